//! Half-line video timing: advances the vertical counter, raises the
//! vertical-line interrupt, and detects the end of each field.

use crate::{InterruptSource, Requester, SystemBus, VideoStandard, CPU_INTERRUPT_LEVEL};

/// Vertical counter register (`VC`).
pub const VC_REGISTER: u32 = 0xF0_0006;
/// Vertical interrupt line register (`VI`).
pub const VI_REGISTER: u32 = 0xF0_004E;
/// Interrupt control register (`INT1`): enable mask and pending status.
pub const INT1_REGISTER: u32 = 0xF0_00E0;

/// `VC` bit set while the lower (odd) field is scanned.
pub const LOWER_FIELD_FLAG: u16 = 0x0800;
/// `VC` bits holding the half-line number within the field.
pub const HALF_LINE_MASK: u16 = 0x07FF;

/// What one half-line tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HalfLineOutcome {
    /// `VC` value written back, field flag included.
    pub vc: u16,
    /// The counter wrapped and the field flag toggled.
    pub field_toggled: bool,
    /// The vertical-line interrupt was raised toward the 68K.
    pub interrupt_raised: bool,
    /// The counter reached line 0: a field (and emulated frame) is complete.
    pub frame_done: bool,
}

/// Scheduler state kept outside the video chip: the interlace field flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoTiming {
    standard: VideoStandard,
    lower_field: bool,
}

impl VideoTiming {
    /// Creates timing for `standard`, starting on the upper field.
    #[must_use]
    pub const fn new(standard: VideoStandard) -> Self {
        Self {
            standard,
            lower_field: false,
        }
    }

    /// Configured broadcast standard.
    #[must_use]
    pub const fn standard(&self) -> VideoStandard {
        self.standard
    }

    /// `true` while the lower field is being scanned.
    #[must_use]
    pub const fn lower_field(&self) -> bool {
        self.lower_field
    }

    /// Interval between half-line ticks, in microseconds.
    #[must_use]
    pub const fn period_usec(&self) -> f64 {
        self.standard.half_line_usec()
    }

    /// Returns to the upper field.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset(&mut self) {
        self.lower_field = false;
    }

    /// Runs one half-line tick against the chip registers on `bus`.
    ///
    /// Register traffic here is internal and never trips the watchpoint.
    /// The caller re-arms the tick after [`Self::period_usec`].
    pub fn on_half_line(&mut self, bus: &mut SystemBus) -> HalfLineOutcome {
        let mut vc = bus.peek_word(VC_REGISTER, Requester::Jaguar).wrapping_add(1);

        let field_toggled = (vc & HALF_LINE_MASK) >= self.standard.half_lines_per_field();
        if field_toggled {
            self.lower_field = !self.lower_field;
            vc = if self.lower_field { LOWER_FIELD_FLAG } else { 0 };
        }
        bus.poke_word(VC_REGISTER, vc, Requester::Jaguar);

        let line = vc & HALF_LINE_MASK;
        let vi = bus.peek_word(VI_REGISTER, Requester::Jaguar);
        let interrupt_raised =
            line == vi && line > 0 && bus.video().interrupt_enabled(InterruptSource::Video);
        if interrupt_raised {
            bus.video_mut().set_pending_interrupt(InterruptSource::Video);
            bus.assert_interrupt(CPU_INTERRUPT_LEVEL);
        }

        bus.video_mut().exec_half_line(vc, true);

        let frame_done = line == 0;
        if frame_done {
            bus.host_mut().poll_input();
        }

        HalfLineOutcome {
            vc,
            field_toggled,
            interrupt_raised,
            frame_done,
        }
    }
}

impl Default for VideoTiming {
    fn default() -> Self {
        Self::new(VideoStandard::default())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        VideoTiming, HALF_LINE_MASK, INT1_REGISTER, LOWER_FIELD_FLAG, VC_REGISTER, VI_REGISTER,
    };
    use rstest::rstest;

    use crate::{Requester, SystemBus, VideoStandard};

    #[test]
    fn counter_increments_and_is_written_back() {
        let mut bus = SystemBus::headless();
        let mut timing = VideoTiming::new(VideoStandard::Ntsc);
        let outcome = timing.on_half_line(&mut bus);
        assert_eq!(outcome.vc, 1);
        assert!(!outcome.frame_done);
        assert_eq!(bus.read_word(VC_REGISTER, Requester::Debugger), 1);
    }

    #[test]
    fn wrap_toggles_field_and_completes_frame() {
        let mut bus = SystemBus::headless();
        bus.write_word(VC_REGISTER, 524, Requester::Jaguar);
        let mut timing = VideoTiming::new(VideoStandard::Ntsc);

        let outcome = timing.on_half_line(&mut bus);
        assert!(outcome.field_toggled);
        assert!(outcome.frame_done);
        assert_eq!(outcome.vc, LOWER_FIELD_FLAG);
        assert!(timing.lower_field());

        bus.write_word(VC_REGISTER, LOWER_FIELD_FLAG | 524, Requester::Jaguar);
        let outcome = timing.on_half_line(&mut bus);
        assert_eq!(outcome.vc, 0);
        assert!(!timing.lower_field());
    }

    #[test]
    fn pal_counts_further_before_wrapping() {
        let mut bus = SystemBus::headless();
        bus.write_word(VC_REGISTER, 524, Requester::Jaguar);
        let mut timing = VideoTiming::new(VideoStandard::Pal);
        let outcome = timing.on_half_line(&mut bus);
        assert!(!outcome.field_toggled);
        assert_eq!(outcome.vc & HALF_LINE_MASK, 525);
    }

    #[test]
    fn programmed_line_raises_level_two_only_when_enabled() {
        let mut bus = SystemBus::headless();
        bus.write_word(VI_REGISTER, 1, Requester::M68k);
        let mut timing = VideoTiming::default();

        assert!(!timing.on_half_line(&mut bus).interrupt_raised);
        assert_eq!(bus.interrupt_level(), 0);

        bus.write_word(VC_REGISTER, 0, Requester::Jaguar);
        bus.write_word(INT1_REGISTER, 0x0001, Requester::M68k);
        assert!(timing.on_half_line(&mut bus).interrupt_raised);
        assert_eq!(bus.interrupt_level(), 2);
        assert_eq!(bus.read_word(INT1_REGISTER, Requester::M68k) & 1, 1);
    }

    #[test]
    fn line_zero_never_interrupts() {
        let mut bus = SystemBus::headless();
        bus.write_word(INT1_REGISTER, 0x0001, Requester::M68k);
        bus.write_word(VC_REGISTER, 524, Requester::Jaguar);
        let mut timing = VideoTiming::new(VideoStandard::Ntsc);
        let outcome = timing.on_half_line(&mut bus);
        assert!(outcome.frame_done);
        assert!(!outcome.interrupt_raised);
    }

    #[rstest]
    #[case(VC_REGISTER)]
    #[case(VI_REGISTER)]
    fn counter_traffic_stays_off_the_watchpoint(#[case] watched: u32) {
        let mut bus = SystemBus::headless();
        bus.set_watchpoint(Some(watched));
        let mut timing = VideoTiming::default();
        for _ in 0..4 {
            timing.on_half_line(&mut bus);
        }
        assert_eq!(bus.counters().watchpoint_hits, 0);
        assert_eq!(bus.peek_word(VC_REGISTER, Requester::Debugger), 4);

        bus.read_word(watched, Requester::M68k);
        assert_eq!(bus.counters().watchpoint_hits, 1);
    }

    #[test]
    fn period_follows_the_standard() {
        assert!((VideoTiming::new(VideoStandard::Pal).period_usec() - 32.0).abs() < f64::EPSILON);
    }
}
