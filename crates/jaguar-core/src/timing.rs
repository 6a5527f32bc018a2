//! Video standards, half-line periods, and clock-domain conversion.

use std::fmt;

/// 68K clock in NTSC consoles, in hertz.
pub const M68K_CLOCK_NTSC_HZ: f64 = 13_295_453.0;
/// 68K clock in PAL consoles, in hertz.
pub const M68K_CLOCK_PAL_HZ: f64 = 13_296_950.0;
/// GPU/DSP clock in NTSC consoles, in hertz.
pub const RISC_CLOCK_NTSC_HZ: f64 = 26_590_906.0;
/// GPU/DSP clock in PAL consoles, in hertz.
pub const RISC_CLOCK_PAL_HZ: f64 = 26_593_900.0;

/// NTSC half-line period in microseconds.
pub const NTSC_HALF_LINE_USEC: f64 = 31.777_777_777;
/// PAL half-line period in microseconds.
pub const PAL_HALF_LINE_USEC: f64 = 32.0;

/// Half-lines counted per NTSC field before the counter wraps.
pub const NTSC_HALF_LINES_PER_FIELD: u16 = 525;
/// Half-lines counted per PAL field before the counter wraps.
pub const PAL_HALF_LINES_PER_FIELD: u16 = 625;

/// Broadcast standard the console is wired for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum VideoStandard {
    /// 60 Hz, 525-line timing.
    #[default]
    Ntsc,
    /// 50 Hz, 625-line timing.
    Pal,
}

impl VideoStandard {
    /// Period between half-line events, in microseconds.
    #[must_use]
    pub const fn half_line_usec(self) -> f64 {
        match self {
            Self::Ntsc => NTSC_HALF_LINE_USEC,
            Self::Pal => PAL_HALF_LINE_USEC,
        }
    }

    /// Half-lines counted per field before `VC` wraps.
    #[must_use]
    pub const fn half_lines_per_field(self) -> u16 {
        match self {
            Self::Ntsc => NTSC_HALF_LINES_PER_FIELD,
            Self::Pal => PAL_HALF_LINES_PER_FIELD,
        }
    }

    /// 68K clock for this standard, in hertz.
    #[must_use]
    pub const fn m68k_clock_hz(self) -> f64 {
        match self {
            Self::Ntsc => M68K_CLOCK_NTSC_HZ,
            Self::Pal => M68K_CLOCK_PAL_HZ,
        }
    }

    /// GPU/DSP clock for this standard, in hertz.
    #[must_use]
    pub const fn risc_clock_hz(self) -> f64 {
        match self {
            Self::Ntsc => RISC_CLOCK_NTSC_HZ,
            Self::Pal => RISC_CLOCK_PAL_HZ,
        }
    }

    /// Converts a slice length to whole 68K cycles, rounding to nearest.
    #[must_use]
    pub fn usec_to_m68k_cycles(self, usec: f64) -> u32 {
        usec_to_cycles(usec, self.m68k_clock_hz())
    }

    /// Converts a slice length to whole GPU/DSP cycles, rounding to nearest.
    #[must_use]
    pub fn usec_to_risc_cycles(self, usec: f64) -> u32 {
        usec_to_cycles(usec, self.risc_clock_hz())
    }
}

impl fmt::Display for VideoStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ntsc => "NTSC",
            Self::Pal => "PAL",
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn usec_to_cycles(usec: f64, clock_hz: f64) -> u32 {
    if usec <= 0.0 {
        return 0;
    }
    let cycle_usec = 1_000_000.0 / clock_hz;
    (usec / cycle_usec + 0.5) as u32
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::VideoStandard;

    #[rstest]
    #[case(VideoStandard::Ntsc, 525, 31.777_777_777)]
    #[case(VideoStandard::Pal, 625, 32.0)]
    fn standards_expose_field_geometry(
        #[case] standard: VideoStandard,
        #[case] half_lines: u16,
        #[case] period: f64,
    ) {
        assert_eq!(standard.half_lines_per_field(), half_lines);
        assert!((standard.half_line_usec() - period).abs() < f64::EPSILON);
    }

    #[test]
    fn one_ntsc_half_line_is_about_422_cpu_cycles() {
        let usec = VideoStandard::Ntsc.half_line_usec();
        assert_eq!(VideoStandard::Ntsc.usec_to_m68k_cycles(usec), 422);
        assert_eq!(VideoStandard::Ntsc.usec_to_risc_cycles(usec), 845);
    }

    #[test]
    fn pal_half_line_rounds_to_nearest_cycle() {
        assert_eq!(VideoStandard::Pal.usec_to_m68k_cycles(32.0), 426);
        assert_eq!(VideoStandard::Pal.usec_to_risc_cycles(32.0), 851);
    }

    #[test]
    fn non_positive_slices_run_no_cycles() {
        assert_eq!(VideoStandard::Ntsc.usec_to_m68k_cycles(0.0), 0);
        assert_eq!(VideoStandard::Pal.usec_to_risc_cycles(-5.0), 0);
    }

    #[test]
    fn default_standard_is_ntsc() {
        assert_eq!(VideoStandard::default(), VideoStandard::Ntsc);
        assert_eq!(VideoStandard::Pal.to_string(), "PAL");
    }
}
