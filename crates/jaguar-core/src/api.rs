//! Public host-facing configuration and driver result types.

use crate::VideoStandard;

/// Default seed for the power-on RAM pattern.
pub const DEFAULT_RAM_SEED: u64 = 0x4A41_4755_4152_0001;

/// Top-level configuration for a machine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineConfig {
    /// Broadcast standard: selects clocks, half-line period, and field length.
    pub video_standard: VideoStandard,
    /// Boot through the BIOS vector block instead of jumping to the cartridge.
    pub use_bios: bool,
    /// Model the Alpine development board, which never boots through the BIOS.
    pub alpine_hardware: bool,
    /// Run the GPU collaborator each slice.
    pub gpu_enabled: bool,
    /// Run the DSP collaborator each slice.
    pub dsp_enabled: bool,
    /// Log every instruction boundary at `trace` level.
    pub instruction_tracing: bool,
    /// Treat illegal opcodes other than `ILLEGAL` (0x4AFC) as fatal.
    pub strict_illegal_instructions: bool,
    /// Address armed as the watchpoint at build time.
    pub watchpoint_address: Option<u32>,
    /// Seed for the pseudo-random RAM content written by init and reset.
    pub ram_seed: u64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            video_standard: VideoStandard::Ntsc,
            use_bios: false,
            alpine_hardware: false,
            gpu_enabled: true,
            dsp_enabled: true,
            instruction_tracing: false,
            strict_illegal_instructions: false,
            watchpoint_address: None,
            ram_seed: DEFAULT_RAM_SEED,
        }
    }
}

impl MachineConfig {
    /// Returns `true` when reset should copy the boot vector block from the
    /// BIOS rather than point the CPU at the cartridge.
    #[must_use]
    pub const fn boots_through_bios(&self, cartridge_inserted: bool) -> bool {
        self.use_bios && cartridge_inserted && !self.alpine_hardware
    }
}

/// Public run-state surface exposed to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to execute the next slice.
    #[default]
    Running,
    /// A fatal fault is latched; only `reset()` resumes execution.
    FaultLatched,
}

/// What one driver slice did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SliceOutcome {
    /// Emulated time covered by the slice, in microseconds.
    pub elapsed_usec: f64,
    /// 68K cycles requested for the slice.
    pub m68k_cycles: u32,
    /// GPU/DSP cycles requested for the slice (0 when both are disabled).
    pub risc_cycles: u32,
    /// Events dispatched at the end of the slice.
    pub events_fired: u32,
    /// The vertical-line interrupt was raised during the slice.
    pub interrupt_raised: bool,
    /// A field completed during the slice.
    pub frame_done: bool,
}

/// Summary of one [`crate::Machine::execute_frame`] call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameReport {
    /// Slices executed.
    pub slices: u32,
    /// Half-line events dispatched.
    pub half_lines: u32,
    /// Vertical-line interrupts raised.
    pub interrupts_raised: u32,
    /// Emulated time covered, in microseconds.
    pub elapsed_usec: f64,
}

impl FrameReport {
    pub(crate) fn absorb(&mut self, slice: &SliceOutcome) {
        self.slices = self.slices.saturating_add(1);
        self.half_lines = self.half_lines.saturating_add(slice.events_fired);
        self.interrupts_raised = self
            .interrupts_raised
            .saturating_add(u32::from(slice.interrupt_raised));
        self.elapsed_usec += slice.elapsed_usec;
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameReport, MachineConfig, RunState, SliceOutcome, DEFAULT_RAM_SEED};
    use crate::VideoStandard;

    #[test]
    fn default_config_boots_the_cartridge_directly_on_ntsc() {
        let config = MachineConfig::default();
        assert_eq!(config.video_standard, VideoStandard::Ntsc);
        assert!(!config.use_bios);
        assert!(config.gpu_enabled && config.dsp_enabled);
        assert!(!config.strict_illegal_instructions);
        assert_eq!(config.watchpoint_address, None);
        assert_eq!(config.ram_seed, DEFAULT_RAM_SEED);
        assert_eq!(RunState::default(), RunState::Running);
    }

    #[test]
    fn bios_boot_needs_a_cartridge_and_retail_hardware() {
        let config = MachineConfig {
            use_bios: true,
            ..MachineConfig::default()
        };
        assert!(config.boots_through_bios(true));
        assert!(!config.boots_through_bios(false));

        let alpine = MachineConfig {
            alpine_hardware: true,
            ..config
        };
        assert!(!alpine.boots_through_bios(true));
        assert!(!MachineConfig::default().boots_through_bios(true));
    }

    #[test]
    fn frame_report_accumulates_slices() {
        let mut report = FrameReport::default();
        let slice = SliceOutcome {
            elapsed_usec: 32.0,
            events_fired: 1,
            interrupt_raised: true,
            ..SliceOutcome::default()
        };
        report.absorb(&slice);
        report.absorb(&SliceOutcome::default());
        assert_eq!(report.slices, 2);
        assert_eq!(report.half_lines, 1);
        assert_eq!(report.interrupts_raised, 1);
        assert!((report.elapsed_usec - 32.0).abs() < f64::EPSILON);
    }
}
