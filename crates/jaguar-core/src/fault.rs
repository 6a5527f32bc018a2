use thiserror::Error;

use crate::CrashReport;

/// Fault classes used for diagnostics aggregation and policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Instruction fetch violated the CPU's alignment contract.
    Fetch,
    /// The CPU reported an opcode it cannot execute.
    Decode,
}

/// Stable fault taxonomy for conditions that stop the primary CPU.
///
/// Unmapped bus traffic and watchpoint hits are diagnostics, not faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultCode {
    /// The 68K program counter reached an odd address.
    #[error("instruction fetch from odd address")]
    OddAddressFetch,
    /// An illegal opcode other than `ILLEGAL` (0x4AFC) ran in strict mode.
    #[error("illegal instruction")]
    IllegalInstruction,
}

impl FaultCode {
    /// Returns the diagnostics fault class for this fault code.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::OddAddressFetch => FaultClass::Fetch,
            Self::IllegalInstruction => FaultClass::Decode,
        }
    }
}

/// Error returned by the execution driver.
#[derive(Debug, Error)]
pub enum MachineError {
    /// A terminal fault stopped the primary CPU.
    #[error("fatal fault at {:06X}: {}", .0.address, .0.fault)]
    Fatal(Box<CrashReport>),
    /// A previous fatal fault is still latched; call `reset()` first.
    #[error("machine halted after a fatal fault")]
    Halted,
    /// No event is armed, so emulated time cannot advance.
    #[error("event queue is empty")]
    SchedulerStalled,
}

impl MachineError {
    /// Returns the crash report for fatal errors.
    #[must_use]
    pub fn crash_report(&self) -> Option<&CrashReport> {
        match self {
            Self::Fatal(report) => Some(report),
            Self::Halted | Self::SchedulerStalled => None,
        }
    }
}
