//! Interrupt mediation between the custom chips and the 68K.
//!
//! Every chip-level source shares one CPU priority level. The handler tells
//! them apart by reading the video chip's `INT1` status register.

use std::fmt;

/// 68K priority level shared by every chip interrupt source.
pub const CPU_INTERRUPT_LEVEL: u8 = 2;

/// User vector returned when the CPU acknowledges [`CPU_INTERRUPT_LEVEL`].
pub const USER_INTERRUPT_VECTOR: u8 = 64;

/// Chip-level interrupt sources multiplexed onto [`CPU_INTERRUPT_LEVEL`].
///
/// Discriminants are the bit positions in the video chip's `INT1` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum InterruptSource {
    /// Vertical counter reached the programmed interrupt line.
    Video = 0,
    /// The GPU raised an interrupt to the CPU.
    Gpu = 1,
    /// The object processor hit a stop object (horizontal blank).
    ObjectProcessor = 2,
    /// A programmable timer expired.
    Timer = 3,
    /// The DSP raised an interrupt through JERRY.
    Dsp = 4,
}

impl InterruptSource {
    /// Every source in `INT1` bit order.
    pub const ALL: [Self; 5] = [
        Self::Video,
        Self::Gpu,
        Self::ObjectProcessor,
        Self::Timer,
        Self::Dsp,
    ];

    /// Mask of this source in the `INT1` enable and pending fields.
    #[must_use]
    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Result of the CPU's interrupt-acknowledge cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptAck {
    /// Use the supplied exception vector.
    Vector(u8),
    /// Fall back to the CPU's autovector for the level.
    Autovector,
}

impl fmt::Display for InterruptAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector(vector) => write!(f, "vector {vector}"),
            Self::Autovector => f.write_str("autovector"),
        }
    }
}

/// Asserted priority level of the primary CPU's interrupt input.
///
/// Level 0 means the line is clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterruptLine {
    level: u8,
}

impl InterruptLine {
    /// Creates a clear interrupt line.
    #[must_use]
    pub const fn new() -> Self {
        Self { level: 0 }
    }

    /// Returns the asserted level (0 when clear).
    #[must_use]
    pub const fn level(self) -> u8 {
        self.level
    }

    /// Returns `true` when any level is asserted.
    #[must_use]
    pub const fn is_asserted(self) -> bool {
        self.level != 0
    }

    /// Asserts `level` on the line. Levels above 7 are clamped.
    #[allow(clippy::missing_const_for_fn)]
    pub fn assert_level(&mut self, level: u8) {
        self.level = level.min(7);
    }

    /// Clears the line.
    #[allow(clippy::missing_const_for_fn)]
    pub fn clear(&mut self) {
        self.level = 0;
    }

    /// Runs the acknowledge handshake for `level`.
    ///
    /// Acknowledging the shared chip level clears the line before the CPU
    /// takes the exception and returns [`USER_INTERRUPT_VECTOR`]; every other
    /// level is left to the CPU's autovector logic.
    #[allow(clippy::missing_const_for_fn)]
    pub fn acknowledge(&mut self, level: u8) -> InterruptAck {
        if level == CPU_INTERRUPT_LEVEL {
            self.clear();
            InterruptAck::Vector(USER_INTERRUPT_VECTOR)
        } else {
            InterruptAck::Autovector
        }
    }
}
