//! Register-file video chip that models only the `INT1` interrupt logic.

use crate::{BusDevice, InterruptSource, RegisterLatch, Requester, VideoChip, INT1_REGISTER};

const INTERRUPT_MASK: u8 = 0x1F;

/// Headless stand-in for TOM.
///
/// Everything except `INT1` is a plain latch. Writing `INT1` sets the enable
/// mask from the low byte and clears the pending bits named in the high byte;
/// a word read of `INT1` returns the pending bits. Byte reads see the latched
/// value, so `INT1 + 1` reads back the enable mask.
#[derive(Debug, Clone)]
pub struct LatchedVideo {
    registers: RegisterLatch,
    enabled: u8,
    pending: u8,
    half_lines: u64,
    rendered_half_lines: u64,
    last_vc: u16,
}

impl Default for LatchedVideo {
    fn default() -> Self {
        Self::new()
    }
}

impl LatchedVideo {
    /// Creates a zeroed chip covering `0xF00000..=0xF0FFFF`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registers: RegisterLatch::new(crate::VIDEO_START, 0x1_0000),
            enabled: 0,
            pending: 0,
            half_lines: 0,
            rendered_half_lines: 0,
            last_vc: 0,
        }
    }

    /// Enabled interrupt sources (`INT1` bits 0..=4).
    #[must_use]
    pub const fn enabled_mask(&self) -> u8 {
        self.enabled
    }

    /// Pending interrupt sources (`INT1` bits 0..=4).
    #[must_use]
    pub const fn pending_mask(&self) -> u8 {
        self.pending
    }

    /// Half-lines seen since reset.
    #[must_use]
    pub const fn half_lines(&self) -> u64 {
        self.half_lines
    }

    /// Half-lines seen with rendering requested.
    #[must_use]
    pub const fn rendered_half_lines(&self) -> u64 {
        self.rendered_half_lines
    }

    /// Counter value passed to the most recent half-line.
    #[must_use]
    pub const fn last_vc(&self) -> u16 {
        self.last_vc
    }

    #[allow(clippy::missing_const_for_fn)]
    fn write_int1(&mut self, value: u16) {
        let [clear, enable] = value.to_be_bytes();
        self.enabled = enable & INTERRUPT_MASK;
        self.pending &= !(clear & INTERRUPT_MASK);
    }
}

impl BusDevice for LatchedVideo {
    fn read8(&mut self, address: u32, who: Requester) -> u8 {
        self.registers.read8(address, who)
    }

    fn read16(&mut self, address: u32, who: Requester) -> u16 {
        if address & crate::ADDRESS_MASK == INT1_REGISTER {
            u16::from(self.pending)
        } else {
            self.registers.read16(address, who)
        }
    }

    fn write8(&mut self, address: u32, value: u8, who: Requester) {
        self.registers.write8(address, value, who);
        let address = address & crate::ADDRESS_MASK;
        if address == INT1_REGISTER || address == INT1_REGISTER + 1 {
            let latched = self.registers.peek16(INT1_REGISTER);
            self.write_int1(latched);
        }
    }

    fn write16(&mut self, address: u32, value: u16, who: Requester) {
        self.registers.write16(address, value, who);
        if address & crate::ADDRESS_MASK == INT1_REGISTER {
            self.write_int1(value);
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

impl VideoChip for LatchedVideo {
    fn interrupt_enabled(&self, source: InterruptSource) -> bool {
        self.enabled & source.bit() != 0
    }

    fn set_pending_interrupt(&mut self, source: InterruptSource) {
        self.pending |= source.bit();
    }

    fn exec_half_line(&mut self, vc: u16, render: bool) {
        self.half_lines = self.half_lines.saturating_add(1);
        if render {
            self.rendered_half_lines = self.rendered_half_lines.saturating_add(1);
        }
        self.last_vc = vc;
    }
}
