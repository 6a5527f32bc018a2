//! Plain register-file device: every register reads back what was written.

use crate::{BusDevice, Requester};

/// Byte-addressed register file covering `base..base + len`.
///
/// Addresses outside the window wrap modulo `len`, so the latch tolerates
/// being mapped over a larger region than it models.
#[derive(Debug, Clone)]
pub struct RegisterLatch {
    base: u32,
    registers: Box<[u8]>,
    writes: u64,
}

impl RegisterLatch {
    /// Creates a zeroed latch at `base` holding `len` bytes (minimum 2).
    #[must_use]
    pub fn new(base: u32, len: usize) -> Self {
        Self {
            base,
            registers: vec![0; len.max(2)].into_boxed_slice(),
            writes: 0,
        }
    }

    /// Latch covering the disc controller block.
    #[must_use]
    pub fn cd_controller() -> Self {
        Self::new(crate::CD_START, 0x100)
    }

    /// Latch covering JERRY's block.
    #[must_use]
    pub fn audio_chip() -> Self {
        Self::new(crate::AUDIO_START, 0x1_0000)
    }

    /// First address decoded by the latch.
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Number of writes accepted since the last reset.
    #[must_use]
    pub const fn writes(&self) -> u64 {
        self.writes
    }

    /// Raw register bytes.
    #[must_use]
    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    /// Reads a byte without requester bookkeeping.
    #[must_use]
    pub fn peek8(&self, address: u32) -> u8 {
        self.registers[self.index(address)]
    }

    /// Reads a big-endian word without requester bookkeeping.
    #[must_use]
    pub fn peek16(&self, address: u32) -> u16 {
        u16::from_be_bytes([self.peek8(address), self.peek8(address.wrapping_add(1))])
    }

    /// Stores a byte without requester bookkeeping.
    pub fn poke8(&mut self, address: u32, value: u8) {
        let index = self.index(address);
        self.registers[index] = value;
    }

    /// Stores a big-endian word without requester bookkeeping.
    pub fn poke16(&mut self, address: u32, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.poke8(address, hi);
        self.poke8(address.wrapping_add(1), lo);
    }

    fn index(&self, address: u32) -> usize {
        let relative = (address & crate::ADDRESS_MASK).wrapping_sub(self.base) as usize;
        relative % self.registers.len()
    }
}

impl BusDevice for RegisterLatch {
    fn read8(&mut self, address: u32, _who: Requester) -> u8 {
        self.peek8(address)
    }

    fn read16(&mut self, address: u32, _who: Requester) -> u16 {
        self.peek16(address)
    }

    fn write8(&mut self, address: u32, value: u8, _who: Requester) {
        self.writes = self.writes.saturating_add(1);
        self.poke8(address, value);
    }

    fn write16(&mut self, address: u32, value: u16, _who: Requester) {
        self.writes = self.writes.saturating_add(1);
        self.poke16(address, value);
    }

    fn reset(&mut self) {
        self.registers.fill(0);
        self.writes = 0;
    }
}
