//! Contracts for the collaborators the core drives but does not implement.
//!
//! Bus masters (the 68K and the two RISC engines) borrow the [`SystemBus`]
//! for the length of one slice. Register-block devices are owned by the bus
//! and never see it, so they cannot re-enter the dispatcher.

use crate::{AccessRequest, InterruptSource, Requester, SystemBus};

/// Snapshot of the 68K register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuRegisters {
    /// Program counter.
    pub pc: u32,
    /// Status register.
    pub sr: u16,
    /// Data registers `D0..=D7`.
    pub d: [u32; 8],
    /// Address registers `A0..=A7`; `a[7]` is the active stack pointer.
    pub a: [u32; 8],
}

impl CpuRegisters {
    /// Active stack pointer (`A7`).
    #[must_use]
    pub const fn sp(&self) -> u32 {
        self.a[7]
    }
}

/// The 68000 interpreter.
///
/// Implementations must call [`SystemBus::on_instruction`] at every
/// instruction boundary and stop the current slice when it returns
/// [`InstructionVerdict::Halt`](crate::InstructionVerdict::Halt). When the
/// CPU honours an interrupt it must call
/// [`SystemBus::acknowledge_interrupt`] to obtain the vector.
pub trait PrimaryCpu {
    /// Runs for up to `cycles` clock cycles and returns the cycles consumed.
    fn execute(&mut self, cycles: u32, bus: &mut SystemBus) -> u32;

    /// Pulses the reset line; the CPU loads SSP and PC from the vector block.
    fn pulse_reset(&mut self, bus: &mut SystemBus);

    /// Current register file.
    fn registers(&self) -> CpuRegisters;

    /// Disassembles the instruction at `address`, returning its text and
    /// length in bytes. The default reports no disassembler.
    fn disassemble(&mut self, bus: &mut SystemBus, address: u32) -> Option<(String, u32)> {
        let _ = (bus, address);
        None
    }
}

/// A RISC co-processor execution engine (GPU or DSP).
pub trait Coprocessor {
    /// Runs for up to `cycles` RISC clock cycles.
    fn execute(&mut self, cycles: u32, bus: &mut SystemBus);

    /// Returns the engine to its power-on state.
    fn reset(&mut self);
}

/// A memory-mapped register block owned by the bus.
///
/// Addresses are full 24-bit bus addresses; devices mask what they decode.
pub trait BusDevice {
    /// Reads one byte.
    fn read8(&mut self, address: u32, who: Requester) -> u8;
    /// Reads one big-endian word.
    fn read16(&mut self, address: u32, who: Requester) -> u16;
    /// Writes one byte.
    fn write8(&mut self, address: u32, value: u8, who: Requester);
    /// Writes one big-endian word.
    fn write16(&mut self, address: u32, value: u16, who: Requester);
    /// Returns the device to its power-on state.
    fn reset(&mut self);
}

/// The video chip: a register block plus the interrupt and line hooks the
/// half-line scheduler needs.
pub trait VideoChip: BusDevice {
    /// Returns `true` when `source` is enabled in `INT1`.
    fn interrupt_enabled(&self, source: InterruptSource) -> bool;
    /// Marks `source` pending in `INT1`.
    fn set_pending_interrupt(&mut self, source: InterruptSource);
    /// Renders (or merely accounts for) the half-line at counter `vc`.
    fn exec_half_line(&mut self, vc: u16, render: bool);
}

/// Callbacks into the embedding host. Every method defaults to a no-op.
pub trait HostHooks {
    /// One byte written to the debug console port.
    fn debug_console_byte(&mut self, byte: u8) {
        let _ = byte;
    }

    /// The armed watchpoint was touched; called before the access completes.
    fn watchpoint_hit(&mut self, request: &AccessRequest) {
        let _ = request;
    }

    /// An access landed on nothing.
    fn unmapped_access(&mut self, request: &AccessRequest) {
        let _ = request;
    }

    /// Once per frame, at the top of the first field line.
    fn poll_input(&mut self) {}
}

/// Host that ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl HostHooks for NullHost {}

#[cfg(test)]
mod tests {
    use super::{CpuRegisters, HostHooks, NullHost};
    use crate::{AccessRequest, AccessWidth, Requester};

    #[test]
    fn stack_pointer_is_a7() {
        let mut registers = CpuRegisters::default();
        registers.a[7] = 0x0020_0000;
        assert_eq!(registers.sp(), 0x0020_0000);
    }

    #[test]
    fn null_host_accepts_every_callback() {
        let mut host = NullHost;
        let request = AccessRequest::read(0xF2_0000, AccessWidth::Word, Requester::M68k);
        host.debug_console_byte(b'A');
        host.watchpoint_hit(&request);
        host.unmapped_access(&request);
        host.poll_input();
    }
}
