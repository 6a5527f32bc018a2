//! Diagnostics counters and post-mortem reports.

use std::fmt;

use crate::{
    AccessDirection, AccessRequest, CpuRegisters, FaultClass, FaultCode, InstructionRecord,
    Requester,
};

/// Number of stack rows captured by crash and shutdown reports.
pub const STACK_DUMP_ROWS: usize = 10;
/// Longs per stack row.
pub const STACK_DUMP_COLUMNS: usize = 4;
/// Distance below the stack pointer at which the stack dump starts.
pub const STACK_DUMP_LEAD_BYTES: u32 = 48;
/// Number of exception vectors captured by crash reports.
pub const EXCEPTION_VECTOR_COUNT: usize = 256;
/// Bytes disassembled before the faulting PC.
pub const DISASSEMBLY_LEAD_BYTES: u32 = 0x20;
/// Bytes disassembled after the faulting PC.
pub const DISASSEMBLY_TRAIL_BYTES: u32 = 0x10;

/// Saturating counters fed by the bus dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiagCounters {
    /// Unmapped reads, indexed by [`Requester::index`].
    pub unmapped_reads: [u32; Requester::COUNT],
    /// Unmapped writes, indexed by [`Requester::index`].
    pub unmapped_writes: [u32; Requester::COUNT],
    /// Most recent unmapped access.
    pub last_unmapped: Option<AccessRequest>,
    /// Times the watchpoint fired.
    pub watchpoint_hits: u32,
    /// Bytes sent to the debug console.
    pub console_bytes: u32,
    /// Instruction boundaries reported by the CPU.
    pub instruction_count: u64,
    /// Fetch-class faults latched (odd program counter).
    pub fetch_faults: u32,
    /// Decode-class faults latched (strict illegal opcodes).
    pub decode_faults: u32,
    /// Most recent latched fault.
    pub last_fault: Option<FaultCode>,
}

impl DiagCounters {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one unmapped access.
    pub fn record_unmapped(&mut self, request: &AccessRequest) {
        let slot = match request.direction {
            AccessDirection::Read => &mut self.unmapped_reads[request.requester.index()],
            AccessDirection::Write => &mut self.unmapped_writes[request.requester.index()],
        };
        *slot = slot.saturating_add(1);
        self.last_unmapped = Some(*request);
    }

    /// Records one watchpoint hit.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_watchpoint_hit(&mut self) {
        self.watchpoint_hits = self.watchpoint_hits.saturating_add(1);
    }

    /// Records one debug-console byte.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_console_byte(&mut self) {
        self.console_bytes = self.console_bytes.saturating_add(1);
    }

    /// Records one latched fault under its class.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_fault(&mut self, code: FaultCode) {
        match code.class() {
            FaultClass::Fetch => self.fetch_faults = self.fetch_faults.saturating_add(1),
            FaultClass::Decode => self.decode_faults = self.decode_faults.saturating_add(1),
        }
        self.last_fault = Some(code);
    }

    /// Increments the instruction counter with saturating behavior.
    #[allow(clippy::missing_const_for_fn)]
    pub fn increment_instruction_count(&mut self) {
        self.instruction_count = self.instruction_count.saturating_add(1);
    }

    /// Unmapped reads issued by `who`.
    #[must_use]
    pub const fn unmapped_reads_by(&self, who: Requester) -> u32 {
        self.unmapped_reads[who.index()]
    }

    /// Unmapped writes issued by `who`.
    #[must_use]
    pub const fn unmapped_writes_by(&self, who: Requester) -> u32 {
        self.unmapped_writes[who.index()]
    }

    /// Unmapped accesses of either direction across every requester.
    #[must_use]
    pub fn total_unmapped(&self) -> u64 {
        self.unmapped_reads
            .iter()
            .chain(self.unmapped_writes.iter())
            .map(|count| u64::from(*count))
            .sum()
    }

    /// Resets all counters to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One row of a stack dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackRow {
    /// Address of the first long.
    pub address: u32,
    /// Longs read from `address` upwards.
    pub longs: [u32; STACK_DUMP_COLUMNS],
}

/// One disassembled (or raw) instruction in a crash report.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisassemblyLine {
    /// Instruction address.
    pub address: u32,
    /// Mnemonic text, or the raw opcode word when no disassembler is present.
    pub text: String,
}

/// State of the vertical-line interrupt at report time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VideoInterruptStatus {
    /// Enabled in `INT1` with a valid handler installed at vector 64.
    pub enabled: bool,
    /// Programmed interrupt line (`VI`).
    pub line: u16,
}

impl fmt::Display for VideoInterruptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "video interrupt is {} (line={})",
            if self.enabled { "enabled" } else { "disabled" },
            self.line
        )
    }
}

/// Everything captured when the primary CPU hits a fatal fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashReport {
    /// Fault that stopped the CPU.
    pub fault: FaultCode,
    /// Program counter at the fault.
    pub address: u32,
    /// Register file at the fault.
    pub registers: CpuRegisters,
    /// Recent instruction boundaries, oldest first.
    pub history: Vec<InstructionRecord>,
    /// Instructions around the faulting PC.
    pub disassembly: Vec<DisassemblyLine>,
    /// Stack rows starting [`STACK_DUMP_LEAD_BYTES`] below SP.
    pub stack: Vec<StackRow>,
    /// Vertical-line interrupt state.
    pub video_interrupt: VideoInterruptStatus,
    /// Exception vector table (`EXCEPTION_VECTOR_COUNT` longs from address 0).
    pub vectors: Vec<u32>,
}

impl fmt::Display for CrashReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "M68K {} at {:06X}", self.fault, self.address)?;
        write_registers(f, &self.registers)?;
        write_stack(f, self.registers.sp(), &self.stack)?;
        writeln!(f, "{}", self.video_interrupt)?;

        writeln!(f, "disassembly:")?;
        for line in &self.disassembly {
            let marker = if line.address == self.address { '>' } else { ' ' };
            writeln!(f, "{marker} {:06X}: {}", line.address, line.text)?;
        }

        writeln!(f, "history ({} instructions, oldest first):", self.history.len())?;
        for record in &self.history {
            let r = &record.registers;
            writeln!(
                f,
                "  {:06X} {:04X} SR={:04X} D0={:08X} A0={:08X} A7={:08X}",
                r.pc, record.opcode, r.sr, r.d[0], r.a[0], r.a[7]
            )?;
        }

        writeln!(f, "installed exception handlers:")?;
        for (vector, handler) in self.vectors.iter().enumerate() {
            if is_valid_handler(*handler) {
                writeln!(f, "  #{vector:<3} -> {handler:06X}")?;
            }
        }
        Ok(())
    }
}

/// State captured when the host shuts the machine down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Register file at shutdown.
    pub registers: CpuRegisters,
    /// Stack rows starting [`STACK_DUMP_LEAD_BYTES`] below SP.
    pub stack: Vec<StackRow>,
    /// Low five bits of `INT1`: enabled interrupt sources.
    pub interrupt_enable: u8,
    /// Vertical-line interrupt state.
    pub video_interrupt: VideoInterruptStatus,
    /// Diagnostics counters at shutdown.
    pub counters: DiagCounters,
}

impl fmt::Display for ShutdownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_stack(f, self.registers.sp(), &self.stack)?;
        writeln!(f, "interrupt enable = ${:02X}", self.interrupt_enable)?;
        writeln!(f, "{}", self.video_interrupt)?;
        write_registers(f, &self.registers)?;
        write!(
            f,
            "unmapped accesses = {}, console bytes = {}, instructions = {}, faults = {}/{}",
            self.counters.total_unmapped(),
            self.counters.console_bytes,
            self.counters.instruction_count,
            self.counters.fetch_faults,
            self.counters.decode_faults
        )
    }
}

/// Returns `true` when an exception vector points at a plausible handler.
#[must_use]
pub const fn is_valid_handler(handler: u32) -> bool {
    handler != 0 && handler != 0xFFFF_FFFF
}

fn write_registers(f: &mut fmt::Formatter<'_>, registers: &CpuRegisters) -> fmt::Result {
    writeln!(f, "PC={:06X} SR={:04X}", registers.pc, registers.sr)?;
    for (prefix, bank) in [('D', &registers.d), ('A', &registers.a)] {
        for (index, value) in bank.iter().enumerate() {
            let separator = if index % 4 == 3 { '\n' } else { ' ' };
            write!(f, "{prefix}{index}={value:08X}{separator}")?;
        }
    }
    Ok(())
}

fn write_stack(f: &mut fmt::Formatter<'_>, sp: u32, rows: &[StackRow]) -> fmt::Result {
    writeln!(f, "stack (SP={sp:08X}):")?;
    for row in rows {
        write!(f, "{:06X}:", row.address)?;
        for long in row.longs {
            write!(f, " {long:08X}")?;
        }
        writeln!(f)?;
    }
    Ok(())
}
