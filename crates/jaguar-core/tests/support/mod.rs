//! Scripted collaborators shared by the integration suites.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use jaguar_core::{
    AccessRequest, Coprocessor, CpuRegisters, HostHooks, InstructionVerdict, InterruptAck,
    PrimaryCpu, Requester, SystemBus, ILLEGAL_OPCODE,
};

/// Cycles charged per scripted instruction.
pub const CYCLES_PER_INSTRUCTION: u32 = 4;

/// Observations recorded by [`ScriptCpu`].
#[derive(Debug, Default)]
pub struct CpuLog {
    pub acknowledged: Vec<InterruptAck>,
    pub resets: u32,
    pub instructions: u64,
}

/// A 68K stand-in that walks forward two bytes per instruction.
///
/// It loads SSP and PC from the vector block on reset, reports every
/// boundary to the bus, honours interrupts at or above its mask, and treats
/// any opcode in `illegal` as illegal.
pub struct ScriptCpu {
    registers: CpuRegisters,
    interrupt_mask: u8,
    illegal: Vec<u16>,
    log: Rc<RefCell<CpuLog>>,
}

impl ScriptCpu {
    pub fn new() -> (Self, Rc<RefCell<CpuLog>>) {
        let log = Rc::new(RefCell::new(CpuLog::default()));
        (
            Self {
                registers: CpuRegisters::default(),
                interrupt_mask: 0,
                illegal: vec![ILLEGAL_OPCODE, 0xFFFF],
                log: Rc::clone(&log),
            },
            log,
        )
    }

    pub fn with_interrupt_mask(mut self, mask: u8) -> Self {
        self.interrupt_mask = mask;
        self
    }
}

impl PrimaryCpu for ScriptCpu {
    fn execute(&mut self, cycles: u32, bus: &mut SystemBus) -> u32 {
        let mut used = 0;
        while used < cycles {
            let level = bus.interrupt_level();
            if level > self.interrupt_mask {
                let ack = bus.acknowledge_interrupt(level);
                self.log.borrow_mut().acknowledged.push(ack);
            }

            let opcode = bus.read_word(self.registers.pc, Requester::M68k);
            let legal = !self.illegal.contains(&opcode);
            if bus.on_instruction(&self.registers, opcode, legal) == InstructionVerdict::Halt {
                break;
            }
            self.log.borrow_mut().instructions += 1;
            self.registers.pc = (self.registers.pc + 2) & 0x00FF_FFFF;
            self.registers.d[0] = self.registers.d[0].wrapping_add(u32::from(opcode));
            used += CYCLES_PER_INSTRUCTION;
        }
        used
    }

    fn pulse_reset(&mut self, bus: &mut SystemBus) {
        self.registers = CpuRegisters::default();
        self.registers.a[7] = bus.read_long(0, Requester::M68k);
        self.registers.pc = bus.read_long(4, Requester::M68k) & 0x00FF_FFFF;
        self.registers.sr = 0x2700;
        self.log.borrow_mut().resets += 1;
    }

    fn registers(&self) -> CpuRegisters {
        self.registers
    }

    fn disassemble(&mut self, bus: &mut SystemBus, address: u32) -> Option<(String, u32)> {
        let opcode = bus.peek_word(address, Requester::Debugger);
        (opcode == 0x4E71).then(|| ("nop".to_owned(), 2))
    }
}

/// Co-processor stand-in that records the cycle budgets it was given.
#[derive(Default)]
pub struct CountingEngine {
    pub log: Rc<RefCell<Vec<u32>>>,
    pub resets: Rc<RefCell<u32>>,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Coprocessor for CountingEngine {
    fn execute(&mut self, cycles: u32, _bus: &mut SystemBus) {
        self.log.borrow_mut().push(cycles);
    }

    fn reset(&mut self) {
        *self.resets.borrow_mut() += 1;
    }
}

/// Host that counts frames and collects console output and watchpoint hits.
#[derive(Clone, Default)]
pub struct CountingHost {
    pub polls: Rc<RefCell<u32>>,
    pub console: Rc<RefCell<Vec<u8>>>,
    pub watched: Rc<RefCell<Vec<AccessRequest>>>,
}

impl HostHooks for CountingHost {
    fn debug_console_byte(&mut self, byte: u8) {
        self.console.borrow_mut().push(byte);
    }

    fn watchpoint_hit(&mut self, request: &AccessRequest) {
        self.watched.borrow_mut().push(*request);
    }

    fn poll_input(&mut self) {
        *self.polls.borrow_mut() += 1;
    }
}

/// Cartridge image of `len` zero bytes.
pub fn zeroed_cartridge(len: usize) -> Vec<u8> {
    vec![0; len]
}
