//! Deterministic frame fingerprint used for cross-host comparison.
//!
//! Boots a zeroed cartridge, runs a handful of fields with the line
//! interrupt armed, and hashes RAM together with the diagnostics counters.

use jaguar_core::{
    CpuRegisters, InstructionVerdict, MachineBuilder, MachineConfig, PrimaryCpu, Requester,
    SystemBus, INT1_REGISTER, VI_REGISTER,
};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

const FRAMES: u32 = 8;
const RUN_ADDRESS: u32 = 0x80_0000;
const CARTRIDGE_MASK: u32 = 0x3FFF;
const SCRATCH: u32 = 0x1000;

/// Walks the cartridge two bytes at a time and stores a running sum.
#[derive(Default)]
struct SummingCpu {
    registers: CpuRegisters,
    acknowledged: u32,
}

impl PrimaryCpu for SummingCpu {
    fn execute(&mut self, cycles: u32, bus: &mut SystemBus) -> u32 {
        let mut used = 0;
        while used < cycles {
            let level = bus.interrupt_level();
            if level > 0 {
                bus.acknowledge_interrupt(level);
                self.acknowledged = self.acknowledged.wrapping_add(1);
            }
            let opcode = bus.read_word(self.registers.pc, Requester::M68k);
            if bus.on_instruction(&self.registers, opcode, true) == InstructionVerdict::Halt {
                break;
            }
            let sum = self.registers.d[0].wrapping_add(u32::from(opcode) ^ self.acknowledged);
            self.registers.d[0] = sum;
            bus.write_long(SCRATCH + (used & 0xFC), sum, Requester::M68k);
            self.registers.pc = RUN_ADDRESS | (self.registers.pc.wrapping_add(2) & CARTRIDGE_MASK);
            used += 4;
        }
        used
    }

    fn pulse_reset(&mut self, bus: &mut SystemBus) {
        self.registers = CpuRegisters::default();
        self.registers.a[7] = bus.read_long(0, Requester::M68k);
        self.registers.pc = bus.read_long(4, Requester::M68k);
        self.acknowledged = 0;
    }

    fn registers(&self) -> CpuRegisters {
        self.registers
    }
}

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn fingerprint() -> String {
    let mut machine = MachineBuilder::new(SummingCpu::default()).build(MachineConfig {
        gpu_enabled: false,
        dsp_enabled: false,
        ..MachineConfig::default()
    });
    let cartridge: Vec<u8> = (0..=u8::MAX)
        .cycle()
        .take(0x4000)
        .map(|byte| byte.wrapping_mul(7))
        .collect();
    machine.load_cartridge(&cartridge, RUN_ADDRESS);
    machine.reset();
    machine.bus_mut().write_word(VI_REGISTER, 200, Requester::M68k);
    machine
        .bus_mut()
        .write_word(INT1_REGISTER, 0x0001, Requester::M68k);

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for _ in 0..FRAMES {
        let report = machine.execute_frame().expect("frame should run");
        hash_bytes(&mut hash, &report.half_lines.to_le_bytes());
        hash_bytes(&mut hash, &report.interrupts_raised.to_le_bytes());
    }

    let counters = machine.counters();
    hash_bytes(&mut hash, &counters.instruction_count.to_le_bytes());
    hash_bytes(&mut hash, &counters.total_unmapped().to_le_bytes());
    hash_bytes(&mut hash, &machine.cpu_registers().pc.to_le_bytes());
    hash_bytes(&mut hash, machine.main_ram());

    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}
