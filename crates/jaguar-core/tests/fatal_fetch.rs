//! Fatal faults: odd instruction fetches, strict illegal-opcode handling,
//! crash reports, and recovery through reset.

mod support;

use jaguar_core::{
    FaultCode, Machine, MachineBuilder, MachineConfig, MachineError, RunState,
    EXCEPTION_VECTOR_COUNT, ILLEGAL_OPCODE,
};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use support::{zeroed_cartridge, ScriptCpu};
use thiserror as _;
use tracing as _;

const CARTRIDGE_BASE: u32 = 0x80_0000;
const NOP: u16 = 0x4E71;

fn machine(strict: bool) -> Machine {
    let (cpu, _) = ScriptCpu::new();
    MachineBuilder::new(cpu).build(MachineConfig {
        gpu_enabled: false,
        dsp_enabled: false,
        strict_illegal_instructions: strict,
        ..MachineConfig::default()
    })
}

fn nop_cartridge_with(offset: usize, opcode: u16) -> Vec<u8> {
    let mut image: Vec<u8> = NOP.to_be_bytes().repeat(0x800);
    image[offset..offset + 2].copy_from_slice(&opcode.to_be_bytes());
    image
}

#[test]
fn odd_run_address_is_fatal_and_reported() {
    let mut machine = machine(false);
    machine.load_cartridge(&zeroed_cartridge(0x1000), 0x1001);
    machine.reset();

    let error = machine.step_slice().expect_err("odd fetch must be fatal");
    assert!(error.to_string().contains("001001"));

    let report = error.crash_report().expect("fatal errors carry a report");
    assert_eq!(report.fault, FaultCode::OddAddressFetch);
    assert_eq!(report.address, 0x1001);
    assert_eq!(report.vectors.len(), EXCEPTION_VECTOR_COUNT);
    assert_eq!(report.history.last().map(|r| r.registers.pc), Some(0x1001));
    assert!(report
        .to_string()
        .starts_with("M68K instruction fetch from odd address at 001001"));
    assert_eq!(machine.run_state(), RunState::FaultLatched);

    let counters = machine.counters();
    assert_eq!((counters.fetch_faults, counters.decode_faults), (1, 0));
    assert_eq!(counters.last_fault, Some(FaultCode::OddAddressFetch));
}

#[test]
fn latched_fault_halts_until_reset() {
    let mut machine = machine(false);
    machine.load_cartridge(&zeroed_cartridge(0x1000), 0x1001);
    machine.reset();
    assert!(matches!(machine.step_slice(), Err(MachineError::Fatal(_))));
    assert!(matches!(machine.step_slice(), Err(MachineError::Halted)));
    assert!(matches!(machine.execute_frame(), Err(MachineError::Halted)));

    machine.load_cartridge(&zeroed_cartridge(0x1000), CARTRIDGE_BASE);
    machine.reset();
    assert_eq!(machine.run_state(), RunState::Running);
    assert!(machine.step_slice().is_ok());
}

#[test]
fn strict_mode_stops_on_an_illegal_opcode() {
    let mut machine = machine(true);
    machine.load_cartridge(&nop_cartridge_with(0x10, 0xFFFF), CARTRIDGE_BASE);
    machine.reset();

    let Err(MachineError::Fatal(report)) = machine.step_slice() else {
        panic!("illegal opcode must be fatal in strict mode");
    };
    assert_eq!(report.fault, FaultCode::IllegalInstruction);
    assert_eq!(report.address, CARTRIDGE_BASE + 0x10);
    assert_eq!(report.history.len(), 9);
    assert_eq!(machine.counters().decode_faults, 1);
    assert_eq!(machine.counters().last_fault, Some(FaultCode::IllegalInstruction));

    let at_fault = report
        .disassembly
        .iter()
        .find(|line| line.address == CARTRIDGE_BASE)
        .expect("window covers the cartridge start");
    assert_eq!(at_fault.text, "nop");
    assert!(report
        .disassembly
        .iter()
        .any(|line| line.address == CARTRIDGE_BASE + 0x10 && line.text == "dc.w $FFFF"));
}

#[rstest]
#[case(true, ILLEGAL_OPCODE)]
#[case(false, 0xFFFF)]
fn tolerated_opcodes_keep_running(#[case] strict: bool, #[case] opcode: u16) {
    let mut machine = machine(strict);
    machine.load_cartridge(&nop_cartridge_with(0x10, opcode), CARTRIDGE_BASE);
    machine.reset();

    machine.step_slice().expect("slice runs");
    assert_eq!(machine.run_state(), RunState::Running);
    assert!(machine.counters().instruction_count > 9);
    assert_eq!(machine.counters().last_fault, None);
}
