//! Memory bus and event scheduler core for the Atari Jaguar.
//!
//! The crate models the 24-bit address space shared by the 68K, the GPU and
//! DSP, and the custom chips, together with the half-line event scheduler
//! that drives video timing and interrupt delivery. Instruction interpreters
//! and chip internals are collaborators supplied through the traits in
//! [`device`].

/// Memory model primitives and fixed region map.
pub mod memory;
pub use memory::{
    decode_memory_region, resolve, validate_fetch_alignment, AccessDirection, AccessRequest,
    AccessWidth, Backing, MemoryRegion, RegionDescriptor, Requester, ResolvedAccess, WritePolicy,
    ADDRESS_MASK, AUDIO_END, AUDIO_START, BOOT_ROM_BYTES, BOOT_ROM_END, BOOT_ROM_START,
    CARTRIDGE_BYTES, CARTRIDGE_END, CARTRIDGE_START, CD_END, CD_START, DEBUG_CONSOLE_ADDRESS,
    FIXED_MEMORY_REGIONS, MAIN_RAM_BYTES, MAIN_RAM_END, MAIN_RAM_MIRROR_MASK, MAIN_RAM_START,
    RESERVED_END, RESERVED_ROM_END, RESERVED_ROM_START, RESERVED_START, VIDEO_END, VIDEO_START,
};

/// Fault taxonomy and driver errors.
pub mod fault;
pub use fault::{FaultClass, FaultCode, MachineError};

/// Diagnostics counters and post-mortem reports.
pub mod diag;
pub use diag::{
    is_valid_handler, CrashReport, DiagCounters, DisassemblyLine, ShutdownReport, StackRow,
    VideoInterruptStatus, EXCEPTION_VECTOR_COUNT,
};

/// Bounded instruction history.
pub mod history;
pub use history::{InstructionRecord, RingBuffer, INSTRUCTION_HISTORY_CAPACITY};

/// Interrupt line and acknowledge handshake.
pub mod interrupt;
pub use interrupt::{
    InterruptAck, InterruptLine, InterruptSource, CPU_INTERRUPT_LEVEL, USER_INTERRUPT_VECTOR,
};

/// Video standards and clock-domain conversion.
pub mod timing;
pub use timing::VideoStandard;

/// Collaborator contracts.
pub mod device;
pub use device::{BusDevice, Coprocessor, CpuRegisters, HostHooks, NullHost, PrimaryCpu, VideoChip};

/// Headless register-file devices.
pub mod peripherals;
pub use peripherals::{LatchedVideo, RegisterLatch};

/// Address-space dispatcher.
pub mod bus;
pub use bus::{InstructionVerdict, LatchedFault, SystemBus, ILLEGAL_OPCODE};

/// Time-ordered event queue.
pub mod event;
pub use event::{DueEvent, EventQueue, SchedulerEvent};

/// Half-line video timing.
pub mod video;
pub use video::{
    HalfLineOutcome, VideoTiming, HALF_LINE_MASK, INT1_REGISTER, LOWER_FIELD_FLAG, VC_REGISTER,
    VI_REGISTER,
};

/// Host-facing configuration and driver results.
pub mod api;
pub use api::{FrameReport, MachineConfig, RunState, SliceOutcome, DEFAULT_RAM_SEED};

/// Execution driver.
pub mod machine;
pub use machine::{Machine, MachineBuilder, BOOT_VECTOR_BYTES};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
