//! The execution driver: owns every collaborator and interleaves CPU,
//! co-processor, and event execution one slice at a time.

use std::fmt;

use tracing::{error, info};

use crate::diag::{
    is_valid_handler, DisassemblyLine, StackRow, VideoInterruptStatus, DISASSEMBLY_LEAD_BYTES,
    DISASSEMBLY_TRAIL_BYTES, STACK_DUMP_COLUMNS, STACK_DUMP_LEAD_BYTES,
    STACK_DUMP_ROWS,
};
use crate::memory::write_u32_be;
use crate::{
    BusDevice, Coprocessor, CpuRegisters, CrashReport, DiagCounters, EventQueue, FrameReport,
    HostHooks, InterruptSource, LatchedFault, LatchedVideo, MachineConfig, MachineError, NullHost,
    PrimaryCpu, RegisterLatch, Requester, RunState, SchedulerEvent, ShutdownReport, SliceOutcome,
    SystemBus, VideoChip, VideoTiming, INT1_REGISTER, USER_INTERRUPT_VECTOR, VI_REGISTER,
};

/// Size of the boot vector block (initial SSP and PC).
pub const BOOT_VECTOR_BYTES: usize = 8;

/// First RAM byte forced to `0xFF` at power-on.
const POWER_ON_PATCH_START: usize = 0x804;
/// One past the last RAM byte forced to `0xFF` at power-on.
const POWER_ON_PATCH_END: usize = 0x808;

/// Assembles a [`Machine`] from its collaborators.
///
/// Only the 68K is mandatory; the register-block devices default to the
/// headless latches and the host defaults to [`NullHost`].
pub struct MachineBuilder {
    cpu: Box<dyn PrimaryCpu>,
    gpu: Option<Box<dyn Coprocessor>>,
    dsp: Option<Box<dyn Coprocessor>>,
    video: Option<Box<dyn VideoChip>>,
    audio: Option<Box<dyn BusDevice>>,
    cd: Option<Box<dyn BusDevice>>,
    host: Option<Box<dyn HostHooks>>,
}

impl MachineBuilder {
    /// Starts a machine around `cpu`.
    #[must_use]
    pub fn new(cpu: impl PrimaryCpu + 'static) -> Self {
        Self {
            cpu: Box::new(cpu),
            gpu: None,
            dsp: None,
            video: None,
            audio: None,
            cd: None,
            host: None,
        }
    }

    /// Installs the GPU engine.
    #[must_use]
    pub fn gpu(mut self, gpu: impl Coprocessor + 'static) -> Self {
        self.gpu = Some(Box::new(gpu));
        self
    }

    /// Installs the DSP engine.
    #[must_use]
    pub fn dsp(mut self, dsp: impl Coprocessor + 'static) -> Self {
        self.dsp = Some(Box::new(dsp));
        self
    }

    /// Replaces the video chip.
    #[must_use]
    pub fn video(mut self, video: impl VideoChip + 'static) -> Self {
        self.video = Some(Box::new(video));
        self
    }

    /// Replaces the audio chip.
    #[must_use]
    pub fn audio(mut self, audio: impl BusDevice + 'static) -> Self {
        self.audio = Some(Box::new(audio));
        self
    }

    /// Replaces the disc controller.
    #[must_use]
    pub fn cd(mut self, cd: impl BusDevice + 'static) -> Self {
        self.cd = Some(Box::new(cd));
        self
    }

    /// Installs the host callbacks.
    #[must_use]
    pub fn host(mut self, host: impl HostHooks + 'static) -> Self {
        self.host = Some(Box::new(host));
        self
    }

    /// Builds and powers on the machine (see [`Machine::init`]).
    ///
    /// Load images and call [`Machine::reset`] before running.
    #[must_use]
    pub fn build(self, config: MachineConfig) -> Machine {
        let mut bus = SystemBus::new(
            self.video
                .unwrap_or_else(|| Box::new(LatchedVideo::new())),
            self.audio
                .unwrap_or_else(|| Box::new(RegisterLatch::audio_chip())),
            self.cd
                .unwrap_or_else(|| Box::new(RegisterLatch::cd_controller())),
            self.host.unwrap_or_else(|| Box::new(NullHost)),
        );
        bus.set_watchpoint(config.watchpoint_address);
        bus.set_instruction_tracing(config.instruction_tracing);
        bus.set_strict_illegal_instructions(config.strict_illegal_instructions);

        let mut machine = Machine {
            timing: VideoTiming::new(config.video_standard),
            ram_rng: config.ram_seed,
            config,
            cpu: self.cpu,
            gpu: self.gpu,
            dsp: self.dsp,
            bus,
            events: EventQueue::new(),
            run_state: RunState::Running,
            run_address: 0,
        };
        machine.init();
        machine
    }
}

impl fmt::Debug for MachineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineBuilder")
            .field("gpu", &self.gpu.is_some())
            .field("dsp", &self.dsp.is_some())
            .finish_non_exhaustive()
    }
}

/// The whole console: bus, collaborators, event queue, and video timing.
pub struct Machine {
    config: MachineConfig,
    cpu: Box<dyn PrimaryCpu>,
    gpu: Option<Box<dyn Coprocessor>>,
    dsp: Option<Box<dyn Coprocessor>>,
    bus: SystemBus,
    events: EventQueue<SchedulerEvent>,
    timing: VideoTiming,
    run_state: RunState,
    run_address: u32,
    ram_rng: u64,
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("config", &self.config)
            .field("bus", &self.bus)
            .field("timing", &self.timing)
            .field("run_state", &self.run_state)
            .field("run_address", &self.run_address)
            .finish_non_exhaustive()
    }
}

impl Machine {
    /// Power-on: randomizes main RAM, applies the power-on RAM pattern,
    /// resets every device, and pulses the 68K reset line.
    pub fn init(&mut self) {
        self.randomize_ram(0);
        self.bus.main_ram_mut()[POWER_ON_PATCH_START..POWER_ON_PATCH_END].fill(0xFF);
        self.timing.reset();
        self.reset_collaborators();
        self.cpu.pulse_reset(&mut self.bus);
    }

    /// Console reset.
    ///
    /// Re-randomizes RAM above the boot vector block, rebuilds the event
    /// queue, installs the boot vectors (from the BIOS when configured and a
    /// cartridge is present, otherwise the cartridge run address at offset
    /// 4), resets every device, pulses the 68K reset, and arms the first
    /// half-line.
    pub fn reset(&mut self) {
        self.randomize_ram(BOOT_VECTOR_BYTES);
        self.events.reset();

        if self.config.boots_through_bios(self.bus.cartridge_inserted()) {
            let mut vectors = [0_u8; BOOT_VECTOR_BYTES];
            vectors.copy_from_slice(&self.bus.boot_rom()[..BOOT_VECTOR_BYTES]);
            self.bus.main_ram_mut()[..BOOT_VECTOR_BYTES].copy_from_slice(&vectors);
        } else {
            write_u32_be(self.bus.main_ram_mut(), 4, self.run_address);
        }

        self.reset_collaborators();
        self.cpu.pulse_reset(&mut self.bus);
        let registers = self.cpu.registers();
        info!(
            target: "jaguar::machine",
            "reset: PC={:06X} SP={:08X} standard={}",
            registers.pc,
            registers.sp(),
            self.timing.standard()
        );

        self.timing.reset();
        self.events
            .schedule_in(SchedulerEvent::HalfLine, self.timing.period_usec());
    }

    /// Copies a cartridge image into the cartridge window and records the
    /// address the CPU starts at when booting without the BIOS.
    pub fn load_cartridge(&mut self, image: &[u8], run_address: u32) -> usize {
        self.run_address = run_address;
        self.bus.load_cartridge(image)
    }

    /// Copies a boot ROM image into the boot ROM window.
    pub fn load_boot_rom(&mut self, image: &[u8]) -> usize {
        self.bus.load_boot_rom(image)
    }

    /// Runs one slice: the 68K, then the enabled co-processors, for the time
    /// until the next event, then dispatches every due event.
    ///
    /// # Errors
    ///
    /// - [`MachineError::Fatal`] when the CPU hits a fatal fault;
    /// - [`MachineError::Halted`] while an earlier fatal fault is latched;
    /// - [`MachineError::SchedulerStalled`] when no event is armed.
    pub fn step_slice(&mut self) -> Result<SliceOutcome, MachineError> {
        if self.run_state == RunState::FaultLatched {
            return Err(MachineError::Halted);
        }
        let Some(delta) = self.events.time_to_next_event() else {
            return Err(MachineError::SchedulerStalled);
        };

        let standard = self.timing.standard();
        let m68k_cycles = standard.usec_to_m68k_cycles(delta);
        self.cpu.execute(m68k_cycles, &mut self.bus);
        if let Some(latched) = self.bus.take_fault() {
            return Err(self.crash(latched));
        }

        let mut risc_cycles = 0;
        for (enabled, engine) in [
            (self.config.gpu_enabled, self.gpu.as_mut()),
            (self.config.dsp_enabled, self.dsp.as_mut()),
        ] {
            if let (true, Some(engine)) = (enabled, engine) {
                risc_cycles = standard.usec_to_risc_cycles(delta);
                engine.execute(risc_cycles, &mut self.bus);
            }
        }

        self.events.advance(delta);
        let mut outcome = SliceOutcome {
            elapsed_usec: delta,
            m68k_cycles,
            risc_cycles,
            ..SliceOutcome::default()
        };
        while let Some(due) = self.events.pop_due() {
            outcome.events_fired = outcome.events_fired.saturating_add(1);
            match due.event {
                SchedulerEvent::HalfLine => {
                    let half_line = self.timing.on_half_line(&mut self.bus);
                    outcome.interrupt_raised |= half_line.interrupt_raised;
                    outcome.frame_done |= half_line.frame_done;
                    self.events.schedule_at(
                        SchedulerEvent::HalfLine,
                        due.time + self.timing.period_usec(),
                    );
                }
            }
        }
        Ok(outcome)
    }

    /// Runs slices until a field completes.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`Self::step_slice`].
    pub fn execute_frame(&mut self) -> Result<FrameReport, MachineError> {
        let mut report = FrameReport::default();
        loop {
            let slice = self.step_slice()?;
            report.absorb(&slice);
            if slice.frame_done {
                return Ok(report);
            }
        }
    }

    /// Captures and logs the end-of-session diagnostics.
    pub fn shutdown_report(&mut self) -> ShutdownReport {
        let registers = self.cpu.registers();
        let report = ShutdownReport {
            registers,
            stack: self.stack_dump(registers.sp()),
            interrupt_enable: self.bus.peek_byte(INT1_REGISTER + 1, Requester::Jaguar) & 0x1F,
            video_interrupt: self.video_interrupt_status(),
            counters: *self.bus.counters(),
        };
        info!(target: "jaguar::machine", "shutdown\n{report}");
        report
    }

    /// Exception handler address installed for vector `vector`.
    pub fn interrupt_handler(&mut self, vector: u8) -> u32 {
        self.bus
            .peek_long(u32::from(vector) * 4, Requester::Jaguar)
    }

    /// Returns `true` when vector `vector` holds a plausible handler
    /// (neither null nor erased).
    pub fn interrupt_handler_is_valid(&mut self, vector: u8) -> bool {
        is_valid_handler(self.interrupt_handler(vector))
    }

    /// Arms (or with `None`, disarms) the watchpoint.
    pub fn set_watchpoint(&mut self, address: Option<u32>) {
        self.bus.set_watchpoint(address);
    }

    /// Physical main RAM, for memory dumps.
    #[must_use]
    pub fn main_ram(&self) -> &[u8] {
        self.bus.main_ram()
    }

    /// The shared bus.
    #[must_use]
    pub const fn bus(&self) -> &SystemBus {
        &self.bus
    }

    /// The shared bus, mutably.
    #[allow(clippy::missing_const_for_fn)]
    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    /// The 68K register file.
    #[must_use]
    pub fn cpu_registers(&self) -> CpuRegisters {
        self.cpu.registers()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Current run state.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Video timing state.
    #[must_use]
    pub const fn timing(&self) -> &VideoTiming {
        &self.timing
    }

    /// Emulated time since the last reset, in microseconds.
    #[must_use]
    pub const fn now_usec(&self) -> f64 {
        self.events.now()
    }

    /// Diagnostics counters.
    #[must_use]
    pub const fn counters(&self) -> &DiagCounters {
        self.bus.counters()
    }

    fn reset_collaborators(&mut self) {
        self.bus.reset_devices();
        self.bus.clear_run_state();
        self.bus.clear_instruction_history();
        for engine in [self.gpu.as_mut(), self.dsp.as_mut()].into_iter().flatten() {
            engine.reset();
        }
        self.run_state = RunState::Running;
    }

    #[allow(clippy::cast_possible_truncation)]
    fn randomize_ram(&mut self, from: usize) {
        let mut state = self.ram_rng;
        for byte in self.bus.main_ram_mut().iter_mut().skip(from) {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1);
            *byte = (state >> 56) as u8;
        }
        self.ram_rng = state;
    }

    fn crash(&mut self, latched: LatchedFault) -> MachineError {
        let registers = latched.registers;
        let vectors = (0..=u8::MAX)
            .map(|vector| self.interrupt_handler(vector))
            .collect();
        let report = CrashReport {
            fault: latched.fault,
            address: registers.pc,
            registers,
            history: self.bus.instruction_history(),
            disassembly: self.disassembly_window(registers.pc),
            stack: self.stack_dump(registers.sp()),
            video_interrupt: self.video_interrupt_status(),
            vectors,
        };
        error!(target: "jaguar::machine", "{report}");
        self.run_state = RunState::FaultLatched;
        MachineError::Fatal(Box::new(report))
    }

    fn disassembly_window(&mut self, pc: u32) -> Vec<DisassemblyLine> {
        let end = pc.wrapping_add(DISASSEMBLY_TRAIL_BYTES);
        let mut address = pc.saturating_sub(DISASSEMBLY_LEAD_BYTES);
        let mut lines = Vec::new();
        while address < end {
            let (text, length) = self
                .cpu
                .disassemble(&mut self.bus, address)
                .unwrap_or_else(|| {
                    let word = self.bus.peek_word(address, Requester::Debugger);
                    (format!("dc.w ${word:04X}"), 2)
                });
            lines.push(DisassemblyLine { address, text });
            address = address.wrapping_add(length.max(2));
        }
        lines
    }

    fn stack_dump(&mut self, sp: u32) -> Vec<StackRow> {
        let mut address = sp.wrapping_sub(STACK_DUMP_LEAD_BYTES);
        (0..STACK_DUMP_ROWS)
            .map(|_| {
                let start = address;
                let mut longs = [0_u32; STACK_DUMP_COLUMNS];
                for long in &mut longs {
                    *long = self.bus.peek_long(address, Requester::Jaguar);
                    address = address.wrapping_add(4);
                }
                StackRow {
                    address: start & crate::ADDRESS_MASK,
                    longs,
                }
            })
            .collect()
    }

    fn video_interrupt_status(&mut self) -> VideoInterruptStatus {
        let enabled = self.bus.video().interrupt_enabled(InterruptSource::Video)
            && self.interrupt_handler_is_valid(USER_INTERRUPT_VECTOR);
        VideoInterruptStatus {
            enabled,
            line: self.bus.peek_word(VI_REGISTER, Requester::Jaguar),
        }
    }
}
