//! The shared 24-bit bus: address dispatch, unmapped handling, the debug
//! console port, the watchpoint, and the 68K interrupt line.

use tracing::{debug, trace, warn};

use crate::memory::{new_erased_rom, new_main_ram, read_u16_be};
use crate::{
    resolve, validate_fetch_alignment, AccessRequest, AccessWidth, Backing, BusDevice,
    CpuRegisters, DiagCounters, FaultCode, HostHooks, InstructionRecord, InterruptAck,
    InterruptLine, LatchedVideo, NullHost, RegisterLatch, Requester, RingBuffer, VideoChip,
    WritePolicy, BOOT_ROM_BYTES, CARTRIDGE_BYTES, DEBUG_CONSOLE_ADDRESS, MAIN_RAM_MIRROR_MASK,
};

/// Opcode of the 68K `ILLEGAL` instruction, which software may use to trap
/// on purpose.
pub const ILLEGAL_OPCODE: u16 = 0x4AFC;

/// Answer to [`SystemBus::on_instruction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionVerdict {
    /// Execute the instruction.
    Continue,
    /// A fatal fault is latched; stop the slice immediately.
    Halt,
}

/// Fault latched by the bus, waiting for the driver to collect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LatchedFault {
    /// Fault kind.
    pub fault: FaultCode,
    /// Register file at the faulting boundary.
    pub registers: CpuRegisters,
}

/// The console bus shared by every master.
///
/// Owns main RAM, the cartridge and boot ROM images, and the register-block
/// devices. Masters borrow it mutably for one slice at a time.
pub struct SystemBus {
    ram: Box<[u8]>,
    cartridge: Box<[u8]>,
    cartridge_inserted: bool,
    boot_rom: Box<[u8]>,
    video: Box<dyn VideoChip>,
    audio: Box<dyn BusDevice>,
    cd: Box<dyn BusDevice>,
    host: Box<dyn HostHooks>,
    watchpoint: Option<u32>,
    irq: InterruptLine,
    history: RingBuffer<InstructionRecord>,
    counters: DiagCounters,
    instruction_tracing: bool,
    strict_illegal_instructions: bool,
    fault: Option<LatchedFault>,
}

impl std::fmt::Debug for SystemBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemBus")
            .field("cartridge_inserted", &self.cartridge_inserted)
            .field("watchpoint", &self.watchpoint)
            .field("irq", &self.irq)
            .field("counters", &self.counters)
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::headless()
    }
}

impl SystemBus {
    /// Creates a bus around the given devices and host.
    #[must_use]
    pub fn new(
        video: Box<dyn VideoChip>,
        audio: Box<dyn BusDevice>,
        cd: Box<dyn BusDevice>,
        host: Box<dyn HostHooks>,
    ) -> Self {
        Self {
            ram: new_main_ram(),
            cartridge: new_erased_rom(CARTRIDGE_BYTES),
            cartridge_inserted: false,
            boot_rom: new_erased_rom(BOOT_ROM_BYTES),
            video,
            audio,
            cd,
            host,
            watchpoint: None,
            irq: InterruptLine::new(),
            history: RingBuffer::default(),
            counters: DiagCounters::new(),
            instruction_tracing: false,
            strict_illegal_instructions: false,
            fault: None,
        }
    }

    /// Creates a bus backed by latch devices and a silent host.
    #[must_use]
    pub fn headless() -> Self {
        Self::new(
            Box::new(LatchedVideo::new()),
            Box::new(RegisterLatch::audio_chip()),
            Box::new(RegisterLatch::cd_controller()),
            Box::new(NullHost),
        )
    }

    /// Reads one byte on behalf of `who`.
    pub fn read_byte(&mut self, address: u32, who: Requester) -> u8 {
        self.check_watchpoint(&AccessRequest::read(address, AccessWidth::Byte, who));
        self.dispatch_read8(address, who)
    }

    /// Reads one big-endian word on behalf of `who`.
    pub fn read_word(&mut self, address: u32, who: Requester) -> u16 {
        self.check_watchpoint(&AccessRequest::read(address, AccessWidth::Word, who));
        self.dispatch_read16(address, who)
    }

    /// Reads one big-endian long as two word reads (`a`, then `a + 2`).
    pub fn read_long(&mut self, address: u32, who: Requester) -> u32 {
        self.check_watchpoint(&AccessRequest::read(address, AccessWidth::Long, who));
        self.dispatch_read32(address, who)
    }

    /// Writes one byte on behalf of `who`.
    pub fn write_byte(&mut self, address: u32, value: u8, who: Requester) {
        let request = AccessRequest::write(address, AccessWidth::Byte, u32::from(value), who);
        self.check_watchpoint(&request);
        self.dispatch_write8(address, value, who);
    }

    /// Writes one big-endian word on behalf of `who`.
    pub fn write_word(&mut self, address: u32, value: u16, who: Requester) {
        let request = AccessRequest::write(address, AccessWidth::Word, u32::from(value), who);
        self.check_watchpoint(&request);
        self.dispatch_write16(address, value, who);
    }

    /// Writes one big-endian long as two word writes (high half first).
    pub fn write_long(&mut self, address: u32, value: u32, who: Requester) {
        let request = AccessRequest::write(address, AccessWidth::Long, value, who);
        self.check_watchpoint(&request);
        self.dispatch_write32(address, value, who);
    }

    /// Reads a byte without consulting the watchpoint.
    pub fn peek_byte(&mut self, address: u32, who: Requester) -> u8 {
        self.dispatch_read8(address, who)
    }

    /// Reads a word without consulting the watchpoint.
    pub fn peek_word(&mut self, address: u32, who: Requester) -> u16 {
        self.dispatch_read16(address, who)
    }

    /// Reads a long without consulting the watchpoint.
    pub fn peek_long(&mut self, address: u32, who: Requester) -> u32 {
        self.dispatch_read32(address, who)
    }

    /// Writes a word without consulting the watchpoint. Used by the
    /// scheduler's own register traffic.
    pub(crate) fn poke_word(&mut self, address: u32, value: u16, who: Requester) {
        self.dispatch_write16(address, value, who);
    }

    fn dispatch_read8(&mut self, address: u32, who: Requester) -> u8 {
        let Some(resolved) = resolve(address, AccessWidth::Byte) else {
            self.unmapped_read(address, AccessWidth::Byte, who);
            return u8::MAX;
        };
        let offset = resolved.offset as usize;
        match resolved.descriptor.backing {
            Backing::MainRam => self.ram[offset],
            Backing::Cartridge => self.cartridge.get(offset).copied().unwrap_or(0xFF),
            Backing::BootRom => self.boot_rom.get(offset).copied().unwrap_or(0xFF),
            Backing::CdDevice => self.cd.read8(resolved.address, who),
            Backing::VideoDevice => self.video.read8(resolved.address, who),
            Backing::AudioDevice => self.audio.read8(resolved.address, who),
            Backing::Open => {
                self.unmapped_read(resolved.address, AccessWidth::Byte, who);
                u8::MAX
            }
        }
    }

    fn dispatch_read16(&mut self, address: u32, who: Requester) -> u16 {
        let Some(resolved) = resolve(address, AccessWidth::Word) else {
            self.unmapped_read(address, AccessWidth::Word, who);
            return u16::MAX;
        };
        let offset = resolved.offset as usize;
        match resolved.descriptor.backing {
            Backing::MainRam => {
                let next = (resolved.address + 1) & MAIN_RAM_MIRROR_MASK;
                u16::from_be_bytes([self.ram[offset], self.ram[next as usize]])
            }
            Backing::Cartridge => read_u16_be(&self.cartridge, offset),
            Backing::BootRom => read_u16_be(&self.boot_rom, offset),
            Backing::CdDevice => self.cd.read16(resolved.address, who),
            Backing::VideoDevice => self.video.read16(resolved.address, who),
            Backing::AudioDevice => self.audio.read16(resolved.address, who),
            Backing::Open => {
                self.unmapped_read(resolved.address, AccessWidth::Word, who);
                u16::MAX
            }
        }
    }

    fn dispatch_read32(&mut self, address: u32, who: Requester) -> u32 {
        let high = self.dispatch_read16(address, who);
        let low = self.dispatch_read16(address.wrapping_add(2), who);
        (u32::from(high) << 16) | u32::from(low)
    }

    fn dispatch_write8(&mut self, address: u32, value: u8, who: Requester) {
        let address = address & crate::ADDRESS_MASK;
        if address == DEBUG_CONSOLE_ADDRESS {
            self.counters.record_console_byte();
            self.host.debug_console_byte(value);
            self.unmapped_write(address, AccessWidth::Byte, u32::from(value), who);
            return;
        }

        let Some(resolved) = resolve(address, AccessWidth::Byte) else {
            self.unmapped_write(address, AccessWidth::Byte, u32::from(value), who);
            return;
        };
        match resolved.descriptor.write_policy {
            WritePolicy::Store => self.ram[resolved.offset as usize] = value,
            WritePolicy::Device => match resolved.descriptor.backing {
                Backing::CdDevice => self.cd.write8(address, value, who),
                Backing::VideoDevice => self.video.write8(address, value, who),
                Backing::AudioDevice => self.audio.write8(address, value, who),
                Backing::MainRam | Backing::Cartridge | Backing::BootRom | Backing::Open => {
                    self.unmapped_write(address, AccessWidth::Byte, u32::from(value), who);
                }
            },
            WritePolicy::Ignore => {}
            WritePolicy::Unmapped => {
                self.unmapped_write(address, AccessWidth::Byte, u32::from(value), who);
            }
        }
    }

    fn dispatch_write16(&mut self, address: u32, value: u16, who: Requester) {
        let address = address & crate::ADDRESS_MASK;
        let Some(resolved) = resolve(address, AccessWidth::Word) else {
            self.unmapped_write(address, AccessWidth::Word, u32::from(value), who);
            return;
        };
        match resolved.descriptor.write_policy {
            WritePolicy::Store => {
                let [hi, lo] = value.to_be_bytes();
                self.ram[resolved.offset as usize] = hi;
                self.ram[((address + 1) & MAIN_RAM_MIRROR_MASK) as usize] = lo;
            }
            WritePolicy::Device => match resolved.descriptor.backing {
                Backing::CdDevice => self.cd.write16(address, value, who),
                Backing::VideoDevice => self.video.write16(address, value, who),
                Backing::AudioDevice => self.audio.write16(address, value, who),
                Backing::MainRam | Backing::Cartridge | Backing::BootRom | Backing::Open => {
                    self.unmapped_write(address, AccessWidth::Word, u32::from(value), who);
                }
            },
            WritePolicy::Ignore => {}
            WritePolicy::Unmapped => {
                self.unmapped_write(address, AccessWidth::Word, u32::from(value), who);
            }
        }
    }

    fn dispatch_write32(&mut self, address: u32, value: u32, who: Requester) {
        #[allow(clippy::cast_possible_truncation)]
        let (high, low) = ((value >> 16) as u16, value as u16);
        self.dispatch_write16(address, high, who);
        self.dispatch_write16(address.wrapping_add(2), low, who);
    }

    fn unmapped_read(&mut self, address: u32, width: AccessWidth, who: Requester) {
        let request = AccessRequest::read(address, width, who);
        self.report_unmapped(&request);
    }

    fn unmapped_write(&mut self, address: u32, width: AccessWidth, value: u32, who: Requester) {
        let request = AccessRequest::write(address, width, value, who);
        self.report_unmapped(&request);
    }

    fn report_unmapped(&mut self, request: &AccessRequest) {
        trace!(target: "jaguar::bus", %request, "unmapped access");
        self.counters.record_unmapped(request);
        self.host.unmapped_access(request);
    }

    fn check_watchpoint(&mut self, request: &AccessRequest) {
        if self.watchpoint.is_some_and(|address| request.covers(address)) {
            debug!(target: "jaguar::bus", %request, "watchpoint hit");
            self.counters.record_watchpoint_hit();
            self.host.watchpoint_hit(request);
        }
    }

    /// Asserts `level` on the 68K interrupt input.
    pub fn assert_interrupt(&mut self, level: u8) {
        self.irq.assert_level(level);
    }

    /// Level currently asserted toward the 68K (0 when clear).
    #[must_use]
    pub const fn interrupt_level(&self) -> u8 {
        self.irq.level()
    }

    /// Interrupt-acknowledge handshake; see [`InterruptLine::acknowledge`].
    pub fn acknowledge_interrupt(&mut self, level: u8) -> InterruptAck {
        let ack = self.irq.acknowledge(level);
        trace!(target: "jaguar::irq", level, %ack, "interrupt acknowledged");
        ack
    }

    /// Called by the 68K before every instruction.
    ///
    /// Records the boundary in the history ring and checks fetch legality.
    /// An odd PC, or an illegal opcode other than [`ILLEGAL_OPCODE`] while
    /// strict mode is on, latches a fault and returns
    /// [`InstructionVerdict::Halt`].
    pub fn on_instruction(
        &mut self,
        registers: &CpuRegisters,
        opcode: u16,
        legal: bool,
    ) -> InstructionVerdict {
        if self.fault.is_some() {
            return InstructionVerdict::Halt;
        }

        self.history.push(InstructionRecord {
            registers: *registers,
            opcode,
        });
        self.counters.increment_instruction_count();
        if self.instruction_tracing {
            trace!(target: "jaguar::cpu", "{:06X}: {opcode:04X}", registers.pc);
        }

        let fault = match validate_fetch_alignment(registers.pc) {
            Err(fault) => Some(fault),
            Ok(()) if self.strict_illegal_instructions && !legal && opcode != ILLEGAL_OPCODE => {
                Some(FaultCode::IllegalInstruction)
            }
            Ok(()) => None,
        };

        match fault {
            Some(fault) => {
                self.counters.record_fault(fault);
                warn!(target: "jaguar::cpu", pc = registers.pc, %fault, "fault latched");
                self.fault = Some(LatchedFault {
                    fault,
                    registers: *registers,
                });
                InstructionVerdict::Halt
            }
            None => InstructionVerdict::Continue,
        }
    }

    /// Takes the latched fault, if any.
    #[allow(clippy::missing_const_for_fn)]
    pub fn take_fault(&mut self) -> Option<LatchedFault> {
        self.fault.take()
    }

    /// Returns `true` while a fault is latched.
    #[must_use]
    pub const fn fault_latched(&self) -> bool {
        self.fault.is_some()
    }

    /// Recorded instruction boundaries, oldest first.
    #[must_use]
    pub fn instruction_history(&self) -> Vec<InstructionRecord> {
        self.history.to_vec()
    }

    /// Forgets the instruction history.
    pub fn clear_instruction_history(&mut self) {
        self.history.clear();
    }

    /// Copies `image` into the cartridge window and marks a cartridge inserted.
    ///
    /// Bytes past the image read as `0xFF`; images larger than the window are
    /// truncated. Returns the number of bytes loaded.
    pub fn load_cartridge(&mut self, image: &[u8]) -> usize {
        let loaded = load_image(&mut self.cartridge, image, "cartridge");
        self.cartridge_inserted = true;
        debug!(target: "jaguar::bus", bytes = loaded, "cartridge loaded");
        loaded
    }

    /// Removes the cartridge image.
    pub fn eject_cartridge(&mut self) {
        self.cartridge.fill(0xFF);
        self.cartridge_inserted = false;
    }

    /// Returns `true` once a cartridge image has been loaded.
    #[must_use]
    pub const fn cartridge_inserted(&self) -> bool {
        self.cartridge_inserted
    }

    /// Copies `image` into the boot ROM window. Returns the bytes loaded.
    pub fn load_boot_rom(&mut self, image: &[u8]) -> usize {
        let loaded = load_image(&mut self.boot_rom, image, "boot ROM");
        debug!(target: "jaguar::bus", bytes = loaded, "boot ROM loaded");
        loaded
    }

    /// Boot ROM contents.
    #[must_use]
    pub fn boot_rom(&self) -> &[u8] {
        &self.boot_rom
    }

    /// Physical main RAM.
    #[must_use]
    pub fn main_ram(&self) -> &[u8] {
        &self.ram
    }

    /// Physical main RAM, writable.
    #[must_use]
    pub fn main_ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }

    /// Resets the register-block devices.
    pub fn reset_devices(&mut self) {
        self.video.reset();
        self.audio.reset();
        self.cd.reset();
    }

    /// The video chip.
    #[must_use]
    pub fn video(&self) -> &dyn VideoChip {
        self.video.as_ref()
    }

    /// The video chip, mutably.
    pub fn video_mut(&mut self) -> &mut dyn VideoChip {
        self.video.as_mut()
    }

    /// The embedding host.
    pub fn host_mut(&mut self) -> &mut dyn HostHooks {
        self.host.as_mut()
    }

    /// Arms (or with `None`, disarms) the watchpoint.
    pub fn set_watchpoint(&mut self, address: Option<u32>) {
        self.watchpoint = address.map(|address| address & crate::ADDRESS_MASK);
    }

    /// Armed watchpoint address.
    #[must_use]
    pub const fn watchpoint(&self) -> Option<u32> {
        self.watchpoint
    }

    /// Enables per-instruction `trace` logging.
    #[allow(clippy::missing_const_for_fn)]
    pub fn set_instruction_tracing(&mut self, enabled: bool) {
        self.instruction_tracing = enabled;
    }

    /// Returns `true` while per-instruction logging is on.
    #[must_use]
    pub const fn instruction_tracing(&self) -> bool {
        self.instruction_tracing
    }

    /// Enables the strict illegal-instruction policy.
    #[allow(clippy::missing_const_for_fn)]
    pub fn set_strict_illegal_instructions(&mut self, enabled: bool) {
        self.strict_illegal_instructions = enabled;
    }

    /// Returns `true` while illegal opcodes are fatal.
    #[must_use]
    pub const fn strict_illegal_instructions(&self) -> bool {
        self.strict_illegal_instructions
    }

    /// Diagnostics counters.
    #[must_use]
    pub const fn counters(&self) -> &DiagCounters {
        &self.counters
    }

    /// Clears the diagnostics counters.
    pub fn reset_counters(&mut self) {
        self.counters.reset();
    }

    pub(crate) fn clear_run_state(&mut self) {
        self.irq.clear();
        self.fault = None;
    }
}

fn load_image(target: &mut [u8], image: &[u8], what: &str) -> usize {
    let loaded = image.len().min(target.len());
    if loaded < image.len() {
        warn!(
            target: "jaguar::bus",
            image = image.len(),
            window = target.len(),
            "{what} image truncated to fit its window"
        );
    }
    target[..loaded].copy_from_slice(&image[..loaded]);
    target[loaded..].fill(0xFF);
    loaded
}
