//! Memory model primitives and the fixed 24-bit region map.

/// Access widths, directions, requester provenance, and fetch legality.
pub mod access;
/// Fixed memory-region map and address decoder.
pub mod map;

pub use access::{
    validate_fetch_alignment, AccessDirection, AccessRequest, AccessWidth, Requester,
    ADDRESS_MASK,
};
pub use map::{
    decode_memory_region, resolve, Backing, MemoryRegion, RegionDescriptor, ResolvedAccess,
    WritePolicy, AUDIO_END, AUDIO_START, BOOT_ROM_BYTES, BOOT_ROM_END, BOOT_ROM_START,
    CARTRIDGE_BYTES, CARTRIDGE_END, CARTRIDGE_START, CD_END, CD_START, FIXED_MEMORY_REGIONS,
    MAIN_RAM_BYTES, MAIN_RAM_END, MAIN_RAM_MIRROR_MASK, MAIN_RAM_START, RESERVED_END,
    RESERVED_ROM_END, RESERVED_ROM_START, RESERVED_START, VIDEO_END, VIDEO_START,
};

/// Byte address of the host debug-console port inside the cartridge window.
pub const DEBUG_CONSOLE_ADDRESS: u32 = 0x80_0000;

/// Allocates a zeroed main-RAM backing store.
#[must_use]
pub fn new_main_ram() -> Box<[u8]> {
    vec![0; MAIN_RAM_BYTES].into_boxed_slice()
}

/// Allocates an erased (all-ones) ROM backing store of `len` bytes.
#[must_use]
pub fn new_erased_rom(len: usize) -> Box<[u8]> {
    vec![0xFF; len].into_boxed_slice()
}

/// Reads a big-endian 16-bit value at `offset`.
///
/// Bytes beyond the end of `memory` read as `0xFF`.
#[must_use]
pub fn read_u16_be(memory: &[u8], offset: usize) -> u16 {
    let hi = memory.get(offset).copied().unwrap_or(0xFF);
    let lo = memory.get(offset + 1).copied().unwrap_or(0xFF);
    u16::from_be_bytes([hi, lo])
}

/// Writes a big-endian 32-bit value at `offset`; out-of-range bytes are dropped.
pub fn write_u32_be(memory: &mut [u8], offset: usize, value: u32) {
    for (index, byte) in value.to_be_bytes().into_iter().enumerate() {
        if let Some(slot) = memory.get_mut(offset + index) {
            *slot = byte;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{new_erased_rom, new_main_ram, read_u16_be, write_u32_be, MAIN_RAM_BYTES};

    #[test]
    fn main_ram_backing_is_two_mebibytes_of_zeroes() {
        let memory = new_main_ram();
        assert_eq!(memory.len(), MAIN_RAM_BYTES);
        assert!(memory.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn erased_rom_reads_as_all_ones() {
        let rom = new_erased_rom(16);
        assert_eq!(read_u16_be(&rom, 0), 0xFFFF);
    }

    #[test]
    fn big_endian_helpers_store_high_byte_first() {
        let mut memory = [0_u8; 8];
        write_u32_be(&mut memory, 4, 0xDEAD_BEEF);
        assert_eq!(memory, [0, 0, 0, 0, 0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(read_u16_be(&memory, 4), 0xDEAD);
    }

    #[test]
    fn helpers_tolerate_the_end_of_the_slice() {
        let mut memory = [0_u8; 3];
        write_u32_be(&mut memory, 2, 0xABCD_0000);
        assert_eq!(memory, [0, 0, 0xAB]);
        assert_eq!(read_u16_be(&memory, 2), 0xABFF);
    }
}
