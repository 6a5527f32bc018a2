//! Fixed 24-bit region map and address decoding helpers.

use crate::AccessWidth;

/// Inclusive start of the main-RAM window (2 MiB mirrored four times).
pub const MAIN_RAM_START: u32 = 0x00_0000;
/// Inclusive end of the main-RAM window.
pub const MAIN_RAM_END: u32 = 0x7F_FFFF;
/// Inclusive start of the cartridge ROM window.
pub const CARTRIDGE_START: u32 = 0x80_0000;
/// Inclusive end of the cartridge ROM window.
pub const CARTRIDGE_END: u32 = 0xDF_FEFF;
/// Inclusive start of the CD controller register block.
pub const CD_START: u32 = 0xDF_FF00;
/// Inclusive end of the CD controller register block.
pub const CD_END: u32 = 0xDF_FFFF;
/// Inclusive start of the boot ROM window.
pub const BOOT_ROM_START: u32 = 0xE0_0000;
/// Inclusive end of the boot ROM window.
pub const BOOT_ROM_END: u32 = 0xE3_FFFF;
/// Inclusive start of the undecoded tail of ROM space.
pub const RESERVED_ROM_START: u32 = 0xE4_0000;
/// Inclusive end of the undecoded tail of ROM space.
pub const RESERVED_ROM_END: u32 = 0xEF_FFFF;
/// Inclusive start of TOM's register block.
pub const VIDEO_START: u32 = 0xF0_0000;
/// Inclusive end of TOM's register block.
pub const VIDEO_END: u32 = 0xF0_FFFF;
/// Inclusive start of JERRY's register block.
pub const AUDIO_START: u32 = 0xF1_0000;
/// Inclusive end of JERRY's register block.
pub const AUDIO_END: u32 = 0xF1_FFFF;
/// Inclusive start of the undecoded top of the address space.
pub const RESERVED_START: u32 = 0xF2_0000;
/// Inclusive end of the undecoded top of the address space.
pub const RESERVED_END: u32 = 0xFF_FFFF;

/// Physical size of main RAM in bytes.
pub const MAIN_RAM_BYTES: usize = 0x20_0000;
/// Mask folding the main-RAM window onto physical storage.
#[allow(clippy::cast_possible_truncation)]
pub const MAIN_RAM_MIRROR_MASK: u32 = (MAIN_RAM_BYTES - 1) as u32;
/// Size of the cartridge ROM window in bytes.
pub const CARTRIDGE_BYTES: usize = (CARTRIDGE_END - CARTRIDGE_START + 1) as usize;
/// Size of the boot ROM window in bytes.
pub const BOOT_ROM_BYTES: usize = (BOOT_ROM_END - BOOT_ROM_START + 1) as usize;

/// Width set for regions that accept byte and word transfers natively.
const BYTE_AND_WORD: u8 = 0b011;

/// Storage or collaborator that answers for a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backing {
    /// Console main RAM.
    MainRam,
    /// Loaded cartridge image.
    Cartridge,
    /// Loaded boot ROM image.
    BootRom,
    /// Disc controller collaborator.
    CdDevice,
    /// Video chip collaborator.
    VideoDevice,
    /// Audio/interrupt chip collaborator.
    AudioDevice,
    /// Nothing drives the bus; reads float high.
    Open,
}

/// Treatment of writes landing in a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WritePolicy {
    /// Writes update backing storage.
    Store,
    /// Writes are forwarded to the owning collaborator.
    Device,
    /// Writes are silently discarded (read-only storage).
    Ignore,
    /// Writes are discarded and reported as unmapped.
    Unmapped,
}

/// Canonical fixed-region descriptor for the 24-bit address map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionDescriptor {
    /// Region classification.
    pub region: MemoryRegion,
    /// Inclusive start address.
    pub start: u32,
    /// Inclusive end address.
    pub end: u32,
    /// Bitset of [`AccessWidth::bit`] values served without decomposition.
    pub native_widths: u8,
    /// Storage or collaborator answering for the region.
    pub backing: Backing,
    /// Mask applied to the address to find the backing offset; `None` when
    /// the offset is relative to `start`.
    pub mirror_mask: Option<u32>,
    /// Treatment of writes.
    pub write_policy: WritePolicy,
}

impl RegionDescriptor {
    /// Returns `true` when `width` is served natively by this region.
    #[must_use]
    pub const fn supports(&self, width: AccessWidth) -> bool {
        self.native_widths & width.bit() != 0
    }

    /// Returns the backing offset for an in-region address.
    #[must_use]
    pub const fn offset_of(&self, addr: u32) -> u32 {
        match self.mirror_mask {
            Some(mask) => addr & mask,
            None => addr - self.start,
        }
    }
}

/// Region classification for 24-bit addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryRegion {
    /// Main RAM and its mirrors (`0x000000..=0x7FFFFF`).
    MainRam,
    /// Cartridge ROM (`0x800000..=0xDFFEFF`).
    CartridgeRom,
    /// CD controller registers (`0xDFFF00..=0xDFFFFF`).
    CdController,
    /// Boot ROM (`0xE00000..=0xE3FFFF`).
    BootRom,
    /// Undecoded ROM space (`0xE40000..=0xEFFFFF`).
    ReservedRom,
    /// TOM registers and local RAM (`0xF00000..=0xF0FFFF`).
    VideoChip,
    /// JERRY registers and local RAM (`0xF10000..=0xF1FFFF`).
    AudioChip,
    /// Undecoded top of the address space (`0xF20000..=0xFFFFFF`).
    Reserved,
}

impl MemoryRegion {
    /// Returns the inclusive bounds for this region.
    #[must_use]
    pub const fn bounds(self) -> (u32, u32) {
        match self {
            Self::MainRam => (MAIN_RAM_START, MAIN_RAM_END),
            Self::CartridgeRom => (CARTRIDGE_START, CARTRIDGE_END),
            Self::CdController => (CD_START, CD_END),
            Self::BootRom => (BOOT_ROM_START, BOOT_ROM_END),
            Self::ReservedRom => (RESERVED_ROM_START, RESERVED_ROM_END),
            Self::VideoChip => (VIDEO_START, VIDEO_END),
            Self::AudioChip => (AUDIO_START, AUDIO_END),
            Self::Reserved => (RESERVED_START, RESERVED_END),
        }
    }

    /// Returns `true` when `addr` belongs to this region.
    #[must_use]
    pub const fn contains(self, addr: u32) -> bool {
        let (start, end) = self.bounds();
        addr >= start && addr <= end
    }

    /// Returns the canonical descriptor for this region.
    #[must_use]
    pub const fn descriptor(self) -> RegionDescriptor {
        let (start, end) = self.bounds();
        let (backing, mirror_mask, write_policy) = match self {
            Self::MainRam => (
                Backing::MainRam,
                Some(MAIN_RAM_MIRROR_MASK),
                WritePolicy::Store,
            ),
            Self::CartridgeRom => (Backing::Cartridge, None, WritePolicy::Ignore),
            Self::CdController => (Backing::CdDevice, None, WritePolicy::Device),
            Self::BootRom => (Backing::BootRom, None, WritePolicy::Ignore),
            Self::ReservedRom => (Backing::Open, None, WritePolicy::Ignore),
            Self::VideoChip => (Backing::VideoDevice, None, WritePolicy::Device),
            Self::AudioChip => (Backing::AudioDevice, None, WritePolicy::Device),
            Self::Reserved => (Backing::Open, None, WritePolicy::Unmapped),
        };
        RegionDescriptor {
            region: self,
            start,
            end,
            native_widths: BYTE_AND_WORD,
            backing,
            mirror_mask,
            write_policy,
        }
    }
}

/// Canonical fixed region layout in ascending address order.
pub const FIXED_MEMORY_REGIONS: [RegionDescriptor; 8] = [
    MemoryRegion::MainRam.descriptor(),
    MemoryRegion::CartridgeRom.descriptor(),
    MemoryRegion::CdController.descriptor(),
    MemoryRegion::BootRom.descriptor(),
    MemoryRegion::ReservedRom.descriptor(),
    MemoryRegion::VideoChip.descriptor(),
    MemoryRegion::AudioChip.descriptor(),
    MemoryRegion::Reserved.descriptor(),
];

const _: () = assert_fixed_region_layout();

const fn assert_fixed_region_layout() {
    let mut index = 0;
    while index < FIXED_MEMORY_REGIONS.len() {
        let descriptor = FIXED_MEMORY_REGIONS[index];
        assert!(
            descriptor.start <= descriptor.end,
            "region start cannot be greater than end"
        );
        assert!(
            descriptor.start & 1 == 0 && descriptor.end & 1 == 1,
            "region boundaries must be word aligned"
        );

        if index > 0 {
            let previous = FIXED_MEMORY_REGIONS[index - 1];
            assert!(
                previous.end + 1 == descriptor.start,
                "fixed regions must be contiguous"
            );
        }

        index += 1;
    }

    assert!(
        FIXED_MEMORY_REGIONS[0].start == 0x00_0000
            && FIXED_MEMORY_REGIONS[FIXED_MEMORY_REGIONS.len() - 1].end == crate::ADDRESS_MASK,
        "fixed regions must cover the full 24-bit space"
    );
}

/// Decodes a 24-bit address into its fixed region.
///
/// The upper byte is ignored. The main-RAM mirror window is matched first.
#[must_use]
pub const fn decode_memory_region(addr: u32) -> MemoryRegion {
    match addr & crate::ADDRESS_MASK {
        MAIN_RAM_START..=MAIN_RAM_END => MemoryRegion::MainRam,
        CARTRIDGE_START..=CARTRIDGE_END => MemoryRegion::CartridgeRom,
        CD_START..=CD_END => MemoryRegion::CdController,
        BOOT_ROM_START..=BOOT_ROM_END => MemoryRegion::BootRom,
        RESERVED_ROM_START..=RESERVED_ROM_END => MemoryRegion::ReservedRom,
        VIDEO_START..=VIDEO_END => MemoryRegion::VideoChip,
        AUDIO_START..=AUDIO_END => MemoryRegion::AudioChip,
        _ => MemoryRegion::Reserved,
    }
}

/// Outcome of decoding one address for one native transfer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolvedAccess {
    /// Owning region descriptor.
    pub descriptor: RegionDescriptor,
    /// Masked 24-bit address.
    pub address: u32,
    /// Offset inside the region's backing.
    pub offset: u32,
}

/// Resolves `addr` for a byte or word transfer.
///
/// Returns `None` when the transfer would straddle the end of the region that
/// owns its first byte, or when `width` is not native to the region (long
/// transfers are always decomposed by the dispatcher first). Main-RAM words
/// never straddle: every byte folds through the mirror mask on its own.
#[must_use]
pub const fn resolve(addr: u32, width: AccessWidth) -> Option<ResolvedAccess> {
    let address = addr & crate::ADDRESS_MASK;
    let descriptor = decode_memory_region(address).descriptor();
    if !descriptor.supports(width) {
        return None;
    }
    if descriptor.mirror_mask.is_none() && address + (width.bytes() - 1) > descriptor.end {
        return None;
    }
    Some(ResolvedAccess {
        descriptor,
        address,
        offset: descriptor.offset_of(address),
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        decode_memory_region, resolve, Backing, MemoryRegion, WritePolicy, BOOT_ROM_BYTES,
        CARTRIDGE_BYTES, CARTRIDGE_END, CARTRIDGE_START, CD_END, CD_START, FIXED_MEMORY_REGIONS,
        MAIN_RAM_BYTES, MAIN_RAM_END, RESERVED_END, VIDEO_END,
    };
    use crate::AccessWidth;

    #[rstest]
    #[case(0x00_0000, MemoryRegion::MainRam)]
    #[case(0x1F_FFFF, MemoryRegion::MainRam)]
    #[case(0x20_0000, MemoryRegion::MainRam)]
    #[case(0x7F_FFFF, MemoryRegion::MainRam)]
    #[case(0x80_0000, MemoryRegion::CartridgeRom)]
    #[case(0xDF_FEFF, MemoryRegion::CartridgeRom)]
    #[case(0xDF_FF00, MemoryRegion::CdController)]
    #[case(0xDF_FFFF, MemoryRegion::CdController)]
    #[case(0xE0_0000, MemoryRegion::BootRom)]
    #[case(0xE3_FFFF, MemoryRegion::BootRom)]
    #[case(0xE4_0000, MemoryRegion::ReservedRom)]
    #[case(0xEF_FFFF, MemoryRegion::ReservedRom)]
    #[case(0xF0_0000, MemoryRegion::VideoChip)]
    #[case(0xF0_FFFF, MemoryRegion::VideoChip)]
    #[case(0xF1_0000, MemoryRegion::AudioChip)]
    #[case(0xF1_FFFF, MemoryRegion::AudioChip)]
    #[case(0xF2_0000, MemoryRegion::Reserved)]
    #[case(0xFF_FFFF, MemoryRegion::Reserved)]
    fn region_decode_is_correct_at_boundaries(#[case] addr: u32, #[case] region: MemoryRegion) {
        assert_eq!(decode_memory_region(addr), region);
        assert!(region.contains(addr));
    }

    #[test]
    fn decode_ignores_the_upper_address_byte() {
        assert_eq!(decode_memory_region(0xFF00_0000), MemoryRegion::MainRam);
        assert_eq!(decode_memory_region(0x12F0_0006), MemoryRegion::VideoChip);
    }

    #[test]
    fn region_sizes_match_backing_stores() {
        assert_eq!(MAIN_RAM_BYTES, 0x20_0000);
        assert_eq!(CARTRIDGE_BYTES, 0x5F_FF00);
        assert_eq!(BOOT_ROM_BYTES, 0x4_0000);
        assert_eq!(FIXED_MEMORY_REGIONS.last().map(|d| d.end), Some(RESERVED_END));
    }

    #[test]
    fn main_ram_mirrors_fold_through_the_mask() {
        for mirror in 0..4_u32 {
            let base = mirror * 0x20_0000;
            let resolved = resolve(base + 0x1234, AccessWidth::Byte).expect("ram is mapped");
            assert_eq!(resolved.offset, 0x1234);
            assert_eq!(resolved.descriptor.backing, Backing::MainRam);
        }

        let last = resolve(MAIN_RAM_END, AccessWidth::Word).expect("ram words never straddle");
        assert_eq!(last.offset, 0x1F_FFFF);
    }

    #[test]
    fn offsets_are_relative_to_region_start() {
        let cart = resolve(CARTRIDGE_START + 0x10, AccessWidth::Word).expect("cart is mapped");
        assert_eq!(cart.offset, 0x10);
        let cd = resolve(CD_START + 4, AccessWidth::Byte).expect("cd is mapped");
        assert_eq!(cd.offset, 4);
    }

    #[test]
    fn words_straddling_a_region_end_are_unmapped() {
        assert!(resolve(CARTRIDGE_END, AccessWidth::Word).is_none());
        assert!(resolve(CD_END, AccessWidth::Word).is_none());
        assert!(resolve(VIDEO_END, AccessWidth::Word).is_none());
        assert!(resolve(VIDEO_END, AccessWidth::Byte).is_some());
        assert!(resolve(CD_END - 1, AccessWidth::Word).is_some());
    }

    #[test]
    fn long_transfers_are_never_native() {
        for descriptor in FIXED_MEMORY_REGIONS {
            assert!(!descriptor.supports(AccessWidth::Long));
            assert!(resolve(descriptor.start, AccessWidth::Long).is_none());
        }
    }

    #[test]
    fn write_policies_match_the_map() {
        let policy = |region: MemoryRegion| region.descriptor().write_policy;
        assert_eq!(policy(MemoryRegion::MainRam), WritePolicy::Store);
        assert_eq!(policy(MemoryRegion::CartridgeRom), WritePolicy::Ignore);
        assert_eq!(policy(MemoryRegion::BootRom), WritePolicy::Ignore);
        assert_eq!(policy(MemoryRegion::ReservedRom), WritePolicy::Ignore);
        assert_eq!(policy(MemoryRegion::CdController), WritePolicy::Device);
        assert_eq!(policy(MemoryRegion::VideoChip), WritePolicy::Device);
        assert_eq!(policy(MemoryRegion::AudioChip), WritePolicy::Device);
        assert_eq!(policy(MemoryRegion::Reserved), WritePolicy::Unmapped);
    }

    #[test]
    fn descriptor_table_is_contiguous() {
        for pair in FIXED_MEMORY_REGIONS.windows(2) {
            assert_eq!(pair[0].end + 1, pair[1].start);
        }
    }
}
