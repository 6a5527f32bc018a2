//! Access-request primitives: widths, directions, requester provenance, and
//! fetch legality.

use std::fmt;

use crate::FaultCode;

/// Mask applied to every bus address before decode; the upper byte is ignored.
pub const ADDRESS_MASK: u32 = 0x00FF_FFFF;

/// Native width of a single bus transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessWidth {
    /// 8-bit transfer.
    Byte,
    /// 16-bit transfer.
    Word,
    /// 32-bit transfer, always decomposed into two word transfers.
    Long,
}

impl AccessWidth {
    /// Number of bytes covered by this width.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Long => 4,
        }
    }

    /// Bit in a region's native-width set corresponding to this width.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Self::Byte => 1 << 0,
            Self::Word => 1 << 1,
            Self::Long => 1 << 2,
        }
    }
}

impl fmt::Display for AccessWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Byte => "byte",
            Self::Word => "word",
            Self::Long => "long",
        })
    }
}

/// Direction of a bus transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessDirection {
    /// Data flows from the target to the requester.
    Read,
    /// Data flows from the requester to the target.
    Write,
}

/// Identity of the bus master (or internal agent) issuing an access.
///
/// Provenance is informational: it never changes which region owns an
/// address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Requester {
    /// Origin not tracked.
    Unknown = 0,
    /// The console core itself (scheduler, reset logic, reports).
    Jaguar = 1,
    /// JERRY's RISC co-processor.
    Dsp = 2,
    /// TOM's RISC co-processor.
    Gpu = 3,
    /// TOM-internal agents other than the GPU.
    Tom = 4,
    /// JERRY-internal agents other than the DSP.
    Jerry = 5,
    /// The 68000 primary CPU.
    M68k = 6,
    /// The blitter.
    Blitter = 7,
    /// The object processor.
    ObjectProcessor = 8,
    /// An interactive debugger or memory viewer.
    Debugger = 9,
}

impl Requester {
    /// Number of requester identities.
    pub const COUNT: usize = 10;

    /// Ordered list of every requester identity.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Unknown,
        Self::Jaguar,
        Self::Dsp,
        Self::Gpu,
        Self::Tom,
        Self::Jerry,
        Self::M68k,
        Self::Blitter,
        Self::ObjectProcessor,
        Self::Debugger,
    ];

    /// Stable index for per-requester tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Jaguar => "Jaguar",
            Self::Dsp => "DSP",
            Self::Gpu => "GPU",
            Self::Tom => "TOM",
            Self::Jerry => "JERRY",
            Self::M68k => "M68K",
            Self::Blitter => "Blitter",
            Self::ObjectProcessor => "OP",
            Self::Debugger => "Debugger",
        }
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One fully described bus transfer, as seen by diagnostics hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessRequest {
    /// Address after masking to 24 bits.
    pub address: u32,
    /// Transfer width.
    pub width: AccessWidth,
    /// Transfer direction.
    pub direction: AccessDirection,
    /// Written value for writes; zero for reads.
    pub data: u32,
    /// Issuing bus master.
    pub requester: Requester,
}

impl AccessRequest {
    /// Builds a read request; the address is masked to 24 bits.
    #[must_use]
    pub const fn read(address: u32, width: AccessWidth, requester: Requester) -> Self {
        Self {
            address: address & ADDRESS_MASK,
            width,
            direction: AccessDirection::Read,
            data: 0,
            requester,
        }
    }

    /// Builds a write request; the address is masked to 24 bits.
    #[must_use]
    pub const fn write(address: u32, width: AccessWidth, data: u32, requester: Requester) -> Self {
        Self {
            address: address & ADDRESS_MASK,
            width,
            direction: AccessDirection::Write,
            data,
            requester,
        }
    }

    /// Returns `true` when `address` lies inside the bytes this request touches.
    #[must_use]
    pub const fn covers(&self, address: u32) -> bool {
        let address = address & ADDRESS_MASK;
        address >= self.address && address - self.address < self.width.bytes()
    }
}

impl fmt::Display for AccessRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            AccessDirection::Read => write!(
                f,
                "{} read at {:06X} by {}",
                self.width, self.address, self.requester
            ),
            AccessDirection::Write => write!(
                f,
                "{} {:X} written at {:06X} by {}",
                self.width, self.data, self.address, self.requester
            ),
        }
    }
}

/// Validates that the primary CPU fetches its next instruction from an even
/// address.
///
/// Odd data accesses are tolerated by the bus; an odd program counter is not.
///
/// # Errors
///
/// Returns [`FaultCode::OddAddressFetch`] when `pc` is odd.
pub const fn validate_fetch_alignment(pc: u32) -> Result<(), FaultCode> {
    if pc & 1 == 0 {
        Ok(())
    } else {
        Err(FaultCode::OddAddressFetch)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        validate_fetch_alignment, AccessDirection, AccessRequest, AccessWidth, Requester,
        ADDRESS_MASK,
    };
    use crate::FaultCode;

    #[test]
    fn requests_mask_the_upper_address_byte() {
        let request = AccessRequest::read(0xAB12_3456, AccessWidth::Word, Requester::M68k);
        assert_eq!(request.address, 0x12_3456);
        assert_eq!(request.direction, AccessDirection::Read);

        let request = AccessRequest::write(0xFFFF_FFFF, AccessWidth::Byte, 7, Requester::Gpu);
        assert_eq!(request.address, ADDRESS_MASK);
        assert_eq!(request.data, 7);
    }

    #[test]
    fn covers_matches_the_byte_span_of_the_width() {
        let long = AccessRequest::read(0x1000, AccessWidth::Long, Requester::M68k);
        assert!(!long.covers(0x0FFF));
        assert!(long.covers(0x1000));
        assert!(long.covers(0x1003));
        assert!(!long.covers(0x1004));

        let byte = AccessRequest::read(0x1000, AccessWidth::Byte, Requester::M68k);
        assert!(byte.covers(0x1000));
        assert!(!byte.covers(0x1001));
    }

    #[test]
    fn requester_indices_are_dense_and_ordered() {
        for (position, requester) in Requester::ALL.iter().enumerate() {
            assert_eq!(requester.index(), position);
        }
        assert_eq!(Requester::M68k.to_string(), "M68K");
    }

    #[test]
    fn odd_program_counter_is_rejected() {
        assert_eq!(validate_fetch_alignment(0x1000), Ok(()));
        assert_eq!(
            validate_fetch_alignment(0x1001),
            Err(FaultCode::OddAddressFetch)
        );
    }

    #[test]
    fn display_includes_address_and_provenance() {
        let text = AccessRequest::write(0xF2_0000, AccessWidth::Word, 0xBEEF, Requester::Dsp)
            .to_string();
        assert_eq!(text, "word BEEF written at F20000 by DSP");
    }
}
