//! Intel style microcode update header
//!
//! Every update block starts with a 48 byte header. Only the first nine
//! dwords carry information, the remaining 12 bytes are reserved.

use crate::cstd::fmt;
use crate::le::read_u32;

/// Packed release date of an update.
///
/// The dword holds hex digits that read as a date, e.g. `0x01232015` is
/// 01/23/2015. The fields are never converted to decimal numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct MicrocodeDate(pub u32);

impl MicrocodeDate {
    pub const fn month(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn day(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn year(self) -> u16 {
        self.0 as u16
    }
}

impl fmt::Display for MicrocodeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}/{:02x}/{:04x}", self.month(), self.day(), self.year())
    }
}

/// Decoded microcode update header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MicrocodeHeader {
    pub header_ver: u32,
    pub update_rev: u32,
    pub date: MicrocodeDate,
    pub proc_sig: u32,
    pub checksum: u32,
    pub loader_rev: u32,
    pub proc_flags: u32,
    pub data_size: u32,
    pub total_size: u32,
}

impl MicrocodeHeader {
    /// Size of the header in bytes, reserved area included.
    pub const SIZE: usize = 48;

    /// The only header version this crate knows about.
    pub const VERSION: u32 = 1;

    /// Decodes the header fields starting at `offset`.
    ///
    /// Only the nine defined dwords have to be present. No field is checked
    /// for plausibility here.
    pub fn parse(buf: &[u8], offset: usize) -> Option<Self> {
        let field = |index: usize| read_u32(buf, offset.checked_add(index * 4)?);

        Some(MicrocodeHeader {
            header_ver: field(0)?,
            update_rev: field(1)?,
            date: MicrocodeDate(field(2)?),
            proc_sig: field(3)?,
            checksum: field(4)?,
            loader_rev: field(5)?,
            proc_flags: field(6)?,
            data_size: field(7)?,
            total_size: field(8)?,
        })
    }

    /// Encodes the nine defined dwords followed by the zeroed reserved area.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let fields = [
            self.header_ver,
            self.update_rev,
            self.date.0,
            self.proc_sig,
            self.checksum,
            self.loader_rev,
            self.proc_flags,
            self.data_size,
            self.total_size,
        ];

        let mut bytes = [0u8; Self::SIZE];
        for (chunk, value) in bytes.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }
}

/// A header that passed validation, together with its position in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MicrocodeRecord {
    pub offset: usize,
    pub header: MicrocodeHeader,
}

impl MicrocodeRecord {
    /// First byte after the update block.
    pub fn end(&self) -> usize {
        self.offset + self.header.total_size as usize
    }
}
