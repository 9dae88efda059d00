//! Heuristic search for microcode updates
//!
//! BIOS images do not carry a directory of the updates they contain (on the
//! Thinkpad T420 and Edge S430 they sit near the end of the image). Instead
//! of parsing the firmware layout, every byte offset is tried as the start of
//! an update header:
//!
//! - the first dword must be the header version 1
//! - `total_size` must be dword aligned and the block must fit into the image
//! - the dwords of the whole block must sum to zero
//! - `data_size` must be smaller than `total_size`
//!
//! The cursor always advances by a single byte, also after an accepted
//! update, so a valid block nested in the payload of another one is
//! reported as well.

use crate::checksum::dword_checksum;
use alloc::vec::Vec;
use core::fmt;
use data_types::le::read_u32;
use data_types::{MicrocodeHeader, MicrocodeRecord};
use log::{debug, trace};

/// Reason a candidate offset was not accepted as an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The first dword is not the header version.
    NotAHeader,
    /// Less than a full header is left in the image.
    Truncated,
    Misaligned { total_size: u32 },
    OutOfBounds { end: u64 },
    ChecksumMismatch { sum: u32 },
    DataSizeTooLarge { data_size: u32, total_size: u32 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotAHeader => write!(f, "no header version signature"),
            Rejection::Truncated => write!(f, "header truncated by end of image"),
            Rejection::Misaligned { total_size } => {
                write!(f, "total size {:#x} is not dword aligned", total_size)
            }
            Rejection::OutOfBounds { end } => {
                write!(f, "block would end at {:#x}, past the end of the image", end)
            }
            Rejection::ChecksumMismatch { sum } => write!(f, "checksum {:#010x} is not zero", sum),
            Rejection::DataSizeTooLarge {
                data_size,
                total_size,
            } => write!(
                f,
                "data size {:#x} not below total size {:#x}",
                data_size, total_size
            ),
        }
    }
}

/// Validates a single candidate update at `offset`.
///
/// The checks run in a fixed order and the first failing one is returned.
pub fn validate_candidate(image: &[u8], offset: usize) -> Result<MicrocodeHeader, Rejection> {
    match read_u32(image, offset) {
        Some(MicrocodeHeader::VERSION) => {}
        Some(_) => return Err(Rejection::NotAHeader),
        None => return Err(Rejection::Truncated),
    }

    if image.len().saturating_sub(offset) < MicrocodeHeader::SIZE {
        return Err(Rejection::Truncated);
    }
    let header = MicrocodeHeader::parse(image, offset).ok_or(Rejection::Truncated)?;

    if header.total_size % 4 != 0 {
        return Err(Rejection::Misaligned {
            total_size: header.total_size,
        });
    }

    let end = offset as u64 + header.total_size as u64;
    if end > image.len() as u64 {
        return Err(Rejection::OutOfBounds { end });
    }

    let sum = dword_checksum(&image[offset..end as usize]);
    if sum != 0 {
        return Err(Rejection::ChecksumMismatch { sum });
    }

    if header.data_size >= header.total_size {
        return Err(Rejection::DataSizeTooLarge {
            data_size: header.data_size,
            total_size: header.total_size,
        });
    }

    Ok(header)
}

/// How the accepted updates are laid out in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicrocodeLayout {
    NotFound,
    /// All updates form one gap-free region.
    Contiguous { offset: usize, length: u64 },
    /// The updates are spread over several locations.
    Scattered,
}

/// Updates found by [`scan_microcode`], in ascending offset order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MicrocodeReport {
    records: Vec<MicrocodeRecord>,
    size_sum: u64,
}

impl MicrocodeReport {
    fn push(&mut self, record: MicrocodeRecord) {
        self.size_sum += record.header.total_size as u64;
        self.records.push(record);
    }

    pub fn records(&self) -> &[MicrocodeRecord] {
        &self.records
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_offset(&self) -> Option<usize> {
        self.records.first().map(|r| r.offset)
    }

    /// End of the last accepted update, not the highest end of all updates.
    pub fn last_end(&self) -> Option<usize> {
        self.records.last().map(MicrocodeRecord::end)
    }

    /// Sum of the total sizes of all accepted updates.
    pub fn size_sum(&self) -> u64 {
        self.size_sum
    }

    pub fn layout(&self) -> MicrocodeLayout {
        match (self.first_offset(), self.last_end()) {
            (Some(first), Some(end)) if (end - first) as u64 == self.size_sum => {
                MicrocodeLayout::Contiguous {
                    offset: first,
                    length: self.size_sum,
                }
            }
            (Some(_), Some(_)) => MicrocodeLayout::Scattered,
            _ => MicrocodeLayout::NotFound,
        }
    }
}

/// Tries every offset of `image` as the start of a microcode update.
pub fn scan_microcode(image: &[u8]) -> MicrocodeReport {
    let mut report = MicrocodeReport::default();

    let Some(last) = image.len().checked_sub(MicrocodeHeader::SIZE) else {
        return report;
    };

    for offset in 0..=last {
        if read_u32(image, offset) != Some(MicrocodeHeader::VERSION) {
            continue;
        }

        match validate_candidate(image, offset) {
            Ok(header) => {
                debug!(
                    "microcode at {:#010x}: signature {:#x}, revision {:#x}, {:#x} bytes",
                    offset, header.proc_sig, header.update_rev, header.total_size
                );
                report.push(MicrocodeRecord { offset, header });
            }
            Err(rejection) => trace!("candidate at {:#010x} rejected: {}", offset, rejection),
        }
    }

    report
}
