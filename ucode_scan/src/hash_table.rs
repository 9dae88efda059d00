//! TCPA microcode hash table
//!
//! Thinkpad BIOS images (at least T420 and T430) keep a table of hashes of
//! the microcode updates they accept. The table follows directly after the
//! marker
//!
//! ```text
//! "TCPACPUH" <13 arbitrary bytes> "IBMSECUR"
//! ```
//!
//! and consists of 163 byte slots. The first byte of a slot is a running
//! index starting at zero, the CPUID of the hashed update is stored little
//! endian at offset 0x1b. The first slot whose index byte does not continue
//! the sequence ends the table.

use alloc::vec::Vec;
use data_types::le::read_u32;
use data_types::HashRecord;
use log::{debug, trace};

pub const ANCHOR_PREFIX: &[u8; 8] = b"TCPACPUH";
pub const ANCHOR_FILLER_LEN: usize = 13;
pub const ANCHOR_SUFFIX: &[u8; 8] = b"IBMSECUR";

/// Length of the complete marker, filler included.
pub const ANCHOR_LEN: usize = ANCHOR_PREFIX.len() + ANCHOR_FILLER_LEN + ANCHOR_SUFFIX.len();

/// Outcome of [`scan_hash_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashTableReport {
    /// The marker does not occur in the image.
    AnchorNotFound,
    /// The marker was found. `records` may still be empty.
    Table {
        /// First byte after the marker, where the table starts.
        anchor: usize,
        records: Vec<HashRecord>,
    },
}

impl HashTableReport {
    pub fn anchor(&self) -> Option<usize> {
        match self {
            HashTableReport::AnchorNotFound => None,
            HashTableReport::Table { anchor, .. } => Some(*anchor),
        }
    }

    pub fn records(&self) -> &[HashRecord] {
        match self {
            HashTableReport::AnchorNotFound => &[],
            HashTableReport::Table { records, .. } => records,
        }
    }

    /// Number of bytes covered by the slots of the table.
    pub fn scanned_len(&self) -> usize {
        self.records().len() * HashRecord::SIZE
    }
}

/// Returns the offset right after the first complete marker in `image`.
pub fn find_anchor(image: &[u8]) -> Option<usize> {
    let suffix_at = ANCHOR_PREFIX.len() + ANCHOR_FILLER_LEN;

    (0..image.len().saturating_sub(ANCHOR_LEN))
        .find(|&p| {
            image[p..].starts_with(ANCHOR_PREFIX) && image[p + suffix_at..].starts_with(ANCHOR_SUFFIX)
        })
        .map(|p| p + ANCHOR_LEN)
}

/// Walks the slots starting at `start` while their index bytes count up
/// from zero.
///
/// A slot that does not fit completely into the image ends the walk as
/// well. The index is compared against the full counter, so a table never
/// holds more than 256 entries.
pub fn walk_records(image: &[u8], start: usize) -> Vec<HashRecord> {
    let mut records = Vec::new();
    let mut offset = start;
    let mut index = 0u32;

    while let Some(&lead) = image.get(offset) {
        if lead as u32 != index {
            trace!(
                "hash table ends at {:#010x}: index byte {:#04x}, expected {:#x}",
                offset,
                lead,
                index
            );
            break;
        }
        if image.len() - offset < HashRecord::SIZE {
            trace!("hash slot {} at {:#010x} truncated by end of image", index, offset);
            break;
        }
        let Some(cpuid) = read_u32(image, offset + HashRecord::CPUID_OFFSET) else {
            break;
        };

        records.push(HashRecord {
            index,
            offset,
            cpuid,
        });
        offset += HashRecord::SIZE;
        index += 1;
    }

    records
}

/// Locates the marker and reads the hash table behind it.
pub fn scan_hash_table(image: &[u8]) -> HashTableReport {
    let Some(anchor) = find_anchor(image) else {
        debug!("no hash table marker in {:#x} bytes", image.len());
        return HashTableReport::AnchorNotFound;
    };
    debug!("hash table marker ends at {:#010x}", anchor);

    let records = walk_records(image, anchor);
    HashTableReport::Table { anchor, records }
}
