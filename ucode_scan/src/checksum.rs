//! Dword checksum of microcode update blocks.
//!
//! An update is intact if the sum of all its little-endian dwords, header
//! included, wraps around to zero.

use data_types::le::dwords;

/// Adds up the little-endian dwords of `block` modulo 2^32.
///
/// # Panics
///
/// If the length of `block` is not a multiple of four.
pub fn dword_checksum(block: &[u8]) -> u32 {
    assert!(
        block.len() % 4 == 0,
        "checksum block length {:#x} is not a multiple of 4",
        block.len()
    );

    dwords(block).fold(0u32, |sum, dword| sum.wrapping_add(dword))
}
