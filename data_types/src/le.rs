//! Little-endian field access into raw image bytes.
//!
//! Every multi-byte field in the structures handled here is stored little
//! endian, independent of the host.

/// Reads a little-endian `u32` at `offset`.
///
/// Returns `None` if the four bytes do not lie completely inside `buf`.
pub fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let bytes = buf.get(offset..end)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Iterates the little-endian dwords of `buf`. Trailing bytes that do not
/// form a full dword are skipped.
pub fn dwords(buf: &[u8]) -> impl Iterator<Item = u32> + '_ {
    buf.chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
}
