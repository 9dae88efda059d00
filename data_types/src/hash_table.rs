//! Entries of the TCPA microcode hash table.

/// One slot of the hash table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HashRecord {
    /// Running index stored in the first byte of the slot.
    pub index: u32,
    /// Offset of the slot in the image.
    pub offset: usize,
    /// CPUID of the processor the hashed update belongs to.
    pub cpuid: u32,
}

impl HashRecord {
    /// Size of a slot in bytes.
    pub const SIZE: usize = 163;

    /// Offset of the little-endian CPUID inside a slot.
    pub const CPUID_OFFSET: usize = 0x1b;
}
