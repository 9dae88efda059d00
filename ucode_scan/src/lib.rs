//! # Microcode scanner
//!
//! Finds microcode update blocks in raw BIOS images (SPI flash dumps or
//! vendor containers such as `.FL1` files) and the TCPA microcode hash table
//! that some Thinkpad firmware carries.
//!
//! Both scanners take the complete image as an immutable byte slice and
//! return a report. Neither of them fails: an image without any match simply
//! yields an empty report.
#![cfg_attr(feature = "nostd", no_std)]

extern crate alloc;

pub mod checksum;
pub mod hash_table;
pub mod microcode;
#[cfg(all(feature = "source", not(feature = "nostd")))]
pub mod source;

pub use data_types::{HashRecord, MicrocodeDate, MicrocodeHeader, MicrocodeRecord};
pub use hash_table::{scan_hash_table, HashTableReport};
pub use microcode::{scan_microcode, MicrocodeLayout, MicrocodeReport};
