//! # Data types
//!
//! Plain records decoded from firmware images: Intel style microcode update
//! headers and the entries of the TCPA microcode hash table found in some
//! Thinkpad BIOS images.
#![cfg_attr(feature = "nostd", no_std)]

extern crate alloc;
#[cfg(feature = "nostd")]
extern crate core;

#[cfg(feature = "nostd")]
mod nostd;
#[cfg(feature = "nostd")]
use nostd as cstd;
#[cfg(not(feature = "nostd"))]
use std as cstd;

pub mod hash_table;
pub mod le;
pub mod microcode;

pub use hash_table::HashRecord;
pub use microcode::{MicrocodeDate, MicrocodeHeader, MicrocodeRecord};
