//! Re-exports for no_std compatibility
//!
//! Stands in for `std` when the `nostd` feature is enabled, so the record
//! types can be formatted without pulling in the standard library.

pub use core::fmt;
