//! Shared types for OUI lookups
//!
//! Hardware address normalization, manufacturer-block prefixes and the
//! terminal outcome of a lookup, as consumed by every other crate in the
//! workspace.

pub mod address;
pub mod lookup;
pub mod time;

pub use address::*;
pub use lookup::*;
pub use time::*;
