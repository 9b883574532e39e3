//! Vendor Resolution Engine
//!
//! Resolves a hardware address to its manufacturer by trying, in order:
//! - the primary remote lookup service
//! - the secondary remote lookup service
//! - the offline registry snapshot
//!
//! Every remote attempt is bounded by its own timeout. Failures of a single
//! resolver are absorbed by the chain; callers only ever see the terminal
//! [`oui_types::LookupResult`].

pub mod engine;
pub mod errors;
pub mod offline;
pub mod remote;
pub mod resolver;

pub use engine::*;
pub use errors::*;
pub use offline::OfflineResolver;
pub use remote::*;
pub use resolver::*;
