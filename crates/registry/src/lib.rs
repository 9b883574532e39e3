//! Offline OUI registry
//!
//! Ingests the public IEEE registry feed into a prefix → manufacturer
//! mapping, keeps it as an immutable snapshot that can be swapped atomically,
//! persists it through a key-value backend and refreshes it when it goes
//! stale.

pub mod bundled;
pub mod errors;
pub mod feed;
pub mod ingest;
pub mod refresh;
pub mod snapshot;
pub mod storage;
pub mod store;

pub use bundled::BundledSnapshot;
pub use errors::*;
pub use feed::{fetch_and_ingest, FeedSource, HttpFeedSource, DEFAULT_FEED_URL};
pub use ingest::{ingest, parse_feed, ParsedFeed, HEX_MARKER};
pub use refresh::{RefreshCoordinator, RefreshDecision, RefreshReport, DEFAULT_REFRESH_INTERVAL};
pub use snapshot::RegistrySnapshot;
pub use storage::{KeyValueStore, MemoryKeyValueStore, SledKeyValueStore};
pub use store::{LoadSource, RegistryStatus, RegistryStore};
