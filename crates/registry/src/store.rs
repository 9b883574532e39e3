//! Registry store: owns the current snapshot and its persistence

use crate::bundled::BundledSnapshot;
use crate::errors::*;
use crate::snapshot::RegistrySnapshot;
use crate::storage::KeyValueStore;
use arc_swap::ArcSwap;
use oui_types::EpochMillis;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Key holding the JSON encoded prefix → manufacturer mapping.
pub const DATABASE_KEY: &str = "oui_database";
/// Key holding the refresh time as big-endian epoch milliseconds.
pub const LAST_UPDATED_KEY: &str = "last_updated";

/// Where the snapshot installed by [`RegistryStore::load`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Persisted,
    Bundled,
    Empty,
}

/// Summary of the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryStatus {
    pub entries: usize,
    pub last_refreshed: Option<EpochMillis>,
    pub stale: bool,
}

/// Holder of the current registry snapshot.
///
/// Readers get an `Arc` to an immutable snapshot. [`RegistryStore::replace`]
/// swaps in a new snapshot in one pointer store, so a reader sees either the
/// old mapping with the old timestamp or the new mapping with the new one.
pub struct RegistryStore {
    current: ArcSwap<RegistrySnapshot>,
    backend: Arc<dyn KeyValueStore>,
    bundled: Option<BundledSnapshot>,
}

impl RegistryStore {
    /// Create an empty store persisting through `backend`.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            current: ArcSwap::from_pointee(RegistrySnapshot::empty()),
            backend,
            bundled: None,
        }
    }

    /// Snapshot to install when nothing has been persisted yet.
    pub fn with_bundled(mut self, bundled: BundledSnapshot) -> Self {
        self.bundled = Some(bundled);
        self
    }

    /// Current snapshot. Empty until the first load or replace.
    pub fn get(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }

    /// Swap in a whole new mapping and refresh time, then persist it.
    ///
    /// The in-memory swap always happens. An `Err` only reports that
    /// persisting the new snapshot failed.
    pub fn replace(&self, entries: HashMap<String, String>, refreshed_at: EpochMillis) -> Result<()> {
        let snapshot = Arc::new(RegistrySnapshot::new(entries, Some(refreshed_at)));
        self.current.store(Arc::clone(&snapshot));
        info!("Registry replaced with {} entries", snapshot.len());

        self.write_snapshot(&snapshot).map_err(|err| {
            warn!("Failed to persist registry snapshot: {}", err);
            err
        })
    }

    /// Write the current snapshot to the backend.
    pub fn persist(&self) -> Result<()> {
        self.write_snapshot(&self.get())
    }

    /// Install the persisted snapshot, or the bundled one when nothing has
    /// been persisted or the persisted data cannot be read.
    pub fn load(&self) -> Result<LoadSource> {
        match self.read_persisted() {
            Ok(Some(snapshot)) => {
                info!(
                    "Loaded persisted registry with {} entries (last refreshed: {:?})",
                    snapshot.len(),
                    snapshot.last_refreshed()
                );
                self.current.store(Arc::new(snapshot));
                return Ok(LoadSource::Persisted);
            }
            Ok(None) => debug!("No persisted registry found"),
            Err(err @ (RegistryError::CorruptSnapshot(_) | RegistryError::Serialization(_))) => {
                warn!("Ignoring unreadable persisted registry: {}", err);
            }
            Err(err) => return Err(err),
        }

        match &self.bundled {
            Some(bundled) => {
                let snapshot = bundled.clone().into_snapshot();
                info!("Loaded bundled registry with {} entries", snapshot.len());
                self.current.store(Arc::new(snapshot));
                Ok(LoadSource::Bundled)
            }
            None => Ok(LoadSource::Empty),
        }
    }

    pub fn is_stale(&self, now: EpochMillis, interval: Duration) -> bool {
        self.get().is_stale(now, interval)
    }

    pub fn status(&self, now: EpochMillis, interval: Duration) -> RegistryStatus {
        let snapshot = self.get();
        RegistryStatus {
            entries: snapshot.len(),
            last_refreshed: snapshot.last_refreshed(),
            stale: snapshot.is_stale(now, interval),
        }
    }

    fn write_snapshot(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        let ordered: BTreeMap<&String, &String> = snapshot.entries().iter().collect();
        // An empty timestamp value marks a snapshot that was never refreshed.
        let last_updated = snapshot
            .last_refreshed()
            .map(|refreshed_at| refreshed_at.to_be_bytes().to_vec())
            .unwrap_or_default();
        self.backend.set(&[
            (DATABASE_KEY, serde_json::to_vec(&ordered)?),
            (LAST_UPDATED_KEY, last_updated),
        ])
    }

    fn read_persisted(&self) -> Result<Option<RegistrySnapshot>> {
        let mut values = self.backend.get(&[DATABASE_KEY, LAST_UPDATED_KEY])?.into_iter();
        let database = values.next().flatten();
        let last_updated = values.next().flatten();

        let Some(database) = database else {
            return Ok(None);
        };

        let entries: HashMap<String, String> = serde_json::from_slice(&database)?;
        let last_refreshed = last_updated
            .filter(|bytes| !bytes.is_empty())
            .map(|bytes| {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    RegistryError::CorruptSnapshot(format!(
                        "{LAST_UPDATED_KEY} is {} bytes, expected 8",
                        bytes.len()
                    ))
                })?;
                Ok::<_, RegistryError>(u64::from_be_bytes(raw))
            })
            .transpose()?;

        let stored = entries.len();
        let snapshot = RegistrySnapshot::new(entries, last_refreshed);
        if snapshot.len() != stored {
            debug!(
                "Key normalization merged {} persisted entries",
                stored - snapshot.len()
            );
        }
        Ok(Some(snapshot))
    }
}
