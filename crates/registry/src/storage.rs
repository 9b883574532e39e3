//! Key-value backends for registry persistence

use crate::errors::*;
use parking_lot::RwLock;
use sled::{Batch, Db, Tree};
use std::collections::HashMap;
use std::path::Path;

/// Persistent key-value store with get/set semantics.
pub trait KeyValueStore: Send + Sync {
    /// Fetch several keys at once; the result is aligned with `keys`.
    fn get(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Write every pair, all-or-nothing.
    fn set(&self, pairs: &[(&str, Vec<u8>)]) -> Result<()>;
}

/// Sled-backed implementation
pub struct SledKeyValueStore {
    db: Db,
    registry: Tree,
}

impl SledKeyValueStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let registry = db.open_tree("registry")?;
        Ok(Self { db, registry })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl KeyValueStore for SledKeyValueStore {
    fn get(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        keys.iter()
            .map(|key| Ok(self.registry.get(key.as_bytes())?.map(|v| v.to_vec())))
            .collect()
    }

    fn set(&self, pairs: &[(&str, Vec<u8>)]) -> Result<()> {
        let mut batch = Batch::default();
        for (key, value) in pairs {
            batch.insert(key.as_bytes(), value.as_slice());
        }
        self.registry.apply_batch(batch)?;
        self.registry.flush()?;
        Ok(())
    }
}

/// In-memory implementation for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        let values = self.values.read();
        Ok(keys.iter().map(|key| values.get(*key).cloned()).collect())
    }

    fn set(&self, pairs: &[(&str, Vec<u8>)]) -> Result<()> {
        let mut values = self.values.write();
        for (key, value) in pairs {
            values.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}
