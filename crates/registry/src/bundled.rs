//! Fallback registry shipped with the application
//!
//! Used on first start, before any feed download has been persisted.

use crate::errors::*;
use crate::snapshot::RegistrySnapshot;
use oui_types::EpochMillis;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const EMBEDDED: &str = include_str!("../data/bundled_oui.json");

#[derive(Debug, Clone, Deserialize)]
pub struct BundledSnapshot {
    #[serde(default)]
    last_updated: Option<EpochMillis>,
    entries: HashMap<String, String>,
}

impl BundledSnapshot {
    /// Snapshot compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED)
    }

    /// Snapshot shipped as a JSON file next to the application.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_snapshot(self) -> RegistrySnapshot {
        RegistrySnapshot::new(self.entries, self.last_updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oui_types::OuiPrefix;

    #[test]
    fn embedded_snapshot_parses_and_is_stale() {
        let bundled = BundledSnapshot::embedded().expect("embedded snapshot parses");
        assert!(!bundled.is_empty());

        let snapshot = bundled.into_snapshot();
        let prefix = OuiPrefix::from_key("ACDE48").unwrap();
        assert_eq!(snapshot.lookup(&prefix), Some("Private"));
        assert_eq!(snapshot.last_refreshed(), None);
        assert!(snapshot.is_stale(0, std::time::Duration::from_secs(1)));
    }

    #[test]
    fn from_json_normalizes_keys() {
        let bundled = BundledSnapshot::from_json(
            r#"{"last_updated": 42, "entries": {"aabbcc": "Lower Inc"}}"#,
        )
        .unwrap();
        let snapshot = bundled.into_snapshot();
        assert_eq!(snapshot.entries()["AABBCC"], "Lower Inc");
        assert_eq!(snapshot.last_refreshed(), Some(42));
    }
}
