use oui_types::{EpochMillis, OuiPrefix};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Immutable view of the registry: the full mapping plus the time it was
/// last refreshed. A new snapshot replaces the old one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    entries: HashMap<String, String>,
    last_refreshed: Option<EpochMillis>,
}

impl RegistrySnapshot {
    /// Snapshot with no entries and no refresh time.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot, normalizing every key to uppercase.
    pub fn new(entries: HashMap<String, String>, last_refreshed: Option<EpochMillis>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(key, vendor)| (key.trim().to_uppercase(), vendor))
            .collect();
        Self {
            entries,
            last_refreshed,
        }
    }

    pub fn entries(&self) -> &HashMap<String, String> {
        &self.entries
    }

    pub fn last_refreshed(&self) -> Option<EpochMillis> {
        self.last_refreshed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Manufacturer registered for `prefix`, if any.
    pub fn lookup(&self, prefix: &OuiPrefix) -> Option<&str> {
        self.lookup_key(&prefix.key())
    }

    /// Look a key up in uppercase, lowercase and as given.
    ///
    /// Older persisted registries were not consistently case-normalized, so
    /// all three spellings are tried.
    pub fn lookup_key(&self, key: &str) -> Option<&str> {
        [key.to_uppercase(), key.to_lowercase(), key.to_string()]
            .iter()
            .find_map(|candidate| self.entries.get(candidate))
            .map(String::as_str)
    }

    /// True when the snapshot was never refreshed or is older than
    /// `interval` at `now`.
    pub fn is_stale(&self, now: EpochMillis, interval: Duration) -> bool {
        match self.last_refreshed {
            None => true,
            Some(last) => u128::from(now.saturating_sub(last)) > interval.as_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oui_types::{days, MILLIS_PER_DAY};

    fn entries(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn staleness_boundaries() {
        let now = 1_700_000_000_000;
        let week = days(7);

        let old = RegistrySnapshot::new(entries(&[]), Some(now - 8 * MILLIS_PER_DAY));
        let recent = RegistrySnapshot::new(entries(&[]), Some(now - 6 * MILLIS_PER_DAY));
        let exact = RegistrySnapshot::new(entries(&[]), Some(now - 7 * MILLIS_PER_DAY));

        assert!(old.is_stale(now, week));
        assert!(!recent.is_stale(now, week));
        assert!(!exact.is_stale(now, week));
        assert!(RegistrySnapshot::empty().is_stale(now, week));
    }

    #[test]
    fn refresh_time_in_the_future_is_fresh() {
        let snapshot = RegistrySnapshot::new(entries(&[]), Some(2_000));
        assert!(!snapshot.is_stale(1_000, Duration::from_millis(10)));
    }

    #[test]
    fn new_normalizes_keys() {
        let snapshot = RegistrySnapshot::new(entries(&[("acde48", "Example Corp")]), None);
        assert!(snapshot.entries().contains_key("ACDE48"));
    }

    #[test]
    fn lookup_tolerates_legacy_key_casing() {
        let prefix = OuiPrefix::from_key("ACDE48").unwrap();

        for key in ["ACDE48", "acde48"] {
            let raw = format!(r#"{{"entries":{{"{key}":"Example Corp"}},"last_refreshed":null}}"#);
            let snapshot: RegistrySnapshot = serde_json::from_str(&raw).unwrap();
            assert_eq!(snapshot.lookup(&prefix), Some("Example Corp"), "{key}");
        }

        let raw = r#"{"entries":{"AcDe48":"Mixed Case"},"last_refreshed":null}"#;
        let mixed: RegistrySnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(mixed.lookup_key("AcDe48"), Some("Mixed Case"));
        assert_eq!(mixed.lookup(&prefix), None);
    }
}
