use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use oui_registry::store::{DATABASE_KEY, LAST_UPDATED_KEY};
use oui_registry::{
    FeedSource, KeyValueStore, MemoryKeyValueStore, RefreshCoordinator, RefreshDecision,
    RegistryError, RegistryStore, SledKeyValueStore,
};
use oui_types::{days, now_millis, OuiPrefix, MILLIS_PER_DAY};
use tempfile::TempDir;
use tokio::sync::Notify;

const FEED: &str = "\
AC-DE-48   (hex)\t\tExample Corp
ACDE48     (base 16)\t\tExample Corp
00-00-0C   (hex)\t\tCisco Systems, Inc
";

/// Feed that counts downloads and optionally waits for a release signal.
struct ScriptedFeed {
    body: std::result::Result<String, u16>,
    fetches: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl ScriptedFeed {
    fn ok(body: &str) -> Self {
        Self {
            body: Ok(body.to_string()),
            fetches: AtomicUsize::new(0),
            gate: None,
        }
    }

    fn status(status: u16) -> Self {
        Self {
            body: Err(status),
            fetches: AtomicUsize::new(0),
            gate: None,
        }
    }

    fn gated(body: &str, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::ok(body)
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    fn location(&self) -> String {
        "scripted://feed".to_string()
    }

    async fn fetch(&self) -> oui_registry::Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.body {
            Ok(body) => Ok(body.clone()),
            Err(status) => Err(RegistryError::IngestionStatus {
                url: self.location(),
                status: *status,
            }),
        }
    }
}

fn entries(pairs: &[(&str, &str)]) -> std::collections::HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn persisted_bytes(backend: &dyn KeyValueStore) -> Vec<Option<Vec<u8>>> {
    backend
        .get(&[DATABASE_KEY, LAST_UPDATED_KEY])
        .expect("read backend")
}

#[tokio::test]
async fn refresh_replaces_registry_and_persists() {
    let temp_dir = TempDir::new().expect("temp dir");
    let backend = Arc::new(SledKeyValueStore::open(temp_dir.path().join("db")).expect("open sled"));
    let store = Arc::new(RegistryStore::new(backend.clone()));
    let feed = Arc::new(ScriptedFeed::ok(FEED));
    let coordinator = RefreshCoordinator::new(feed.clone(), store.clone(), days(7));

    let before = now_millis();
    let report = coordinator.refresh_now().await.expect("refresh succeeds");

    assert_eq!(report.entries, 2);
    assert_eq!(report.skipped, 0);
    assert!(report.persisted);
    assert!(report.refreshed_at >= before);

    let snapshot = store.get();
    let prefix = OuiPrefix::from_key("ACDE48").unwrap();
    assert_eq!(snapshot.lookup(&prefix), Some("Example Corp"));
    assert_eq!(snapshot.last_refreshed(), Some(report.refreshed_at));

    let reloaded = RegistryStore::new(backend);
    reloaded.load().expect("load");
    assert_eq!(*reloaded.get(), *snapshot);
    assert!(!coordinator.is_refreshing());
}

#[tokio::test]
async fn feed_without_entries_leaves_prior_registry_untouched() {
    let backend = Arc::new(MemoryKeyValueStore::new());
    let store = Arc::new(RegistryStore::new(backend.clone()));
    store
        .replace(entries(&[("112233", "Prior Inc")]), 1_000)
        .expect("seed registry");
    let prior_snapshot = store.get();
    let prior_bytes = persisted_bytes(backend.as_ref());

    let feed = Arc::new(ScriptedFeed::ok("truncated download\nno markers here\n"));
    let coordinator = RefreshCoordinator::new(feed, store.clone(), days(7));

    let err = coordinator.refresh_now().await.unwrap_err();
    assert!(err.inner().is_parse_failure());

    assert!(Arc::ptr_eq(&prior_snapshot, &store.get()));
    assert_eq!(persisted_bytes(backend.as_ref()), prior_bytes);
}

#[tokio::test]
async fn transport_failure_leaves_prior_registry_untouched() {
    let backend = Arc::new(MemoryKeyValueStore::new());
    let store = Arc::new(RegistryStore::new(backend.clone()));
    store
        .replace(entries(&[("112233", "Prior Inc")]), 1_000)
        .expect("seed registry");
    let prior_snapshot = store.get();
    let prior_bytes = persisted_bytes(backend.as_ref());

    let coordinator = RefreshCoordinator::new(Arc::new(ScriptedFeed::status(503)), store.clone(), days(7));

    let err = coordinator.refresh_now().await.unwrap_err();
    assert!(err.inner().is_transport_failure());
    assert!(matches!(
        err.inner(),
        RegistryError::IngestionStatus { status: 503, .. }
    ));

    assert!(Arc::ptr_eq(&prior_snapshot, &store.get()));
    assert_eq!(persisted_bytes(backend.as_ref()), prior_bytes);
}

#[tokio::test]
async fn concurrent_refresh_requests_share_one_download() {
    let gate = Arc::new(Notify::new());
    let feed = Arc::new(ScriptedFeed::gated(FEED, gate.clone()));
    let store = Arc::new(RegistryStore::new(Arc::new(MemoryKeyValueStore::new())));
    let coordinator = RefreshCoordinator::new(feed.clone(), store.clone(), days(7));

    let scheduled = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.refresh_now().await }
    });

    // Wait until the first download is parked on the gate.
    while feed.fetches() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(coordinator.is_refreshing());

    let explicit = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.refresh_now().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    gate.notify_one();

    let first = scheduled.await.expect("join").expect("refresh");
    let second = explicit.await.expect("join").expect("refresh");

    assert_eq!(feed.fetches(), 1);
    assert_eq!(first, second);
    assert!(!coordinator.is_refreshing());
    assert_eq!(store.get().len(), 2);
}

#[tokio::test]
async fn abandoned_refresh_still_installs_registry() {
    let gate = Arc::new(Notify::new());
    let feed = Arc::new(ScriptedFeed::gated(FEED, gate.clone()));
    let store = Arc::new(RegistryStore::new(Arc::new(MemoryKeyValueStore::new())));
    let coordinator = RefreshCoordinator::new(feed.clone(), store.clone(), days(7));

    let caller = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.refresh_now().await }
    });
    while feed.fetches() == 0 {
        tokio::task::yield_now().await;
    }

    // The only waiter goes away before the download finishes.
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());
    gate.notify_one();

    for _ in 0..200 {
        if !coordinator.is_refreshing() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(!coordinator.is_refreshing());
    assert_eq!(store.get().len(), 2);
    assert_eq!(feed.fetches(), 1);

    gate.notify_one();
    coordinator.refresh_now().await.expect("later refresh");
    assert_eq!(feed.fetches(), 2);
}

#[tokio::test]
async fn refresh_after_completion_downloads_again() {
    let feed = Arc::new(ScriptedFeed::ok(FEED));
    let store = Arc::new(RegistryStore::new(Arc::new(MemoryKeyValueStore::new())));
    let coordinator = RefreshCoordinator::new(feed.clone(), store, days(7));

    coordinator.refresh_now().await.expect("first refresh");
    coordinator.refresh_now().await.expect("second refresh");

    assert_eq!(feed.fetches(), 2);
}

#[tokio::test]
async fn check_and_refresh_respects_staleness() {
    let feed = Arc::new(ScriptedFeed::ok(FEED));
    let store = Arc::new(RegistryStore::new(Arc::new(MemoryKeyValueStore::new())));
    let now = 1_000 * MILLIS_PER_DAY;
    store
        .replace(entries(&[("112233", "Prior Inc")]), now - 6 * MILLIS_PER_DAY)
        .expect("seed registry");

    let coordinator = RefreshCoordinator::new(feed.clone(), store.clone(), days(7));

    let decision = coordinator.check_and_refresh_at(now).await.expect("check");
    assert_eq!(decision, RefreshDecision::Fresh);
    assert_eq!(feed.fetches(), 0);

    let later = now + 2 * MILLIS_PER_DAY;
    let decision = coordinator.check_and_refresh_at(later).await.expect("check");
    assert!(matches!(decision, RefreshDecision::Refreshed(ref report) if report.entries == 2));
    assert_eq!(feed.fetches(), 1);
}

#[tokio::test]
async fn empty_registry_is_always_due() {
    let feed = Arc::new(ScriptedFeed::ok(FEED));
    let store = Arc::new(RegistryStore::new(Arc::new(MemoryKeyValueStore::new())));
    let coordinator = RefreshCoordinator::new(feed.clone(), store, days(7));

    let decision = coordinator.check_and_refresh().await.expect("check");
    assert!(matches!(decision, RefreshDecision::Refreshed(_)));
}

#[tokio::test]
async fn scheduler_refreshes_stale_registry_on_first_tick() {
    let feed = Arc::new(ScriptedFeed::ok(FEED));
    let store = Arc::new(RegistryStore::new(Arc::new(MemoryKeyValueStore::new())));
    let coordinator = RefreshCoordinator::new(feed.clone(), store.clone(), days(7));

    let handle = coordinator.spawn_scheduler(Duration::from_secs(3600));
    for _ in 0..200 {
        if !store.get().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    handle.abort();

    assert_eq!(store.get().len(), 2);
    assert_eq!(feed.fetches(), 1);
}
