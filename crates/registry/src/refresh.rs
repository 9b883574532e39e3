//! Refresh scheduling
//!
//! At most one feed download runs at a time. A refresh requested while
//! another is in flight joins it and receives the same outcome.

use crate::errors::*;
use crate::feed::{fetch_and_ingest, FeedSource};
use crate::store::RegistryStore;
use futures::future::{BoxFuture, FutureExt, Shared};
use oui_types::{now_millis, EpochMillis};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Registry age after which a refresh is due.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Outcome of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub entries: usize,
    pub skipped: usize,
    pub refreshed_at: EpochMillis,
    /// False when the new snapshot is live in memory but could not be
    /// written to the backend.
    pub persisted: bool,
}

/// What [`RefreshCoordinator::check_and_refresh`] decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshDecision {
    Fresh,
    Refreshed(RefreshReport),
}

type RefreshFuture = Shared<BoxFuture<'static, std::result::Result<RefreshReport, RefreshError>>>;

struct InFlight {
    generation: u64,
    future: RefreshFuture,
}

struct CoordinatorInner {
    feed: Arc<dyn FeedSource>,
    store: Arc<RegistryStore>,
    refresh_interval: Duration,
    in_flight: Mutex<Option<InFlight>>,
    generation: AtomicU64,
}

impl CoordinatorInner {
    /// Clear the in-flight slot if it still belongs to `generation`.
    fn finish(&self, generation: u64) {
        let mut slot = self.in_flight.lock();
        if slot.as_ref().map(|f| f.generation) == Some(generation) {
            *slot = None;
        }
    }
}

/// Serializes registry refreshes and decides when one is due.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl RefreshCoordinator {
    /// Coordinator refreshing `store` from `feed` once it is older than
    /// `refresh_interval`.
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: Arc<RegistryStore>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                feed,
                store,
                refresh_interval,
                in_flight: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.inner.refresh_interval
    }

    pub fn store(&self) -> &Arc<RegistryStore> {
        &self.inner.store
    }

    /// True while a refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner.in_flight.lock().is_some()
    }

    /// Download and install the feed now, joining any refresh already in
    /// flight instead of starting a second download.
    pub async fn refresh_now(&self) -> std::result::Result<RefreshReport, RefreshError> {
        let future = {
            let mut slot = self.inner.in_flight.lock();
            match slot.as_ref() {
                Some(in_flight) => {
                    debug!("Joining in-flight registry refresh #{}", in_flight.generation);
                    in_flight.future.clone()
                }
                None => {
                    let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    let future = self.start_refresh(generation);
                    *slot = Some(InFlight {
                        generation,
                        future: future.clone(),
                    });
                    future
                }
            }
        };

        future.await
    }

    /// Refresh only if the current snapshot is stale.
    pub async fn check_and_refresh(&self) -> std::result::Result<RefreshDecision, RefreshError> {
        self.check_and_refresh_at(now_millis()).await
    }

    pub async fn check_and_refresh_at(
        &self,
        now: EpochMillis,
    ) -> std::result::Result<RefreshDecision, RefreshError> {
        if !self.inner.store.is_stale(now, self.inner.refresh_interval) {
            debug!("Registry is up to date");
            return Ok(RefreshDecision::Fresh);
        }

        info!("Registry is stale, refreshing");
        self.refresh_now().await.map(RefreshDecision::Refreshed)
    }

    /// Run a staleness check every `check_interval`, starting immediately.
    pub fn spawn_scheduler(&self, check_interval: Duration) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match coordinator.check_and_refresh().await {
                    Ok(RefreshDecision::Fresh) => {}
                    Ok(RefreshDecision::Refreshed(report)) => {
                        info!("Scheduled refresh installed {} entries", report.entries)
                    }
                    Err(err) => error!("Scheduled registry refresh failed: {}", err),
                }
            }
        })
    }

    /// Spawn the download so it runs to completion even if every caller
    /// stops waiting for it.
    fn start_refresh(&self, generation: u64) -> RefreshFuture {
        let feed = Arc::clone(&self.inner.feed);
        let store = Arc::clone(&self.inner.store);
        let owner: Weak<CoordinatorInner> = Arc::downgrade(&self.inner);

        let task = tokio::spawn({
            let owner = owner.clone();
            async move {
                let result = fetch_and_ingest(feed.as_ref(), &store)
                    .await
                    .map_err(RefreshError::from);
                if let Some(owner) = owner.upgrade() {
                    owner.finish(generation);
                }
                result
            }
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(err) => {
                    // The task never reached `finish`.
                    if let Some(owner) = owner.upgrade() {
                        owner.finish(generation);
                    }
                    Err(RegistryError::RefreshTask(err.to_string()).into())
                }
            }
        }
        .boxed()
        .shared()
    }
}
