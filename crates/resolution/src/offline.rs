//! Offline registry resolver

use crate::errors::AttemptError;
use crate::resolver::{Attempt, Resolver, ResolverKind};
use async_trait::async_trait;
use oui_registry::RegistryStore;
use oui_types::{now_millis, MacAddress, ResolutionSource};
use std::sync::Arc;
use std::time::Duration;

/// Answers from the current registry snapshot. Never times out.
pub struct OfflineResolver {
    store: Arc<RegistryStore>,
    refresh_interval: Duration,
}

impl OfflineResolver {
    pub fn new(store: Arc<RegistryStore>, refresh_interval: Duration) -> Self {
        Self {
            store,
            refresh_interval,
        }
    }
}

#[async_trait]
impl Resolver for OfflineResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::Offline
    }

    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn attempt(&self, address: &MacAddress) -> Attempt {
        let snapshot = self.store.get();
        if snapshot.is_empty() {
            return Attempt::Failed(AttemptError::OfflineUnavailable);
        }

        match snapshot.lookup(&address.prefix()) {
            Some(vendor) => Attempt::Found {
                vendor: vendor.to_string(),
                source: ResolutionSource::Offline {
                    stale: snapshot.is_stale(now_millis(), self.refresh_interval),
                },
            },
            None => Attempt::NotFound,
        }
    }
}
