//! Chain runner

use crate::errors::AttemptError;
use crate::resolver::{Attempt, Resolver, ResolverKind};
use oui_types::{validate, LookupResult, MacAddress, NotFoundReason};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Runs the resolver chain for one address at a time.
///
/// Resolvers are tried sequentially in [`ResolverKind`] order. The first
/// positive answer wins. A remote "not found" never stops the chain while
/// another resolver remains, and attempt failures are logged and absorbed.
///
/// A timed-out attempt is dropped at the deadline, so whatever it would
/// have produced later can never reach the result.
#[derive(Clone)]
pub struct ResolutionEngine {
    chain: Vec<Arc<dyn Resolver>>,
}

impl ResolutionEngine {
    /// Build an engine from any set of resolvers; they are ordered by kind.
    pub fn new(mut chain: Vec<Arc<dyn Resolver>>) -> Self {
        chain.sort_by_key(|resolver| resolver.kind());
        Self { chain }
    }

    /// Kinds of the configured resolvers, in the order they run.
    pub fn order(&self) -> Vec<ResolverKind> {
        self.chain.iter().map(|resolver| resolver.kind()).collect()
    }

    pub fn has_offline(&self) -> bool {
        self.chain
            .iter()
            .any(|resolver| resolver.kind() == ResolverKind::Offline)
    }

    /// Validate `raw` and resolve it. Malformed input never reaches a
    /// resolver.
    pub async fn resolve(&self, raw: &str) -> LookupResult {
        match validate(raw) {
            Ok(address) => self.resolve_address(&address).await,
            Err(err) => {
                debug!("Rejected lookup input {:?}: {}", raw, err);
                LookupResult::Invalid {
                    reason: err.to_string(),
                }
            }
        }
    }

    pub async fn resolve_address(&self, address: &MacAddress) -> LookupResult {
        let prefix = address.prefix();
        let mut negative = false;
        let mut offline_unavailable = false;

        for (position, resolver) in self.chain.iter().enumerate() {
            let kind = resolver.kind();
            match run_attempt(resolver.as_ref(), address).await {
                Attempt::Found { vendor, source } => {
                    info!("Resolved {} to {:?} via {}", prefix, vendor, kind);
                    return LookupResult::Found {
                        prefix,
                        vendor,
                        source,
                    };
                }
                Attempt::NotFound => {
                    negative = true;
                    if position + 1 < self.chain.len() {
                        debug!("{} resolver has no entry for {}, falling through", kind, prefix);
                    } else {
                        debug!("{} resolver has no entry for {}", kind, prefix);
                    }
                }
                Attempt::Failed(AttemptError::OfflineUnavailable) => {
                    offline_unavailable = true;
                    warn!("Offline registry is not loaded, cannot resolve {}", prefix);
                }
                Attempt::Failed(err) => {
                    warn!("{} resolver failed for {}: {}", kind, prefix, err);
                }
            }
        }

        let reason = if offline_unavailable {
            NotFoundReason::OfflineUnavailable
        } else if negative {
            NotFoundReason::Unknown
        } else {
            NotFoundReason::NoDefinitiveAnswer
        };
        LookupResult::NotFound { prefix, reason }
    }
}

/// One attempt, raced against the resolver's deadline when it has one.
async fn run_attempt(resolver: &dyn Resolver, address: &MacAddress) -> Attempt {
    match resolver.timeout() {
        Some(limit) => match timeout(limit, resolver.attempt(address)).await {
            Ok(attempt) => attempt,
            Err(_) => Attempt::Failed(AttemptError::Timeout(limit)),
        },
        None => resolver.attempt(address).await,
    }
}
