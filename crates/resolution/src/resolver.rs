//! Resolver abstraction shared by every link in the chain

use crate::errors::AttemptError;
use async_trait::async_trait;
use oui_types::{MacAddress, ResolutionSource};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Position of a resolver in the fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    Primary,
    Secondary,
    Offline,
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolverKind::Primary => "primary",
            ResolverKind::Secondary => "secondary",
            ResolverKind::Offline => "offline",
        };
        f.write_str(name)
    }
}

/// Outcome of one resolver attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// Definitive positive answer
    Found {
        vendor: String,
        source: ResolutionSource,
    },
    /// Explicit "no such vendor" from this resolver
    NotFound,
    /// No usable answer; the chain falls through
    Failed(AttemptError),
}

/// A strategy able to attempt a vendor lookup.
#[async_trait]
pub trait Resolver: Send + Sync {
    fn kind(&self) -> ResolverKind;

    /// Upper bound for one attempt. `None` runs the attempt unbounded.
    fn timeout(&self) -> Option<Duration>;

    async fn attempt(&self, address: &MacAddress) -> Attempt;
}
