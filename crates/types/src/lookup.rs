//! Terminal outcome of a single address lookup

use crate::address::OuiPrefix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which resolver produced a positive answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Primary remote lookup service
    Primary,
    /// Secondary remote lookup service
    Secondary,
    /// Local offline registry; `stale` is true when the registry is older
    /// than the configured refresh interval.
    Offline { stale: bool },
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionSource::Primary => f.write_str("primary remote"),
            ResolutionSource::Secondary => f.write_str("secondary remote"),
            ResolutionSource::Offline { stale: false } => f.write_str("offline registry"),
            ResolutionSource::Offline { stale: true } => f.write_str("offline registry (stale)"),
        }
    }
}

/// Diagnostic attached to a negative lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    /// Every resolver was consulted and none knows the block.
    Unknown,
    /// The offline registry has never been loaded, so the local fallback
    /// could not answer.
    OfflineUnavailable,
    /// No resolver gave a definitive answer and there is no offline
    /// fallback in the chain.
    NoDefinitiveAnswer,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NotFoundReason::Unknown => "vendor not found for this MAC address",
            NotFoundReason::OfflineUnavailable => {
                "vendor not found; offline registry is not loaded"
            }
            NotFoundReason::NoDefinitiveAnswer => "unable to look up vendor",
        };
        f.write_str(text)
    }
}

/// Result handed back across the engine boundary.
///
/// Resolver-level failures never appear here; only the terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupResult {
    Found {
        prefix: OuiPrefix,
        vendor: String,
        source: ResolutionSource,
    },
    NotFound {
        prefix: OuiPrefix,
        reason: NotFoundReason,
    },
    Invalid {
        reason: String,
    },
}

impl LookupResult {
    pub fn is_found(&self) -> bool {
        matches!(self, LookupResult::Found { .. })
    }

    pub fn vendor(&self) -> Option<&str> {
        match self {
            LookupResult::Found { vendor, .. } => Some(vendor),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<ResolutionSource> {
        match self {
            LookupResult::Found { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn prefix(&self) -> Option<OuiPrefix> {
        match self {
            LookupResult::Found { prefix, .. } | LookupResult::NotFound { prefix, .. } => {
                Some(*prefix)
            }
            LookupResult::Invalid { .. } => None,
        }
    }
}

impl fmt::Display for LookupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupResult::Found {
                prefix,
                vendor,
                source,
            } => write!(f, "Vendor: {vendor} ({prefix}, via {source})"),
            LookupResult::NotFound { prefix, reason } => write!(f, "{prefix}: {reason}"),
            LookupResult::Invalid { reason } => write!(f, "Invalid MAC address format: {reason}"),
        }
    }
}
