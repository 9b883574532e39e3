//! Error types for the offline registry

use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry feed fetch failed ({url}): {reason}")]
    IngestionTransport { url: String, reason: String },

    #[error("registry feed returned HTTP {status} ({url})")]
    IngestionStatus { url: String, status: u16 },

    #[error("registry feed yielded no usable entries ({lines_scanned} lines scanned, {skipped} malformed)")]
    IngestionParse { lines_scanned: usize, skipped: usize },

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt persisted registry: {0}")]
    CorruptSnapshot(String),

    #[error("registry refresh task failed: {0}")]
    RefreshTask(String),

    #[error("Key-value store error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl RegistryError {
    /// The feed could not be retrieved at all.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            RegistryError::IngestionTransport { .. } | RegistryError::IngestionStatus { .. }
        )
    }

    /// The feed was retrieved but contained nothing usable.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, RegistryError::IngestionParse { .. })
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// A refresh failure shared between every caller that joined the same
/// in-flight refresh.
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct RefreshError(Arc<RegistryError>);

impl RefreshError {
    pub fn inner(&self) -> &RegistryError {
        &self.0
    }
}

impl From<RegistryError> for RefreshError {
    fn from(err: RegistryError) -> Self {
        RefreshError(Arc::new(err))
    }
}
