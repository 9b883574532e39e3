//! Registry feed download

use crate::errors::*;
use crate::ingest::ingest;
use crate::refresh::RefreshReport;
use crate::store::RegistryStore;
use async_trait::async_trait;
use oui_types::now_millis;
use std::time::Duration;
use tracing::{info, warn};

/// Canonical public registry listing.
pub const DEFAULT_FEED_URL: &str = "https://standards-oui.ieee.org/oui/oui.txt";

/// Source of the raw registry text.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human readable location, for logs and errors.
    fn location(&self) -> String;

    /// Retrieve the whole feed. No retries; a failure is returned as is.
    async fn fetch(&self) -> Result<String>;
}

/// Feed served over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
    url: String,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RegistryError::IngestionTransport {
                url: url.clone(),
                reason: err.to_string(),
            })?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    fn location(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<String> {
        let transport = |err: reqwest::Error| RegistryError::IngestionTransport {
            url: self.url.clone(),
            reason: err.to_string(),
        };

        let response = self.client.get(&self.url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::IngestionStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(transport)
    }
}

/// Download the feed, parse it and hand the result to the store.
///
/// On any fetch or parse failure the store is left untouched.
pub async fn fetch_and_ingest(feed: &dyn FeedSource, store: &RegistryStore) -> Result<RefreshReport> {
    info!("Downloading registry feed from {}", feed.location());
    let raw = feed.fetch().await?;

    let parsed = ingest(&raw)?;
    info!(
        "Parsed {} registry entries ({} malformed lines skipped)",
        parsed.len(),
        parsed.skipped
    );

    let entries = parsed.len();
    let skipped = parsed.skipped;
    let refreshed_at = now_millis();
    let persisted = match store.replace(parsed.entries, refreshed_at) {
        Ok(()) => true,
        Err(err) => {
            warn!("Registry refreshed in memory only: {}", err);
            false
        }
    };

    Ok(RefreshReport {
        entries,
        skipped,
        refreshed_at,
        persisted,
    })
}
