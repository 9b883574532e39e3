//! Remote lookup services

use crate::errors::AttemptError;
use crate::resolver::{Attempt, Resolver, ResolverKind};
use async_trait::async_trait;
use oui_types::{MacAddress, ResolutionSource};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_PRIMARY_URL: &str = "https://api.macvendors.com";
pub const DEFAULT_SECONDARY_URL: &str = "https://api.maclookup.app/v2/macs";
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Endpoint and per-attempt timeout of a remote resolver.
#[derive(Debug, Clone)]
pub struct RemoteEndpoint {
    pub base_url: String,
    pub timeout: Duration,
}

impl RemoteEndpoint {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn url_for(&self, address: &str) -> String {
        format!("{}/{}", self.base_url, address)
    }
}

/// Plain-text service: `GET {base}/AA:BB:CC:DD:EE:FF` answers with the
/// vendor name, or 404 for unknown prefixes.
#[derive(Debug, Clone)]
pub struct PrimaryResolver {
    client: reqwest::Client,
    endpoint: RemoteEndpoint,
}

impl PrimaryResolver {
    pub fn new(client: reqwest::Client, endpoint: RemoteEndpoint) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl Resolver for PrimaryResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::Primary
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.endpoint.timeout)
    }

    async fn attempt(&self, address: &MacAddress) -> Attempt {
        let url = self.endpoint.url_for(&address.colon_separated());
        debug!("Primary lookup: GET {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => return Attempt::Failed(err.into()),
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Attempt::NotFound;
        }
        if !status.is_success() {
            return Attempt::Failed(AttemptError::UnexpectedStatus(status.as_u16()));
        }

        match response.text().await {
            Ok(body) => {
                let vendor = body.trim();
                if vendor.is_empty() {
                    Attempt::Failed(AttemptError::MalformedResponse("empty vendor".into()))
                } else {
                    Attempt::Found {
                        vendor: vendor.to_string(),
                        source: ResolutionSource::Primary,
                    }
                }
            }
            Err(err) => Attempt::Failed(err.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompanyPayload {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    found: Option<bool>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// JSON service: `GET {base}/AABBCCDDEEFF` answers with a payload carrying
/// a `company` field and a `found` flag.
#[derive(Debug, Clone)]
pub struct SecondaryResolver {
    client: reqwest::Client,
    endpoint: RemoteEndpoint,
}

impl SecondaryResolver {
    pub fn new(client: reqwest::Client, endpoint: RemoteEndpoint) -> Self {
        Self { client, endpoint }
    }

    fn interpret(payload: CompanyPayload) -> Attempt {
        if payload.success == Some(false) {
            let detail = payload.error.unwrap_or_else(|| "request rejected".into());
            return Attempt::Failed(AttemptError::MalformedResponse(detail));
        }
        if payload.found == Some(false) {
            return Attempt::NotFound;
        }
        match payload.company.as_deref().map(str::trim) {
            Some(company) if !company.is_empty() => Attempt::Found {
                vendor: company.to_string(),
                source: ResolutionSource::Secondary,
            },
            _ => Attempt::Failed(AttemptError::MalformedResponse(
                "missing company name".into(),
            )),
        }
    }
}

#[async_trait]
impl Resolver for SecondaryResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::Secondary
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.endpoint.timeout)
    }

    async fn attempt(&self, address: &MacAddress) -> Attempt {
        let url = self.endpoint.url_for(&address.canonical());
        debug!("Secondary lookup: GET {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => return Attempt::Failed(err.into()),
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Attempt::NotFound;
        }
        if !status.is_success() {
            return Attempt::Failed(AttemptError::UnexpectedStatus(status.as_u16()));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => return Attempt::Failed(err.into()),
        };
        match serde_json::from_slice::<CompanyPayload>(&body) {
            Ok(payload) => Self::interpret(payload),
            Err(err) => Attempt::Failed(AttemptError::MalformedResponse(err.to_string())),
        }
    }
}
