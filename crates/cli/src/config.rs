//! Layered configuration: optional TOML file, then `OUI_*` environment
//! variables.

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File as ConfigFile};
use oui_registry::{DEFAULT_FEED_URL, DEFAULT_REFRESH_INTERVAL};
use oui_resolution::{DEFAULT_PRIMARY_URL, DEFAULT_SECONDARY_URL};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const DEFAULT_CONFIG_PATH: &str = "config/oui.toml";
const DEFAULT_RPC_BIND: &str = "127.0.0.1:8090";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // Remote resolvers
    pub primary_url: String,
    pub secondary_url: String,
    pub resolver_timeout: Duration,

    // Registry
    pub feed_url: String,
    pub feed_timeout: Duration,
    pub refresh_interval: Duration,
    pub refresh_check: Duration,
    pub bundled_snapshot: Option<PathBuf>,

    // Storage
    pub data_dir: PathBuf,

    // RPC
    pub rpc_bind: String,

    // Logging
    pub log_level: String,
    pub log_format: String,
}

impl AppConfig {
    /// Load from `config_path` (must exist) or `config/oui.toml` when present,
    /// overlaid by the environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let resolved_path = match config_path {
            Some(path) => {
                if !path.exists() {
                    bail!(
                        "Configuration file {} not found (specified via --config)",
                        path.display()
                    );
                }
                Some(path.to_path_buf())
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                path.exists().then_some(path)
            }
        };

        let mut builder = Config::builder();
        if let Some(path) = &resolved_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }
        builder = builder.add_source(Environment::with_prefix("OUI"));

        let config = builder.build().context("failed to read configuration")?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let primary_url = get_string_value(config, &["primary_url", "resolvers.primary_url"])
            .unwrap_or_else(|| DEFAULT_PRIMARY_URL.to_string());
        let secondary_url = get_string_value(config, &["secondary_url", "resolvers.secondary_url"])
            .unwrap_or_else(|| DEFAULT_SECONDARY_URL.to_string());
        let resolver_timeout_ms = get_u64_value(
            config,
            &["resolver_timeout_ms", "resolvers.timeout_ms"],
            3_000,
        )?;

        let feed_url = get_string_value(config, &["feed_url", "registry.feed_url"])
            .unwrap_or_else(|| DEFAULT_FEED_URL.to_string());
        let feed_timeout_secs = get_u64_value(
            config,
            &["feed_timeout_secs", "registry.feed_timeout_secs"],
            120,
        )?;
        let refresh_interval_hours = get_u64_value(
            config,
            &["refresh_interval_hours", "registry.refresh_interval_hours"],
            DEFAULT_REFRESH_INTERVAL.as_secs() / 3_600,
        )?;
        let refresh_check_secs = get_u64_value(
            config,
            &["refresh_check_secs", "registry.refresh_check_secs"],
            3_600,
        )?;
        if refresh_check_secs == 0 {
            bail!("refresh_check_secs must be greater than zero");
        }
        let bundled_snapshot =
            get_string_value(config, &["bundled_snapshot", "registry.bundled_snapshot"])
                .map(PathBuf::from);

        let data_dir = get_string_value(config, &["data_dir", "storage.data_dir"])
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let rpc_bind = get_string_value(config, &["rpc_bind", "rpc.bind"])
            .unwrap_or_else(|| DEFAULT_RPC_BIND.to_string());

        let log_level = get_string_value(config, &["log_level", "log.level"])
            .unwrap_or_else(|| "info".to_string());
        let log_format = get_string_value(config, &["log_format", "log.format"])
            .unwrap_or_else(|| "pretty".to_string());

        for (key, value) in [
            ("primary_url", &primary_url),
            ("secondary_url", &secondary_url),
            ("feed_url", &feed_url),
        ] {
            Url::parse(value).with_context(|| format!("invalid URL {value:?} for {key}"))?;
        }

        Ok(Self {
            primary_url,
            secondary_url,
            resolver_timeout: Duration::from_millis(resolver_timeout_ms),
            feed_url,
            feed_timeout: Duration::from_secs(feed_timeout_secs),
            refresh_interval: Duration::from_secs(refresh_interval_hours.saturating_mul(3_600)),
            refresh_check: Duration::from_secs(refresh_check_secs),
            bundled_snapshot,
            data_dir,
            rpc_bind,
            log_level,
            log_format,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("registry.db")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("oui-lookup")
}

fn get_string_value(config: &Config, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        config
            .get_string(key)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn get_u64_value(config: &Config, keys: &[&str], default: u64) -> Result<u64> {
    match get_string_value(config, keys) {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("invalid value {raw:?} for {}", keys[0])),
        None => Ok(default),
    }
}
