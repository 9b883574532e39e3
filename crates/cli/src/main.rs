//! OUI Lookup command line interface
//!
//! Resolves MAC addresses to their manufacturer, maintains the offline
//! registry and serves both over HTTP.

mod config;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use oui_registry::{
    BundledSnapshot, HttpFeedSource, KeyValueStore, LoadSource, MemoryKeyValueStore,
    RefreshCoordinator, RegistryStore, SledKeyValueStore,
};
use oui_resolution::{
    OfflineResolver, PrimaryResolver, RemoteEndpoint, ResolutionEngine, Resolver,
    SecondaryResolver,
};
use oui_rpc::{start_server, AppState};
use oui_types::{now_millis, EpochMillis, LookupResult};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "oui")]
#[command(about = "Resolve MAC addresses to their manufacturer", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Data directory (overrides `data_dir`)
    #[arg(short, long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Skip the remote lookup services
    #[arg(long, global = true)]
    offline: bool,

    /// Keep the registry in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up the manufacturer of a MAC address
    Lookup {
        /// Address such as AC:DE:48:00:11:22, ac-de-48-00-11-22 or ACDE48001122
        address: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download the registry feed now
    Update,
    /// Show registry size and freshness
    Status,
    /// Serve the HTTP API and refresh the registry in the background
    Serve {
        /// Listen address (overrides `rpc_bind`)
        #[arg(long)]
        bind: Option<String>,
    },
}

/// Everything a command needs, wired from configuration.
struct Services {
    store: Arc<RegistryStore>,
    refresher: RefreshCoordinator,
    engine: Arc<ResolutionEngine>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    init_logging(&config)?;

    let services = build_services(&config, &cli)?;

    match cli.command {
        Commands::Lookup { address, json } => lookup(&services, &address, json).await,
        Commands::Update => update(&services).await,
        Commands::Status => status(&services, &config),
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.rpc_bind.clone());
            serve(services, &config, &bind).await
        }
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "compact" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn build_services(config: &AppConfig, cli: &Cli) -> Result<Services> {
    let backend: Arc<dyn KeyValueStore> = if cli.ephemeral {
        info!("Using in-memory registry storage");
        Arc::new(MemoryKeyValueStore::new())
    } else {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("failed to create data directory {}", config.data_dir.display())
        })?;
        let path = config.database_path();
        Arc::new(
            SledKeyValueStore::open(&path)
                .with_context(|| format!("failed to open registry database {}", path.display()))?,
        )
    };

    let bundled = match &config.bundled_snapshot {
        Some(path) => BundledSnapshot::from_path(path)
            .with_context(|| format!("failed to read bundled registry {}", path.display()))?,
        None => BundledSnapshot::embedded().context("embedded registry snapshot is invalid")?,
    };

    let store = Arc::new(RegistryStore::new(backend).with_bundled(bundled));
    match store.load().context("failed to load registry")? {
        LoadSource::Persisted => {}
        LoadSource::Bundled => info!("No persisted registry yet, using the bundled snapshot"),
        LoadSource::Empty => warn!("Offline registry is empty until the first refresh"),
    }

    let feed = HttpFeedSource::new(&config.feed_url, config.feed_timeout)?;
    let refresher = RefreshCoordinator::new(Arc::new(feed), store.clone(), config.refresh_interval);

    let mut chain: Vec<Arc<dyn Resolver>> = Vec::new();
    if !cli.offline {
        let client = reqwest::Client::builder()
            .user_agent(concat!("oui-lookup/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        chain.push(Arc::new(PrimaryResolver::new(
            client.clone(),
            RemoteEndpoint::new(&config.primary_url, config.resolver_timeout),
        )));
        chain.push(Arc::new(SecondaryResolver::new(
            client,
            RemoteEndpoint::new(&config.secondary_url, config.resolver_timeout),
        )));
    }
    chain.push(Arc::new(OfflineResolver::new(
        store.clone(),
        config.refresh_interval,
    )));

    Ok(Services {
        store,
        refresher,
        engine: Arc::new(ResolutionEngine::new(chain)),
    })
}

async fn lookup(services: &Services, address: &str, as_json: bool) -> Result<()> {
    let result = services.engine.resolve(address).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result);
    }

    if let LookupResult::Invalid { reason } = result {
        anyhow::bail!("invalid MAC address {address:?}: {reason}");
    }
    Ok(())
}

async fn update(services: &Services) -> Result<()> {
    match services.refresher.refresh_now().await {
        Ok(report) => {
            let response = json!({ "success": true, "report": report });
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(err) => {
            let response = json!({ "success": false, "error": err.to_string() });
            println!("{}", serde_json::to_string_pretty(&response)?);
            Err(err).context("registry update failed")
        }
    }
}

fn status(services: &Services, config: &AppConfig) -> Result<()> {
    let status = services.store.status(now_millis(), config.refresh_interval);

    println!("Entries:        {}", status.entries);
    println!("Last refreshed: {}", format_timestamp(status.last_refreshed));
    println!("Stale:          {}", status.stale);
    if status.stale {
        println!("Run `oui update` to download the current registry.");
    }
    Ok(())
}

async fn serve(services: Services, config: &AppConfig, bind: &str) -> Result<()> {
    let scheduler = services.refresher.spawn_scheduler(config.refresh_check);
    let state = AppState::new(services.engine.clone(), services.refresher.clone());

    let result = tokio::select! {
        result = start_server(state, bind) => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!("Shutting down");
            Ok(())
        }
    };

    scheduler.abort();
    result
}

fn format_timestamp(millis: Option<EpochMillis>) -> String {
    millis
        .and_then(|millis| i64::try_from(millis).ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oui_resolution::ResolverKind;

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp(None), "never");
        assert_eq!(format_timestamp(Some(0)), "1970-01-01 00:00:00 UTC");
        assert_eq!(
            format_timestamp(Some(1_700_000_000_000)),
            "2023-11-14 22:13:20 UTC"
        );
    }

    #[test]
    fn cli_accepts_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["oui", "lookup", "ACDE48001122", "--offline", "--json"])
            .unwrap();
        assert!(cli.offline);
        assert!(matches!(cli.command, Commands::Lookup { json: true, .. }));
    }

    #[tokio::test]
    async fn offline_ephemeral_services_resolve_from_bundled_snapshot() {
        let config = AppConfig::from_config(&::config::Config::default()).unwrap();
        let cli = Cli::try_parse_from(["oui", "--offline", "--ephemeral", "status"]).unwrap();

        let services = build_services(&config, &cli).unwrap();
        assert_eq!(services.engine.order(), vec![ResolverKind::Offline]);

        let result = services.engine.resolve("ac:de:48:00:11:22").await;
        assert_eq!(result.vendor(), Some("Private"));
    }
}
