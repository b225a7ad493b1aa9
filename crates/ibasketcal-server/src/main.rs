//! ibasketcal server binary.
//!
//! Loads configuration (environment over an optional `ibasketcal.toml`),
//! opens the configured store backend, wires the scrape pipeline to the
//! refresh controller, and serves the HTTP surface.

mod settings;

use std::{sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use ibasketcal_api::AppState;
use ibasketcal_core::store::Store;
use ibasketcal_scrape::{
  HarvesterConfig, Orchestrator, RefreshConfig, RefreshController,
  ScrapeConfig, TokenHarvester, UpstreamClient, UpstreamConfig,
};
use ibasketcal_store_remote::{EdgeSqlStore, RowStore};
use ibasketcal_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::{AppConfig, DbType};

#[derive(Parser)]
#[command(author, version, about = "Israeli basketball calendar server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "ibasketcal.toml")]
  config: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::default())
    .build()
    .context("failed to read configuration")?;
  let cfg: AppConfig = settings
    .try_deserialize()
    .context("failed to deserialise configuration")?;

  tracing::info!(db_type = ?cfg.db_type, "starting");

  match cfg.db_type {
    DbType::File => {
      let path = cfg.data_dir.join("basketball.db");
      let store = SqliteStore::open(&path)
        .await
        .with_context(|| format!("failed to open store at {path:?}"))?;
      serve(store, cfg).await
    }
    DbType::Edgesql => {
      let url = cfg
        .edgesql_url
        .clone()
        .context("EDGESQL_URL is required for the edgesql backend")?;
      let token = cfg
        .edgesql_auth_token
        .clone()
        .context("EDGESQL_AUTH_TOKEN is required for the edgesql backend")?;
      let store = EdgeSqlStore::connect(url, token)
        .await
        .context("failed to connect to edge-SQL service")?;
      serve(store, cfg).await
    }
    DbType::Rowstore => {
      let url = cfg
        .rowstore_url
        .clone()
        .context("ROWSTORE_URL is required for the rowstore backend")?;
      let key = cfg
        .rowstore_key
        .clone()
        .context("ROWSTORE_KEY is required for the rowstore backend")?;
      let store = RowStore::connect(url, key)
        .await
        .context("failed to connect to row-store service")?;
      serve(store, cfg).await
    }
  }
}

async fn serve<S>(store: S, cfg: AppConfig) -> anyhow::Result<()>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let harvester = Arc::new(TokenHarvester::new(HarvesterConfig {
    widget_url: cfg.widget_url.clone(),
    api_host:   cfg.upstream_api_host.clone(),
    headless:   cfg.scraper_headless,
    timeout:    ibasketcal_scrape::harvester::DEFAULT_ACQUIRE_TIMEOUT,
  }));
  let client = UpstreamClient::new(UpstreamConfig {
    base_url: cfg.upstream_base_url.clone(),
    origin:   cfg.upstream_origin.clone(),
  })
  .context("failed to build upstream client")?;
  let orchestrator = Orchestrator::new(harvester, client, ScrapeConfig {
    parallelism: cfg.scrape_parallelism,
    ..Default::default()
  });

  let refresh = RefreshController::new(store.clone(), orchestrator, RefreshConfig {
    cooldown: Duration::from_secs(cfg.refresh_cooldown_seconds),
    ttl:      Duration::from_secs(cfg.cache_ttl_minutes * 60),
  });
  refresh.load_persisted().await;
  // An empty store fills itself on boot; readers serve whatever exists
  // meanwhile.
  refresh.ensure_populated().await;

  let state = AppState { store: Arc::new(store), refresh: refresh.clone() };
  let app = ibasketcal_api::router(state);

  let address = format!("{}:{}", cfg.host, cfg.port);
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!("listening on http://{address}");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal(refresh))
    .await
    .context("server error")
}

/// Resolve on Ctrl-C / SIGTERM and tell the controller to wind down any
/// in-flight scrape.
async fn shutdown_signal<S>(refresh: Arc<RefreshController<S>>)
where
  S: Store + Clone + Send + Sync + 'static,
{
  let ctrl_c = tokio::signal::ctrl_c();
  #[cfg(unix)]
  {
    let mut terminate =
      tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("install SIGTERM handler");
    tokio::select! {
      _ = ctrl_c => {}
      _ = terminate.recv() => {}
    }
  }
  #[cfg(not(unix))]
  {
    let _ = ctrl_c.await;
  }

  tracing::info!("shutdown requested");
  refresh.shutdown();
}
