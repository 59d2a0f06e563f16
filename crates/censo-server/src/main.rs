//! censo-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `CENSO_*` environment variables, opens the SQLite store, wires the Google
//! collaborators and serves the census API over HTTP.
//!
//! Nested settings use `__` in the environment, e.g.
//! `CENSO_GOOGLE__CENSUS_SPREADSHEET_ID=...`.
//!
//! Google credentials are tried in order: `google.access_token`, a service
//! account key from `google.credentials_json` or `google.credentials_path`
//! (acting as `google.impersonate_email` when set), then the metadata server.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use censo_google::GoogleClient;
use censo_server::{AppState, ServerConfig, staging::FsStaging, workflow::Workflow};
use censo_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "School census API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("CENSO")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let staging_dir = expand_tilde(&server_cfg.staging_dir);

  // Open SQLite store.
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  // External collaborators.
  let google = GoogleClient::new(server_cfg.google.clone()).context("failed to build Google client")?;
  let sheets = Arc::new(google.sheets());
  let staging = Arc::new(FsStaging::new(staging_dir));

  let workflow = Workflow::new(
    store.clone(),
    sheets.clone(),
    Arc::new(google.drive()),
    staging.clone(),
  );

  let state = AppState {
    store,
    workflow:  Arc::new(workflow),
    staging,
    locations: sheets,
    config:    Arc::new(server_cfg.clone()),
  };

  let app = censo_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(environment = %server_cfg.environment, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
