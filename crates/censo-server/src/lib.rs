//! HTTP layer for the school census backend.
//!
//! Exposes an axum [`Router`] under `/v1` backed by any [`CensusStore`],
//! plus the finalize [`workflow`] that fans a completed census out to the
//! spreadsheet and the photo storage.

pub mod auth;
pub mod census;
pub mod error;
pub mod extract;
pub mod health;
pub mod locations;
pub mod schools;
pub mod staging;
pub mod upload;
pub mod workflow;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  http::{HeaderName, HeaderValue, Method, header},
  routing::{get, post},
};
use censo_core::{
  sink::{LocationSource, PhotoStaging},
  store::CensusStore,
};
use censo_google::GoogleConfig;
use serde::Deserialize;
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  trace::TraceLayer,
};

use workflow::Workflow;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CENSO_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  /// Reported by the health endpoint.
  pub environment:      String,
  pub store_path:       PathBuf,
  /// Where uploaded photos wait for their census to be completed.
  pub staging_dir:      PathBuf,
  /// When set, write endpoints require a matching `X-API-Key` header.
  pub api_key:          Option<String>,
  /// Allowed CORS origin. Any origin when unset.
  pub cors_origin:      Option<String>,
  pub max_upload_bytes: usize,
  pub google:           GoogleConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:             "0.0.0.0".to_string(),
      port:             8000,
      environment:      "development".to_string(),
      store_path:       PathBuf::from("censo.db"),
      staging_dir:      PathBuf::from("staging"),
      api_key:          None,
      cors_origin:      None,
      max_upload_bytes: 20 * 1024 * 1024,
      google:           GoogleConfig::default(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: CensusStore> {
  pub store:     Arc<S>,
  pub workflow:  Arc<Workflow<S>>,
  pub staging:   Arc<dyn PhotoStaging>,
  pub locations: Arc<dyn LocationSource>,
  pub config:    Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the `/v1` router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: CensusStore + Clone + 'static,
{
  let cors = cors_layer(state.config.cors_origin.as_deref());
  let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

  Router::new()
    .route("/v1/health",    get(health::handler::<S>))
    .route("/v1/schools",   get(schools::fetch::<S>).post(schools::upsert::<S>))
    .route("/v1/census",    get(census::fetch::<S>).post(census::submit::<S>))
    .route("/v1/upload",    post(upload::handler::<S>).layer(upload_limit))
    .route("/v1/locations", get(locations::handler::<S>))
    .layer(TraceLayer::new_for_http())
    .layer(cors)
    .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
  let allow_origin = match origin {
    None | Some("*") => AllowOrigin::any(),
    Some(o) => match HeaderValue::from_str(o) {
      Ok(v) => AllowOrigin::exact(v),
      Err(_) => {
        tracing::warn!(origin = o, "invalid cors_origin, allowing any origin");
        AllowOrigin::any()
      }
    },
  };

  CorsLayer::new()
    .allow_origin(allow_origin)
    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
    .allow_headers([
      header::CONTENT_TYPE,
      header::AUTHORIZATION,
      HeaderName::from_static(auth::API_KEY_HEADER),
    ])
}

#[cfg(test)]
mod fakes;
