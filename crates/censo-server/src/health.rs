//! `GET /v1/health`

use axum::{Json, extract::State};
use censo_core::store::CensusStore;
use serde_json::{Value, json};

use crate::AppState;

pub async fn handler<S>(State(state): State<AppState<S>>) -> Json<Value>
where
  S: CensusStore + Clone + 'static,
{
  Json(json!({
    "status":      "available",
    "environment": state.config.environment,
    "version":     env!("CARGO_PKG_VERSION"),
  }))
}
