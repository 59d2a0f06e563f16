//! `GET /v1/locations`: region → municipality → school names.

use axum::{Json, extract::State};
use censo_core::{locations::Locations, store::CensusStore};

use crate::{AppState, error::ApiError};

pub async fn handler<S>(State(state): State<AppState<S>>) -> Result<Json<Locations>, ApiError>
where
  S: CensusStore + Clone + 'static,
{
  let locations = state.locations.locations().await.map_err(ApiError::External)?;
  Ok(Json(locations))
}
