//! Handlers for `/v1/schools`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/v1/schools` | Every school, ordered by name |
//! | `GET`  | `/v1/schools?id=<id>` | 404 if not found |
//! | `POST` | `/v1/schools` | Upsert by `codigo_inep`, 201 with `{id}` |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use censo_core::{school::SchoolProfile, store::CensusStore};
use serde::Deserialize;
use serde_json::json;

use crate::{
  AppState,
  auth::ApiKey,
  error::ApiError,
  extract::{JsonBody, QueryParams},
};

// ─── Fetch ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FetchParams {
  pub id: Option<i64>,
}

/// `GET /v1/schools[?id=<id>]`
pub async fn fetch<S>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<FetchParams>,
) -> Result<Response, ApiError>
where
  S: CensusStore + Clone + 'static,
{
  let Some(id) = params.id else {
    let schools = state
      .store
      .list_schools()
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?;
    return Ok(Json(schools).into_response());
  };

  let school = state
    .store
    .get_school(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("school {id} not found")))?;
  Ok(Json(school).into_response())
}

// ─── Upsert ───────────────────────────────────────────────────────────────────

/// `POST /v1/schools`, body: the identification form fields.
pub async fn upsert<S>(
  _: ApiKey,
  State(state): State<AppState<S>>,
  JsonBody(profile): JsonBody<SchoolProfile>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CensusStore + Clone + 'static,
{
  let profile = profile.validate()?;
  let id = state
    .store
    .upsert_school(profile)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}
