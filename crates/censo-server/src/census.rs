//! Handlers for `/v1/census`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/v1/census?school_id=<id>[&year=<y>]` | Merged answers, `{}` if none |
//! | `POST` | `/v1/census` | Merge-upsert; `"completed"` starts the finalize pipeline |

use axum::{Json, extract::State};
use censo_core::{
  census::{CensusRecord, CensusSubmission},
  store::CensusStore,
};
use chrono::{Datelike as _, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::{
  AppState,
  auth::ApiKey,
  error::ApiError,
  extract::{JsonBody, QueryParams},
};

/// Zero or absent means the current UTC year.
fn census_year(year: Option<i32>) -> i32 {
  match year {
    Some(y) if y != 0 => y,
    _ => Utc::now().year(),
  }
}

// ─── Fetch ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FetchParams {
  pub school_id: Option<i64>,
  pub year:      Option<i32>,
}

/// `GET /v1/census?school_id=<id>[&year=<y>]`
pub async fn fetch<S>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<FetchParams>,
) -> Result<Json<Value>, ApiError>
where
  S: CensusStore + Clone + 'static,
{
  let school_id = params
    .school_id
    .ok_or_else(|| ApiError::BadRequest("school_id is required".into()))?;

  let record = state
    .store
    .get_census(school_id, census_year(params.year))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok(Json(Value::Object(record.map(|r| r.data).unwrap_or_default())))
}

// ─── Submit ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub school_id: Option<i64>,
  #[serde(default)]
  pub year:      Option<i32>,
  #[serde(default)]
  pub status:    Option<String>,
  #[serde(default)]
  pub data:      Value,
}

/// `POST /v1/census`, body: `{"school_id":1,"year":2026,"status":"completed","data":{...}}`
pub async fn submit<S>(
  _: ApiKey,
  State(state): State<AppState<S>>,
  JsonBody(body): JsonBody<SubmitBody>,
) -> Result<Json<CensusRecord>, ApiError>
where
  S: CensusStore + Clone + 'static,
{
  let school_id = body
    .school_id
    .filter(|id| *id > 0)
    .ok_or_else(|| ApiError::BadRequest("school_id is required".into()))?;

  let submission = CensusSubmission::new(
    school_id,
    census_year(body.year),
    body.status.unwrap_or_default(),
    body.data,
  )?;

  let submitted = state.workflow.submit(submission).await?;
  Ok(Json(submitted.record))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn year_defaults_to_current() {
    let now = Utc::now().year();
    assert_eq!(census_year(None), now);
    assert_eq!(census_year(Some(0)), now);
    assert_eq!(census_year(Some(2024)), 2024);
  }
}
