//! `POST /v1/upload`: stage a school photo until its census is completed.
//!
//! Multipart fields: `photo` (the file) and `school_id`. Staging again for
//! the same school replaces the earlier photo.

use axum::{
  Json,
  extract::{
    Multipart, State,
    multipart::{MultipartError, MultipartRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use bytes::Bytes;
use censo_core::{sink::StagedPhoto, store::CensusStore};
use serde_json::json;

use crate::{AppState, auth::ApiKey, error::ApiError};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub async fn handler<S>(
  _: ApiKey,
  State(state): State<AppState<S>>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CensusStore + Clone + 'static,
{
  let mut multipart = multipart?;
  let mut school_id: Option<i64> = None;
  let mut photo: Option<StagedPhoto> = None;

  while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
    let name = field.name().map(str::to_owned);
    match name.as_deref() {
      Some("school_id") => {
        let text = field.text().await.map_err(bad_multipart)?;
        let id = text
          .trim()
          .parse()
          .map_err(|_| ApiError::BadRequest(format!("invalid school_id {text:?}")))?;
        school_id = Some(id);
      }
      Some("photo") => {
        let filename = field.file_name().unwrap_or("photo").to_string();
        let content_type = field
          .content_type()
          .unwrap_or(DEFAULT_CONTENT_TYPE)
          .to_string();
        let content: Bytes = field.bytes().await.map_err(bad_multipart)?;
        photo = Some(StagedPhoto { filename, content_type, content });
      }
      _ => {}
    }
  }

  let school_id = school_id.ok_or_else(|| ApiError::BadRequest("school_id is required".into()))?;
  let photo = photo.ok_or_else(|| ApiError::BadRequest("photo is required".into()))?;

  state
    .store
    .get_school(school_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("school {school_id} not found")))?;

  if photo.content.is_empty() {
    tracing::warn!(school_id, "staged photo is empty; it will not be uploaded");
  }
  let bytes = photo.content.len();
  state
    .staging
    .stage(school_id, photo)
    .await
    .map_err(ApiError::Store)?;

  tracing::info!(school_id, bytes, "photo staged");
  Ok((
    StatusCode::CREATED,
    Json(json!({ "school_id": school_id, "bytes": bytes })),
  ))
}

fn bad_multipart(e: MultipartError) -> ApiError { ApiError::BadRequest(e.body_text()) }
