//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::{
    multipart::MultipartRejection,
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
  response::{IntoResponse, Response},
};
use censo_core::sink::BoxError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// A call to the spreadsheet or photo storage failed while the client
  /// was waiting on it.
  #[error("external service error: {0}")]
  External(#[source] BoxError),
}

impl From<censo_core::Error> for ApiError {
  fn from(e: censo_core::Error) -> Self {
    match e {
      censo_core::Error::SchoolNotFound(id) => ApiError::NotFound(format!("school {id} not found")),
      other => ApiError::BadRequest(other.to_string()),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(e: JsonRejection) -> Self {
    tracing::debug!(error = %e.body_text(), "rejected json body");
    ApiError::BadRequest("malformed JSON body".into())
  }
}

impl From<QueryRejection> for ApiError {
  fn from(e: QueryRejection) -> Self {
    tracing::debug!(error = %e.body_text(), "rejected query string");
    ApiError::BadRequest("malformed query string".into())
  }
}

impl From<MultipartRejection> for ApiError {
  fn from(e: MultipartRejection) -> Self {
    tracing::debug!(error = %e.body_text(), "rejected multipart body");
    ApiError::BadRequest("expected a multipart/form-data body".into())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid or missing API key".to_string()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal storage error".to_string())
      }
      ApiError::External(e) => {
        tracing::error!(error = %e, "external service error");
        (StatusCode::INTERNAL_SERVER_ERROR, "external service unavailable".to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
