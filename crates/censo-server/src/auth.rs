//! Placeholder API-key check for write endpoints.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use censo_core::store::CensusStore;

use crate::{AppState, error::ApiError};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Zero-size marker: present in the handler means the request carried the
/// configured key, or that no key is configured.
pub struct ApiKey;

/// Verify the `X-API-Key` header against `expected`. An unset or empty
/// expected key disables the check.
pub fn verify_api_key(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
  let Some(expected) = expected.filter(|k| !k.is_empty()) else {
    return Ok(());
  };

  let given = headers
    .get(API_KEY_HEADER)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  if given != expected {
    return Err(ApiError::Unauthorized);
  }
  Ok(())
}

impl<S> FromRequestParts<AppState<S>> for ApiKey
where
  S: CensusStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_api_key(&parts.headers, state.config.api_key.as_deref())?;
    Ok(ApiKey)
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(key: Option<&'static str>) -> HeaderMap {
    let mut h = HeaderMap::new();
    if let Some(k) = key {
      h.insert(API_KEY_HEADER, HeaderValue::from_static(k));
    }
    h
  }

  #[test]
  fn no_configured_key_allows_everything() {
    assert!(verify_api_key(&headers(None), None).is_ok());
    assert!(verify_api_key(&headers(None), Some("")).is_ok());
  }

  #[test]
  fn matching_key_passes() {
    assert!(verify_api_key(&headers(Some("s3cret")), Some("s3cret")).is_ok());
  }

  #[test]
  fn missing_or_wrong_key_is_rejected() {
    assert!(matches!(
      verify_api_key(&headers(None), Some("s3cret")),
      Err(ApiError::Unauthorized)
    ));
    assert!(matches!(
      verify_api_key(&headers(Some("guess")), Some("s3cret")),
      Err(ApiError::Unauthorized)
    ));
  }
}
