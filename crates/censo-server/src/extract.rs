//! `Json` and `Query` extractors whose rejections render as [`ApiError`].
//!
//! axum's own rejections answer 415/422 with a plain-text body carrying the
//! serde message. Every malformed request here is a 400 with the usual
//! `{ "error": ... }` body instead.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);
