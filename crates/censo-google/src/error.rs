//! Error type for `censo-google`.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{context} → {status}: {body}")]
  Status {
    context: &'static str,
    status:  StatusCode,
    body:    String,
  },

  #[error("{0} is not configured")]
  NotConfigured(&'static str),

  #[error("invalid service account credentials: {0}")]
  Credentials(String),

  #[error("access token error: {0}")]
  Token(String),

  #[error("invalid url: {0}")]
  Url(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
