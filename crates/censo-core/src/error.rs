//! Error types for `censo-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(String),

  #[error("school not found: {0}")]
  SchoolNotFound(i64),

  #[error("census data must be a JSON object, got {0}")]
  DataNotObject(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
