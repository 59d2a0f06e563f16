//! Census records and the merge applied on every submission.
//!
//! A census is filled in page by page. Each page posts only its own answers,
//! so the stored payload is the accumulation of every submission for the
//! same `(school, year)`. The merge is shallow: a top-level key present in
//! the newer submission replaces the stored value wholesale, nested objects
//! included.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// The status value that triggers the finalize pipeline.
pub const COMPLETED: &str = "completed";

/// Free-form survey answers keyed by form field name.
pub type Answers = Map<String, Value>;

/// One school's survey answers for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensusRecord {
  pub id:         i64,
  pub school_id:  i64,
  pub year:       i32,
  pub status:     String,
  pub data:       Answers,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl CensusRecord {
  pub fn is_completed(&self) -> bool { is_completed(&self.status) }
}

/// Only the exact literal counts; any other value, including the empty
/// string, is still in progress.
pub fn is_completed(status: &str) -> bool { status == COMPLETED }

/// A partial submission for one `(school, year)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CensusSubmission {
  pub school_id: i64,
  pub year:      i32,
  pub status:    String,
  pub data:      Answers,
}

impl CensusSubmission {
  /// Build a submission from a decoded request body.
  ///
  /// `data` must be a JSON object; `null` is accepted as an empty delta.
  pub fn new(
    school_id: i64,
    year: i32,
    status: impl Into<String>,
    data: Value,
  ) -> Result<Self> {
    let data = match data {
      Value::Object(map) => map,
      Value::Null => Map::new(),
      Value::Bool(_) => return Err(Error::DataNotObject("a boolean")),
      Value::Number(_) => return Err(Error::DataNotObject("a number")),
      Value::String(_) => return Err(Error::DataNotObject("a string")),
      Value::Array(_) => return Err(Error::DataNotObject("an array")),
    };
    Ok(Self { school_id, year, status: status.into(), data })
  }
}

/// Merge `delta` into `stored`: keys in `delta` win, everything else is kept.
pub fn merge_answers(stored: &mut Answers, delta: Answers) {
  for (key, value) in delta {
    stored.insert(key, value);
  }
}
