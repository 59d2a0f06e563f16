//! The `CensusStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `censo-store-sqlite`).
//! Higher layers (`censo-server`) depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::{
  census::{CensusRecord, CensusSubmission},
  school::{School, SchoolProfile},
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the relational store holding schools and census records.
///
/// The school section is the registry (upsert by INEP code); the census
/// section owns the merge-upsert. Nothing is ever deleted.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CensusStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Schools ───────────────────────────────────────────────────────────

  /// Insert a school, or update every mutable field of the school already
  /// registered under the same INEP code. Returns the (stable) school id.
  fn upsert_school(
    &self,
    profile: SchoolProfile,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Retrieve a school by id. Returns `None` if not found.
  fn get_school(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<School>, Self::Error>> + Send + '_;

  /// Every registered school, ordered by name.
  fn list_schools(
    &self,
  ) -> impl Future<Output = Result<Vec<School>, Self::Error>> + Send + '_;

  // ── Census ────────────────────────────────────────────────────────────

  /// Merge a submission into the record for `(school_id, year)`, creating
  /// it on first write, and return the stored result.
  ///
  /// Top-level keys of the submission replace stored keys; all other stored
  /// keys survive. The status is always overwritten. Two writers racing on
  /// the same key resolve last-write-wins.
  fn upsert_census(
    &self,
    submission: CensusSubmission,
  ) -> impl Future<Output = Result<CensusRecord, Self::Error>> + Send + '_;

  /// Fetch the record for `(school_id, year)`. Returns `None` if no
  /// submission has been made yet.
  fn get_census(
    &self,
    school_id: i64,
    year: i32,
  ) -> impl Future<Output = Result<Option<CensusRecord>, Self::Error>> + Send + '_;
}
