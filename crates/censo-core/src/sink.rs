//! Collaborators outside the relational store.
//!
//! The spreadsheet, the object storage, the photo staging area and the
//! locations sheet are all reached through these traits so the finalize
//! workflow can run against fakes. They are object-safe (via
//! [`async_trait`]) and are held as `Arc<dyn ...>`.

use async_trait::async_trait;
use bytes::Bytes;

use crate::{census::CensusRecord, locations::Locations, school::School};

/// Error type returned by every collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Append-only tabular destination for completed censuses.
#[async_trait]
pub trait ExportSink: Send + Sync {
  /// Append one row built from `school` and `census`. Never deduplicates.
  async fn append(&self, school: &School, census: &CensusRecord) -> Result<(), BoxError>;
}

/// Object storage organised in folders below a configured root.
#[async_trait]
pub trait PhotoSink: Send + Sync {
  /// Return the id of the folder named exactly `name`, creating it if absent.
  async fn find_or_create_folder(&self, name: &str) -> Result<String, BoxError>;

  /// Store a new object in `folder_id` and return a viewable link.
  async fn upload(
    &self,
    folder_id: &str,
    filename: &str,
    content_type: &str,
    content: Bytes,
  ) -> Result<String, BoxError>;
}

/// A photo uploaded ahead of the census it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedPhoto {
  pub filename:     String,
  pub content_type: String,
  pub content:      Bytes,
}

/// A photo read back from staging, with the token of the stage it came from.
///
/// Every call to [`PhotoStaging::stage`] mints a new token, so a token tells
/// apart a photo that was replaced after it was loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Staged {
  pub token: String,
  pub photo: StagedPhoto,
}

/// Holding area for photos, keyed by school id. At most one photo per school;
/// staging again replaces the previous one.
#[async_trait]
pub trait PhotoStaging: Send + Sync {
  async fn stage(&self, school_id: i64, photo: StagedPhoto) -> Result<(), BoxError>;

  /// Returns `None` when nothing is staged for the school.
  async fn load(&self, school_id: i64) -> Result<Option<Staged>, BoxError>;

  /// Remove the school's photo if it is still the stage `token` names.
  /// Returns `false`, leaving staging untouched, when it was replaced or is
  /// already gone.
  async fn discard(&self, school_id: i64, token: &str) -> Result<bool, BoxError>;
}

/// Read-only reference data: which schools exist where.
#[async_trait]
pub trait LocationSource: Send + Sync {
  async fn locations(&self) -> Result<Locations, BoxError>;
}
