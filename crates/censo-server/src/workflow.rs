//! Merge/finalize workflow.
//!
//! Every census submission is merged into the stored record. When the
//! merged status is `"completed"` two detached tasks start: one appends the
//! census to the export sink, the other moves the school's staged photo into
//! its folder in photo storage. The response does not wait for them and
//! failures are only logged. The merge has already committed by then.
//!
//! Relocations for one school run one at a time, so back-to-back
//! completions upload a staged photo once: the second task finds it already
//! discarded. A photo staged again while its predecessor is uploading
//! survives the discard and waits for the next completion.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex as StdMutex},
};

use censo_core::{
  census::{CensusRecord, CensusSubmission},
  folder::photo_folder_name,
  sink::{ExportSink, PhotoSink, PhotoStaging, Staged},
  store::CensusStore,
};
use tokio::{sync::Mutex, task::JoinHandle};

use crate::error::ApiError;

pub struct Workflow<S> {
  store:       Arc<S>,
  export:      Arc<dyn ExportSink>,
  photos:      Arc<dyn PhotoSink>,
  staging:     Arc<dyn PhotoStaging>,
  relocations: RelocationLocks,
}

/// One lock per school, created on first use.
#[derive(Default)]
struct RelocationLocks(StdMutex<HashMap<i64, Arc<Mutex<()>>>>);

impl RelocationLocks {
  fn for_school(&self, school_id: i64) -> Arc<Mutex<()>> {
    let mut locks = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    locks.entry(school_id).or_default().clone()
  }
}

/// Result of a submission: the stored record, and the background tasks when
/// the submission completed the census.
pub struct Submitted {
  pub record:     CensusRecord,
  pub finalizing: Option<Finalizing>,
}

/// Handles of the two finalize tasks. Dropping them detaches the tasks.
pub struct Finalizing {
  pub export: JoinHandle<()>,
  pub photo:  JoinHandle<()>,
}

#[cfg(test)]
impl Finalizing {
  /// Wait for both tasks, failing the test if either panicked.
  pub(crate) async fn join(self) {
    let (export, photo) = tokio::join!(self.export, self.photo);
    export.unwrap();
    photo.unwrap();
  }
}

impl<S> Workflow<S>
where
  S: CensusStore + 'static,
{
  pub fn new(
    store: Arc<S>,
    export: Arc<dyn ExportSink>,
    photos: Arc<dyn PhotoSink>,
    staging: Arc<dyn PhotoStaging>,
  ) -> Self {
    Self { store, export, photos, staging, relocations: RelocationLocks::default() }
  }

  /// Merge `submission` into the stored census and, if the merged status is
  /// `"completed"`, start finalizing it.
  pub async fn submit(&self, submission: CensusSubmission) -> Result<Submitted, ApiError> {
    let school_id = submission.school_id;
    self
      .store
      .get_school(school_id)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?
      .ok_or_else(|| ApiError::NotFound(format!("school {school_id} not found")))?;

    let record = self
      .store
      .upsert_census(submission)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?;

    let finalizing = record.is_completed().then(|| self.finalize(&record));
    Ok(Submitted { record, finalizing })
  }

  /// Spawn the export and photo tasks for a completed census.
  pub fn finalize(&self, census: &CensusRecord) -> Finalizing {
    tracing::info!(school_id = census.school_id, year = census.year, "census completed, finalizing");

    let export = tokio::spawn(export_census(
      self.store.clone(),
      self.export.clone(),
      census.clone(),
    ));
    let photo = tokio::spawn(relocate_photo(
      self.store.clone(),
      self.photos.clone(),
      self.staging.clone(),
      self.relocations.for_school(census.school_id),
      census.school_id,
    ));
    Finalizing { export, photo }
  }
}

// ─── Export ───────────────────────────────────────────────────────────────────

async fn export_census<S: CensusStore>(store: Arc<S>, sink: Arc<dyn ExportSink>, census: CensusRecord) {
  let school = match store.get_school(census.school_id).await {
    Ok(Some(school)) => school,
    Ok(None) => {
      tracing::warn!(school_id = census.school_id, "school vanished before export");
      return;
    }
    Err(e) => {
      tracing::error!(school_id = census.school_id, error = %e, "export: school lookup failed");
      return;
    }
  };

  match sink.append(&school, &census).await {
    Ok(()) => tracing::info!(school_id = school.id, year = census.year, "census exported"),
    Err(e) => tracing::error!(school_id = school.id, error = %e, "census export failed"),
  }
}

// ─── Photo relocation ─────────────────────────────────────────────────────────

async fn relocate_photo<S: CensusStore>(
  store: Arc<S>,
  photos: Arc<dyn PhotoSink>,
  staging: Arc<dyn PhotoStaging>,
  lock: Arc<Mutex<()>>,
  school_id: i64,
) {
  let _guard = lock.lock().await;

  let Staged { token, photo } = match staging.load(school_id).await {
    Ok(Some(staged)) => staged,
    Ok(None) => {
      tracing::debug!(school_id, "no staged photo");
      return;
    }
    Err(e) => {
      tracing::error!(school_id, error = %e, "reading staged photo failed");
      return;
    }
  };

  if photo.content.is_empty() {
    tracing::warn!(school_id, filename = %photo.filename, "staged photo is empty, not uploading");
    return;
  }

  let school = match store.get_school(school_id).await {
    Ok(Some(school)) => school,
    Ok(None) => {
      tracing::warn!(school_id, "school vanished before photo upload");
      return;
    }
    Err(e) => {
      tracing::error!(school_id, error = %e, "photo: school lookup failed");
      return;
    }
  };

  let folder_name = photo_folder_name(&school);
  let folder_id = match photos.find_or_create_folder(&folder_name).await {
    Ok(id) => id,
    Err(e) => {
      tracing::error!(school_id, folder = %folder_name, error = %e, "photo folder lookup failed");
      return;
    }
  };

  let link = match photos
    .upload(&folder_id, &photo.filename, &photo.content_type, photo.content)
    .await
  {
    Ok(link) => link,
    Err(e) => {
      tracing::error!(school_id, error = %e, "photo upload failed");
      return;
    }
  };
  tracing::info!(school_id, %link, "photo uploaded");

  match staging.discard(school_id, &token).await {
    Ok(true) => {}
    Ok(false) => tracing::info!(school_id, "photo was restaged during upload, keeping the newer one"),
    Err(e) => tracing::error!(school_id, error = %e, "discarding staged photo failed"),
  }
}
