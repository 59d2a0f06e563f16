//! In-memory collaborators for router and workflow tests.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
  },
};

use async_trait::async_trait;
use bytes::Bytes;
use censo_core::{
  census::CensusRecord,
  locations::Locations,
  school::School,
  sink::{BoxError, ExportSink, LocationSource, PhotoSink, PhotoStaging, Staged, StagedPhoto},
};

/// Records every appended row; optionally fails every append.
#[derive(Default)]
pub struct RecordingExport {
  pub rows: Mutex<Vec<(School, CensusRecord)>>,
  pub fail: bool,
}

#[async_trait]
impl ExportSink for RecordingExport {
  async fn append(&self, school: &School, census: &CensusRecord) -> Result<(), BoxError> {
    if self.fail {
      return Err("spreadsheet unavailable".into());
    }
    self.rows.lock().unwrap().push((school.clone(), census.clone()));
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
  pub folder_id:    String,
  pub filename:     String,
  pub content_type: String,
  pub content:      Bytes,
}

/// Folders keyed by name; uploads appended in order.
#[derive(Default)]
pub struct MemoryPhotos {
  pub folders: Mutex<HashMap<String, String>>,
  pub uploads: Mutex<Vec<Upload>>,
  pub fail:    bool,
}

#[async_trait]
impl PhotoSink for MemoryPhotos {
  async fn find_or_create_folder(&self, name: &str) -> Result<String, BoxError> {
    let mut folders = self.folders.lock().unwrap();
    let next = format!("folder-{}", folders.len() + 1);
    Ok(folders.entry(name.to_string()).or_insert(next).clone())
  }

  async fn upload(
    &self,
    folder_id: &str,
    filename: &str,
    content_type: &str,
    content: Bytes,
  ) -> Result<String, BoxError> {
    if self.fail {
      return Err("storage unavailable".into());
    }
    let mut uploads = self.uploads.lock().unwrap();
    uploads.push(Upload {
      folder_id:    folder_id.to_string(),
      filename:     filename.to_string(),
      content_type: content_type.to_string(),
      content,
    });
    Ok(format!("https://photos.test/{}", uploads.len()))
  }
}

/// Staged photos with a counter as the stage token.
#[derive(Default)]
pub struct MemoryStaging {
  photos: Mutex<HashMap<i64, (u64, StagedPhoto)>>,
  next:   AtomicU64,
}

impl MemoryStaging {
  pub fn put(&self, school_id: i64, photo: StagedPhoto) {
    let token = self.next.fetch_add(1, Ordering::SeqCst);
    self.photos.lock().unwrap().insert(school_id, (token, photo));
  }

  pub fn staged(&self, school_id: i64) -> Option<StagedPhoto> {
    self.photos.lock().unwrap().get(&school_id).map(|(_, p)| p.clone())
  }
}

#[async_trait]
impl PhotoStaging for MemoryStaging {
  async fn stage(&self, school_id: i64, photo: StagedPhoto) -> Result<(), BoxError> {
    self.put(school_id, photo);
    Ok(())
  }

  async fn load(&self, school_id: i64) -> Result<Option<Staged>, BoxError> {
    Ok(self.photos.lock().unwrap().get(&school_id).map(|(token, photo)| Staged {
      token: token.to_string(),
      photo: photo.clone(),
    }))
  }

  async fn discard(&self, school_id: i64, token: &str) -> Result<bool, BoxError> {
    let mut photos = self.photos.lock().unwrap();
    match photos.get(&school_id) {
      Some((current, _)) if current.to_string() == token => {
        photos.remove(&school_id);
        Ok(true)
      }
      _ => Ok(false),
    }
  }
}

/// Serves a fixed location tree, or fails when `None`.
pub struct StaticLocations(pub Option<Locations>);

#[async_trait]
impl LocationSource for StaticLocations {
  async fn locations(&self) -> Result<Locations, BoxError> {
    self.0.clone().ok_or_else(|| "locations sheet unavailable".into())
  }
}

/// Every fake, shared with the state under test so assertions can inspect them.
#[derive(Clone)]
pub struct Fakes {
  pub export:    Arc<RecordingExport>,
  pub photos:    Arc<MemoryPhotos>,
  pub staging:   Arc<MemoryStaging>,
  pub locations: Arc<StaticLocations>,
}

impl Default for Fakes {
  fn default() -> Self {
    Self {
      export:    Arc::default(),
      photos:    Arc::default(),
      staging:   Arc::default(),
      locations: Arc::new(StaticLocations(Some(Locations::new()))),
    }
  }
}
