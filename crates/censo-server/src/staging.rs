//! Filesystem photo staging.
//!
//! Each school has at most two files in the staging directory:
//! `school-{id}.photo` with the raw bytes and `school-{id}.json` with the
//! filename and content type. Both are written to a temporary name first and
//! renamed into place; the sidecar goes last, so a photo is only visible
//! once it is complete. The sidecar also carries the stage token, and one
//! lock orders staging against discards so a replaced photo is never
//! removed by the relocation of its predecessor.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use async_trait::async_trait;
use bytes::Bytes;
use censo_core::sink::{BoxError, PhotoStaging, Staged, StagedPhoto};
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::Mutex};
use uuid::Uuid;

#[derive(Serialize, Deserialize)]
struct Sidecar {
  token:        String,
  filename:     String,
  content_type: String,
}

pub struct FsStaging {
  dir:  PathBuf,
  lock: Mutex<()>,
}

impl FsStaging {
  pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into(), lock: Mutex::new(()) } }

  fn photo_path(&self, school_id: i64) -> PathBuf { self.dir.join(format!("school-{school_id}.photo")) }

  fn sidecar_path(&self, school_id: i64) -> PathBuf { self.dir.join(format!("school-{school_id}.json")) }

  async fn read_sidecar(&self, school_id: i64) -> Result<Option<Sidecar>, BoxError> {
    match read_optional(&self.sidecar_path(school_id)).await? {
      Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
      None => Ok(None),
    }
  }

  async fn write_atomic(&self, path: &Path, content: &[u8]) -> std::io::Result<()> {
    let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4().simple()));
    fs::write(&tmp, content).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
      let _ = fs::remove_file(&tmp).await;
      return Err(e);
    }
    Ok(())
  }
}

/// Treat a missing file as absent rather than an error.
async fn read_optional(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
  match fs::read(path).await {
    Ok(bytes) => Ok(Some(bytes)),
    Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
    Err(e) => Err(e),
  }
}

async fn remove_optional(path: &Path) -> std::io::Result<()> {
  match fs::remove_file(path).await {
    Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
    _ => Ok(()),
  }
}

#[async_trait]
impl PhotoStaging for FsStaging {
  async fn stage(&self, school_id: i64, photo: StagedPhoto) -> Result<(), BoxError> {
    let _guard = self.lock.lock().await;
    fs::create_dir_all(&self.dir).await?;

    let sidecar = serde_json::to_vec(&Sidecar {
      token:        Uuid::new_v4().to_string(),
      filename:     photo.filename,
      content_type: photo.content_type,
    })?;
    // Hide any previous photo while the new bytes land.
    remove_optional(&self.sidecar_path(school_id)).await?;
    self.write_atomic(&self.photo_path(school_id), &photo.content).await?;
    self.write_atomic(&self.sidecar_path(school_id), &sidecar).await?;
    Ok(())
  }

  async fn load(&self, school_id: i64) -> Result<Option<Staged>, BoxError> {
    let _guard = self.lock.lock().await;
    let Some(sidecar) = self.read_sidecar(school_id).await? else {
      return Ok(None);
    };
    let Some(content) = read_optional(&self.photo_path(school_id)).await? else {
      return Ok(None);
    };

    Ok(Some(Staged {
      token: sidecar.token,
      photo: StagedPhoto {
        filename:     sidecar.filename,
        content_type: sidecar.content_type,
        content:      Bytes::from(content),
      },
    }))
  }

  async fn discard(&self, school_id: i64, token: &str) -> Result<bool, BoxError> {
    let _guard = self.lock.lock().await;
    match self.read_sidecar(school_id).await? {
      Some(sidecar) if sidecar.token == token => {}
      _ => return Ok(false),
    }
    remove_optional(&self.sidecar_path(school_id)).await?;
    remove_optional(&self.photo_path(school_id)).await?;
    Ok(true)
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  fn photo(content: &'static [u8]) -> StagedPhoto {
    StagedPhoto {
      filename:     "fachada.jpg".into(),
      content_type: "image/jpeg".into(),
      content:      Bytes::from_static(content),
    }
  }

  #[tokio::test]
  async fn stage_then_load() {
    let dir = TempDir::new().unwrap();
    let staging = FsStaging::new(dir.path().join("staging"));

    staging.stage(7, photo(b"JPEG")).await.unwrap();

    assert_eq!(staging.load(7).await.unwrap().unwrap().photo, photo(b"JPEG"));
    assert_eq!(staging.load(8).await.unwrap(), None);
  }

  #[tokio::test]
  async fn restaging_replaces_previous_photo() {
    let dir = TempDir::new().unwrap();
    let staging = FsStaging::new(dir.path());

    staging.stage(7, photo(b"old")).await.unwrap();
    staging.stage(7, photo(b"new")).await.unwrap();

    let staged = staging.load(7).await.unwrap().unwrap();
    assert_eq!(staged.photo.content, Bytes::from_static(b"new"));
  }

  #[tokio::test]
  async fn zero_byte_photo_is_kept_as_is() {
    let dir = TempDir::new().unwrap();
    let staging = FsStaging::new(dir.path());

    staging.stage(7, photo(b"")).await.unwrap();

    let loaded = staging.load(7).await.unwrap().unwrap();
    assert!(loaded.photo.content.is_empty());
  }

  #[tokio::test]
  async fn discard_removes_both_files_once() {
    let dir = TempDir::new().unwrap();
    let staging = FsStaging::new(dir.path());

    staging.stage(7, photo(b"JPEG")).await.unwrap();
    let token = staging.load(7).await.unwrap().unwrap().token;

    assert!(staging.discard(7, &token).await.unwrap());
    assert!(!staging.discard(7, &token).await.unwrap());

    assert_eq!(staging.load(7).await.unwrap(), None);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
  }

  #[tokio::test]
  async fn discard_with_stale_token_keeps_newer_photo() {
    let dir = TempDir::new().unwrap();
    let staging = FsStaging::new(dir.path());

    staging.stage(7, photo(b"old")).await.unwrap();
    let old = staging.load(7).await.unwrap().unwrap();
    staging.stage(7, photo(b"new")).await.unwrap();

    assert!(!staging.discard(7, &old.token).await.unwrap());

    let current = staging.load(7).await.unwrap().unwrap();
    assert_ne!(current.token, old.token);
    assert_eq!(current.photo.content, Bytes::from_static(b"new"));
  }
}
