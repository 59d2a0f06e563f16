//! Google Drive: per-school photo folders below a configured root.

use async_trait::async_trait;
use bytes::Bytes;
use censo_core::sink::{BoxError, PhotoSink};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{check, Error, GoogleClient, Result};

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

#[derive(Clone)]
pub struct DriveClient {
  google: GoogleClient,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
  id:            String,
  #[serde(default)]
  web_view_link: Option<String>,
}

#[derive(Deserialize)]
struct FileList {
  #[serde(default)]
  files: Vec<DriveFile>,
}

impl DriveClient {
  pub fn new(google: GoogleClient) -> Self { Self { google } }

  fn root_folder(&self) -> Result<&str> {
    self
      .google
      .config()
      .drive_root_folder_id
      .as_deref()
      .ok_or(Error::NotConfigured("drive_root_folder_id"))
  }

  async fn find_folder(&self, root: &str, name: &str) -> Result<Option<String>> {
    let mut url = GoogleClient::url(&self.google.config().drive_base_url, &["drive", "v3", "files"])?;
    url
      .query_pairs_mut()
      .append_pair("q", &folder_query(root, name))
      .append_pair("fields", "files(id, name)")
      .append_pair("supportsAllDrives", "true")
      .append_pair("includeItemsFromAllDrives", "true");

    let req = self.google.authorized(self.google.http.get(url)).await?;
    let resp = check(req.send().await?, "drive folder lookup").await?;
    let list: FileList = resp.json().await?;
    Ok(list.files.into_iter().next().map(|f| f.id))
  }

  async fn create_folder(&self, root: &str, name: &str) -> Result<String> {
    let mut url = GoogleClient::url(&self.google.config().drive_base_url, &["drive", "v3", "files"])?;
    url
      .query_pairs_mut()
      .append_pair("fields", "id")
      .append_pair("supportsAllDrives", "true");

    let body = json!({ "name": name, "parents": [root], "mimeType": FOLDER_MIME });
    let req = self
      .google
      .authorized(self.google.http.post(url).json(&body))
      .await?;
    let resp = check(req.send().await?, "drive folder create").await?;
    let folder: DriveFile = resp.json().await?;
    Ok(folder.id)
  }
}

/// Drive query matching a non-trashed folder named exactly `name` in `root`.
fn folder_query(root: &str, name: &str) -> String {
  format!(
    "name = '{}' and '{}' in parents and mimeType = '{FOLDER_MIME}' and trashed = false",
    escape_query(name),
    escape_query(root),
  )
}

fn escape_query(s: &str) -> String { s.replace('\\', "\\\\").replace('\'', "\\'") }

/// A `multipart/related` body: JSON metadata part, then the media part.
fn related_body(boundary: &str, metadata: &serde_json::Value, content_type: &str, content: &[u8]) -> Vec<u8> {
  let mut body = Vec::with_capacity(content.len() + 512);
  body.extend_from_slice(
    format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n").as_bytes(),
  );
  body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes());
  body.extend_from_slice(content);
  body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
  body
}

#[async_trait]
impl PhotoSink for DriveClient {
  async fn find_or_create_folder(&self, name: &str) -> Result<String, BoxError> {
    let root = self.root_folder()?;

    if let Some(id) = self.find_folder(root, name).await? {
      tracing::info!(folder = name, %id, "reusing drive folder");
      return Ok(id);
    }

    let id = self.create_folder(root, name).await?;
    tracing::info!(folder = name, %id, "created drive folder");
    Ok(id)
  }

  async fn upload(
    &self,
    folder_id: &str,
    filename: &str,
    content_type: &str,
    content: Bytes,
  ) -> Result<String, BoxError> {
    let mut url = GoogleClient::url(
      &self.google.config().drive_base_url,
      &["upload", "drive", "v3", "files"],
    )?;
    url
      .query_pairs_mut()
      .append_pair("uploadType", "multipart")
      .append_pair("fields", "id, webViewLink")
      .append_pair("supportsAllDrives", "true");

    let boundary = format!("censo-{}", Uuid::new_v4().simple());
    let metadata = json!({ "name": filename, "parents": [folder_id], "mimeType": content_type });
    let body = related_body(&boundary, &metadata, content_type, &content);

    let req = self
      .google
      .authorized(
        self
          .google
          .http
          .post(url)
          .header(
            reqwest::header::CONTENT_TYPE,
            format!("multipart/related; boundary={boundary}"),
          )
          .body(body),
      )
      .await?;
    let resp = check(req.send().await?, "drive upload").await?;
    let file: DriveFile = resp.json().await?;

    tracing::info!(id = %file.id, folder_id, "uploaded photo to drive");
    Ok(
      file
        .web_view_link
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", file.id)),
    )
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
  };
  use serde_json::Value;
  use std::collections::HashMap;

  use super::*;
  use crate::{GoogleConfig, auth::TokenSource};

  #[derive(Default)]
  struct FakeDrive {
    folders: Mutex<Vec<(String, String)>>,
    uploads: Mutex<Vec<Vec<u8>>>,
  }

  /// Serves folder lookup/creation and uploads on an ephemeral local port.
  /// Lookup matches on the quoted name inside the `q` parameter.
  async fn fake_drive() -> (String, Arc<FakeDrive>) {
    let drive = Arc::new(FakeDrive::default());

    let app = Router::new()
      .route(
        "/drive/v3/files",
        get(
          |State(d): State<Arc<FakeDrive>>, Query(q): Query<HashMap<String, String>>| async move {
            let query = q.get("q").cloned().unwrap_or_default();
            let files: Vec<Value> = d
              .folders
              .lock()
              .unwrap()
              .iter()
              .filter(|(name, _)| query.contains(&format!("name = '{name}'")))
              .map(|(name, id)| json!({ "id": id, "name": name }))
              .collect();
            Json(json!({ "files": files }))
          },
        )
        .post(|State(d): State<Arc<FakeDrive>>, Json(body): Json<Value>| async move {
          let mut folders = d.folders.lock().unwrap();
          let id = format!("folder-{}", folders.len() + 1);
          folders.push((body["name"].as_str().unwrap_or_default().to_string(), id.clone()));
          Json(json!({ "id": id }))
        }),
      )
      .route(
        "/upload/drive/v3/files",
        post(|State(d): State<Arc<FakeDrive>>, body: axum::body::Bytes| async move {
          let mut uploads = d.uploads.lock().unwrap();
          uploads.push(body.to_vec());
          Json(json!({ "id": format!("file-{}", uploads.len()) }))
        }),
      )
      .with_state(drive.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (format!("http://{addr}"), drive)
  }

  fn client(base: &str) -> DriveClient {
    let config = GoogleConfig {
      drive_root_folder_id: Some("root".into()),
      drive_base_url: base.into(),
      ..Default::default()
    };
    GoogleClient::with_token_source(config, TokenSource::Static("t".into()))
      .unwrap()
      .drive()
  }

  #[test]
  fn query_escapes_quotes() {
    assert_eq!(
      folder_query("root", "O'Neil"),
      "name = 'O\\'Neil' and 'root' in parents and \
       mimeType = 'application/vnd.google-apps.folder' and trashed = false"
    );
  }

  #[test]
  fn related_body_layout() {
    let body = related_body("b", &json!({ "name": "x.jpg" }), "image/jpeg", b"JPEG");
    let text = String::from_utf8(body).unwrap();
    assert!(text.starts_with("--b\r\nContent-Type: application/json"));
    assert!(text.contains("{\"name\":\"x.jpg\"}"));
    assert!(text.contains("Content-Type: image/jpeg\r\n\r\nJPEG\r\n--b--\r\n"));
  }

  #[tokio::test]
  async fn same_folder_name_is_reused() {
    let (base, fake) = fake_drive().await;
    let drive = client(&base);

    let first = drive.find_or_create_folder("Escola A - DRE - Ana").await.unwrap();
    let second = drive.find_or_create_folder("Escola A - DRE - Ana").await.unwrap();
    let other = drive.find_or_create_folder("Escola B - DRE - Bia").await.unwrap();

    assert_eq!(first, second);
    assert_ne!(first, other);
    assert_eq!(fake.folders.lock().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn upload_falls_back_to_constructed_link() {
    let (base, fake) = fake_drive().await;
    let link = client(&base)
      .upload("folder-1", "fachada.jpg", "image/jpeg", Bytes::from_static(b"JPEG"))
      .await
      .unwrap();

    assert_eq!(link, "https://drive.google.com/file/d/file-1/view");
    assert_eq!(fake.uploads.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn missing_root_folder_is_an_error() {
    let drive = GoogleClient::with_token_source(GoogleConfig::default(), TokenSource::Static("t".into()))
      .unwrap()
      .drive();
    let err = drive.find_or_create_folder("x").await.unwrap_err();
    assert!(err.to_string().contains("drive_root_folder_id"));
  }
}
