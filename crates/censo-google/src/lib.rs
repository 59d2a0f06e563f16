//! Google Sheets and Google Drive collaborators for the census backend.
//!
//! [`SheetsClient`] appends finalized censuses to the census spreadsheet and
//! reads the locations reference sheet; [`DriveClient`] files school photos
//! into per-school folders. Both talk plain REST through [`reqwest`] and
//! share one [`GoogleClient`].

pub mod auth;
pub mod drive;
pub mod error;
pub mod sheets;

pub use drive::DriveClient;
pub use error::{Error, Result};
pub use sheets::SheetsClient;

use std::{path::PathBuf, sync::Arc, time::Duration};

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

use auth::{ServiceAccountKey, TokenSource};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Google settings, nested under `google` in the server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
  /// Fixed bearer token. Takes precedence over every other credential.
  pub access_token:             Option<String>,
  /// Service account key file contents, as downloaded from the console.
  pub credentials_json:         Option<String>,
  /// Path to a service account key file. Read when `credentials_json` is
  /// unset. With neither, tokens come from the metadata server.
  pub credentials_path:         Option<PathBuf>,
  /// Workspace user the service account acts as.
  pub impersonate_email:        Option<String>,
  pub census_spreadsheet_id:    Option<String>,
  /// A1 range the census rows are appended after.
  pub census_range:             String,
  pub locations_spreadsheet_id: Option<String>,
  /// A1 range holding `[region, _, school, municipality]` rows.
  pub locations_range:          String,
  /// Parent of every per-school photo folder.
  pub drive_root_folder_id:     Option<String>,
  /// Request timeout. No timeout unless set.
  pub timeout_secs:             Option<u64>,
  pub sheets_base_url:          String,
  pub drive_base_url:           String,
}

impl Default for GoogleConfig {
  fn default() -> Self {
    Self {
      access_token:             None,
      credentials_json:         None,
      credentials_path:         None,
      impersonate_email:        None,
      census_spreadsheet_id:    None,
      census_range:             "Base_dados!A:A".to_string(),
      locations_spreadsheet_id: None,
      locations_range:          "setores!B2:E".to_string(),
      drive_root_folder_id:     None,
      timeout_secs:             None,
      sheets_base_url:          "https://sheets.googleapis.com".to_string(),
      drive_base_url:           "https://www.googleapis.com".to_string(),
    }
  }
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Shared HTTP client, token source and configuration.
///
/// Cheap to clone; everything inside is `Arc`-based.
#[derive(Clone)]
pub struct GoogleClient {
  http:   Client,
  token:  Arc<TokenSource>,
  config: Arc<GoogleConfig>,
}

impl GoogleClient {
  pub fn new(config: GoogleConfig) -> Result<Self> {
    let token = token_source(&config)?;
    Self::with_token_source(config, token)
  }

  pub fn with_token_source(config: GoogleConfig, token: TokenSource) -> Result<Self> {
    let mut builder = Client::builder();
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(Self {
      http:   builder.build()?,
      token:  Arc::new(token),
      config: Arc::new(config),
    })
  }

  pub fn sheets(&self) -> SheetsClient { SheetsClient::new(self.clone()) }

  pub fn drive(&self) -> DriveClient { DriveClient::new(self.clone()) }

  pub fn config(&self) -> &GoogleConfig { &self.config }

  async fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder> {
    let token = self.token.token(&self.http).await?;
    Ok(req.bearer_auth(token))
  }

  fn url(base: &str, segments: &[&str]) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(base).map_err(|e| Error::Url(e.to_string()))?;
    url
      .path_segments_mut()
      .map_err(|_| Error::Url(format!("{base} cannot be a base")))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }
}

fn token_source(config: &GoogleConfig) -> Result<TokenSource> {
  if let Some(token) = config.access_token.as_ref().filter(|t| !t.is_empty()) {
    return Ok(TokenSource::Static(token.clone()));
  }

  let key_json = match (&config.credentials_json, &config.credentials_path) {
    (Some(json), _) if !json.is_empty() => Some(json.clone()),
    (_, Some(path)) => Some(std::fs::read_to_string(path).map_err(|e| {
      Error::Credentials(format!("reading {}: {e}", path.display()))
    })?),
    _ => None,
  };

  Ok(match key_json {
    Some(json) => {
      let key = ServiceAccountKey::from_json(&json)?;
      tracing::info!(
        client_email = %key.client_email,
        subject = config.impersonate_email.as_deref().unwrap_or("-"),
        "using service account credentials"
      );
      TokenSource::service_account(key, config.impersonate_email.clone())
    }
    None => TokenSource::metadata(),
  })
}

/// Turn a non-2xx response into [`Error::Status`], keeping the body for logs.
async fn check(resp: Response, context: &'static str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  Err(Error::Status { context, status, body })
}
