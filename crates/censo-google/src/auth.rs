//! Bearer tokens for the Google APIs.
//!
//! Three sources: a fixed token handed in through configuration, a service
//! account key exchanged for tokens through a signed JWT assertion, or the
//! instance metadata server. The last two are cached until shortly before
//! they expire.

use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{Error, Result};

const METADATA_TOKEN_URL: &str =
  "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Drive for the photo folders, Sheets for the export and the locations.
pub const SCOPES: &str =
  "https://www.googleapis.com/auth/drive https://www.googleapis.com/auth/spreadsheets";

/// Lifetime requested for each signed assertion. Google caps it at one hour.
const ASSERTION_LIFETIME: i64 = 3600;

/// Refresh this long before the reported expiry.
const EXPIRY_SLACK: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct AccessToken {
  access_token: String,
  expires_in:   u64,
}

struct CachedToken {
  value:      String,
  expires_at: Instant,
}

// ─── Service account ──────────────────────────────────────────────────────────

/// The fields of a downloaded service account key file that token exchange
/// needs. Other fields in the file are ignored.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
  pub client_email:   String,
  /// PEM-encoded RSA private key.
  pub private_key:    String,
  #[serde(default)]
  pub private_key_id: Option<String>,
  #[serde(default = "default_token_uri")]
  pub token_uri:      String,
}

fn default_token_uri() -> String { DEFAULT_TOKEN_URI.to_string() }

impl ServiceAccountKey {
  pub fn from_json(json: &str) -> Result<Self> {
    serde_json::from_str(json).map_err(|e| Error::Credentials(e.to_string()))
  }
}

impl std::fmt::Debug for ServiceAccountKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ServiceAccountKey")
      .field("client_email", &self.client_email)
      .field("token_uri", &self.token_uri)
      .finish_non_exhaustive()
  }
}

/// Claims of the JWT assertion sent to the token endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
  pub iss:   String,
  pub scope: String,
  pub aud:   String,
  pub iat:   i64,
  pub exp:   i64,
  /// User to impersonate through domain-wide delegation.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sub:   Option<String>,
}

/// Sign the assertion for `key`, issued at `now` (unix seconds).
pub(crate) fn assertion(key: &ServiceAccountKey, subject: Option<&str>, now: i64) -> Result<String> {
  let mut header = Header::new(Algorithm::RS256);
  header.kid = key.private_key_id.clone();

  let claims = Claims {
    iss:   key.client_email.clone(),
    scope: SCOPES.to_string(),
    aud:   key.token_uri.clone(),
    iat:   now,
    exp:   now + ASSERTION_LIFETIME,
    sub:   subject.map(str::to_string),
  };

  let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
    .map_err(|e| Error::Credentials(format!("private_key: {e}")))?;
  jsonwebtoken::encode(&header, &claims, &signing_key)
    .map_err(|e| Error::Credentials(format!("signing assertion: {e}")))
}

// ─── Token source ─────────────────────────────────────────────────────────────

enum Provider {
  Metadata { url: String },
  ServiceAccount {
    key:     ServiceAccountKey,
    subject: Option<String>,
  },
}

pub enum TokenSource {
  Static(String),
  Refreshing(Refreshing),
}

/// A provider and the last token it handed out.
pub struct Refreshing {
  provider: Provider,
  cache:    Mutex<Option<CachedToken>>,
}

impl TokenSource {
  pub fn metadata() -> Self { Self::metadata_at(METADATA_TOKEN_URL) }

  pub fn metadata_at(url: impl Into<String>) -> Self {
    Self::refreshing(Provider::Metadata { url: url.into() })
  }

  /// Tokens for `key`, acting as `subject` when one is given.
  pub fn service_account(key: ServiceAccountKey, subject: Option<String>) -> Self {
    let subject = subject.filter(|s| !s.is_empty());
    Self::refreshing(Provider::ServiceAccount { key, subject })
  }

  fn refreshing(provider: Provider) -> Self {
    Self::Refreshing(Refreshing { provider, cache: Mutex::new(None) })
  }

  /// Return a token valid for at least [`EXPIRY_SLACK`].
  pub async fn token(&self, http: &reqwest::Client) -> Result<String> {
    let (provider, cache) = match self {
      Self::Static(token) => return Ok(token.clone()),
      Self::Refreshing(Refreshing { provider, cache }) => (provider, cache),
    };

    let mut cached = cache.lock().await;
    if let Some(t) = cached.as_ref()
      && t.expires_at > Instant::now()
    {
      return Ok(t.value.clone());
    }

    let fresh = provider.fetch(http).await?;

    let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(EXPIRY_SLACK);
    tracing::debug!(expires_in = fresh.expires_in, "refreshed google access token");
    *cached = Some(CachedToken {
      value:      fresh.access_token.clone(),
      expires_at: Instant::now() + lifetime,
    });
    Ok(fresh.access_token)
  }
}

impl Provider {
  async fn fetch(&self, http: &reqwest::Client) -> Result<AccessToken> {
    let (resp, context) = match self {
      Provider::Metadata { url } => {
        let resp = http
          .get(url)
          .header("Metadata-Flavor", "Google")
          .send()
          .await?;
        (resp, "metadata server")
      }
      Provider::ServiceAccount { key, subject } => {
        let jwt = assertion(key, subject.as_deref(), Utc::now().timestamp())?;
        let resp = http
          .post(&key.token_uri)
          .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", jwt.as_str())])
          .send()
          .await?;
        (resp, "token endpoint")
      }
    };

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(Error::Token(format!("{context} → {status}: {body}")));
    }
    Ok(resp.json().await?)
  }
}

#[cfg(test)]
mod tests {
  use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
  };

  use axum::{Form, Json, Router, extract::State, http::StatusCode, routing::post};
  use jsonwebtoken::{DecodingKey, Validation};
  use serde_json::json;

  use super::*;

  const PRIVATE_KEY: &str = include_str!("../testdata/service-account-key.pem");
  const PUBLIC_KEY: &str = include_str!("../testdata/service-account-key.pub.pem");

  type Exchanges = Arc<StdMutex<Vec<Claims>>>;

  fn key(token_uri: &str) -> ServiceAccountKey {
    ServiceAccountKey {
      client_email:   "censo@project.iam.gserviceaccount.com".into(),
      private_key:    PRIVATE_KEY.into(),
      private_key_id: Some("key-1".into()),
      token_uri:      token_uri.into(),
    }
  }

  fn verify(jwt: &str, audience: &str) -> Claims {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[audience]);
    jsonwebtoken::decode::<Claims>(
      jwt,
      &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
      &validation,
    )
    .unwrap()
    .claims
  }

  /// A token endpoint that checks the assertion signature and records its
  /// claims.
  async fn fake_token_endpoint() -> (String, Exchanges) {
    let exchanges: Exchanges = Arc::default();

    let app = Router::new()
      .route(
        "/token",
        post(
          |State(log): State<(String, Exchanges)>, Form(form): Form<HashMap<String, String>>| async move {
            if form.get("grant_type").map(String::as_str) != Some(JWT_BEARER_GRANT) {
              return (StatusCode::BAD_REQUEST, Json(json!({ "error": "unsupported_grant_type" })));
            }
            let claims = verify(&form["assertion"], &log.0);
            log.1.lock().unwrap().push(claims);
            (
              StatusCode::OK,
              Json(json!({ "access_token": "sa-token", "expires_in": 3600, "token_type": "Bearer" })),
            )
          },
        ),
      );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let token_uri = format!("http://{}/token", listener.local_addr().unwrap());
    let app = app.with_state((token_uri.clone(), exchanges.clone()));
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (token_uri, exchanges)
  }

  #[test]
  fn assertion_carries_scopes_and_subject() {
    let key = key("https://oauth2.googleapis.com/token");
    let jwt = assertion(&key, Some("secretaria@escola.gov.br"), Utc::now().timestamp()).unwrap();

    let header = jsonwebtoken::decode_header(&jwt).unwrap();
    assert_eq!(header.alg, Algorithm::RS256);
    assert_eq!(header.kid.as_deref(), Some("key-1"));

    let claims = verify(&jwt, "https://oauth2.googleapis.com/token");
    assert_eq!(claims.iss, "censo@project.iam.gserviceaccount.com");
    assert_eq!(claims.scope, SCOPES);
    assert_eq!(claims.sub.as_deref(), Some("secretaria@escola.gov.br"));
    assert_eq!(claims.exp - claims.iat, ASSERTION_LIFETIME);
  }

  #[test]
  fn key_file_defaults_token_uri() {
    let key = ServiceAccountKey::from_json(
      &json!({
        "type": "service_account",
        "client_email": "censo@project.iam.gserviceaccount.com",
        "private_key": PRIVATE_KEY,
      })
      .to_string(),
    )
    .unwrap();
    assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
    assert!(ServiceAccountKey::from_json("{}").is_err());
  }

  #[test]
  fn bad_private_key_is_a_credentials_error() {
    let mut key = key(DEFAULT_TOKEN_URI);
    key.private_key = "not a key".into();
    assert!(matches!(assertion(&key, None, 0), Err(Error::Credentials(_))));
  }

  #[tokio::test]
  async fn service_account_token_is_exchanged_once_and_cached() {
    let (token_uri, exchanges) = fake_token_endpoint().await;
    let source = TokenSource::service_account(key(&token_uri), Some(String::new()));
    let http = reqwest::Client::new();

    assert_eq!(source.token(&http).await.unwrap(), "sa-token");
    assert_eq!(source.token(&http).await.unwrap(), "sa-token");

    let exchanges = exchanges.lock().unwrap();
    assert_eq!(exchanges.len(), 1);
    assert_eq!(exchanges[0].aud, token_uri);
    assert_eq!(exchanges[0].sub, None);
  }

  #[tokio::test]
  async fn rejected_exchange_is_a_token_error() {
    let (token_uri, _) = fake_token_endpoint().await;
    let source = TokenSource::service_account(key(&format!("{token_uri}/missing")), None);

    let err = source.token(&reqwest::Client::new()).await.unwrap_err();
    assert!(matches!(err, Error::Token(_)));
  }
}
