//! Google Sheets: census export and the locations reference sheet.

use async_trait::async_trait;
use censo_core::{
  census::CensusRecord,
  export::census_row,
  locations::{build_locations, Locations},
  school::School,
  sink::{BoxError, ExportSink, LocationSource},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{check, Error, GoogleClient, Result};

#[derive(Clone)]
pub struct SheetsClient {
  google: GoogleClient,
}

#[derive(Deserialize)]
struct ValueRange {
  #[serde(default)]
  values: Vec<Vec<Value>>,
}

impl SheetsClient {
  pub fn new(google: GoogleClient) -> Self { Self { google } }

  /// Append `row` after the last row of `range`. Cells are sent as
  /// `USER_ENTERED`, so numbers and dates are parsed by the sheet.
  pub async fn append_row(&self, spreadsheet_id: &str, range: &str, row: Vec<String>) -> Result<()> {
    let cfg = self.google.config();
    let target = format!("{range}:append");
    let mut url = GoogleClient::url(
      &cfg.sheets_base_url,
      &["v4", "spreadsheets", spreadsheet_id, "values", target.as_str()],
    )?;
    url
      .query_pairs_mut()
      .append_pair("valueInputOption", "USER_ENTERED")
      .append_pair("insertDataOption", "INSERT_ROWS");

    let req = self
      .google
      .authorized(self.google.http.post(url).json(&json!({ "values": [row] })))
      .await?;
    check(req.send().await?, "sheets append").await?;
    Ok(())
  }

  /// Read `range` as rows of display strings.
  pub async fn read_rows(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>> {
    let cfg = self.google.config();
    let url = GoogleClient::url(
      &cfg.sheets_base_url,
      &["v4", "spreadsheets", spreadsheet_id, "values", range],
    )?;

    let req = self.google.authorized(self.google.http.get(url)).await?;
    let resp = check(req.send().await?, "sheets read").await?;
    let body: ValueRange = resp.json().await?;

    Ok(
      body
        .values
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect(),
    )
  }
}

fn cell_text(v: Value) -> String {
  match v {
    Value::String(s) => s,
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

#[async_trait]
impl ExportSink for SheetsClient {
  async fn append(&self, school: &School, census: &CensusRecord) -> Result<(), BoxError> {
    let cfg = self.google.config();
    let spreadsheet_id = cfg
      .census_spreadsheet_id
      .as_deref()
      .ok_or(Error::NotConfigured("census_spreadsheet_id"))?;

    self
      .append_row(spreadsheet_id, &cfg.census_range, census_row(school, census))
      .await?;
    Ok(())
  }
}

#[async_trait]
impl LocationSource for SheetsClient {
  async fn locations(&self) -> Result<Locations, BoxError> {
    let cfg = self.google.config();
    let spreadsheet_id = cfg
      .locations_spreadsheet_id
      .as_deref()
      .ok_or(Error::NotConfigured("locations_spreadsheet_id"))?;

    let rows = self.read_rows(spreadsheet_id, &cfg.locations_range).await?;
    Ok(build_locations(rows))
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
  };
  use censo_core::school::SchoolProfile;
  use chrono::Utc;

  use super::*;
  use crate::{GoogleConfig, auth::TokenSource};

  type Appended = Arc<Mutex<Vec<(String, Value)>>>;

  /// A stand-in for the Sheets REST API on an ephemeral local port.
  async fn fake_sheets() -> (String, Appended) {
    let appended: Appended = Arc::default();

    let app = Router::new()
      .route(
        "/v4/spreadsheets/{id}/values/{range}",
        get(|| async {
          Json(json!({
            "values": [
              ["DRE Belém", "1", "Escola B", "Belém"],
              ["DRE Belém", "2", "Escola A", "Belém"],
              ["DRE Belém", "3"],
            ]
          }))
        })
        .post(
          |State(log): State<Appended>,
           Path((_id, range)): Path<(String, String)>,
           Json(body): Json<Value>| async move {
            log.lock().unwrap().push((range, body));
            Json(json!({}))
          },
        ),
      )
      .with_state(appended.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (format!("http://{addr}"), appended)
  }

  fn client(config: GoogleConfig) -> SheetsClient {
    GoogleClient::with_token_source(config, TokenSource::Static("t".into()))
      .unwrap()
      .sheets()
  }

  fn configured(base: &str) -> GoogleConfig {
    GoogleConfig {
      census_spreadsheet_id: Some("census".into()),
      locations_spreadsheet_id: Some("locations".into()),
      sheets_base_url: base.into(),
      ..Default::default()
    }
  }

  fn school() -> School {
    School {
      id:         1,
      profile:    SchoolProfile { name: "Escola A".into(), ..Default::default() },
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  fn census() -> CensusRecord {
    CensusRecord {
      id:         1,
      school_id:  1,
      year:       2026,
      status:     "completed".into(),
      data:       Default::default(),
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[tokio::test]
  async fn locations_are_built_from_sheet_rows() {
    let (base, _) = fake_sheets().await;
    let locations = client(configured(&base)).locations().await.unwrap();
    assert_eq!(locations["DRE Belém"]["Belém"], vec!["Escola A", "Escola B"]);
  }

  #[tokio::test]
  async fn export_appends_one_row() {
    let (base, appended) = fake_sheets().await;

    client(configured(&base)).append(&school(), &census()).await.unwrap();

    let log = appended.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].0, "Base_dados!A:A:append");
    assert_eq!(log[0].1["values"][0][4], json!("Escola A"));
  }

  #[tokio::test]
  async fn export_without_spreadsheet_id_fails() {
    let err = client(GoogleConfig::default())
      .append(&school(), &census())
      .await
      .unwrap_err();
    assert!(err.to_string().contains("census_spreadsheet_id"));
  }
}
