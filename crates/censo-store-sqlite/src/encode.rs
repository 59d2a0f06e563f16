//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. JSON-valued fields (the
//! school's offered shifts/stages/modalities and the census answers) are
//! stored as compact JSON text.

use censo_core::{
  census::{Answers, CensusRecord},
  school::{School, SchoolProfile},
};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{Error, Result};

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON
// ─────────────────────────────────────────────────────────────────────

pub fn encode_json(v: &Value) -> Result<String> { Ok(serde_json::to_string(v)?) }

pub fn encode_answers(a: &Answers) -> Result<String> { Ok(serde_json::to_string(a)?) }

pub fn decode_answers(s: &str) -> Result<Answers> { Ok(serde_json::from_str(s)?) }

// ─── Raw row types ────────────────────────────────────────────────────────────

/// Column list shared by every `SELECT` that produces a [`RawSchool`].
pub const SCHOOL_COLUMNS: &str = "id, inep_code, name, cnpj, address, phone, municipality, \
   postal_code, zone, region, administrative_dependency, director_name, \
   director_registration, director_contact, shifts, stages, modalities, \
   created_at, updated_at";

/// Raw row from `schools` before type decoding.
pub struct RawSchool {
  pub id:                        i64,
  pub inep_code:                 String,
  pub name:                      String,
  pub cnpj:                      String,
  pub address:                   String,
  pub phone:                     String,
  pub municipality:              String,
  pub postal_code:               String,
  pub zone:                      String,
  pub region:                    String,
  pub administrative_dependency: String,
  pub director_name:             String,
  pub director_registration:     String,
  pub director_contact:          String,
  pub shifts:                    String,
  pub stages:                    String,
  pub modalities:                String,
  pub created_at:                String,
  pub updated_at:                String,
}

impl RawSchool {
  /// Map a row selected with [`SCHOOL_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                        row.get(0)?,
      inep_code:                 row.get(1)?,
      name:                      row.get(2)?,
      cnpj:                      row.get(3)?,
      address:                   row.get(4)?,
      phone:                     row.get(5)?,
      municipality:              row.get(6)?,
      postal_code:               row.get(7)?,
      zone:                      row.get(8)?,
      region:                    row.get(9)?,
      administrative_dependency: row.get(10)?,
      director_name:             row.get(11)?,
      director_registration:     row.get(12)?,
      director_contact:          row.get(13)?,
      shifts:                    row.get(14)?,
      stages:                    row.get(15)?,
      modalities:                row.get(16)?,
      created_at:                row.get(17)?,
      updated_at:                row.get(18)?,
    })
  }

  pub fn into_school(self) -> Result<School> {
    Ok(School {
      id:         self.id,
      profile:    SchoolProfile {
        name:                      self.name,
        inep_code:                 self.inep_code,
        cnpj:                      self.cnpj,
        address:                   self.address,
        phone:                     self.phone,
        municipality:              self.municipality,
        postal_code:               self.postal_code,
        zone:                      self.zone,
        region:                    self.region,
        administrative_dependency: self.administrative_dependency,
        director_name:             self.director_name,
        director_registration:     self.director_registration,
        director_contact:          self.director_contact,
        shifts:                    serde_json::from_str(&self.shifts)?,
        stages:                    serde_json::from_str(&self.stages)?,
        modalities:                serde_json::from_str(&self.modalities)?,
      },
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw row from `census_responses` before type decoding.
pub struct RawCensus {
  pub id:         i64,
  pub school_id:  i64,
  pub year:       i32,
  pub status:     String,
  pub data:       String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawCensus {
  pub fn into_census(self) -> Result<CensusRecord> {
    Ok(CensusRecord {
      id:         self.id,
      school_id:  self.school_id,
      year:       self.year,
      status:     self.status,
      data:       decode_answers(&self.data)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
