//! [`SqliteStore`]: the SQLite implementation of [`CensusStore`].

use std::path::Path;

use censo_core::{
  census::{merge_answers, CensusRecord, CensusSubmission},
  school::{School, SchoolProfile},
  store::CensusStore,
};
use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use crate::{
  encode::{
    encode_answers, encode_dt, encode_json, decode_answers, RawCensus, RawSchool,
    SCHOOL_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A census store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn other(e: impl std::error::Error + Send + Sync + 'static) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

// ─── CensusStore impl ────────────────────────────────────────────────────────

impl CensusStore for SqliteStore {
  type Error = Error;

  // ── Schools ───────────────────────────────────────────────────────────────

  async fn upsert_school(&self, profile: SchoolProfile) -> Result<i64> {
    let p          = profile.validate()?;
    let shifts     = encode_json(&p.shifts)?;
    let stages     = encode_json(&p.stages)?;
    let modalities = encode_json(&p.modalities)?;
    let now        = encode_dt(Utc::now());

    let id = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "INSERT INTO schools (
             inep_code, name, cnpj, address, phone, municipality, postal_code,
             zone, region, administrative_dependency, director_name,
             director_registration, director_contact, shifts, stages, modalities,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)
           ON CONFLICT (inep_code) DO UPDATE SET
             name                      = excluded.name,
             cnpj                      = excluded.cnpj,
             address                   = excluded.address,
             phone                     = excluded.phone,
             municipality              = excluded.municipality,
             postal_code               = excluded.postal_code,
             zone                      = excluded.zone,
             region                    = excluded.region,
             administrative_dependency = excluded.administrative_dependency,
             director_name             = excluded.director_name,
             director_registration     = excluded.director_registration,
             director_contact          = excluded.director_contact,
             shifts                    = excluded.shifts,
             stages                    = excluded.stages,
             modalities                = excluded.modalities,
             updated_at                = excluded.updated_at
           RETURNING id",
          rusqlite::params![
            p.inep_code,
            p.name,
            p.cnpj,
            p.address,
            p.phone,
            p.municipality,
            p.postal_code,
            p.zone,
            p.region,
            p.administrative_dependency,
            p.director_name,
            p.director_registration,
            p.director_contact,
            shifts,
            stages,
            modalities,
            now,
          ],
          |row| row.get::<_, i64>(0),
        )?)
      })
      .await?;

    Ok(id)
  }

  async fn get_school(&self, id: i64) -> Result<Option<School>> {
    let raw: Option<RawSchool> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SCHOOL_COLUMNS} FROM schools WHERE id = ?1"),
            rusqlite::params![id],
            RawSchool::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSchool::into_school).transpose()
  }

  async fn list_schools(&self) -> Result<Vec<School>> {
    let raws: Vec<RawSchool> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {SCHOOL_COLUMNS} FROM schools ORDER BY name ASC, id ASC"))?;
        let rows = stmt
          .query_map([], RawSchool::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSchool::into_school).collect()
  }

  // ── Census ────────────────────────────────────────────────────────────────

  async fn upsert_census(&self, submission: CensusSubmission) -> Result<CensusRecord> {
    let CensusSubmission { school_id, year, status, data: delta } = submission;
    let now = encode_dt(Utc::now());

    // Read, merge and write under one IMMEDIATE transaction on the store's
    // single connection, so no other writer can land between the read and
    // the write.
    let raw: Option<RawCensus> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let school_exists = tx
          .query_row(
            "SELECT 1 FROM schools WHERE id = ?1",
            rusqlite::params![school_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !school_exists {
          return Ok(None);
        }

        let stored: Option<String> = tx
          .query_row(
            "SELECT data FROM census_responses WHERE school_id = ?1 AND year = ?2",
            rusqlite::params![school_id, year],
            |row| row.get(0),
          )
          .optional()?;

        let mut data = match stored {
          Some(s) => decode_answers(&s).map_err(other)?,
          None => Default::default(),
        };
        merge_answers(&mut data, delta);
        let data_str = encode_answers(&data).map_err(other)?;

        let (id, created_at): (i64, String) = tx.query_row(
          "INSERT INTO census_responses (school_id, year, status, data, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)
           ON CONFLICT (school_id, year) DO UPDATE SET
             status     = excluded.status,
             data       = excluded.data,
             updated_at = excluded.updated_at
           RETURNING id, created_at",
          rusqlite::params![school_id, year, status, data_str, now],
          |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        tx.commit()?;

        Ok(Some(RawCensus {
          id,
          school_id,
          year,
          status,
          data: data_str,
          created_at,
          updated_at: now,
        }))
      })
      .await?;

    raw
      .ok_or(Error::Core(censo_core::Error::SchoolNotFound(school_id)))?
      .into_census()
  }

  async fn get_census(&self, school_id: i64, year: i32) -> Result<Option<CensusRecord>> {
    let raw: Option<RawCensus> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, school_id, year, status, data, created_at, updated_at
             FROM census_responses
             WHERE school_id = ?1 AND year = ?2",
            rusqlite::params![school_id, year],
            |row| {
              Ok(RawCensus {
                id:         row.get(0)?,
                school_id:  row.get(1)?,
                year:       row.get(2)?,
                status:     row.get(3)?,
                data:       row.get(4)?,
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCensus::into_census).transpose()
  }
}
