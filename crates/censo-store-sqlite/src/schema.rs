//! SQL schema for the census SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per INEP code; re-submissions update in place.
CREATE TABLE IF NOT EXISTS schools (
    id                        INTEGER PRIMARY KEY AUTOINCREMENT,
    inep_code                 TEXT NOT NULL UNIQUE CHECK (inep_code != ''),
    name                      TEXT NOT NULL,
    cnpj                      TEXT NOT NULL DEFAULT '',
    address                   TEXT NOT NULL DEFAULT '',
    phone                     TEXT NOT NULL DEFAULT '',
    municipality              TEXT NOT NULL DEFAULT '',
    postal_code               TEXT NOT NULL DEFAULT '',
    zone                      TEXT NOT NULL DEFAULT '',
    region                    TEXT NOT NULL DEFAULT '',
    administrative_dependency TEXT NOT NULL DEFAULT '',
    director_name             TEXT NOT NULL DEFAULT '',
    director_registration     TEXT NOT NULL DEFAULT '',
    director_contact          TEXT NOT NULL DEFAULT '',
    shifts                    TEXT NOT NULL DEFAULT 'null',   -- JSON
    stages                    TEXT NOT NULL DEFAULT 'null',   -- JSON
    modalities                TEXT NOT NULL DEFAULT 'null',   -- JSON
    created_at                TEXT NOT NULL,                  -- ISO 8601 UTC
    updated_at                TEXT NOT NULL
);

-- Exactly one census per (school, year). No DELETE is ever issued.
CREATE TABLE IF NOT EXISTS census_responses (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    school_id   INTEGER NOT NULL REFERENCES schools(id),
    year        INTEGER NOT NULL,
    status      TEXT NOT NULL DEFAULT '',
    data        TEXT NOT NULL DEFAULT '{}',   -- merged JSON object
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (school_id, year)
);

CREATE INDEX IF NOT EXISTS schools_name_idx ON schools(name);

PRAGMA user_version = 1;
";
