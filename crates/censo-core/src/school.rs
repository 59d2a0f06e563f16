//! School: the identity record every census hangs off.
//!
//! Schools are keyed by their INEP code. Submitting a profile whose code is
//! already registered updates that row in place; the numeric id never
//! changes once assigned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// The mutable fields of a school, as submitted by the identification form.
///
/// Wire names follow the form field names used by the census frontend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchoolProfile {
  #[serde(rename = "nome_escola")]
  pub name:                      String,
  /// External registration code. Unique across the registry.
  #[serde(rename = "codigo_inep")]
  pub inep_code:                 String,
  pub cnpj:                      String,
  #[serde(rename = "endereco")]
  pub address:                   String,
  #[serde(rename = "telefone_institucional")]
  pub phone:                     String,
  #[serde(rename = "municipio")]
  pub municipality:              String,
  #[serde(rename = "cep")]
  pub postal_code:               String,
  /// Urbana, Rural or Ribeirinha. Kept free-form.
  #[serde(rename = "zona")]
  pub zone:                      String,
  /// Administrative region (DRE).
  #[serde(rename = "dre")]
  pub region:                    String,
  #[serde(rename = "dependencia_administrativa")]
  pub administrative_dependency: String,
  #[serde(rename = "nome_diretor")]
  pub director_name:             String,
  #[serde(rename = "matricula_diretor")]
  pub director_registration:     String,
  #[serde(rename = "contato_diretor")]
  pub director_contact:          String,
  #[serde(rename = "turnos")]
  pub shifts:                    Value,
  #[serde(rename = "etapas_ofertadas")]
  pub stages:                    Value,
  #[serde(rename = "modalidades_ofertadas")]
  pub modalities:                Value,
}

impl SchoolProfile {
  /// Trim the natural key and reject profiles that cannot be upserted.
  pub fn validate(mut self) -> Result<Self> {
    self.inep_code = self.inep_code.trim().to_owned();
    if self.inep_code.is_empty() {
      return Err(Error::Validation("codigo_inep must not be empty".into()));
    }
    Ok(self)
  }
}

/// A registered school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
  pub id:         i64,
  #[serde(flatten)]
  pub profile:    SchoolProfile,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
