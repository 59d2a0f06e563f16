//! Folder naming for relocated school photos.

use crate::school::School;

/// Replace every character that is not an ASCII letter, ASCII digit or a
/// space with `-`. Accented letters count as unsafe, one `-` per `char`.
pub fn sanitize_folder_name(raw: &str) -> String {
  raw
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == ' ' { c } else { '-' })
    .collect()
}

/// `"{name} - {region} - {director}"`, sanitized.
pub fn photo_folder_name(school: &School) -> String {
  let p = &school.profile;
  sanitize_folder_name(&format!(
    "{} - {} - {}",
    p.name, p.region, p.director_name
  ))
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::school::SchoolProfile;

  #[test]
  fn non_ascii_and_punctuation_become_hyphens() {
    assert_eq!(
      sanitize_folder_name("São Paulo's School #5"),
      "S-o Paulo-s School -5"
    );
  }

  #[test]
  fn safe_names_pass_through() {
    assert_eq!(sanitize_folder_name("Escola 12 de Maio"), "Escola 12 de Maio");
  }

  #[test]
  fn slashes_cannot_escape_the_folder() {
    assert_eq!(sanitize_folder_name("../etc/x"), "---etc-x");
  }

  #[test]
  fn folder_name_joins_name_region_and_director() {
    let school = School {
      id:         1,
      profile:    SchoolProfile {
        name: "EEEM Tiradentes".into(),
        region: "DRE Belém".into(),
        director_name: "Ana Conceição".into(),
        ..Default::default()
      },
      created_at: Utc::now(),
      updated_at: Utc::now(),
    };
    assert_eq!(
      photo_folder_name(&school),
      "EEEM Tiradentes - DRE Bel-m - Ana Concei--o"
    );
  }
}
