//! The region → municipality → school names reference mapping.

use std::collections::BTreeMap;

/// `region -> municipality -> sorted, deduplicated school names`.
pub type Locations = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Build the mapping from raw sheet rows laid out as
/// `[region, <ignored>, school, municipality, ...]`.
///
/// Rows shorter than four cells, or with a blank region, school or
/// municipality, are skipped.
pub fn build_locations<I, R, S>(rows: I) -> Locations
where
  I: IntoIterator<Item = R>,
  R: AsRef<[S]>,
  S: AsRef<str>,
{
  let mut mapping = Locations::new();

  for row in rows {
    let row = row.as_ref();
    if row.len() < 4 {
      continue;
    }
    let region       = row[0].as_ref().trim();
    let school       = row[2].as_ref().trim();
    let municipality = row[3].as_ref().trim();
    if region.is_empty() || school.is_empty() || municipality.is_empty() {
      continue;
    }

    let schools = mapping
      .entry(region.to_owned())
      .or_default()
      .entry(municipality.to_owned())
      .or_default();
    if !schools.iter().any(|s| s == school) {
      schools.push(school.to_owned());
    }
  }

  for municipalities in mapping.values_mut() {
    for schools in municipalities.values_mut() {
      schools.sort();
    }
  }

  mapping
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn groups_dedups_and_sorts() {
    let rows = vec![
      vec!["DRE Belém", "x", "Escola B", "Belém"],
      vec!["DRE Belém", "x", "Escola A", "Belém"],
      vec!["DRE Belém", "x", "Escola B", "Belém"],
      vec!["DRE Castanhal", "x", " Escola C ", "Castanhal"],
    ];
    let locations = build_locations(rows);

    assert_eq!(locations.len(), 2);
    assert_eq!(locations["DRE Belém"]["Belém"], vec!["Escola A", "Escola B"]);
    assert_eq!(locations["DRE Castanhal"]["Castanhal"], vec!["Escola C"]);
  }

  #[test]
  fn skips_short_and_blank_rows() {
    let rows = vec![
      vec!["DRE Belém", "x", "Escola A"],
      vec!["", "x", "Escola B", "Belém"],
      vec!["DRE Belém", "x", "  ", "Belém"],
    ];
    assert!(build_locations(rows).is_empty());
  }
}
