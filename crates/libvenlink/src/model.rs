use serde::{Deserialize, Serialize};

use crate::normalize::{normalize_name, normalize_postcode};

/// A pair of decimal-degree coordinates, both guaranteed finite and in range.
///
/// Absent or unparseable coordinates are represented as `None` at the field
/// level, never as NaN and never as zero.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Coordinates {
  pub latitude: f64,
  pub longitude: f64,
}

impl Coordinates {
  pub fn new(latitude: f64, longitude: f64) -> Option<Coordinates> {
    if !latitude.is_finite() || !longitude.is_finite() {
      return None;
    }

    if latitude.abs() > 90.0 || longitude.abs() > 180.0 {
      return None;
    }

    Some(Coordinates { latitude, longitude })
  }

  /// Parse a pair of decimal-degree strings. Empty or malformed input yields
  /// `None`, not an error.
  pub fn parse(latitude: &str, longitude: &str) -> Option<Coordinates> {
    let latitude = latitude.trim().parse::<f64>().ok()?;
    let longitude = longitude.trim().parse::<f64>().ok()?;

    Coordinates::new(latitude, longitude)
  }
}

/// A probe record from the commercial places directory.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Place {
  pub id: String,
  pub name: String,
  pub address: String,
  pub coordinates: Option<Coordinates>,

  pub rating: Option<f64>,
  pub review_count: Option<u64>,
  pub cuisines: String,
  pub price_level: String,
}

/// A candidate record from the hygiene-inspection registry.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Establishment {
  pub id: String,
  pub name: String,
  pub postcode: String,
  pub coordinates: Option<Coordinates>,

  pub business_type: String,
  pub rating_value: String,
  pub rating_date: String,
  pub local_authority: String,
  pub hygiene_score: Option<u8>,
  pub structural_score: Option<u8>,
  pub confidence_score: Option<u8>,
}

/// The outcome of matching one probe against the candidate collection.
///
/// `candidate_id` (and the `candidate` payload) are present if and only if the
/// winning combined score reached the acceptance floor and the winning
/// candidate was not rejected on exact distance. Below the floor, the best
/// scores found are still carried for diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchResult {
  pub probe_id: String,
  pub candidate_id: Option<String>,
  pub combined_score: f64,
  pub name_score: f64,
  pub distance_score: f64,
  pub postcode_score: f64,
  pub distance_meters: Option<f64>,
  pub candidate: Option<Establishment>,
}

impl MatchResult {
  pub(crate) fn unmatched(probe_id: &str) -> MatchResult {
    MatchResult {
      probe_id: probe_id.to_string(),
      candidate_id: None,
      combined_score: 0.0,
      name_score: 0.0,
      distance_score: 0.0,
      postcode_score: 0.0,
      distance_meters: None,
      candidate: None,
    }
  }
}

/// A probe with its comparison keys precomputed once per run.
pub(crate) struct KeyedPlace<'c> {
  pub(crate) place: &'c Place,
  pub(crate) name_key: String,
  pub(crate) address_key: String,
}

impl<'c> KeyedPlace<'c> {
  pub(crate) fn new(place: &'c Place) -> KeyedPlace<'c> {
    KeyedPlace {
      place,
      name_key: normalize_name(&place.name),
      address_key: normalize_postcode(&place.address),
    }
  }
}

/// A candidate with its comparison keys precomputed once per run.
pub(crate) struct KeyedEstablishment<'c> {
  pub(crate) establishment: &'c Establishment,
  pub(crate) name_key: String,
  pub(crate) postcode_key: String,
}

impl<'c> KeyedEstablishment<'c> {
  pub(crate) fn new(establishment: &'c Establishment) -> KeyedEstablishment<'c> {
    KeyedEstablishment {
      establishment,
      name_key: normalize_name(&establishment.name),
      postcode_key: normalize_postcode(&establishment.postcode),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::Coordinates;

  #[test]
  fn coordinates_parse() {
    assert_eq!(Coordinates::parse("51.5007", "-0.1246"), Some(Coordinates { latitude: 51.5007, longitude: -0.1246 }));
    assert_eq!(Coordinates::parse(" 51.5007 ", " -0.1246 "), Some(Coordinates { latitude: 51.5007, longitude: -0.1246 }));
  }

  #[test]
  fn coordinates_missing_is_none() {
    assert_eq!(Coordinates::parse("", ""), None);
    assert_eq!(Coordinates::parse("51.5", ""), None);
    assert_eq!(Coordinates::parse("N/A", "-0.1246"), None);
    assert_eq!(Coordinates::parse("NaN", "-0.1246"), None);
    assert_eq!(Coordinates::parse("inf", "0"), None);
  }

  #[test]
  fn coordinates_out_of_range_is_none() {
    assert_eq!(Coordinates::new(91.0, 0.0), None);
    assert_eq!(Coordinates::new(0.0, 180.5), None);
    assert!(Coordinates::new(-90.0, 180.0).is_some());
  }

  #[test]
  fn keyed_place_precomputes_keys() {
    let place = super::Place {
      id: "p1".to_string(),
      name: "The Crown & Anchor LTD".to_string(),
      address: "1 SW1A 1AA, London".to_string(),
      ..Default::default()
    };

    let keyed = super::KeyedPlace::new(&place);

    assert_eq!(keyed.name_key, "THE CROWN AND ANCHOR");
    assert_eq!(keyed.address_key, "1SW1A1AA,LONDON");
  }
}
