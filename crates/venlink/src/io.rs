use std::{io::Read, path::Path};

use anyhow::Context;
use libvenlink::prelude::*;
use serde::{Deserialize, Serialize};

/// CSV shape of a places snapshot. Coordinates stay strings at this boundary:
/// an empty or malformed field means "missing", never zero.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PlaceRow {
  pub place_id: String,
  pub name: String,
  pub address: String,
  #[serde(default)]
  pub latitude: String,
  #[serde(default)]
  pub longitude: String,
  #[serde(default)]
  pub rating: String,
  #[serde(default)]
  pub num_reviews: String,
  #[serde(default)]
  pub food_types: String,
  #[serde(default)]
  pub price_level: String,
}

impl From<PlaceRow> for Place {
  fn from(row: PlaceRow) -> Place {
    Place {
      coordinates: Coordinates::parse(&row.latitude, &row.longitude),
      id: row.place_id,
      name: row.name,
      address: row.address,
      rating: row.rating.trim().parse().ok(),
      review_count: row.num_reviews.trim().parse().ok(),
      cuisines: row.food_types,
      price_level: row.price_level,
    }
  }
}

impl From<&Place> for PlaceRow {
  fn from(place: &Place) -> PlaceRow {
    PlaceRow {
      place_id: place.id.clone(),
      name: place.name.clone(),
      address: place.address.clone(),
      latitude: place.coordinates.map(|c| c.latitude.to_string()).unwrap_or_default(),
      longitude: place.coordinates.map(|c| c.longitude.to_string()).unwrap_or_default(),
      rating: place.rating.map(|r| r.to_string()).unwrap_or_default(),
      num_reviews: place.review_count.map(|r| r.to_string()).unwrap_or_default(),
      food_types: place.cuisines.clone(),
      price_level: place.price_level.clone(),
    }
  }
}

/// CSV shape of a ratings snapshot.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EstablishmentRow {
  pub fhrs_id: String,
  pub business_name: String,
  #[serde(default)]
  pub business_type: String,
  #[serde(default)]
  pub postcode: String,
  #[serde(default)]
  pub rating_value: String,
  #[serde(default)]
  pub rating_date: String,
  #[serde(default)]
  pub local_authority_name: String,
  #[serde(default)]
  pub hygiene_score: String,
  #[serde(default)]
  pub structural_score: String,
  #[serde(default)]
  pub confidence_in_management_score: String,
  #[serde(default)]
  pub latitude: String,
  #[serde(default)]
  pub longitude: String,
}

impl From<EstablishmentRow> for Establishment {
  fn from(row: EstablishmentRow) -> Establishment {
    Establishment {
      coordinates: Coordinates::parse(&row.latitude, &row.longitude),
      id: row.fhrs_id,
      name: row.business_name,
      postcode: row.postcode,
      business_type: row.business_type,
      rating_value: row.rating_value,
      rating_date: row.rating_date,
      local_authority: row.local_authority_name,
      hygiene_score: row.hygiene_score.trim().parse().ok(),
      structural_score: row.structural_score.trim().parse().ok(),
      confidence_score: row.confidence_in_management_score.trim().parse().ok(),
    }
  }
}

impl From<&Establishment> for EstablishmentRow {
  fn from(establishment: &Establishment) -> EstablishmentRow {
    EstablishmentRow {
      fhrs_id: establishment.id.clone(),
      business_name: establishment.name.clone(),
      business_type: establishment.business_type.clone(),
      postcode: establishment.postcode.clone(),
      rating_value: establishment.rating_value.clone(),
      rating_date: establishment.rating_date.clone(),
      local_authority_name: establishment.local_authority.clone(),
      hygiene_score: establishment.hygiene_score.map(|s| s.to_string()).unwrap_or_default(),
      structural_score: establishment.structural_score.map(|s| s.to_string()).unwrap_or_default(),
      confidence_in_management_score: establishment.confidence_score.map(|s| s.to_string()).unwrap_or_default(),
      latitude: establishment.coordinates.map(|c| c.latitude.to_string()).unwrap_or_default(),
      longitude: establishment.coordinates.map(|c| c.longitude.to_string()).unwrap_or_default(),
    }
  }
}

/// One joined output row per probe, in probe input order.
#[derive(Debug, Deserialize, Serialize)]
pub struct MatchedRow {
  pub place_id: String,
  pub name: String,
  pub address: String,
  pub latitude: String,
  pub longitude: String,
  pub rating: String,
  pub num_reviews: String,
  pub food_types: String,
  pub price_level: String,

  pub fhrs_id: String,
  pub fhrs_business_name: String,
  pub fhrs_business_type: String,
  pub fhrs_postcode: String,
  pub fhrs_rating_value: String,
  pub fhrs_rating_date: String,
  pub fhrs_local_authority: String,
  pub fhrs_hygiene_score: String,
  pub fhrs_structural_score: String,
  pub fhrs_confidence_score: String,

  pub match_score: String,
  pub match_name_score: String,
  pub match_distance_m: String,
}

impl MatchedRow {
  fn new(place: &Place, result: &MatchResult) -> MatchedRow {
    let probe = PlaceRow::from(place);

    let mut row = MatchedRow {
      place_id: probe.place_id,
      name: probe.name,
      address: probe.address,
      latitude: probe.latitude,
      longitude: probe.longitude,
      rating: probe.rating,
      num_reviews: probe.num_reviews,
      food_types: probe.food_types,
      price_level: probe.price_level,

      fhrs_id: String::new(),
      fhrs_business_name: String::new(),
      fhrs_business_type: String::new(),
      fhrs_postcode: String::new(),
      fhrs_rating_value: String::new(),
      fhrs_rating_date: String::new(),
      fhrs_local_authority: String::new(),
      fhrs_hygiene_score: String::new(),
      fhrs_structural_score: String::new(),
      fhrs_confidence_score: String::new(),

      match_score: format!("{:.3}", result.combined_score),
      match_name_score: format!("{:.3}", result.name_score),
      match_distance_m: result.distance_meters.map(|d| format!("{d:.1}")).unwrap_or_default(),
    };

    if let Some(candidate) = &result.candidate {
      row.fhrs_id = candidate.id.clone();
      row.fhrs_business_name = candidate.name.clone();
      row.fhrs_business_type = candidate.business_type.clone();
      row.fhrs_postcode = candidate.postcode.clone();
      row.fhrs_rating_value = candidate.rating_value.clone();
      row.fhrs_rating_date = candidate.rating_date.clone();
      row.fhrs_local_authority = candidate.local_authority.clone();
      row.fhrs_hygiene_score = candidate.hygiene_score.map(|s| s.to_string()).unwrap_or_default();
      row.fhrs_structural_score = candidate.structural_score.map(|s| s.to_string()).unwrap_or_default();
      row.fhrs_confidence_score = candidate.confidence_score.map(|s| s.to_string()).unwrap_or_default();
    }

    row
  }
}

pub fn read_places<R: Read>(reader: R) -> anyhow::Result<Vec<Place>> {
  let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
  let mut places = Vec::new();

  for row in reader.deserialize::<PlaceRow>() {
    places.push(row.context("malformed places row")?.into());
  }

  Ok(places)
}

pub fn load_places(path: &Path) -> anyhow::Result<Vec<Place>> {
  let file = std::fs::File::open(path).with_context(|| format!("could not open places snapshot {}", path.display()))?;

  read_places(file)
}

pub fn read_establishments<R: Read>(reader: R) -> anyhow::Result<Vec<Establishment>> {
  let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
  let mut establishments = Vec::new();

  for row in reader.deserialize::<EstablishmentRow>() {
    establishments.push(row.context("malformed ratings row")?.into());
  }

  Ok(establishments)
}

pub fn load_establishments(path: &Path) -> anyhow::Result<Vec<Establishment>> {
  let file = std::fs::File::open(path).with_context(|| format!("could not open ratings snapshot {}", path.display()))?;

  read_establishments(file)
}

pub fn write_places(path: &Path, places: &[Place]) -> anyhow::Result<()> {
  let mut writer = csv::Writer::from_path(path).with_context(|| format!("could not create {}", path.display()))?;

  for place in places {
    writer.serialize(PlaceRow::from(place)).context("could not write places row")?;
  }

  writer.flush().context("could not flush places snapshot")?;

  Ok(())
}

pub fn write_establishments(path: &Path, establishments: &[Establishment]) -> anyhow::Result<()> {
  let mut writer = csv::Writer::from_path(path).with_context(|| format!("could not create {}", path.display()))?;

  for establishment in establishments {
    writer.serialize(EstablishmentRow::from(establishment)).context("could not write ratings row")?;
  }

  writer.flush().context("could not flush ratings snapshot")?;

  Ok(())
}

pub fn write_matches(path: &Path, places: &[Place], results: &[MatchResult]) -> anyhow::Result<()> {
  let mut writer = csv::Writer::from_path(path).with_context(|| format!("could not create {}", path.display()))?;

  for (place, result) in places.iter().zip(results) {
    writer.serialize(MatchedRow::new(place, result)).context("could not write joined row")?;
  }

  writer.flush().context("could not flush joined output")?;

  Ok(())
}
