use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use libvenlink::prelude::*;
use serde::Deserialize;
use tokio::time::{Duration, sleep};

use crate::io;

const NEARBY_URL: &str = "https://places.googleapis.com/v1/places:searchNearby";

// Nearby Search (v1) requires a field mask; no spaces allowed.
const FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,places.location,places.rating,places.userRatingCount,places.types,places.priceLevel";

// Wrapper types the directory serves alongside every venue.
const GENERIC_TYPES: [&str; 4] = ["restaurant", "food", "point_of_interest", "establishment"];

#[derive(Args)]
pub struct FetchPlacesArgs {
  /// Destination for the places snapshot
  #[arg(long)]
  pub output: PathBuf,

  /// Places API key
  #[arg(long)]
  pub api_key: String,

  #[arg(long, default_value_t = 51.28)]
  pub min_lat: f64,

  #[arg(long, default_value_t = 51.70)]
  pub max_lat: f64,

  #[arg(long, default_value_t = -0.51)]
  pub min_lng: f64,

  #[arg(long, default_value_t = 0.33)]
  pub max_lng: f64,

  #[arg(long, default_value_t = 10)]
  pub grid_rows: usize,

  #[arg(long, default_value_t = 10)]
  pub grid_cols: usize,

  /// Radius of each nearby-search circle, in meters
  #[arg(long, default_value_t = 2000.0)]
  pub radius_meters: f64,

  /// Stop scanning once this many unique places have been collected
  #[arg(long, default_value_t = 1000)]
  pub target: usize,
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
  #[serde(default)]
  places: Vec<DirectoryPlace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectoryPlace {
  #[serde(default)]
  id: String,
  display_name: Option<DisplayName>,
  #[serde(default)]
  formatted_address: String,
  location: Option<Location>,
  rating: Option<f64>,
  user_rating_count: Option<u64>,
  #[serde(default)]
  types: Vec<String>,
  price_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DisplayName {
  #[serde(default)]
  text: String,
}

#[derive(Debug, Deserialize)]
struct Location {
  latitude: Option<f64>,
  longitude: Option<f64>,
}

impl From<DirectoryPlace> for Place {
  fn from(place: DirectoryPlace) -> Place {
    let cuisines = place.types.iter().filter(|t| !GENERIC_TYPES.contains(&t.as_str())).cloned().collect::<Vec<_>>().join(", ");

    Place {
      coordinates: place.location.and_then(|l| Coordinates::new(l.latitude?, l.longitude?)),
      id: place.id,
      name: place.display_name.map(|n| n.text).unwrap_or_default(),
      address: place.formatted_address,
      rating: place.rating,
      review_count: place.user_rating_count,
      cuisines,
      price_level: place.price_level.unwrap_or_default(),
    }
  }
}

pub async fn run(args: FetchPlacesArgs) -> anyhow::Result<()> {
  let client = reqwest::Client::new();

  let lat_step = (args.max_lat - args.min_lat) / args.grid_rows.saturating_sub(1).max(1) as f64;
  let lng_step = (args.max_lng - args.min_lng) / args.grid_cols.saturating_sub(1).max(1) as f64;

  let mut seen = ahash::HashSet::default();
  let mut places: Vec<Place> = Vec::new();

  'scan: for row in 0..args.grid_rows {
    for col in 0..args.grid_cols {
      let lat = args.min_lat + row as f64 * lat_step;
      let lng = args.min_lng + col as f64 * lng_step;

      match fetch_cell(&client, &args, lat, lng).await {
        Ok(cell) => {
          let found = cell.len();
          let mut added = 0;

          for place in cell {
            if !place.id.is_empty() && seen.insert(place.id.clone()) {
              places.push(place.into());
              added += 1;
            }
          }

          tracing::info!(row, col, lat, lng, found, added, unique = places.len(), "scanned places cell");
        }

        Err(err) => tracing::warn!(row, col, lat, lng, error = %err, "places cell failed, skipping"),
      }

      if places.len() >= args.target {
        tracing::info!(unique = places.len(), "reached target place count, stopping scan");
        break 'scan;
      }

      sleep(Duration::from_millis(500)).await;
    }
  }

  io::write_places(&args.output, &places)?;

  tracing::info!(unique = places.len(), output = %args.output.display(), "wrote places snapshot");

  Ok(())
}

async fn fetch_cell(client: &reqwest::Client, args: &FetchPlacesArgs, lat: f64, lng: f64) -> anyhow::Result<Vec<DirectoryPlace>> {
  let body = serde_json::json!({
    "includedTypes": ["restaurant"],
    "maxResultCount": 20,
    "locationRestriction": {
      "circle": {
        "center": { "latitude": lat, "longitude": lng },
        "radius": args.radius_meters
      }
    }
  });

  let response: NearbyResponse = client
    .post(NEARBY_URL)
    .header("Content-Type", "application/json")
    .header("X-Goog-Api-Key", &args.api_key)
    .header("X-Goog-FieldMask", FIELD_MASK)
    .json(&body)
    .send()
    .await
    .context("could not reach the places directory")?
    .error_for_status()
    .context("places directory rejected the request")?
    .json()
    .await
    .context("invalid places directory payload")?;

  Ok(response.places)
}

#[cfg(test)]
mod tests {
  use libvenlink::prelude::*;

  #[test]
  fn deserializes_directory_payload() {
    let payload = r#"{
      "places": [
        {
          "id": "ChIJa",
          "displayName": { "text": "The Crown & Anchor" },
          "formattedAddress": "1 SW1A 1AA, London",
          "location": { "latitude": 51.5007, "longitude": -0.1246 },
          "rating": 4.5,
          "userRatingCount": 210,
          "types": ["restaurant", "food", "british_restaurant", "point_of_interest"],
          "priceLevel": "PRICE_LEVEL_MODERATE"
        },
        {
          "id": "ChIJb",
          "displayName": { "text": "Unplotted Cafe" }
        }
      ]
    }"#;

    let response: super::NearbyResponse = serde_json::from_str(payload).unwrap();
    let places: Vec<Place> = response.places.into_iter().map(Into::into).collect();

    assert_eq!(places[0].id, "ChIJa");
    assert_eq!(places[0].coordinates, Coordinates::new(51.5007, -0.1246));
    assert_eq!(places[0].cuisines, "british_restaurant");
    assert_eq!(places[0].review_count, Some(210));

    assert_eq!(places[1].coordinates, None);
    assert_eq!(places[1].price_level, "");
  }

  #[test]
  fn deserializes_empty_response() {
    let response: super::NearbyResponse = serde_json::from_str("{}").unwrap();

    assert!(response.places.is_empty());
  }
}
