use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use libvenlink::prelude::*;
use serde::Deserialize;
use tokio::time::{Duration, sleep};

use crate::io;

const ESTABLISHMENTS_URL: &str = "https://api.ratings.food.gov.uk/Establishments";
const PAGE_SIZE: usize = 500;

#[derive(Args)]
pub struct FetchRatingsArgs {
  /// Destination for the ratings snapshot
  #[arg(long)]
  pub output: PathBuf,

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

  /// Search radius around each grid point (the registry API takes miles)
  #[arg(long, default_value_t = 1.3)]
  pub radius_miles: f64,
}

#[derive(Debug, Deserialize)]
struct EstablishmentsPage {
  #[serde(default)]
  establishments: Vec<FhrsEstablishment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FhrsEstablishment {
  #[serde(rename = "FHRSID")]
  fhrs_id: i64,
  #[serde(default)]
  business_name: String,
  #[serde(default)]
  business_type: String,
  #[serde(default)]
  post_code: Option<String>,
  #[serde(default)]
  rating_value: Option<String>,
  #[serde(default)]
  rating_date: Option<String>,
  #[serde(default)]
  local_authority_name: Option<String>,
  #[serde(default, rename = "geocode")]
  geocode: Option<Geocode>,
  #[serde(default, rename = "scores")]
  scores: Option<Scores>,
}

// The registry serves geocode values as strings; they flow through
// Coordinates::parse like every other boundary coordinate.
#[derive(Debug, Default, Deserialize)]
struct Geocode {
  #[serde(default)]
  latitude: Option<String>,
  #[serde(default)]
  longitude: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Scores {
  #[serde(default)]
  hygiene: Option<u8>,
  #[serde(default)]
  structural: Option<u8>,
  #[serde(default)]
  confidence_in_management: Option<u8>,
}

impl From<FhrsEstablishment> for Establishment {
  fn from(e: FhrsEstablishment) -> Establishment {
    let geocode = e.geocode.unwrap_or_default();
    let scores = e.scores.unwrap_or_default();

    Establishment {
      id: e.fhrs_id.to_string(),
      name: e.business_name,
      postcode: e.post_code.unwrap_or_default(),
      coordinates: Coordinates::parse(geocode.latitude.as_deref().unwrap_or(""), geocode.longitude.as_deref().unwrap_or("")),
      business_type: e.business_type,
      rating_value: e.rating_value.unwrap_or_default(),
      rating_date: e.rating_date.unwrap_or_default(),
      local_authority: e.local_authority_name.unwrap_or_default(),
      hygiene_score: scores.hygiene,
      structural_score: scores.structural,
      confidence_score: scores.confidence_in_management,
    }
  }
}

pub async fn run(args: FetchRatingsArgs) -> anyhow::Result<()> {
  let client = reqwest::Client::new();

  let lat_step = (args.max_lat - args.min_lat) / args.grid_rows.saturating_sub(1).max(1) as f64;
  let lng_step = (args.max_lng - args.min_lng) / args.grid_cols.saturating_sub(1).max(1) as f64;

  let mut seen = ahash::HashSet::default();
  let mut establishments: Vec<Establishment> = Vec::new();

  for row in 0..args.grid_rows {
    for col in 0..args.grid_cols {
      let lat = args.min_lat + row as f64 * lat_step;
      let lng = args.min_lng + col as f64 * lng_step;

      match fetch_cell(&client, lat, lng, args.radius_miles).await {
        Ok(cell) => {
          let found = cell.len();
          let mut added = 0;

          for establishment in cell {
            if seen.insert(establishment.fhrs_id) {
              establishments.push(establishment.into());
              added += 1;
            }
          }

          tracing::info!(row, col, lat, lng, found, added, unique = establishments.len(), "scanned ratings cell");
        }

        Err(err) => tracing::warn!(row, col, lat, lng, error = %err, "ratings cell failed, skipping"),
      }

      sleep(Duration::from_millis(400)).await;
    }
  }

  io::write_establishments(&args.output, &establishments)?;

  tracing::info!(unique = establishments.len(), output = %args.output.display(), "wrote ratings snapshot");

  Ok(())
}

/// Fetch every page of results around one grid point, stopping at the first
/// short page.
async fn fetch_cell(client: &reqwest::Client, lat: f64, lng: f64, radius_miles: f64) -> anyhow::Result<Vec<FhrsEstablishment>> {
  let mut page_number = 1;
  let mut all = Vec::new();

  loop {
    let page: EstablishmentsPage = client
      .get(ESTABLISHMENTS_URL)
      .header("x-api-version", "2")
      .header("accept", "application/json")
      .query(&[
        ("latitude", lat.to_string()),
        ("longitude", lng.to_string()),
        ("maxDistanceLimit", radius_miles.to_string()),
        ("countryId", "1".to_string()),
        ("schemeTypeKey", "FHRS".to_string()),
        ("pageNumber", page_number.to_string()),
        ("pageSize", PAGE_SIZE.to_string()),
        ("sortOptionKey", "distance".to_string()),
      ])
      .send()
      .await
      .context("could not reach the ratings registry")?
      .error_for_status()
      .context("ratings registry rejected the request")?
      .json()
      .await
      .context("invalid ratings registry payload")?;

    let count = page.establishments.len();
    all.extend(page.establishments);

    if count < PAGE_SIZE {
      break;
    }

    page_number += 1;
    sleep(Duration::from_millis(200)).await;
  }

  Ok(all)
}
