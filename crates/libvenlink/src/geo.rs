use std::collections::HashMap;

use ahash::RandomState;

use crate::model::Coordinates;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters. Symmetric, zero for identical points.
pub fn haversine_meters(a: Coordinates, b: Coordinates) -> f64 {
  let phi1 = a.latitude.to_radians();
  let phi2 = b.latitude.to_radians();
  let dphi = (b.latitude - a.latitude).to_radians();
  let dlambda = (b.longitude - a.longitude).to_radians();

  let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);

  2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

// sin x >= 2x/pi on [0, pi/2], so a great-circle distance of `meters` cannot
// move latitude by more than 90*d/R degrees. The same bound holds for
// longitude once divided by the cosine of the window's largest absolute
// latitude.
pub(crate) fn latitude_window_degrees(meters: f64) -> f64 {
  90.0 * meters / EARTH_RADIUS_METERS
}

/// Conservative longitude half-window, or `None` when the window touches a
/// pole and no useful longitude bound exists.
pub(crate) fn longitude_window_degrees(meters: f64, latitude: f64) -> Option<f64> {
  let extreme = (latitude.abs() + latitude_window_degrees(meters)).min(90.0);
  let cos_max = extreme.to_radians().cos();

  if cos_max <= 1e-9 {
    return None;
  }

  Some((90.0 * meters / (EARTH_RADIUS_METERS * cos_max)).min(180.0))
}

pub(crate) fn longitude_delta_degrees(a: f64, b: f64) -> f64 {
  let delta = (a - b).abs() % 360.0;

  if delta > 180.0 { 360.0 - delta } else { delta }
}

/// Read-only spatial pruning index, built once before dispatch.
///
/// Located candidates are bucketed into latitude bands one window high; a
/// query scans the covering bands and applies the exact window test. The
/// window is a necessary-but-not-sufficient filter: it may let a too-distant
/// candidate through (the exact haversine check is authoritative), but it
/// never excludes one within `radius_meters`.
pub(crate) struct LatitudeIndex {
  band_degrees: f64,
  radius_meters: f64,
  bands: HashMap<i64, Vec<(usize, Coordinates)>, RandomState>,
}

impl LatitudeIndex {
  pub(crate) fn build<I>(locations: I, radius_meters: f64) -> LatitudeIndex
  where
    I: IntoIterator<Item = Option<Coordinates>>,
  {
    let band_degrees = latitude_window_degrees(radius_meters);
    let mut bands: HashMap<i64, Vec<(usize, Coordinates)>, RandomState> = HashMap::default();

    for (index, coordinates) in locations.into_iter().enumerate() {
      if let Some(coordinates) = coordinates {
        bands.entry(Self::band(coordinates.latitude, band_degrees)).or_default().push((index, coordinates));
      }
    }

    LatitudeIndex { band_degrees, radius_meters, bands }
  }

  fn band(latitude: f64, band_degrees: f64) -> i64 {
    (latitude / band_degrees).floor() as i64
  }

  /// Indices of located candidates inside the window around `center`, in
  /// ascending input order.
  pub(crate) fn query(&self, center: Coordinates) -> Vec<usize> {
    let lat_window = self.band_degrees;
    let lon_window = longitude_window_degrees(self.radius_meters, center.latitude);

    let low = Self::band(center.latitude - lat_window, self.band_degrees);
    let high = Self::band(center.latitude + lat_window, self.band_degrees);

    let mut hits = Vec::new();

    for band in low..=high {
      let Some(entries) = self.bands.get(&band) else {
        continue;
      };

      for (index, coordinates) in entries {
        if (coordinates.latitude - center.latitude).abs() > lat_window {
          continue;
        }

        if let Some(window) = lon_window
          && longitude_delta_degrees(coordinates.longitude, center.longitude) > window
        {
          continue;
        }

        hits.push(*index);
      }
    }

    hits.sort_unstable();
    hits
  }
}
