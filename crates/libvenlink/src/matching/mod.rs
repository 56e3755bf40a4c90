pub(crate) mod signals;

use serde::Deserialize;
use serde_inline_default::serde_inline_default;

use crate::error::LinkError;

/// Relative weight of each signal in the combined score.
///
/// The combined score lives in `[0, total()]`; `min_match_score` must be
/// calibrated against the same scale. The defaults sum to 1.0.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Weights {
  pub name: f64,
  pub distance: f64,
  pub postcode: f64,
}

impl Weights {
  pub fn total(&self) -> f64 {
    self.name + self.distance + self.postcode
  }
}

impl Default for Weights {
  fn default() -> Weights {
    Weights { name: 0.7, distance: 0.2, postcode: 0.1 }
  }
}

/// Piecewise-constant distance scoring: the first step whose breakpoint
/// contains the distance wins; past the last step, `beyond` applies up to the
/// hard cutoff, and 0.0 after it.
#[derive(Clone, Debug, Deserialize)]
pub struct DistanceBuckets {
  pub steps: Vec<(f64, f64)>,
  pub beyond: f64,
}

impl Default for DistanceBuckets {
  fn default() -> DistanceBuckets {
    DistanceBuckets {
      steps: vec![(50.0, 1.0), (150.0, 0.7), (300.0, 0.4)],
      beyond: 0.2,
    }
  }
}

#[serde_inline_default]
#[derive(Clone, Debug, Deserialize)]
pub struct MatchParams {
  /// Spatial hard cutoff: candidates farther than this never match.
  #[serde_inline_default(500.0)]
  pub max_distance_meters: f64,
  /// Acceptance floor on the combined score, on the `[0, weights.total()]`
  /// scale.
  #[serde_inline_default(0.5)]
  pub min_match_score: f64,
  #[serde(default)]
  pub weights: Weights,
  #[serde(default)]
  pub distance_buckets: DistanceBuckets,
}

impl Default for MatchParams {
  fn default() -> MatchParams {
    MatchParams {
      max_distance_meters: 500.0,
      min_match_score: 0.5,
      weights: Weights::default(),
      distance_buckets: DistanceBuckets::default(),
    }
  }
}

impl MatchParams {
  /// Fatal pre-batch validation: a configuration that would silently produce
  /// meaningless scores aborts before any record is processed.
  pub fn validate(&self) -> Result<(), LinkError> {
    if !self.max_distance_meters.is_finite() || self.max_distance_meters <= 0.0 {
      return Err(LinkError::Config(format!("max_distance_meters must be a positive number, got {}", self.max_distance_meters)));
    }

    for (label, weight) in [("name", self.weights.name), ("distance", self.weights.distance), ("postcode", self.weights.postcode)] {
      if !weight.is_finite() || weight < 0.0 {
        return Err(LinkError::Config(format!("{label} weight must be a non-negative number, got {weight}")));
      }
    }

    if self.weights.total() <= 0.0 {
      return Err(LinkError::Config("signal weights must not all be zero".to_string()));
    }

    if !self.min_match_score.is_finite() || self.min_match_score < 0.0 || self.min_match_score > self.weights.total() {
      return Err(LinkError::Config(format!(
        "min_match_score must lie within [0, {}], got {}",
        self.weights.total(),
        self.min_match_score
      )));
    }

    let mut previous: Option<(f64, f64)> = None;

    for &(meters, score) in &self.distance_buckets.steps {
      if !meters.is_finite() || meters <= 0.0 {
        return Err(LinkError::Config(format!("distance bucket breakpoint must be a positive number, got {meters}")));
      }

      if meters > self.max_distance_meters {
        return Err(LinkError::Config(format!("distance bucket at {meters} m lies past the {} m cutoff", self.max_distance_meters)));
      }

      if !(0.0..=1.0).contains(&score) {
        return Err(LinkError::Config(format!("distance bucket score must lie within [0, 1], got {score}")));
      }

      if let Some((previous_meters, previous_score)) = previous {
        if meters <= previous_meters {
          return Err(LinkError::Config("distance bucket breakpoints must be strictly increasing".to_string()));
        }

        if score > previous_score {
          return Err(LinkError::Config("distance bucket scores must not increase with distance".to_string()));
        }
      }

      previous = Some((meters, score));
    }

    if !(0.0..=1.0).contains(&self.distance_buckets.beyond) {
      return Err(LinkError::Config(format!("distance score past the last bucket must lie within [0, 1], got {}", self.distance_buckets.beyond)));
    }

    if let Some((_, last_score)) = previous
      && self.distance_buckets.beyond > last_score
    {
      return Err(LinkError::Config("distance score past the last bucket must not exceed the last bucket score".to_string()));
    }

    Ok(())
  }
}
