use rayon::prelude::*;
use tracing::instrument;

use crate::{
  error::LinkError,
  geo::{self, LatitudeIndex},
  matching::{MatchParams, signals},
  model::{Establishment, KeyedEstablishment, KeyedPlace, MatchResult, Place},
};

struct Scored {
  candidate: usize,
  combined: f64,
  name: f64,
  distance: f64,
  postcode: f64,
  distance_meters: Option<f64>,
}

/// The batch record-linkage engine.
///
/// Holds a validated configuration and matches a probe collection against a
/// candidate collection. Pure over its inputs: neither collection is mutated,
/// no state survives a run, and identical inputs produce identical results.
///
/// # Examples
///
/// ```rust
/// use libvenlink::prelude::*;
///
/// let places = vec![Place {
///   id: "p-1".to_string(),
///   name: "The Crown & Anchor LTD".to_string(),
///   address: "1 SW1A 1AA, London".to_string(),
///   coordinates: Coordinates::new(51.5007, -0.1246),
///   ..Default::default()
/// }];
///
/// let establishments = vec![Establishment {
///   id: "411".to_string(),
///   name: "THE CROWN AND ANCHOR".to_string(),
///   postcode: "SW1A 1AA".to_string(),
///   coordinates: Coordinates::new(51.5008, -0.1247),
///   ..Default::default()
/// }];
///
/// let results = link(&places, &establishments, &MatchParams::default()).unwrap();
///
/// assert_eq!(results[0].candidate_id.as_deref(), Some("411"));
/// ```
pub struct Linker {
  params: MatchParams,
}

impl Linker {
  /// Validate the configuration once, before any record is processed.
  pub fn new(params: MatchParams) -> Result<Linker, LinkError> {
    params.validate()?;

    Ok(Linker { params })
  }

  pub fn params(&self) -> &MatchParams {
    &self.params
  }

  /// Match every probe against the candidate collection, returning one
  /// result per probe in probe input order.
  ///
  /// Probe searches are independent and run in parallel over a read-shared
  /// candidate snapshot and spatial index.
  #[instrument(name = "link", skip_all, fields(probes = places.len(), candidates = establishments.len()))]
  pub fn link(&self, places: &[Place], establishments: &[Establishment]) -> Vec<MatchResult> {
    let probes: Vec<KeyedPlace> = places.iter().map(KeyedPlace::new).collect();
    let candidates: Vec<KeyedEstablishment> = establishments.iter().map(KeyedEstablishment::new).collect();
    let index = LatitudeIndex::build(establishments.iter().map(|e| e.coordinates), self.params.max_distance_meters);

    let results: Vec<MatchResult> = probes.par_iter().map(|probe| self.best_match(probe, &candidates, &index)).collect();

    let matched = results.iter().filter(|result| result.candidate_id.is_some()).count();

    tracing::info!(probes = results.len(), matched, "linked probe collection");

    results
  }

  fn best_match(&self, probe: &KeyedPlace, candidates: &[KeyedEstablishment], index: &LatitudeIndex) -> MatchResult {
    // Without probe coordinates there is nothing to prune on: scan the full
    // collection. Otherwise the window query reaches located candidates only.
    let pool: Vec<usize> = match probe.place.coordinates {
      Some(center) => index.query(center),
      None => (0..candidates.len()).collect(),
    };

    let mut best: Option<Scored> = None;

    for position in pool {
      let candidate = &candidates[position];

      let distance_meters = match (probe.place.coordinates, candidate.establishment.coordinates) {
        (Some(a), Some(b)) => Some(geo::haversine_meters(a, b)),
        _ => None,
      };

      // The exact distance is authoritative over the coarse window.
      if distance_meters.is_some_and(|d| d > self.params.max_distance_meters) {
        continue;
      }

      let name = signals::name_score(&probe.name_key, &candidate.name_key);
      let distance = signals::distance_score(distance_meters, &self.params);
      let postcode = signals::postcode_score(&candidate.postcode_key, &probe.address_key);

      let weights = &self.params.weights;
      let combined = weights.name * name + weights.distance * distance + weights.postcode * postcode;

      tracing::debug!(
        probe = %probe.place.id,
        candidate = %candidate.establishment.id,
        name,
        distance,
        postcode,
        combined,
        "scored candidate"
      );

      // First-max tie-break: a later candidate must strictly beat the best.
      if best.as_ref().is_none_or(|scored| combined > scored.combined) {
        best = Some(Scored {
          candidate: position,
          combined,
          name,
          distance,
          postcode,
          distance_meters,
        });
      }
    }

    let Some(scored) = best else {
      return MatchResult::unmatched(&probe.place.id);
    };

    let accepted = scored.combined >= self.params.min_match_score;
    let establishment = candidates[scored.candidate].establishment;

    MatchResult {
      probe_id: probe.place.id.clone(),
      candidate_id: accepted.then(|| establishment.id.clone()),
      combined_score: scored.combined,
      name_score: scored.name,
      distance_score: scored.distance,
      postcode_score: scored.postcode,
      distance_meters: scored.distance_meters,
      candidate: accepted.then(|| establishment.clone()),
    }
  }
}

/// One-shot convenience over [`Linker`].
pub fn link(places: &[Place], establishments: &[Establishment], params: &MatchParams) -> Result<Vec<MatchResult>, LinkError> {
  Ok(Linker::new(params.clone())?.link(places, establishments))
}

#[cfg(test)]
mod tests {
  use float_cmp::assert_approx_eq;

  use super::{Linker, link};
  use crate::{
    error::LinkError,
    matching::MatchParams,
    model::{Coordinates, Establishment, Place},
  };

  fn place(id: &str, name: &str, address: &str, coordinates: Option<(f64, f64)>) -> Place {
    Place {
      id: id.to_string(),
      name: name.to_string(),
      address: address.to_string(),
      coordinates: coordinates.and_then(|(lat, lng)| Coordinates::new(lat, lng)),
      ..Default::default()
    }
  }

  fn establishment(id: &str, name: &str, postcode: &str, coordinates: Option<(f64, f64)>) -> Establishment {
    Establishment {
      id: id.to_string(),
      name: name.to_string(),
      postcode: postcode.to_string(),
      coordinates: coordinates.and_then(|(lat, lng)| Coordinates::new(lat, lng)),
      ..Default::default()
    }
  }

  #[test]
  fn full_agreement_scores_one() {
    let places = vec![place("p-1", "The Crown & Anchor LTD", "1 SW1A 1AA, London", Some((51.5007, -0.1246)))];
    let establishments = vec![establishment("411", "THE CROWN AND ANCHOR", "SW1A 1AA", Some((51.5008, -0.1247)))];

    let results = link(&places, &establishments, &MatchParams::default()).unwrap();
    let result = &results[0];

    assert_eq!(result.candidate_id.as_deref(), Some("411"));
    assert_eq!(result.name_score, 1.0);
    assert_eq!(result.distance_score, 1.0);
    assert_eq!(result.postcode_score, 1.0);
    assert_approx_eq!(f64, result.combined_score, 1.0, epsilon = 1e-12);
    assert!(result.distance_meters.unwrap() < 50.0);
    assert!(result.candidate.is_some());
  }

  #[test]
  fn distant_candidate_is_pruned() {
    // ~3 km north of the probe: outside the 500 m cutoff entirely.
    let places = vec![place("p-1", "The Crown & Anchor", "1 SW1A 1AA, London", Some((51.5007, -0.1246)))];
    let establishments = vec![establishment("500", "Red Lion", "N1 9AA", Some((51.5277, -0.1246)))];

    let results = link(&places, &establishments, &MatchParams::default()).unwrap();

    assert_eq!(results[0].candidate_id, None);
    assert_eq!(results[0].combined_score, 0.0);
    assert_eq!(results[0].candidate, None);
  }

  #[test]
  fn hard_reject_overrides_window() {
    // ~600 m away: inside the conservative degree window, past the cutoff.
    let places = vec![place("p-1", "The Crown & Anchor", "1 SW1A 1AA, London", Some((51.5007, -0.1246)))];
    let establishments = vec![establishment("411", "THE CROWN AND ANCHOR", "SW1A 1AA", Some((51.5061, -0.1246)))];

    let results = link(&places, &establishments, &MatchParams::default()).unwrap();

    assert_eq!(results[0].candidate_id, None);
    assert_eq!(results[0].combined_score, 0.0);
  }

  #[test]
  fn probe_without_coordinates_matches_on_name_and_postcode() {
    let places = vec![place("p-1", "The Crown & Anchor", "1 SW1A 1AA, London", None)];
    let establishments = vec![
      establishment("1", "Dishoom", "E2 7DP", Some((51.5236, -0.0782))),
      establishment("411", "THE CROWN AND ANCHOR", "SW1A 1AA", Some((51.5008, -0.1247))),
    ];

    let results = link(&places, &establishments, &MatchParams::default()).unwrap();
    let result = &results[0];

    assert_eq!(result.candidate_id.as_deref(), Some("411"));
    assert_eq!(result.distance_meters, None);
    assert_eq!(result.distance_score, 0.0);
    assert_approx_eq!(f64, result.combined_score, 0.8, epsilon = 1e-12);
  }

  #[test]
  fn below_floor_keeps_diagnostics() {
    let places = vec![place("p-1", "Mango Tree", "46 Grosvenor Place", Some((51.5007, -0.1246)))];
    let establishments = vec![establishment("9", "Completely Unrelated Kebabs", "XX1 1XX", Some((51.5008, -0.1247)))];

    let results = link(&places, &establishments, &MatchParams::default()).unwrap();
    let result = &results[0];

    assert_eq!(result.candidate_id, None);
    assert_eq!(result.candidate, None);
    assert!(result.combined_score > 0.0, "diagnostic score should survive");
    assert!(result.combined_score < 0.5);
  }

  #[test]
  fn empty_candidates_is_no_match_for_every_probe() {
    let places = vec![
      place("p-1", "The Crown & Anchor", "1 SW1A 1AA", Some((51.5007, -0.1246))),
      place("p-2", "Dishoom", "7 Boundary St", None),
    ];

    let results = link(&places, &[], &MatchParams::default()).unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|result| result.candidate_id.is_none() && result.combined_score == 0.0));
  }

  #[test]
  fn tie_breaks_on_first_encountered() {
    let places = vec![place("p-1", "The Crown", "1 SW1A 1AA", Some((51.5007, -0.1246)))];
    let establishments = vec![
      establishment("first", "THE CROWN", "SW1A 1AA", Some((51.5007, -0.1246))),
      establishment("second", "THE CROWN", "SW1A 1AA", Some((51.5007, -0.1246))),
    ];

    let results = link(&places, &establishments, &MatchParams::default()).unwrap();

    assert_eq!(results[0].candidate_id.as_deref(), Some("first"));
  }

  #[test]
  fn results_follow_probe_order() {
    let places: Vec<Place> = (0..64)
      .map(|i| place(&format!("p-{i}"), &format!("Venue {i}"), "1 High St", Some((51.4 + i as f64 * 0.001, -0.12))))
      .collect();
    let establishments: Vec<Establishment> = (0..64)
      .map(|i| establishment(&format!("e-{i}"), &format!("Venue {i}"), "SW1A 1AA", Some((51.4 + i as f64 * 0.001, -0.12))))
      .collect();

    let results = link(&places, &establishments, &MatchParams::default()).unwrap();

    for (position, result) in results.iter().enumerate() {
      assert_eq!(result.probe_id, format!("p-{position}"));
    }
  }

  #[test]
  fn runs_are_deterministic() {
    let places: Vec<Place> = (0..50)
      .map(|i| place(&format!("p-{i}"), &format!("The Lamb {}", i % 7), "1 High St SW1A 1AA", Some((51.49 + i as f64 * 0.0004, -0.12))))
      .collect();
    let establishments: Vec<Establishment> = (0..80)
      .map(|i| establishment(&format!("e-{i}"), &format!("The Lamb {}", i % 9), "SW1A 1AA", Some((51.49 + i as f64 * 0.00025, -0.1201))))
      .collect();

    let linker = Linker::new(MatchParams::default()).unwrap();

    assert_eq!(linker.link(&places, &establishments), linker.link(&places, &establishments));
  }

  #[test]
  fn invalid_configuration_is_fatal() {
    let params = MatchParams { min_match_score: 99.0, ..Default::default() };

    match Linker::new(params) {
      Err(LinkError::Config(message)) => assert!(message.contains("min_match_score")),
      Err(other) => panic!("expected a configuration error, got {other}"),
      Ok(_) => panic!("expected a configuration error"),
    }
  }

  #[test]
  fn matched_result_carries_payload() {
    let places = vec![place("p-1", "Hawksmoor", "157A Commercial St, E1 6BJ", Some((51.5194, -0.0751)))];
    let mut candidate = establishment("77", "Hawksmoor Spitalfields", "E1 6BJ", Some((51.5195, -0.0752)));
    candidate.hygiene_score = Some(5);
    candidate.local_authority = "Tower Hamlets".to_string();

    let results = link(&places, &[candidate.clone()], &MatchParams::default()).unwrap();

    assert_eq!(results[0].candidate.as_ref(), Some(&candidate));
  }
}
