use itertools::Itertools;
use strsim::normalized_levenshtein;

use crate::matching::MatchParams;

/// Token-order-invariant name similarity over normalized keys.
///
/// Tokens are sorted before the edit-distance ratio so that
/// `CROWN ANCHOR THE` and `THE CROWN ANCHOR` compare at 1.0. Symmetric; 0.0
/// when either key is empty.
pub(crate) fn name_score(lhs: &str, rhs: &str) -> f64 {
  if lhs.is_empty() || rhs.is_empty() {
    return 0.0;
  }

  if lhs == rhs {
    return 1.0;
  }

  let lhs = lhs.split_whitespace().sorted_unstable().join(" ");
  let rhs = rhs.split_whitespace().sorted_unstable().join(" ");

  normalized_levenshtein(&lhs, &rhs)
}

/// Piecewise-constant distance score; 0.0 when the distance is incomputable.
pub(crate) fn distance_score(distance_meters: Option<f64>, params: &MatchParams) -> f64 {
  let Some(distance) = distance_meters else {
    return 0.0;
  };

  for &(within, score) in &params.distance_buckets.steps {
    if distance <= within {
      return score;
    }
  }

  if distance <= params.max_distance_meters { params.distance_buckets.beyond } else { 0.0 }
}

/// Corroboration: 1.0 iff the candidate's postcode key appears literally in
/// the probe's address key; 0.0 when either is empty.
pub(crate) fn postcode_score(postcode_key: &str, address_key: &str) -> f64 {
  if postcode_key.is_empty() || address_key.is_empty() {
    return 0.0;
  }

  if address_key.contains(postcode_key) { 1.0 } else { 0.0 }
}
