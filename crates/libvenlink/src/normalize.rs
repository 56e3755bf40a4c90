use std::sync::LazyLock;

use any_ascii::any_ascii;
use regex::Regex;

static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Z0-9 ]+").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const LEGAL_SUFFIXES: [&str; 2] = [" LTD", " LIMITED"];

/// Canonicalize a display name into a comparison key.
///
/// ASCII-folds and uppercases, expands `&` to ` AND `, drops everything
/// outside `[A-Z0-9 ]`, collapses whitespace and strips trailing legal-entity
/// suffixes. Idempotent: suffixes are stripped after punctuation removal and
/// until none terminates the string, so a second pass is a no-op.
pub fn normalize_name(raw: &str) -> String {
  if raw.is_empty() {
    return String::new();
  }

  let folded = any_ascii(raw).to_uppercase().replace('&', " AND ");
  let cleaned = NON_ALPHANUMERIC.replace_all(&folded, "");
  let mut name = WHITESPACE.replace_all(&cleaned, " ").trim().to_string();

  loop {
    let length = name.len();

    for suffix in LEGAL_SUFFIXES {
      if name.ends_with(suffix) {
        name.truncate(name.len() - suffix.len());
      }
    }

    if name.len() == length {
      break;
    }
  }

  name
}

/// Canonicalize a postcode: uppercase, all whitespace removed. Also used on
/// the probe's full address to form the corroboration key, since the signal is
/// a literal substring test.
pub fn normalize_postcode(raw: &str) -> String {
  raw.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase()
}
