use std::{io::Read, path::PathBuf};

use anyhow::Context;
use clap::Args;

#[derive(Args)]
pub struct ReportArgs {
  /// Joined output produced by the link command
  #[arg(long)]
  pub input: PathBuf,

  /// Combined-score threshold for the high-confidence count
  #[arg(long, default_value_t = 0.8)]
  pub high_confidence: f64,
}

#[derive(Debug, Default, PartialEq)]
pub struct Summary {
  pub total: usize,
  pub matched: usize,
  pub high_confidence: usize,
  pub mean_distance_meters: Option<f64>,
}

impl Summary {
  fn rate(part: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { part as f64 / total as f64 * 100.0 }
  }
}

pub fn summarize<R: Read>(reader: R, high_confidence: f64) -> anyhow::Result<Summary> {
  let mut reader = csv::Reader::from_reader(reader);
  let headers = reader.headers().context("joined output has no header row")?.clone();

  let column = |name: &str| headers.iter().position(|h| h == name).with_context(|| format!("joined output is missing the {name} column"));

  let fhrs_id = column("fhrs_id")?;
  let match_score = column("match_score")?;
  let match_distance = column("match_distance_m")?;

  let mut summary = Summary::default();
  let mut distance_sum = 0.0;
  let mut distance_count = 0usize;

  for record in reader.records() {
    let record = record.context("malformed joined output row")?;

    summary.total += 1;

    if record.get(fhrs_id).is_none_or(|id| id.trim().is_empty()) {
      continue;
    }

    summary.matched += 1;

    if let Some(score) = record.get(match_score).and_then(|s| s.trim().parse::<f64>().ok())
      && score >= high_confidence
    {
      summary.high_confidence += 1;
    }

    if let Some(distance) = record.get(match_distance).and_then(|d| d.trim().parse::<f64>().ok()) {
      distance_sum += distance;
      distance_count += 1;
    }
  }

  if distance_count > 0 {
    summary.mean_distance_meters = Some(distance_sum / distance_count as f64);
  }

  Ok(summary)
}

pub fn run(args: ReportArgs) -> anyhow::Result<()> {
  let file = std::fs::File::open(&args.input).with_context(|| format!("could not open {}", args.input.display()))?;
  let summary = summarize(file, args.high_confidence)?;

  println!("Total places:           {}", summary.total);
  println!("Matched to a rating:    {} ({:.1}%)", summary.matched, Summary::rate(summary.matched, summary.total));
  println!(
    "High confidence (>= {}): {} ({:.1}%)",
    args.high_confidence,
    summary.high_confidence,
    Summary::rate(summary.high_confidence, summary.total)
  );

  if let Some(mean) = summary.mean_distance_meters {
    println!("Mean match distance:    {mean:.1} m");
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  #[test]
  fn summarizes_joined_output() {
    let csv = "\
place_id,name,fhrs_id,match_score,match_distance_m
p-1,The Crown & Anchor,411,1.000,12.3
p-2,Dishoom,77,0.612,48.7
p-3,Unmatched Cafe,,0.214,
";

    let summary = super::summarize(csv.as_bytes(), 0.8).unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.matched, 2);
    assert_eq!(summary.high_confidence, 1);
    assert!((summary.mean_distance_meters.unwrap() - 30.5).abs() < 1e-9);
  }

  #[test]
  fn empty_input_is_not_an_error() {
    let csv = "place_id,name,fhrs_id,match_score,match_distance_m\n";
    let summary = super::summarize(csv.as_bytes(), 0.8).unwrap();

    assert_eq!(summary.total, 0);
    assert_eq!(summary.matched, 0);
    assert_eq!(summary.mean_distance_meters, None);
  }
}
