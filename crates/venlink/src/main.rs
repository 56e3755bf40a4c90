mod fhrs;
mod io;
mod places;
mod report;

use std::{fs::File, path::PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use libvenlink::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Link food venues to hygiene ratings", long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Grid-scan the places directory into a CSV snapshot
  FetchPlaces(places::FetchPlacesArgs),
  /// Grid-scan the hygiene registry into a CSV snapshot
  FetchRatings(fhrs::FetchRatingsArgs),
  /// Link a places snapshot against a ratings snapshot
  Link(LinkArgs),
  /// Summarize a linked output file
  Report(report::ReportArgs),
}

#[derive(Args)]
struct LinkArgs {
  /// Places snapshot produced by fetch-places
  #[arg(long)]
  places: PathBuf,

  /// Ratings snapshot produced by fetch-ratings
  #[arg(long)]
  ratings: PathBuf,

  /// Destination for the joined output
  #[arg(long)]
  output: PathBuf,

  /// Full engine configuration as JSON; overrides the individual flags
  #[arg(long)]
  params: Option<PathBuf>,

  #[arg(long, default_value_t = 500.0)]
  max_distance_meters: f64,

  #[arg(long, default_value_t = 0.5)]
  min_match_score: f64,

  #[arg(long, default_value_t = 0.7)]
  name_weight: f64,

  #[arg(long, default_value_t = 0.2)]
  distance_weight: f64,

  #[arg(long, default_value_t = 0.1)]
  postcode_weight: f64,
}

impl LinkArgs {
  fn match_params(&self) -> anyhow::Result<MatchParams> {
    if let Some(path) = &self.params {
      let file = File::open(path).with_context(|| format!("could not open {}", path.display()))?;

      return serde_json::from_reader(file).with_context(|| format!("invalid engine configuration in {}", path.display()));
    }

    Ok(MatchParams {
      max_distance_meters: self.max_distance_meters,
      min_match_score: self.min_match_score,
      weights: Weights {
        name: self.name_weight,
        distance: self.distance_weight,
        postcode: self.postcode_weight,
      },
      ..Default::default()
    })
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  match Cli::parse().command {
    Command::FetchPlaces(args) => places::run(args).await,
    Command::FetchRatings(args) => fhrs::run(args).await,
    Command::Link(args) => run_link(args),
    Command::Report(args) => report::run(args),
  }
}

fn run_link(args: LinkArgs) -> anyhow::Result<()> {
  let params = args.match_params()?;
  let linker = Linker::new(params)?;

  let places = io::load_places(&args.places)?;
  let establishments = io::load_establishments(&args.ratings)?;

  tracing::info!(places = places.len(), establishments = establishments.len(), "loaded snapshots");

  let results = linker.link(&places, &establishments);

  io::write_matches(&args.output, &places, &results)?;

  let matched = results.iter().filter(|result| result.candidate_id.is_some()).count();

  tracing::info!(
    matched,
    total = results.len(),
    output = %args.output.display(),
    "wrote joined output"
  );

  Ok(())
}
