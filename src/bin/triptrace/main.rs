use std::{
  io::Read,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::error;
use serde_json::Value;
use triptrace::{
  config::Config,
  enrichment::PlaceResolver,
  registry::StyleFamily,
  session::{TimelineSession, TraceSession, parse_date_fragment, today},
  source::{StaticSource, TripSource},
  surface::StyledGeoJsonSurface,
  task_tracker::task_tracker,
  timeline::html::render_table,
};

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Prints the trip table of a day as html table rows.
  Timeline {
    /// The day, as 2015-06-01 or #2015-06-01. Today if missing or unreadable.
    #[arg(short, long)]
    date: Option<String>,

    /// Reads the trip document from a file instead of the server. `-` is stdin.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Leaves coordinate places unnamed.
    #[arg(long, default_value_t = false)]
    no_enrich: bool,
  },
  /// Prints the styled trace of a day as GeoJSON.
  Trace {
    #[arg(short, long)]
    date: Option<String>,

    #[arg(short, long)]
    file: Option<PathBuf>,
  },
  /// Prints the styled position predictions as GeoJSON.
  Predict {
    #[arg(short, long)]
    file: Option<PathBuf>,
  },
}

fn read_document(path: &Path) -> Result<Value> {
  let mut text = String::new();
  if path == Path::new("-") {
    std::io::stdin()
      .read_to_string(&mut text)
      .context("Failed to read stdin")?;
  } else {
    text = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read {}", path.display()))?;
  }
  serde_json::from_str(&text).with_context(|| format!("{} is not json", path.display()))
}

fn source(config: &Config, file: Option<&Path>) -> Result<Arc<dyn TripSource>> {
  Ok(match file {
    Some(path) => Arc::new(StaticSource::new(read_document(path)?)),
    None => Arc::new(config.trip_source()?),
  })
}

async fn timeline(
  config: &Config,
  date: Option<&str>,
  file: Option<&Path>,
  no_enrich: bool,
) -> Result<()> {
  let resolver = if no_enrich {
    None
  } else {
    Some(PlaceResolver::new(config.geocoder()?))
  };
  let mut session = TimelineSession::new(source(config, file)?, resolver);
  session
    .show(parse_date_fragment(date.unwrap_or_default(), today()))
    .await?;
  session.settle().await;
  let pending = task_tracker().summary();
  if !pending.is_empty() {
    log::debug!("Still running: {pending}");
  }
  if let Some(grid) = session.grid() {
    println!("{}", render_table(grid));
  }
  Ok(())
}

async fn trace(config: &Config, date: Option<&str>, file: Option<&Path>) -> Result<()> {
  let mut session = TraceSession::new(
    source(config, file)?,
    StyledGeoJsonSurface::new(),
    StyleFamily::Trace,
  );
  session
    .show(parse_date_fragment(date.unwrap_or_default(), today()))
    .await?;
  println!("{}", serde_json::to_string_pretty(&session.surface().to_geojson())?);
  Ok(())
}

async fn predict(config: &Config, file: Option<&Path>) -> Result<()> {
  let mut session = TraceSession::new(
    source(config, file)?,
    StyledGeoJsonSurface::new(),
    StyleFamily::Prediction,
  );
  session.show_predictions().await?;
  println!("{}", serde_json::to_string_pretty(&session.surface().to_geojson())?);
  Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
  let args = Args::parse();

  env_logger::init();

  let config = Config::new();
  let result = match &args.command {
    Command::Timeline {
      date,
      file,
      no_enrich,
    } => timeline(&config, date.as_deref(), file.as_deref(), *no_enrich).await,
    Command::Trace { date, file } => trace(&config, date.as_deref(), file.as_deref()).await,
    Command::Predict { file } => predict(&config, file.as_deref()).await,
  };

  if let Err(e) = result {
    error!("{e:#}");
    std::process::exit(1);
  }
}
