#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fetches OSM tags from Overpass and writes them as merged `GeoJSON`.
//!
//! Uses `indicatif-log-bridge` (via [`osm_geojson_cli_utils::init_logger`])
//! so `log` output and progress bars share the terminal cleanly.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use osm_geojson_cli::config::{Config, Overrides};
use osm_geojson_cli::pipeline::{self, BUILD_STAGES};
use osm_geojson_cli_utils::{IndicatifProgress, MultiProgress};

#[derive(Parser)]
#[command(name = "osm_geojson", about = "OSM tag to GeoJSON feature pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every configured query and save one coordinate file per query
    Fetch(CommonArgs),
    /// Build merged `GeoJSON` from previously fetched coordinate files
    Build(CommonArgs),
    /// Fetch, then build, without re-reading the coordinate files
    Run(CommonArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "osm_geojson.toml")]
    config: PathBuf,
    /// Douglas-Peucker tolerance in degrees (overrides `simplify.epsilon`)
    #[arg(long)]
    epsilon: Option<f64>,
    /// Buffer distance in degrees; negative erodes (overrides `buffer.distance`)
    #[arg(long, allow_negative_numbers = true)]
    buffer: Option<f64>,
    /// Skip merging overlapping features
    #[arg(long)]
    no_merge: bool,
    /// Output directory (overrides `output_dir`)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl CommonArgs {
    fn load(self) -> Result<Config, Box<dyn std::error::Error>> {
        let overrides = Overrides {
            output_dir: self.output_dir,
            epsilon: self.epsilon,
            buffer: self.buffer,
            no_merge: self.no_merge,
        };
        Ok(Config::load(&self.config)?.with_overrides(overrides)?)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = osm_geojson_cli_utils::init_logger();
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::Fetch(args) => {
            let config = args.load()?;
            let results = fetch(&config, &multi).await?;
            pipeline::save_coordinates(&config, &results)?;
        }
        Commands::Build(args) => {
            let config = args.load()?;
            let inputs = pipeline::read_coordinates(&config)?;
            build(&config, inputs, &multi)?;
        }
        Commands::Run(args) => {
            let config = args.load()?;
            let results = fetch(&config, &multi).await?;
            pipeline::save_coordinates(&config, &results)?;
            build(&config, results, &multi)?;
        }
    }

    log::info!("Done in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

async fn fetch(
    config: &Config,
    multi: &MultiProgress,
) -> Result<Vec<pipeline::QueryResult>, Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::fetch_bar(multi, "Fetching");
    Ok(pipeline::fetch(config, &progress).await?)
}

fn build(
    config: &Config,
    inputs: Vec<pipeline::QueryResult>,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::stages_bar(multi, "Building", BUILD_STAGES);
    let (features, diagnostics) = pipeline::build(config, inputs, &progress)?;

    for (kind, count) in diagnostics.summary() {
        log::info!("{kind}: {count}");
    }

    pipeline::save_features(config, &features)?;
    println!(
        "Wrote {} features to {}",
        features.len(),
        config.features_path().display()
    );
    Ok(())
}
