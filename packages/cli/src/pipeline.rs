//! Fetch and build stages behind the `fetch`, `build` and `run` commands.
//!
//! Build stages run in a fixed order: drop invalid records and simplify
//! each query's coordinates, build features tagged with the query,
//! concatenate, buffer, merge.
//! Per-record problems never abort a run; they are collected into
//! [`Diagnostics`] and logged as a summary after each stage.

use std::sync::Arc;

use osm_geojson_features::builder::build_features;
use osm_geojson_features::{FeatureError, FeatureSet};
use osm_geojson_geometry::coordinates::{self, simplify_records};
use osm_geojson_geometry::{Diagnostics, GeometryError, PersistError};
use osm_geojson_geometry_models::{CoordinateSet, Properties};
use osm_geojson_overpass::progress::ProgressCallback;
use osm_geojson_overpass::{FetchError, OverpassClient, TagFilter};

use crate::config::{Config, ConfigError};

/// Number of progress steps reported by [`build`].
pub const BUILD_STAGES: u64 = 4;

/// Errors that can abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Fetching from Overpass failed.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// A geometry operation was given invalid parameters.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Reading or writing a coordinate file failed.
    #[error("Persist error: {0}")]
    Persist(#[from] PersistError),

    /// A feature operation failed.
    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),
}

/// Coordinates fetched for one query.
pub type QueryResult = (TagFilter, CoordinateSet);

/// Fetches every configured query from Overpass.
///
/// # Errors
///
/// Returns [`PipelineError::Fetch`] on the first failed request.
pub async fn fetch(
    config: &Config,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Vec<QueryResult>, PipelineError> {
    let client = OverpassClient::new(config.endpoint.clone(), config.area.clone(), config.timeout())?;
    log::info!(
        "Fetching {} queries from {} (area: {})",
        config.queries.len(),
        client.endpoint(),
        config.area.as_deref().unwrap_or("worldwide")
    );

    Ok(client.fetch_batch(&config.queries, progress).await?)
}

/// Saves each query's coordinates to [`Config::coordinates_path`].
///
/// # Errors
///
/// Returns [`PipelineError::Persist`] if a file cannot be written.
pub fn save_coordinates(config: &Config, results: &[QueryResult]) -> Result<(), PipelineError> {
    for (filter, set) in results {
        coordinates::save(set, &config.coordinates_path(filter))?;
    }
    Ok(())
}

/// Reads the coordinate files written by a previous `fetch`.
///
/// # Errors
///
/// Returns [`PipelineError::Persist`] if a query's file is missing or
/// malformed.
pub fn read_coordinates(config: &Config) -> Result<Vec<QueryResult>, PipelineError> {
    config
        .queries
        .iter()
        .map(|filter| {
            let set = coordinates::read(&config.coordinates_path(filter))?;
            Ok((filter.clone(), set))
        })
        .collect()
}

/// Turns fetched coordinates into the final feature set.
///
/// # Errors
///
/// Returns [`PipelineError::Geometry`] or [`PipelineError::Feature`] if the
/// configured tolerance or buffer distance is invalid.
pub fn build(
    config: &Config,
    inputs: Vec<QueryResult>,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<(FeatureSet, Diagnostics), PipelineError> {
    let mut all = Diagnostics::new();
    progress.set_total(BUILD_STAGES);

    progress.set_message("Simplifying".to_string());
    let mut stage = Diagnostics::new();
    let mut simplified = Vec::with_capacity(inputs.len());
    for (filter, set) in inputs {
        let (set, dropped) = coordinates::drop_degenerate(&set);
        stage.extend(dropped);

        let set = match config.simplify.epsilon {
            Some(epsilon) => {
                let (set, diagnostics) = simplify_records(&set, epsilon)?;
                stage.extend(diagnostics);
                set
            }
            None => set,
        };
        simplified.push((filter, set));
    }
    finish_stage("simplify", stage, &mut all, progress);

    progress.set_message("Building features".to_string());
    let mut stage = Diagnostics::new();
    let per_query: Vec<FeatureSet> = simplified
        .iter()
        .map(|(filter, set)| {
            let mut properties = Properties::new();
            let (key, value) = filter.property();
            properties.insert(key, value);

            let (features, diagnostics) = build_features(set, &properties);
            stage.extend(diagnostics);
            features
        })
        .collect();
    let features = FeatureSet::concat(per_query);
    finish_stage("build", stage, &mut all, progress);

    progress.set_message("Buffering".to_string());
    let (features, stage) = features.buffer(&config.buffer_options())?;
    finish_stage("buffer", stage, &mut all, progress);

    progress.set_message("Merging".to_string());
    let features = if config.merge.enabled {
        features.merge()
    } else {
        log::info!("Merging disabled");
        features
    };
    progress.inc(1);

    progress.finish(format!(
        "Built {} features ({} diagnostics)",
        features.len(),
        all.len()
    ));

    Ok((features, all))
}

fn finish_stage(
    name: &str,
    stage: Diagnostics,
    all: &mut Diagnostics,
    progress: &Arc<dyn ProgressCallback>,
) {
    stage.log_summary(name);
    all.extend(stage);
    progress.inc(1);
}

/// Writes the final feature set to [`Config::features_path`].
///
/// # Errors
///
/// Returns [`PipelineError::Feature`] if the file cannot be written.
pub fn save_features(config: &Config, features: &FeatureSet) -> Result<(), PipelineError> {
    features.save(&config.features_path())?;
    Ok(())
}
