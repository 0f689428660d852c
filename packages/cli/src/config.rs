//! TOML run configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use osm_geojson_features::BufferOptions;
use osm_geojson_features::buffer::DEFAULT_POINT_SEGMENTS;
use osm_geojson_overpass::TagFilter;
use serde::Deserialize;

/// Errors that can occur while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing failed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The file parsed but a value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A complete run configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory for coordinate caches and the final `GeoJSON`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Overpass area selector restricting the search, e.g.
    /// `["ISO3166-1"="DE"][admin_level=2]`. Worldwide when absent.
    #[serde(default)]
    pub area: Option<String>,
    /// Overpass interpreter URL. Defaults to the public instance.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// HTTP timeout per request.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub simplify: SimplifyConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    /// Tags to fetch. Each becomes one coordinate file and contributes its
    /// tag as a property to the features it produces.
    pub queries: Vec<TagFilter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimplifyConfig {
    /// Douglas-Peucker tolerance in degrees. No simplification when absent.
    #[serde(default)]
    pub epsilon: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BufferConfig {
    /// Buffer distance in degrees; negative erodes, zero disables.
    #[serde(default)]
    pub distance: f64,
    /// Turn points into disks as well.
    #[serde(default)]
    pub points: bool,
    #[serde(default = "default_point_segments")]
    pub point_segments: u32,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            distance: 0.0,
            points: false,
            point_segments: DEFAULT_POINT_SEGMENTS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

const fn default_point_segments() -> u32 {
    DEFAULT_POINT_SEGMENTS
}

const fn default_true() -> bool {
    true
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output_dir: Option<PathBuf>,
    pub epsilon: Option<f64>,
    pub buffer: Option<f64>,
    pub no_merge: bool,
}

impl Config {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading configuration from {}", path.display());
        let toml_str = std::fs::read_to_string(path)?;
        Self::parse(&toml_str)
    }

    /// Applies command-line overrides and re-validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if an override is out of range.
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self, ConfigError> {
        if let Some(output_dir) = overrides.output_dir {
            self.output_dir = output_dir;
        }
        if let Some(epsilon) = overrides.epsilon {
            self.simplify.epsilon = Some(epsilon);
        }
        if let Some(distance) = overrides.buffer {
            self.buffer.distance = distance;
        }
        if overrides.no_merge {
            self.merge.enabled = false;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.queries.is_empty() {
            return Err(ConfigError::Invalid("no [[queries]] configured".to_string()));
        }
        if let Some(filter) = self.queries.iter().find(|q| q.key.is_empty()) {
            return Err(ConfigError::Invalid(format!("empty query key in {filter:?}")));
        }
        let mut slugs: BTreeMap<String, &TagFilter> = BTreeMap::new();
        for filter in &self.queries {
            if let Some(other) = slugs.insert(filter.slug(), filter) {
                return Err(ConfigError::Invalid(format!(
                    "queries {other} and {filter} share the coordinate file {}.json",
                    filter.slug()
                )));
            }
        }
        match self.simplify.epsilon {
            Some(epsilon) if !epsilon.is_finite() || epsilon < 0.0 => {
                return Err(ConfigError::Invalid(format!(
                    "simplify.epsilon must be a non-negative number, got {epsilon}"
                )));
            }
            _ => {}
        }
        if !self.buffer.distance.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "buffer.distance must be finite, got {}",
                self.buffer.distance
            )));
        }
        Ok(())
    }

    /// Buffer parameters for the feature stage.
    #[must_use]
    pub const fn buffer_options(&self) -> BufferOptions {
        BufferOptions::new(self.buffer.distance)
            .with_points(self.buffer.points)
            .with_point_segments(self.buffer.point_segments)
    }

    /// Per-request HTTP timeout, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Where the coordinate set for `filter` is stored.
    #[must_use]
    pub fn coordinates_path(&self, filter: &TagFilter) -> PathBuf {
        self.output_dir
            .join("coordinates")
            .join(format!("{}.json", filter.slug()))
    }

    /// Where the final feature collection is written.
    #[must_use]
    pub fn features_path(&self) -> PathBuf {
        self.output_dir.join("features.geojson")
    }
}
