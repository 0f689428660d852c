#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `GeoJSON` feature construction, buffering, and merging.
//!
//! Raw records from a [`CoordinateSet`](osm_geojson_geometry_models::CoordinateSet)
//! are turned into [`Feature`]s by [`builder`], optionally expanded or
//! eroded by [`buffer`], and collapsed by [`merge`] so that overlapping
//! polygons and duplicate points end up as a single feature. Every
//! transformation returns a new [`FeatureSet`]; inputs are never mutated.

pub mod buffer;
pub mod builder;
pub mod geojson_io;
pub mod merge;

use std::collections::BTreeMap;
use std::path::Path;

use geo::{Area, MultiPolygon, Point, Polygon};
use osm_geojson_geometry::Diagnostics;
use osm_geojson_geometry_models::Properties;

pub use buffer::BufferOptions;

/// Errors that can occur while working with features.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    /// Two features share an identifier.
    #[error("Duplicate feature identifier: {0}")]
    DuplicateIdentifier(String),

    /// Buffer distance is not a finite number.
    #[error("Invalid buffer distance {0}: must be finite")]
    InvalidDistance(f64),

    /// A persisted feature has a geometry type this tool does not handle.
    #[error("Unsupported geometry for feature {id}: {kind}")]
    UnsupportedGeometry {
        /// Identifier of the offending feature.
        id: String,
        /// `GeoJSON` geometry type name.
        kind: String,
    },

    /// The persisted document is valid `GeoJSON` but not a
    /// `FeatureCollection`.
    #[error("Expected a GeoJSON FeatureCollection")]
    NotAFeatureCollection,

    /// `GeoJSON` parsing or conversion failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Geometry carried by a [`Feature`].
///
/// Built features are points or polygons. Buffering a point yields a
/// polygon, and buffering or merging polygons may yield a multi-polygon.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    /// A single position.
    Point(Point<f64>),
    /// A polygon (exterior ring plus optional holes).
    Polygon(Polygon<f64>),
    /// Several disjoint polygons treated as one feature.
    MultiPolygon(MultiPolygon<f64>),
}

impl FeatureGeometry {
    /// Wraps a multi-polygon, unwrapping it to a plain polygon when it has
    /// exactly one part.
    #[must_use]
    pub fn from_multi_polygon(mut multi: MultiPolygon<f64>) -> Self {
        if multi.0.len() == 1 {
            Self::Polygon(multi.0.remove(0))
        } else {
            Self::MultiPolygon(multi)
        }
    }

    /// Whether this geometry covers an area (polygon or multi-polygon).
    #[must_use]
    pub const fn is_polygonal(&self) -> bool {
        matches!(self, Self::Polygon(_) | Self::MultiPolygon(_))
    }

    /// Polygonal geometries as a multi-polygon; `None` for points.
    #[must_use]
    pub fn to_multi_polygon(&self) -> Option<MultiPolygon<f64>> {
        match self {
            Self::Point(_) => None,
            Self::Polygon(p) => Some(MultiPolygon(vec![p.clone()])),
            Self::MultiPolygon(mp) => Some(mp.clone()),
        }
    }

    /// Planar area in square degrees (zero for points).
    #[must_use]
    pub fn area(&self) -> f64 {
        match self {
            Self::Point(_) => 0.0,
            Self::Polygon(p) => p.unsigned_area(),
            Self::MultiPolygon(mp) => mp.unsigned_area(),
        }
    }
}

/// A geometry plus its properties, the unit persisted to `GeoJSON`.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Unique identifier within a [`FeatureSet`].
    pub id: String,
    /// The feature's geometry.
    pub geometry: FeatureGeometry,
    /// Scalar properties, at minimum the query tag that produced the
    /// feature.
    pub properties: Properties,
    /// Identifiers of the raw records this feature was built from, sorted
    /// ascending. `[id]` for features that were never merged.
    sources: Vec<String>,
}

impl Feature {
    /// Creates a feature that stands for a single raw record.
    #[must_use]
    pub fn new(id: impl Into<String>, geometry: FeatureGeometry, properties: Properties) -> Self {
        let id = id.into();
        Self {
            sources: vec![id.clone()],
            id,
            geometry,
            properties,
        }
    }

    /// Replaces the source identifiers. Empty input keeps `[id]`.
    #[must_use]
    pub fn with_sources(mut self, mut sources: Vec<String>) -> Self {
        sources.sort();
        sources.dedup();
        if !sources.is_empty() {
            self.sources = sources;
        }
        self
    }

    /// Identifiers of the raw records absorbed into this feature.
    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// The smallest source identifier; used to order features.
    #[must_use]
    pub fn representative(&self) -> &str {
        self.sources.first().map_or(self.id.as_str(), String::as_str)
    }
}

/// Ordered collection of [`Feature`]s with unique identifiers.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    features: Vec<Feature>,
    index: BTreeMap<String, usize>,
}

impl FeatureSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the set holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features in order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Iterates features in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Looks up a feature by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.index.get(id).map(|&i| &self.features[i])
    }

    /// Appends a feature.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::DuplicateIdentifier`] if a feature with the
    /// same identifier is already present; the set is left unchanged.
    pub fn push(&mut self, feature: Feature) -> Result<(), FeatureError> {
        if self.index.contains_key(&feature.id) {
            return Err(FeatureError::DuplicateIdentifier(feature.id));
        }
        self.index.insert(feature.id.clone(), self.features.len());
        self.features.push(feature);
        Ok(())
    }

    /// Concatenates several sets, e.g. one per query tag.
    ///
    /// The same OSM element can match more than one query. When an
    /// identifier repeats, the first geometry is kept and the later
    /// feature's properties are merged in, overwriting on key collision.
    #[must_use]
    pub fn concat(sets: impl IntoIterator<Item = Self>) -> Self {
        let mut combined = Self::new();
        for set in sets {
            for feature in set.features {
                if let Some(&i) = combined.index.get(&feature.id) {
                    log::debug!("Feature {} matched more than one query", feature.id);
                    combined.features[i].properties.extend(feature.properties);
                } else {
                    combined.index.insert(feature.id.clone(), combined.features.len());
                    combined.features.push(feature);
                }
            }
        }
        combined
    }

    /// Buffers polygon features (and optionally points) by a planar
    /// distance. See [`buffer::buffer`].
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidDistance`] if the distance is not
    /// finite.
    pub fn buffer(&self, options: &BufferOptions) -> Result<(Self, Diagnostics), FeatureError> {
        buffer::buffer(self, options)
    }

    /// Collapses overlapping polygons and duplicate points. See
    /// [`merge::merge`].
    #[must_use]
    pub fn merge(&self) -> Self {
        merge::merge(self)
    }

    /// Saves the set as a `GeoJSON` `FeatureCollection`.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if serialization or file I/O fails.
    pub fn save(&self, path: &Path) -> Result<(), FeatureError> {
        geojson_io::save(self, path)
    }

    /// Reads a set previously written by [`Self::save`].
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if the file cannot be read or parsed.
    pub fn read(path: &Path) -> Result<Self, FeatureError> {
        geojson_io::read(path)
    }
}

impl PartialEq for FeatureSet {
    fn eq(&self, other: &Self) -> bool {
        self.features == other.features
    }
}

impl TryFrom<Vec<Feature>> for FeatureSet {
    type Error = FeatureError;

    fn try_from(features: Vec<Feature>) -> Result<Self, Self::Error> {
        let mut set = Self::new();
        for feature in features {
            set.push(feature)?;
        }
        Ok(set)
    }
}

impl IntoIterator for FeatureSet {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureSet {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
