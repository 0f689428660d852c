#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate-level geometry processing.
//!
//! Douglas-Peucker simplification of coordinate sequences, structural
//! validation of raw records, and JSON persistence of
//! [`CoordinateSet`](osm_geojson_geometry_models::CoordinateSet)s. Failures
//! that only affect a single record are collected in [`Diagnostics`]
//! instead of aborting a batch.

pub mod coordinates;
pub mod diagnostics;
pub mod simplify;
pub mod validate;

use std::fmt;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};

/// Minimum number of coordinates in a valid closed ring (three distinct
/// vertices plus the closing point).
pub const MIN_RING_LEN: usize = 4;

/// Minimum number of distinct vertices in a valid polygon ring.
pub const MIN_RING_VERTICES: usize = 3;

/// Errors that can occur while processing raw geometries.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// A record violates the kind/coordinate-count invariant.
    #[error("Invalid geometry {id}: {reason}")]
    InvalidGeometry {
        /// Identifier of the offending record.
        id: String,
        /// What is wrong with it.
        reason: InvalidReason,
    },

    /// Simplification tolerance is negative or not a number.
    #[error("Invalid simplification tolerance {0}: must be finite and >= 0")]
    InvalidTolerance(f64),
}

/// Why a record failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// A point record without exactly one coordinate.
    PointCoordinateCount(usize),
    /// A polygon ring with fewer than [`MIN_RING_LEN`] coordinates.
    TooFewCoordinates(usize),
    /// A polygon ring whose first and last coordinates differ.
    UnclosedRing,
    /// A polygon ring with fewer than [`MIN_RING_VERTICES`] distinct vertices.
    TooFewDistinctVertices(usize),
    /// A coordinate component is NaN or infinite.
    NonFiniteCoordinate,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PointCoordinateCount(n) => {
                write!(f, "point must have exactly 1 coordinate, found {n}")
            }
            Self::TooFewCoordinates(n) => {
                write!(f, "ring needs at least {MIN_RING_LEN} coordinates, found {n}")
            }
            Self::UnclosedRing => f.write_str("ring is not closed"),
            Self::TooFewDistinctVertices(n) => write!(
                f,
                "ring needs at least {MIN_RING_VERTICES} distinct vertices, found {n}"
            ),
            Self::NonFiniteCoordinate => f.write_str("coordinate is not finite"),
        }
    }
}

/// Errors from reading or writing persisted coordinate sets.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
