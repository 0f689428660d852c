#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Overpass API client.
//!
//! Builds Overpass QL queries from OSM tag filters, posts them to an
//! Overpass interpreter endpoint, and extracts the returned nodes, ways,
//! and relations into a [`CoordinateSet`](osm_geojson_geometry_models::CoordinateSet).
//! There is no retry or backoff: a failed request fails the fetch.

pub mod client;
pub mod progress;
pub mod query;
pub mod response;

pub use client::OverpassClient;
pub use query::{OverpassQuery, TagFilter};

/// Public Overpass instance used when no endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

/// Errors that can occur while fetching from Overpass.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The interpreter answered with a non-success status.
    #[error("Overpass returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two extracted elements mapped to the same identifier.
    #[error("Geometry error: {0}")]
    Geometry(#[from] osm_geojson_geometry_models::DuplicateIdentifierError),
}
