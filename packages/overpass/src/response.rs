//! Overpass JSON response shape and coordinate extraction.

use osm_geojson_geometry_models::{Coordinate, CoordinateSet, DuplicateIdentifierError, GeometryRecord};
use serde::Deserialize;

/// Top-level `[out:json]` response. Only `elements` is used.
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// A single OSM element as returned by `out geom`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
    },
    Way {
        id: i64,
        #[serde(default)]
        geometry: Vec<Option<LatLon>>,
    },
    Relation {
        id: i64,
        #[serde(default)]
        members: Vec<Member>,
    },
    #[serde(other)]
    Other,
}

/// A relation member. Way members carry their geometry inline.
#[derive(Debug, Deserialize)]
pub struct Member {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Vec<Option<LatLon>>,
}

/// A position in Overpass order.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl From<LatLon> for Coordinate {
    fn from(value: LatLon) -> Self {
        Self::new(value.lon, value.lat)
    }
}

/// Converts a response into a coordinate set keyed by `node/<id>`,
/// `way/<id>` or `relation/<id>`.
///
/// Nodes become points. Ways become polygons of their geometry.
/// Relations become polygons built by concatenating the geometries of all
/// their way members in member order; such rings are often not closed and
/// are rejected later by validation. Elements without coordinates are
/// skipped.
///
/// # Errors
///
/// Returns [`DuplicateIdentifierError`] if the response lists the same
/// element twice.
pub fn extract(response: OverpassResponse) -> Result<CoordinateSet, DuplicateIdentifierError> {
    let mut set = CoordinateSet::new();
    let mut skipped = 0_usize;

    for element in response.elements {
        let (id, record) = match element {
            Element::Node { id, lat, lon } => (
                format!("node/{id}"),
                GeometryRecord::point(Coordinate::new(lon, lat)),
            ),
            Element::Way { id, geometry } => {
                (format!("way/{id}"), GeometryRecord::polygon(flatten(geometry)))
            }
            Element::Relation { id, members } => {
                let coordinates = members
                    .into_iter()
                    .filter(|m| m.kind == "way")
                    .flat_map(|m| flatten(m.geometry))
                    .collect();
                (format!("relation/{id}"), GeometryRecord::polygon(coordinates))
            }
            Element::Other => {
                skipped += 1;
                continue;
            }
        };

        if record.coordinates.is_empty() {
            log::debug!("Skipping {id}: no coordinates");
            skipped += 1;
            continue;
        }

        set.insert(id, record)?;
    }

    log::debug!("Extracted {} elements, skipped {skipped}", set.len());
    Ok(set)
}

fn flatten(geometry: Vec<Option<LatLon>>) -> Vec<Coordinate> {
    geometry.into_iter().flatten().map(Coordinate::from).collect()
}
