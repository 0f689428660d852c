//! Structural checks on raw geometry records.

use osm_geojson_geometry_models::{Coordinate, GeometryKind, GeometryRecord};

use crate::{GeometryError, InvalidReason, MIN_RING_LEN, MIN_RING_VERTICES};

/// Checks the kind/coordinate-count invariant of a record.
///
/// Points need exactly one coordinate. Polygons need a closed ring of at
/// least [`MIN_RING_LEN`] coordinates with [`MIN_RING_VERTICES`] distinct
/// vertices. All coordinates must be finite.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidGeometry`] describing the first violated
/// rule.
pub fn validate_record(id: &str, record: &GeometryRecord) -> Result<(), GeometryError> {
    let invalid = |reason| GeometryError::InvalidGeometry {
        id: id.to_string(),
        reason,
    };

    if !record.coordinates.iter().all(|c| c.is_finite()) {
        return Err(invalid(InvalidReason::NonFiniteCoordinate));
    }

    match record.kind {
        GeometryKind::Point => {
            if record.coordinates.len() != 1 {
                return Err(invalid(InvalidReason::PointCoordinateCount(
                    record.coordinates.len(),
                )));
            }
        }
        GeometryKind::Polygon => {
            let len = record.coordinates.len();
            if len < MIN_RING_LEN {
                return Err(invalid(InvalidReason::TooFewCoordinates(len)));
            }
            if !record.is_closed() {
                return Err(invalid(InvalidReason::UnclosedRing));
            }
            let distinct = record.distinct_vertex_count();
            if distinct < MIN_RING_VERTICES {
                return Err(invalid(InvalidReason::TooFewDistinctVertices(distinct)));
            }
        }
    }

    Ok(())
}

/// Whether two non-adjacent edges of a closed ring properly cross.
///
/// Touching or collinear-overlapping edges are not reported. Quadratic in
/// the number of edges.
#[must_use]
pub fn has_self_intersection(ring: &[Coordinate]) -> bool {
    if ring.len() < MIN_RING_LEN {
        return false;
    }

    let edges = ring.len() - 1;
    for i in 0..edges {
        let (a1, a2) = (ring[i], ring[i + 1]);
        for j in (i + 2)..edges {
            // First and last edges share the closing vertex.
            if i == 0 && j == edges - 1 {
                continue;
            }
            if segments_properly_intersect(a1, a2, ring[j], ring[j + 1]) {
                return true;
            }
        }
    }

    false
}

fn segments_properly_intersect(a1: Coordinate, a2: Coordinate, b1: Coordinate, b2: Coordinate) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);

    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// Cross product of `(b - a) x (c - a)`; positive for a left turn.
fn orientation(a: Coordinate, b: Coordinate, c: Coordinate) -> f64 {
    (b.lon - a.lon) * (c.lat - a.lat) - (b.lat - a.lat) * (c.lon - a.lon)
}
