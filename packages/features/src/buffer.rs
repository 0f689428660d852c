//! Planar buffering (dilation and erosion) of features.
//!
//! Distances are in the coordinate unit, i.e. degrees. This is an
//! approximation: one degree of longitude shrinks towards the poles, so a
//! buffered shape is wider in metres near the equator than at high
//! latitudes.

use std::f64::consts::TAU;

use geo::{Buffer as _, Coord, LineString, MultiPolygon, Point, Polygon};
use osm_geojson_geometry::{DiagnosticKind, Diagnostics};

use crate::{Feature, FeatureError, FeatureGeometry, FeatureSet};

/// Fewest segments used to approximate a buffered point.
pub const MIN_POINT_SEGMENTS: u32 = 16;

/// Segments used to approximate a buffered point unless configured.
pub const DEFAULT_POINT_SEGMENTS: u32 = 64;

/// Parameters for [`buffer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferOptions {
    /// Planar distance in degrees. Negative values erode polygons.
    pub distance: f64,
    /// Turn point features into disks of radius `distance`. When unset,
    /// points pass through unchanged.
    pub points: bool,
    /// Segments used for point disks; raised to [`MIN_POINT_SEGMENTS`].
    pub point_segments: u32,
}

impl BufferOptions {
    /// Polygon-only buffering by `distance`.
    #[must_use]
    pub const fn new(distance: f64) -> Self {
        Self {
            distance,
            points: false,
            point_segments: DEFAULT_POINT_SEGMENTS,
        }
    }

    /// Enables or disables point-to-disk buffering.
    #[must_use]
    pub const fn with_points(mut self, points: bool) -> Self {
        self.points = points;
        self
    }

    /// Sets the number of segments used for point disks.
    #[must_use]
    pub const fn with_point_segments(mut self, segments: u32) -> Self {
        self.point_segments = segments;
        self
    }
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Buffers every polygonal feature (and, if requested, every point).
///
/// A distance of zero returns an identical set. Features that erode to
/// nothing are dropped and reported as
/// [`DiagnosticKind::EmptyAfterBuffer`]. Identifiers, properties, and
/// source identifiers are kept.
///
/// # Errors
///
/// Returns [`FeatureError::InvalidDistance`] if the distance is NaN or
/// infinite.
pub fn buffer(
    features: &FeatureSet,
    options: &BufferOptions,
) -> Result<(FeatureSet, Diagnostics), FeatureError> {
    let distance = options.distance;
    if !distance.is_finite() {
        return Err(FeatureError::InvalidDistance(distance));
    }

    let mut diagnostics = Diagnostics::new();
    if distance == 0.0 {
        return Ok((features.clone(), diagnostics));
    }

    let segments = options.point_segments.max(MIN_POINT_SEGMENTS);
    let mut buffered = FeatureSet::new();

    for feature in features {
        let geometry = match &feature.geometry {
            FeatureGeometry::Point(point) if options.points => {
                if distance < 0.0 {
                    None
                } else {
                    Some(FeatureGeometry::Polygon(disk(*point, distance, segments)))
                }
            }
            FeatureGeometry::Point(_) => Some(feature.geometry.clone()),
            FeatureGeometry::Polygon(polygon) => non_empty(polygon.buffer(distance)),
            FeatureGeometry::MultiPolygon(multi) => non_empty(multi.buffer(distance)),
        };

        match geometry {
            Some(geometry) => {
                if let Err(e) = buffered.push(Feature {
                    geometry,
                    ..feature.clone()
                }) {
                    log::warn!("Skipping buffered feature: {e}");
                }
            }
            None => diagnostics.record(
                DiagnosticKind::EmptyAfterBuffer,
                feature.id.clone(),
                Some(format!("distance {distance}")),
            ),
        }
    }

    log::info!(
        "Buffered {} features by {distance}: {} kept, {} dropped",
        features.len(),
        buffered.len(),
        diagnostics.len()
    );

    Ok((buffered, diagnostics))
}

/// Drops zero-area parts and returns `None` if nothing is left.
fn non_empty(multi: MultiPolygon<f64>) -> Option<FeatureGeometry> {
    use geo::Area as _;

    let parts: Vec<Polygon<f64>> = multi
        .0
        .into_iter()
        .filter(|p| p.unsigned_area() > 0.0)
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(FeatureGeometry::from_multi_polygon(MultiPolygon(parts)))
    }
}

/// Regular polygon with `segments` vertices approximating a disk.
fn disk(center: Point<f64>, radius: f64, segments: u32) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = (0..segments)
        .map(|i| {
            let angle = TAU * f64::from(i) / f64::from(segments);
            Coord {
                x: radius.mul_add(angle.cos(), center.x()),
                y: radius.mul_add(angle.sin(), center.y()),
            }
        })
        .collect();

    Polygon::new(LineString::new(ring), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area as _, polygon};
    use osm_geojson_geometry_models::Properties;

    fn square(id: &str, min: f64, size: f64) -> Feature {
        let polygon = polygon![
            (x: min, y: min),
            (x: min + size, y: min),
            (x: min + size, y: min + size),
            (x: min, y: min + size),
        ];
        Feature::new(id, FeatureGeometry::Polygon(polygon), Properties::new())
    }

    fn point(id: &str) -> Feature {
        Feature::new(id, FeatureGeometry::Point(Point::new(5.0, 5.0)), Properties::new())
    }

    fn sample() -> FeatureSet {
        FeatureSet::try_from(vec![square("way/1", 0.0, 2.0), point("node/2")]).unwrap()
    }

    #[test]
    fn zero_distance_is_identity() {
        let features = sample();
        let (buffered, diagnostics) = buffer(&features, &BufferOptions::new(0.0).with_points(true)).unwrap();
        assert_eq!(buffered, features);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn positive_distance_grows_polygons_and_keeps_points() {
        let (buffered, diagnostics) = buffer(&sample(), &BufferOptions::new(0.5)).unwrap();
        assert!(diagnostics.is_empty());

        let grown = buffered.get("way/1").unwrap();
        assert!(grown.geometry.area() > 4.0);
        assert_eq!(buffered.get("node/2").unwrap().geometry, point("node/2").geometry);
    }

    #[test]
    fn buffered_point_becomes_disk() {
        let options = BufferOptions::new(1.0).with_points(true).with_point_segments(4);
        let (buffered, _) = buffer(&sample(), &options).unwrap();

        let FeatureGeometry::Polygon(disk) = &buffered.get("node/2").unwrap().geometry else {
            panic!("expected polygon");
        };
        // Segment count is raised to the minimum; ring is closed.
        assert_eq!(disk.exterior().0.len(), MIN_POINT_SEGMENTS as usize + 1);
        let area = disk.unsigned_area();
        assert!(area > 3.0 && area < std::f64::consts::PI);
    }

    #[test]
    fn erosion_drops_collapsed_polygons() {
        let features =
            FeatureSet::try_from(vec![square("way/1", 0.0, 2.0), square("way/2", 10.0, 10.0)])
                .unwrap();
        let (eroded, diagnostics) = buffer(&features, &BufferOptions::new(-1.5)).unwrap();

        assert!(eroded.get("way/1").is_none());
        let shrunk = eroded.get("way/2").unwrap();
        assert!((shrunk.geometry.area() - 49.0).abs() < 1e-6);
        assert_eq!(diagnostics.ids(DiagnosticKind::EmptyAfterBuffer), vec!["way/1"]);
    }

    #[test]
    fn rejects_non_finite_distance() {
        assert!(matches!(
            buffer(&sample(), &BufferOptions::new(f64::NAN)),
            Err(FeatureError::InvalidDistance(_))
        ));
    }

    #[test]
    fn keeps_properties_and_sources() {
        let mut feature = square("merged:way/1:2", 0.0, 2.0)
            .with_sources(vec!["way/1".to_string(), "way/2".to_string()]);
        feature.properties.insert("amenity".to_string(), "school".into());
        let features = FeatureSet::try_from(vec![feature.clone()]).unwrap();

        let (buffered, _) = buffer(&features, &BufferOptions::new(0.1)).unwrap();
        let out = &buffered.features()[0];
        assert_eq!(out.id, feature.id);
        assert_eq!(out.properties, feature.properties);
        assert_eq!(out.sources(), feature.sources());
    }
}
