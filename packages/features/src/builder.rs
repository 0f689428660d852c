//! Conversion of raw geometry records into features.

use geo::{Coord, LineString, Point, Polygon};
use osm_geojson_geometry::validate::{has_self_intersection, validate_record};
use osm_geojson_geometry::{DiagnosticKind, Diagnostics, GeometryError};
use osm_geojson_geometry_models::{CoordinateSet, GeometryKind, GeometryRecord, Properties};

use crate::{Feature, FeatureGeometry, FeatureSet};

/// Builds a single feature from a raw record.
///
/// Self-intersecting polygon rings are not repaired; they are passed
/// through and reported as [`DiagnosticKind::SelfIntersection`].
///
/// # Errors
///
/// Returns [`GeometryError::InvalidGeometry`] if the record violates the
/// kind/coordinate-count invariant (single-coordinate polygon, unclosed
/// ring, fewer than three distinct vertices, ...).
pub fn build(
    id: &str,
    record: &GeometryRecord,
    properties: &Properties,
    diagnostics: &mut Diagnostics,
) -> Result<Feature, GeometryError> {
    validate_record(id, record)?;

    let geometry = match record.kind {
        GeometryKind::Point => {
            let c = record.coordinates[0];
            FeatureGeometry::Point(Point::new(c.lon, c.lat))
        }
        GeometryKind::Polygon => {
            if has_self_intersection(&record.coordinates) {
                diagnostics.record(DiagnosticKind::SelfIntersection, id, None);
            }
            let ring: Vec<Coord<f64>> = record
                .coordinates
                .iter()
                .map(|c| Coord { x: c.lon, y: c.lat })
                .collect();
            FeatureGeometry::Polygon(Polygon::new(LineString::new(ring), vec![]))
        }
    };

    Ok(Feature::new(id, geometry, properties.clone()))
}

/// Builds features for every record in `set`, all sharing `properties`.
///
/// Invalid records are skipped and reported as
/// [`DiagnosticKind::InvalidGeometry`]; everything else ends up in the
/// returned set in the same order as in `set`.
#[must_use]
pub fn build_features(set: &CoordinateSet, properties: &Properties) -> (FeatureSet, Diagnostics) {
    let mut features = FeatureSet::new();
    let mut diagnostics = Diagnostics::new();

    for (id, record) in set.iter() {
        match build(id, record, properties, &mut diagnostics) {
            Ok(feature) => {
                if let Err(e) = features.push(feature) {
                    log::warn!("Skipping built feature: {e}");
                }
            }
            Err(e) => diagnostics.record_error(id, &e),
        }
    }

    log::info!(
        "Built {} features from {} records",
        features.len(),
        set.len()
    );

    (features, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use osm_geojson_geometry_models::Coordinate;

    fn ring(points: &[(f64, f64)]) -> Vec<Coordinate> {
        points.iter().copied().map(Coordinate::from).collect()
    }

    fn school() -> Properties {
        let mut properties = Properties::new();
        properties.insert("amenity".to_string(), "school".into());
        properties
    }

    #[test]
    fn builds_point_feature() {
        let mut diagnostics = Diagnostics::new();
        let record = GeometryRecord::point(Coordinate::new(13.4, 52.5));
        let feature = build("node/1", &record, &school(), &mut diagnostics).unwrap();

        assert_eq!(feature.id, "node/1");
        assert_eq!(feature.geometry, FeatureGeometry::Point(Point::new(13.4, 52.5)));
        assert_eq!(feature.properties["amenity"], "school");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn builds_polygon_feature() {
        let mut diagnostics = Diagnostics::new();
        let record =
            GeometryRecord::polygon(ring(&[(0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0), (0.0, 0.0)]));
        let feature = build("way/1", &record, &school(), &mut diagnostics).unwrap();

        assert!(feature.geometry.is_polygonal());
        assert!((feature.geometry.area() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn single_point_polygon_is_invalid() {
        let mut diagnostics = Diagnostics::new();
        let record = GeometryRecord::polygon(ring(&[(0.0, 0.0)]));
        assert!(matches!(
            build("way/1", &record, &school(), &mut diagnostics),
            Err(GeometryError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn self_intersection_is_flagged_not_repaired() {
        let mut diagnostics = Diagnostics::new();
        let bowtie = ring(&[(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0), (0.0, 0.0)]);
        let record = GeometryRecord::polygon(bowtie);
        let feature = build("way/8", &record, &school(), &mut diagnostics).unwrap();

        let FeatureGeometry::Polygon(polygon) = &feature.geometry else {
            panic!("expected polygon");
        };
        assert_eq!(polygon.exterior().0.len(), 5);
        assert_eq!(diagnostics.ids(DiagnosticKind::SelfIntersection), vec!["way/8"]);
    }

    #[test]
    fn build_features_skips_invalid_records() {
        let mut set = CoordinateSet::new();
        set.insert("node/1", GeometryRecord::point(Coordinate::new(1.0, 1.0)))
            .unwrap();
        set.insert(
            "way/2",
            GeometryRecord::polygon(ring(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)])),
        )
        .unwrap();
        set.insert(
            "way/3",
            GeometryRecord::polygon(ring(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (0.0, 0.0)])),
        )
        .unwrap();

        let (features, diagnostics) = build_features(&set, &school());
        let ids: Vec<&str> = features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["node/1", "way/3"]);
        assert_eq!(diagnostics.ids(DiagnosticKind::InvalidGeometry), vec!["way/2"]);
    }
}
