//! Batch operations and JSON persistence for [`CoordinateSet`]s.

use std::path::Path;

use osm_geojson_geometry_models::{CoordinateSet, GeometryKind, GeometryRecord};

use crate::simplify::simplify;
use crate::validate::validate_record;
use crate::{DiagnosticKind, Diagnostics, GeometryError, PersistError};

/// Simplifies every polygon ring in `set`, returning a new set.
///
/// Point records are copied as-is. Rings that would become degenerate keep
/// their original coordinates and are reported as
/// [`DiagnosticKind::DegenerateSimplification`].
///
/// # Errors
///
/// Returns [`GeometryError::InvalidTolerance`] if `epsilon` is negative or
/// not finite. Per-record problems never produce an error.
pub fn simplify_records(
    set: &CoordinateSet,
    epsilon: f64,
) -> Result<(CoordinateSet, Diagnostics), GeometryError> {
    if !epsilon.is_finite() || epsilon < 0.0 {
        return Err(GeometryError::InvalidTolerance(epsilon));
    }

    let mut simplified = CoordinateSet::new();
    let mut diagnostics = Diagnostics::new();
    let mut removed = 0_usize;

    for (id, record) in set.iter() {
        let record = match record.kind {
            GeometryKind::Point => record.clone(),
            GeometryKind::Polygon => {
                let result = simplify(&record.coordinates, epsilon)?;
                if result.fell_back {
                    diagnostics.record(
                        DiagnosticKind::DegenerateSimplification,
                        id,
                        Some(format!("epsilon {epsilon}")),
                    );
                }
                removed += record.coordinates.len() - result.coordinates.len();
                GeometryRecord::polygon(result.coordinates)
            }
        };
        if let Err(e) = simplified.insert(id, record) {
            log::warn!("Skipping simplified record: {e}");
        }
    }

    log::info!(
        "Simplified {} records (epsilon {epsilon}): removed {removed} coordinates",
        set.len()
    );

    Ok((simplified, diagnostics))
}

/// Returns a copy of `set` without records that fail [`validate_record`].
///
/// Each dropped record is reported as [`DiagnosticKind::InvalidGeometry`].
#[must_use]
pub fn drop_degenerate(set: &CoordinateSet) -> (CoordinateSet, Diagnostics) {
    let mut valid = CoordinateSet::new();
    let mut diagnostics = Diagnostics::new();

    for (id, record) in set.iter() {
        match validate_record(id, record) {
            Ok(()) => {
                if let Err(e) = valid.insert(id, record.clone()) {
                    log::warn!("Skipping record: {e}");
                }
            }
            Err(e) => diagnostics.record_error(id, &e),
        }
    }

    if !diagnostics.is_empty() {
        log::warn!(
            "Dropped {} of {} records with invalid geometry",
            diagnostics.len(),
            set.len()
        );
    }

    (valid, diagnostics)
}

/// Saves a coordinate set as JSON, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`PersistError`] if serialization or file I/O fails.
pub fn save(set: &CoordinateSet, path: &Path) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    log::info!("Saving {} coordinate records to {}", set.len(), path.display());
    let json = serde_json::to_string(set)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Reads a coordinate set previously written by [`save`].
///
/// # Errors
///
/// Returns [`PersistError`] if the file cannot be read or is not a valid
/// coordinate set (including duplicate identifiers).
pub fn read(path: &Path) -> Result<CoordinateSet, PersistError> {
    let json = std::fs::read_to_string(path)?;
    let set: CoordinateSet = serde_json::from_str(&json)?;
    log::debug!("Read {} coordinate records from {}", set.len(), path.display());
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use osm_geojson_geometry_models::Coordinate;

    fn ring(points: &[(f64, f64)]) -> Vec<Coordinate> {
        points.iter().copied().map(Coordinate::from).collect()
    }

    fn sample_set() -> CoordinateSet {
        let mut set = CoordinateSet::new();
        set.insert("node/1", GeometryRecord::point(Coordinate::new(13.4, 52.5)))
            .unwrap();
        set.insert(
            "way/2",
            GeometryRecord::polygon(ring(&[
                (0.0, 0.0),
                (0.0, 5.0),
                (0.01, 5.0),
                (5.0, 5.0),
                (5.0, 0.0),
                (0.0, 0.0),
            ])),
        )
        .unwrap();
        set.insert(
            "way/3",
            GeometryRecord::polygon(ring(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (0.0, 0.0)])),
        )
        .unwrap();
        set
    }

    #[test]
    fn simplify_records_reduces_polygons_only() {
        let set = sample_set();
        let (simplified, diagnostics) = simplify_records(&set, 0.1).unwrap();

        assert_eq!(simplified.get("node/1"), set.get("node/1"));
        assert_eq!(simplified.get("way/2").unwrap().coordinates.len(), 5);
        assert!(diagnostics.is_empty());
        // Input is left untouched.
        assert_eq!(set.get("way/2").unwrap().coordinates.len(), 6);
    }

    #[test]
    fn simplify_records_reports_fallbacks() {
        let (simplified, diagnostics) = simplify_records(&sample_set(), 100.0).unwrap();

        assert_eq!(
            diagnostics.ids(DiagnosticKind::DegenerateSimplification),
            vec!["way/2", "way/3"]
        );
        assert_eq!(simplified, sample_set());
    }

    #[test]
    fn simplify_records_rejects_bad_tolerance() {
        assert!(matches!(
            simplify_records(&sample_set(), -0.5),
            Err(GeometryError::InvalidTolerance(_))
        ));
    }

    #[test]
    fn drop_degenerate_removes_invalid_records() {
        let mut set = sample_set();
        set.insert("way/4", GeometryRecord::polygon(ring(&[(0.0, 0.0), (1.0, 1.0)])))
            .unwrap();

        let (valid, diagnostics) = drop_degenerate(&set);
        assert_eq!(valid.len(), 3);
        assert!(!valid.contains("way/4"));
        assert_eq!(diagnostics.ids(DiagnosticKind::InvalidGeometry), vec!["way/4"]);
    }

    #[test]
    fn save_and_read_round_trip() {
        let dir = std::env::temp_dir().join("osm_geojson_coordinates_round_trip");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("coordinates.json");

        let set = sample_set();
        save(&set, &path).unwrap();
        let read_back = read(&path).unwrap();
        assert_eq!(read_back, set);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
