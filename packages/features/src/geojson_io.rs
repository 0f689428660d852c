//! Reading and writing [`FeatureSet`]s as `GeoJSON` `FeatureCollection`s.
//!
//! Feature identifiers go into the standard `id` member. Source
//! identifiers of merged features are stored in a `sources` foreign member
//! so that a persisted set can be merged again without losing history.

use std::path::Path;

use geojson::{FeatureCollection, GeoJson, Geometry, JsonObject, feature::Id};
use serde_json::Value;

use crate::{Feature, FeatureError, FeatureGeometry, FeatureSet};

const SOURCES_MEMBER: &str = "sources";

/// Converts a feature set into a `GeoJSON` `FeatureCollection`.
#[must_use]
pub fn to_feature_collection(features: &FeatureSet) -> FeatureCollection {
    let features = features.iter().map(to_geojson_feature).collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn to_geojson_feature(feature: &Feature) -> geojson::Feature {
    let value = match &feature.geometry {
        FeatureGeometry::Point(p) => geojson::Value::from(p),
        FeatureGeometry::Polygon(p) => geojson::Value::from(p),
        FeatureGeometry::MultiPolygon(mp) => geojson::Value::from(mp),
    };

    let foreign_members = (feature.sources() != std::slice::from_ref(&feature.id)).then(|| {
        let mut members = JsonObject::new();
        members.insert(
            SOURCES_MEMBER.to_string(),
            Value::from(feature.sources().to_vec()),
        );
        members
    });

    geojson::Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: Some(Id::String(feature.id.clone())),
        properties: Some(feature.properties.clone()),
        foreign_members,
    }
}

/// Converts a `GeoJSON` `FeatureCollection` back into a feature set.
///
/// Features without an `id` are named `feature/<index>`. Features without
/// a geometry are skipped with a warning.
///
/// # Errors
///
/// * [`FeatureError::UnsupportedGeometry`] for geometry types other than
///   `Point`, `Polygon` and `MultiPolygon`
/// * [`FeatureError::DuplicateIdentifier`] if two features share an `id`
/// * [`FeatureError::GeoJson`] if a geometry cannot be converted
pub fn from_feature_collection(collection: FeatureCollection) -> Result<FeatureSet, FeatureError> {
    let mut set = FeatureSet::new();

    for (index, feature) in collection.features.into_iter().enumerate() {
        let id = match &feature.id {
            Some(Id::String(s)) => s.clone(),
            Some(Id::Number(n)) => n.to_string(),
            None => format!("feature/{index}"),
        };

        let Some(geometry) = feature.geometry else {
            log::warn!("Skipping feature {id} without geometry");
            continue;
        };

        let geometry = match geo::Geometry::<f64>::try_from(geometry)? {
            geo::Geometry::Point(p) => FeatureGeometry::Point(p),
            geo::Geometry::Polygon(p) => FeatureGeometry::Polygon(p),
            geo::Geometry::MultiPolygon(mp) => FeatureGeometry::MultiPolygon(mp),
            other => {
                return Err(FeatureError::UnsupportedGeometry {
                    id,
                    kind: geometry_type_name(&other).to_string(),
                });
            }
        };

        let sources = feature
            .foreign_members
            .as_ref()
            .and_then(|members| members.get(SOURCES_MEMBER))
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let properties = feature.properties.unwrap_or_default();
        set.push(Feature::new(id, geometry, properties).with_sources(sources))?;
    }

    Ok(set)
}

const fn geometry_type_name(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}

/// Writes a feature set to `path` as `GeoJSON`, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns [`FeatureError`] if serialization or file I/O fails.
pub fn save(features: &FeatureSet, path: &Path) -> Result<(), FeatureError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    log::info!("Writing {} features to {}", features.len(), path.display());
    let json = serde_json::to_string(&to_feature_collection(features))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Reads a feature set from a `GeoJSON` file.
///
/// # Errors
///
/// Returns [`FeatureError::NotAFeatureCollection`] if the document is a
/// bare geometry or feature, and other [`FeatureError`]s if the file
/// cannot be read or converted.
pub fn read(path: &Path) -> Result<FeatureSet, FeatureError> {
    let json = std::fs::read_to_string(path)?;

    match json.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => from_feature_collection(collection),
        GeoJson::Feature(_) | GeoJson::Geometry(_) => Err(FeatureError::NotAFeatureCollection),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{MultiPolygon, Point, polygon};
    use osm_geojson_geometry_models::Properties;

    fn sample() -> FeatureSet {
        let mut properties = Properties::new();
        properties.insert("amenity".to_string(), "school".into());

        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
        let other = polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0), (x: 5.0, y: 6.0)];

        FeatureSet::try_from(vec![
            Feature::new("node/1", FeatureGeometry::Point(Point::new(13.4, 52.5)), properties.clone()),
            Feature::new("way/2", FeatureGeometry::Polygon(square), properties.clone()),
            Feature::new(
                "merged:way/3:2",
                FeatureGeometry::MultiPolygon(MultiPolygon(vec![other.clone(), other])),
                properties,
            )
            .with_sources(vec!["way/4".to_string(), "way/3".to_string()]),
        ])
        .unwrap()
    }

    #[test]
    fn collection_carries_ids_and_sources() {
        let collection = to_feature_collection(&sample());
        assert_eq!(collection.features.len(), 3);

        let plain = &collection.features[0];
        assert_eq!(plain.id, Some(Id::String("node/1".to_string())));
        assert!(plain.foreign_members.is_none());

        let merged = &collection.features[2];
        let sources = &merged.foreign_members.as_ref().unwrap()[SOURCES_MEMBER];
        assert_eq!(sources, &serde_json::json!(["way/3", "way/4"]));
    }

    #[test]
    fn save_and_read_round_trip() {
        let dir = std::env::temp_dir().join("osm_geojson_features_round_trip");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("features.geojson");

        let features = sample();
        save(&features, &path).unwrap();
        let read_back = read(&path).unwrap();
        assert_eq!(read_back, features);
        assert_eq!(read_back.get("merged:way/3:2").unwrap().representative(), "way/3");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_ids_and_geometries_are_handled() {
        let collection: FeatureCollection = serde_json::from_value(serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": null, "properties": {} },
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [1.0, 2.0] },
                    "properties": { "amenity": "school" }
                }
            ]
        }))
        .unwrap();

        let set = from_feature_collection(collection).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.features()[0].id, "feature/1");
    }

    #[test]
    fn rejects_line_strings() {
        let collection: FeatureCollection = serde_json::from_value(serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": "way/1",
                "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] },
                "properties": {}
            }]
        }))
        .unwrap();

        assert!(matches!(
            from_feature_collection(collection),
            Err(FeatureError::UnsupportedGeometry { kind, .. }) if kind == "LineString"
        ));
    }

    #[test]
    fn bare_geometry_is_not_a_collection() {
        let dir = std::env::temp_dir().join("osm_geojson_features_bare_geometry");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("point.geojson");
        std::fs::write(&path, r#"{"type":"Point","coordinates":[1.0,2.0]}"#).unwrap();

        assert!(matches!(read(&path), Err(FeatureError::NotAFeatureCollection)));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
