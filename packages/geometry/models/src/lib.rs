#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raw coordinate and geometry record types.
//!
//! These types describe geometries exactly as the fetch layer hands them
//! over: a mapping from element identifier (e.g. `"way/123"`) to a kind tag
//! and an ordered list of `[lon, lat]` pairs. They carry no geometry logic
//! of their own beyond cheap structural checks.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{AsRefStr, Display, EnumString};

/// Scalar property values attached to a feature (e.g. `"amenity" → "school"`).
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// A WGS84 longitude/latitude pair in degrees.
///
/// Serialized as a two-element array `[lon, lat]`, matching `GeoJSON`
/// coordinate order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl Coordinate {
    /// Creates a coordinate from longitude and latitude.
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Whether both components are finite numbers.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    /// Exact-equality key, usable in ordered sets and maps.
    ///
    /// Negative zero is folded into positive zero so that `-0.0` and `0.0`
    /// compare equal, as they do under `==`.
    #[must_use]
    pub fn key(self) -> (u64, u64) {
        let normalize = |v: f64| if v == 0.0 { 0.0_f64 } else { v };
        (normalize(self.lon).to_bits(), normalize(self.lat).to_bits())
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self { lon, lat }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(coordinate: Coordinate) -> Self {
        [coordinate.lon, coordinate.lat]
    }
}

/// Kind tag of a raw geometry record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GeometryKind {
    /// A single coordinate (OSM node).
    Point,
    /// A closed ring (OSM way or relation outline).
    Polygon,
}

/// A single fetched geometry: kind plus ordered coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryRecord {
    /// Whether this record describes a point or a polygon ring.
    pub kind: GeometryKind,
    /// Ordered coordinates. Exactly one for points; a closed ring for
    /// polygons.
    pub coordinates: Vec<Coordinate>,
}

impl GeometryRecord {
    /// Creates a point record.
    #[must_use]
    pub fn point(coordinate: Coordinate) -> Self {
        Self {
            kind: GeometryKind::Point,
            coordinates: vec![coordinate],
        }
    }

    /// Creates a polygon record from a ring. The ring is stored as given;
    /// no closing point is added.
    #[must_use]
    pub const fn polygon(ring: Vec<Coordinate>) -> Self {
        Self {
            kind: GeometryKind::Polygon,
            coordinates: ring,
        }
    }

    /// Whether the coordinate sequence has at least three entries and its
    /// first and last coordinates are equal.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        is_closed(&self.coordinates)
    }

    /// Number of distinct vertices, ignoring the closing coordinate.
    #[must_use]
    pub fn distinct_vertex_count(&self) -> usize {
        distinct_vertex_count(&self.coordinates)
    }
}

/// Whether `coordinates` forms a closed sequence (`len >= 3`, first == last).
#[must_use]
pub fn is_closed(coordinates: &[Coordinate]) -> bool {
    coordinates.len() >= 3 && coordinates.first() == coordinates.last()
}

/// Number of pairwise-distinct coordinates in `coordinates`.
#[must_use]
pub fn distinct_vertex_count(coordinates: &[Coordinate]) -> usize {
    coordinates
        .iter()
        .map(|c| c.key())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Error returned when inserting an identifier that already exists in a
/// [`CoordinateSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateIdentifierError {
    /// The identifier that was already present.
    pub id: String,
}

impl fmt::Display for DuplicateIdentifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "duplicate geometry identifier {}", self.id)
    }
}

impl std::error::Error for DuplicateIdentifierError {}

/// Raw fetched geometries keyed by identifier.
///
/// Entries keep insertion order, which is also the order they are persisted
/// in. Identifiers are unique.
#[derive(Debug, Clone, Default)]
pub struct CoordinateSet {
    records: Vec<(String, GeometryRecord)>,
    index: BTreeMap<String, usize>,
}

impl CoordinateSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a record.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateIdentifierError`] if `id` is already present; the
    /// set is left unchanged.
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        record: GeometryRecord,
    ) -> Result<(), DuplicateIdentifierError> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(DuplicateIdentifierError { id });
        }
        self.index.insert(id.clone(), self.records.len());
        self.records.push((id, record));
        Ok(())
    }

    /// Looks up a record by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&GeometryRecord> {
        self.index.get(id).map(|&i| &self.records[i].1)
    }

    /// Whether `id` is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterates records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &GeometryRecord)> {
        self.records.iter().map(|(id, record)| (id.as_str(), record))
    }

    /// Appends every record of `other` whose identifier is not yet present.
    /// Returns the identifiers that were skipped as duplicates.
    pub fn absorb(&mut self, other: Self) -> Vec<String> {
        let mut skipped = Vec::new();
        for (id, record) in other.records {
            if let Err(e) = self.insert(id, record) {
                skipped.push(e.id);
            }
        }
        skipped
    }
}

impl PartialEq for CoordinateSet {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl IntoIterator for CoordinateSet {
    type Item = (String, GeometryRecord);
    type IntoIter = std::vec::IntoIter<(String, GeometryRecord)>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl TryFrom<Vec<(String, GeometryRecord)>> for CoordinateSet {
    type Error = DuplicateIdentifierError;

    fn try_from(records: Vec<(String, GeometryRecord)>) -> Result<Self, Self::Error> {
        let mut set = Self::new();
        for (id, record) in records {
            set.insert(id, record)?;
        }
        Ok(set)
    }
}

impl Serialize for CoordinateSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for (id, record) in &self.records {
            map.serialize_entry(id, record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CoordinateSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = CoordinateSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping identifiers to geometry records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut set = CoordinateSet::new();
                while let Some((id, record)) = access.next_entry::<String, GeometryRecord>()? {
                    set.insert(id, record).map_err(serde::de::Error::custom)?;
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(SetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Coordinate> {
        vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 1.0),
            Coordinate::new(1.0, 1.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(0.0, 0.0),
        ]
    }

    #[test]
    fn coordinate_serializes_as_lon_lat_array() {
        let json = serde_json::to_string(&Coordinate::new(13.4, 52.5)).unwrap();
        assert_eq!(json, "[13.4,52.5]");
    }

    #[test]
    fn negative_zero_shares_key_with_zero() {
        assert_eq!(
            Coordinate::new(-0.0, 1.0).key(),
            Coordinate::new(0.0, 1.0).key()
        );
    }

    #[test]
    fn ring_structure_checks() {
        let record = GeometryRecord::polygon(square());
        assert!(record.is_closed());
        assert_eq!(record.distinct_vertex_count(), 4);

        let open = GeometryRecord::polygon(square()[..4].to_vec());
        assert!(!open.is_closed());
    }

    #[test]
    fn rejects_duplicate_identifier() {
        let mut set = CoordinateSet::new();
        set.insert("node/1", GeometryRecord::point(Coordinate::new(1.0, 2.0)))
            .unwrap();
        let err = set
            .insert("node/1", GeometryRecord::point(Coordinate::new(3.0, 4.0)))
            .unwrap_err();
        assert_eq!(err.id, "node/1");
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get("node/1").unwrap().coordinates[0],
            Coordinate::new(1.0, 2.0)
        );
    }

    #[test]
    fn json_keeps_insertion_order() {
        let mut set = CoordinateSet::new();
        set.insert("way/9", GeometryRecord::polygon(square())).unwrap();
        set.insert("node/1", GeometryRecord::point(Coordinate::new(1.0, 2.0)))
            .unwrap();

        let json = serde_json::to_string(&set).unwrap();
        assert!(json.find("way/9").unwrap() < json.find("node/1").unwrap());
        assert!(json.contains(r#""kind":"polygon""#));

        let parsed: CoordinateSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, set);
        let ids: Vec<&str> = parsed.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["way/9", "node/1"]);
    }

    #[test]
    fn json_with_duplicate_keys_is_rejected() {
        let json = r#"{
            "node/1": {"kind": "point", "coordinates": [[1.0, 2.0]]},
            "node/1": {"kind": "point", "coordinates": [[3.0, 4.0]]}
        }"#;
        assert!(serde_json::from_str::<CoordinateSet>(json).is_err());
    }

    #[test]
    fn absorb_skips_existing_identifiers() {
        let mut a = CoordinateSet::new();
        a.insert("node/1", GeometryRecord::point(Coordinate::new(1.0, 2.0)))
            .unwrap();
        let mut b = CoordinateSet::new();
        b.insert("node/1", GeometryRecord::point(Coordinate::new(9.0, 9.0)))
            .unwrap();
        b.insert("node/2", GeometryRecord::point(Coordinate::new(3.0, 4.0)))
            .unwrap();

        let skipped = a.absorb(b);
        assert_eq!(skipped, vec!["node/1".to_string()]);
        assert_eq!(a.len(), 2);
        assert_eq!(
            a.get("node/1").unwrap().coordinates[0],
            Coordinate::new(1.0, 2.0)
        );
    }

    #[test]
    fn kind_round_trips_through_strings() {
        assert_eq!(GeometryKind::Polygon.to_string(), "polygon");
        assert_eq!("point".parse::<GeometryKind>().unwrap(), GeometryKind::Point);
    }
}
