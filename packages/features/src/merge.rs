//! Collapsing of overlapping polygons and duplicate points.
//!
//! Two polygonal features overlap when their intersection has positive
//! area; touching along an edge or at a corner does not count. Overlap is
//! applied transitively, so a chain A-B-C becomes one feature even if A and
//! C are disjoint. Candidate pairs come from an R-tree over bounding boxes,
//! the exact area test runs only on those.
//!
//! Points merge only with points at exactly the same position. Points are
//! never absorbed into polygons.

use std::collections::BTreeMap;

use geo::{Area as _, BooleanOps as _, MultiPolygon};
use osm_geojson_geometry_models::Coordinate;
use rstar::{AABB, RTree, RTreeObject};

use crate::{Feature, FeatureGeometry, FeatureSet};

/// A polygonal feature stored in the R-tree, keyed by its position in the
/// input set.
struct PolygonEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for PolygonEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Disjoint-set forest over feature positions.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a == b {
            return;
        }
        match self.rank[a].cmp(&self.rank[b]) {
            std::cmp::Ordering::Less => self.parent[a] = b,
            std::cmp::Ordering::Greater => self.parent[b] = a,
            std::cmp::Ordering::Equal => {
                self.parent[b] = a;
                self.rank[a] += 1;
            }
        }
    }
}

/// Merges every group of overlapping polygons and every group of
/// coincident points into a single feature.
///
/// A merged feature has:
/// * the union of its members' geometries,
/// * the members' properties applied in ascending identifier order (the
///   last identifier wins on key collision),
/// * the union of its members' source identifiers,
/// * the identifier `merged:<representative>:<source count>`, where the
///   representative is the smallest source identifier.
///
/// Features that overlap nothing are returned unchanged. The output is
/// ordered by representative, which makes the operation idempotent.
#[must_use]
pub fn merge(features: &FeatureSet) -> FeatureSet {
    let items = features.features();
    let mut groups = UnionFind::new(items.len());

    link_overlapping_polygons(items, &mut groups);
    link_coincident_points(items, &mut groups);

    let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..items.len() {
        members.entry(groups.find(i)).or_default().push(i);
    }

    let mut merged: Vec<Feature> = members
        .into_values()
        .map(|group| merge_group(items, &group))
        .collect();
    merged.sort_by(|a, b| a.representative().cmp(b.representative()));

    let mut output = FeatureSet::new();
    for feature in merged {
        if let Err(e) = output.push(feature) {
            log::warn!("Skipping merged feature: {e}");
        }
    }

    log::info!(
        "Merged {} features into {}",
        features.len(),
        output.len()
    );

    output
}

fn link_overlapping_polygons(items: &[Feature], groups: &mut UnionFind) {
    let entries: Vec<PolygonEntry> = items
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| {
            let polygon = feature.geometry.to_multi_polygon()?;
            Some(PolygonEntry {
                index,
                envelope: compute_envelope(&polygon),
                polygon,
            })
        })
        .collect();

    let tree = RTree::bulk_load(entries);
    let mut pairs = 0_usize;

    for entry in tree.iter() {
        for candidate in tree.locate_in_envelope_intersecting(&entry.envelope) {
            if candidate.index <= entry.index {
                continue;
            }
            if entry.polygon.intersection(&candidate.polygon).unsigned_area() > 0.0 {
                groups.union(entry.index, candidate.index);
                pairs += 1;
            }
        }
    }

    log::debug!("Found {pairs} overlapping polygon pairs among {} polygons", tree.size());
}

fn link_coincident_points(items: &[Feature], groups: &mut UnionFind) {
    let mut first_at: BTreeMap<(u64, u64), usize> = BTreeMap::new();

    for (index, feature) in items.iter().enumerate() {
        if let FeatureGeometry::Point(point) = &feature.geometry {
            let key = Coordinate::new(point.x(), point.y()).key();
            match first_at.get(&key) {
                Some(&first) => groups.union(first, index),
                None => {
                    first_at.insert(key, index);
                }
            }
        }
    }
}

fn merge_group(items: &[Feature], group: &[usize]) -> Feature {
    if let [only] = group {
        return items[*only].clone();
    }

    let mut members: Vec<&Feature> = group.iter().map(|&i| &items[i]).collect();
    members.sort_by(|a, b| a.id.cmp(&b.id));

    let geometry = match &members[0].geometry {
        FeatureGeometry::Point(point) => FeatureGeometry::Point(*point),
        _ => {
            let union = members
                .iter()
                .filter_map(|f| f.geometry.to_multi_polygon())
                .fold(MultiPolygon::new(vec![]), |acc, next| acc.union(&next));
            FeatureGeometry::from_multi_polygon(union)
        }
    };

    let mut properties = members[0].properties.clone();
    for member in &members[1..] {
        properties.extend(member.properties.clone());
    }

    let sources: Vec<String> = members
        .iter()
        .flat_map(|f| f.sources().iter().cloned())
        .collect();

    let feature = Feature::new(String::new(), geometry, properties).with_sources(sources);
    let id = format!(
        "merged:{}:{}",
        feature.representative(),
        feature.sources().len()
    );

    log::debug!("Merged {} features into {id}", members.len());

    Feature { id, ..feature }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    use geo::BoundingRect;

    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
