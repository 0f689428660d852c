//! Douglas-Peucker coordinate sequence simplification.
//!
//! Distances are planar and measured in the input units (degrees). No
//! geodesic correction is applied, so a given tolerance removes more
//! east-west detail near the poles than at the equator.

use osm_geojson_geometry_models::{Coordinate, distinct_vertex_count, is_closed};

use crate::{GeometryError, MIN_RING_LEN, MIN_RING_VERTICES};

/// Result of [`simplify`].
#[derive(Debug, Clone, PartialEq)]
pub struct Simplification {
    /// The simplified sequence (or the original, see [`Self::fell_back`]).
    pub coordinates: Vec<Coordinate>,
    /// Set when a closed ring would have been reduced below a valid polygon
    /// and the original ring was returned instead.
    pub fell_back: bool,
}

/// Simplifies a coordinate sequence with the Douglas-Peucker algorithm.
///
/// Open paths and closed rings are both accepted. The first and last
/// coordinates are always kept, so a closed ring stays closed. When a ring
/// would end up with fewer than four coordinates or three distinct
/// vertices, the input ring is returned unchanged with
/// [`Simplification::fell_back`] set.
///
/// `epsilon == 0` and sequences of two or fewer coordinates are returned
/// unchanged. When several points share the maximum distance the earliest
/// one is used as the split point.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidTolerance`] if `epsilon` is negative or
/// not finite.
pub fn simplify(coordinates: &[Coordinate], epsilon: f64) -> Result<Simplification, GeometryError> {
    if !epsilon.is_finite() || epsilon < 0.0 {
        return Err(GeometryError::InvalidTolerance(epsilon));
    }

    let unchanged = || Simplification {
        coordinates: coordinates.to_vec(),
        fell_back: false,
    };

    if epsilon == 0.0 || coordinates.len() <= 2 {
        return Ok(unchanged());
    }

    let reduced: Vec<Coordinate> = douglas_peucker(coordinates, epsilon)
        .into_iter()
        .map(|i| coordinates[i])
        .collect();

    if is_closed(coordinates)
        && (reduced.len() < MIN_RING_LEN || distinct_vertex_count(&reduced) < MIN_RING_VERTICES)
    {
        return Ok(Simplification {
            coordinates: coordinates.to_vec(),
            fell_back: true,
        });
    }

    Ok(Simplification {
        coordinates: reduced,
        fell_back: false,
    })
}

/// Shorthand for [`simplify`] when the fallback flag is not needed.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidTolerance`] if `epsilon` is negative or
/// not finite.
pub fn simplify_coordinates(
    coordinates: &[Coordinate],
    epsilon: f64,
) -> Result<Vec<Coordinate>, GeometryError> {
    simplify(coordinates, epsilon).map(|s| s.coordinates)
}

/// Returns the indices of the points kept by Douglas-Peucker, ascending.
///
/// Uses an explicit stack of index ranges instead of recursion. The set of
/// kept points does not depend on the order ranges are processed in, so
/// the result matches the recursive formulation.
fn douglas_peucker(points: &[Coordinate], epsilon: f64) -> Vec<usize> {
    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut ranges = vec![(0, last)];
    while let Some((start, end)) = ranges.pop() {
        if end <= start + 1 {
            continue;
        }

        let (index, distance) = farthest_point(points, start, end);
        if distance > epsilon {
            keep[index] = true;
            ranges.push((start, index));
            ranges.push((index, end));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect()
}

/// Finds the interior point of `start..=end` farthest from the segment
/// `points[start] -> points[end]`. Ties go to the earliest index.
fn farthest_point(points: &[Coordinate], start: usize, end: usize) -> (usize, f64) {
    let mut max_index = start;
    let mut max_distance = f64::NEG_INFINITY;

    for (i, point) in points.iter().enumerate().take(end).skip(start + 1) {
        let distance = perpendicular_distance(*point, points[start], points[end]);
        if distance > max_distance {
            max_index = i;
            max_distance = distance;
        }
    }

    (max_index, max_distance)
}

/// Planar distance from `point` to the line through `start` and `end`.
///
/// When `start == end` (a closed ring's endpoints) the distance to that
/// single point is used.
fn perpendicular_distance(point: Coordinate, start: Coordinate, end: Coordinate) -> f64 {
    let dx = end.lon - start.lon;
    let dy = end.lat - start.lat;
    let length = dx.hypot(dy);

    if length == 0.0 {
        return (point.lon - start.lon).hypot(point.lat - start.lat);
    }

    (dy * point.lon - dx * point.lat + end.lon * start.lat - end.lat * start.lon).abs() / length
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(points: &[(f64, f64)]) -> Vec<Coordinate> {
        points.iter().copied().map(Coordinate::from).collect()
    }

    fn square_ring() -> Vec<Coordinate> {
        coords(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (0.0, 0.0)])
    }

    fn wiggly_path() -> Vec<Coordinate> {
        coords(&[
            (0.0, 0.0),
            (1.0, 0.3),
            (2.0, -0.2),
            (3.0, 1.5),
            (4.0, 0.1),
            (5.0, -0.05),
            (6.0, 2.5),
            (7.0, 0.4),
            (8.0, 0.0),
            (9.0, -1.2),
            (10.0, 0.0),
        ])
    }

    #[test]
    fn zero_epsilon_is_identity() {
        let path = coords(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        assert_eq!(simplify_coordinates(&path, 0.0).unwrap(), path);
    }

    #[test]
    fn short_sequences_are_untouched() {
        let path = coords(&[(0.0, 0.0), (5.0, 5.0)]);
        assert_eq!(simplify_coordinates(&path, 100.0).unwrap(), path);
        assert!(simplify_coordinates(&[], 1.0).unwrap().is_empty());
    }

    #[test]
    fn rejects_negative_and_nan_tolerance() {
        let path = wiggly_path();
        assert_eq!(
            simplify(&path, -1.0).unwrap_err(),
            GeometryError::InvalidTolerance(-1.0)
        );
        assert!(simplify(&path, f64::NAN).is_err());
    }

    #[test]
    fn collinear_points_collapse_to_endpoints() {
        let path = coords(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        assert_eq!(
            simplify_coordinates(&path, 0.01).unwrap(),
            coords(&[(0.0, 0.0), (3.0, 3.0)])
        );
    }

    #[test]
    fn keeps_points_beyond_tolerance() {
        let simplified = simplify_coordinates(&wiggly_path(), 1.0).unwrap();
        assert_eq!(
            simplified,
            coords(&[
                (0.0, 0.0),
                (2.0, -0.2),
                (3.0, 1.5),
                (5.0, -0.05),
                (6.0, 2.5),
                (9.0, -1.2),
                (10.0, 0.0),
            ])
        );
    }

    #[test]
    fn equal_distances_split_at_earliest_point() {
        // (1,1) and (3,1) are both at distance 1 from the base segment.
        let path = coords(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0), (3.0, 1.0), (4.0, 0.0)]);
        let simplified = simplify_coordinates(&path, 0.9).unwrap();
        assert_eq!(simplified[1], Coordinate::new(1.0, 1.0));
    }

    #[test]
    fn minimal_square_is_unchanged() {
        let ring = square_ring();
        let result = simplify(&ring, 0.001).unwrap();
        assert_eq!(result.coordinates, ring);
        assert!(!result.fell_back);
    }

    #[test]
    fn over_simplified_ring_falls_back_to_original() {
        let ring = square_ring();
        let result = simplify(&ring, 50.0).unwrap();
        assert!(result.fell_back);
        assert_eq!(result.coordinates, ring);
        assert_eq!(result.coordinates.first(), result.coordinates.last());
        assert!(result.coordinates.len() >= MIN_RING_LEN);
    }

    #[test]
    fn dense_ring_stays_closed() {
        let mut ring: Vec<Coordinate> = (0..64)
            .map(|i| {
                let angle = f64::from(i) / 64.0 * std::f64::consts::TAU;
                Coordinate::new(angle.cos() * 10.0, angle.sin() * 10.0)
            })
            .collect();
        ring.push(ring[0]);

        for epsilon in [0.01, 0.1, 1.0, 3.0, 20.0] {
            let result = simplify(&ring, epsilon).unwrap();
            assert_eq!(result.coordinates.first(), result.coordinates.last());
            assert!(result.coordinates.len() >= MIN_RING_LEN);
        }
    }

    #[test]
    fn simplification_is_idempotent() {
        let mut ring = wiggly_path();
        ring.push(Coordinate::new(5.0, -6.0));
        ring.push(ring[0]);

        for path in [wiggly_path(), ring] {
            for epsilon in [0.0, 0.1, 0.5, 1.0, 2.0, 100.0] {
                let once = simplify_coordinates(&path, epsilon).unwrap();
                let twice = simplify_coordinates(&once, epsilon).unwrap();
                assert_eq!(once, twice, "epsilon {epsilon}");
            }
        }
    }

    #[test]
    fn larger_tolerance_never_keeps_more_points() {
        let path = wiggly_path();
        let epsilons = [0.0, 0.05, 0.2, 0.5, 1.0, 1.5, 2.0, 3.0, 10.0];
        let lengths: Vec<usize> = epsilons
            .iter()
            .map(|&e| simplify_coordinates(&path, e).unwrap().len())
            .collect();
        assert!(lengths.windows(2).all(|w| w[1] <= w[0]), "{lengths:?}");
    }
}
