//! Divide-and-conquer triangulation over x-sorted points.
//!
//! Points are sorted by x (stable, so ties keep input order) and the range is
//! halved at `mid = lo + (hi - lo) / 2` until at most three points remain.
//! Three points form a triangle when they are not collinear; one or two
//! points form nothing. Sub-results are then joined with a [`MergeStrategy`].
//!
//! Neither merge is a full Delaunay merge. Their output is a valid set of
//! counter-clockwise, non-degenerate, non-duplicated triangles, but it need
//! not cover the convex hull nor satisfy the empty circumcircle property.
//! Use [`Construction::IncrementalFlip`](super::construction::Construction)
//! when a Delaunay mesh is required.

use serde::{Deserialize, Serialize};

use crate::core::algorithms::construction::{BuildStats, ConstructionError};
use crate::core::mesh::{Mesh, VertexKey};
use crate::geometry::point::Point;
use crate::geometry::predicates::{InCircle, angle, area, in_circle, orientation};

/// How two triangulated halves are joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeStrategy {
    /// Each point of the merged range, in x order, is joined to its two
    /// nearest already-visited points of the range when the three are
    /// counter-clockwise.
    #[default]
    NearestNeighbor,
    /// A base edge between the two halves advances upward; at each step it is
    /// joined to the best candidate on its left or right, picked by the
    /// in-circle test.
    AdvancingFront,
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Divide-and-conquer builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DivideAndConquer {
    strategy: MergeStrategy,
}

impl DivideAndConquer {
    #[must_use]
    pub const fn new(strategy: MergeStrategy) -> Self {
        Self { strategy }
    }

    #[must_use]
    pub const fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    /// Triangulates every non-auxiliary vertex of `mesh` and rebuilds
    /// adjacency.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::AlreadyTriangulated`] if the mesh has
    /// triangles, or a [`ConstructionError::Mesh`] on a failed insertion.
    pub fn triangulate(&self, mesh: &mut Mesh) -> Result<BuildStats, ConstructionError> {
        if mesh.number_of_triangles() > 0 {
            return Err(ConstructionError::AlreadyTriangulated {
                triangles: mesh.number_of_triangles(),
            });
        }
        let mut points: Vec<(VertexKey, Point)> = mesh
            .vertices()
            .filter(|(_, v)| !v.is_auxiliary())
            .map(|(k, v)| (k, v.point()))
            .collect();
        // `vertices()` follows arena order; sort by index first so ties in x
        // keep input order.
        points.sort_by_key(|&(k, _)| mesh.vertex(k).map_or(0, |v| v.index()));
        points.sort_by(|(_, p), (_, q)| p.x().total_cmp(&q.x()));

        let mut stats = BuildStats {
            inserted: points.len(),
            ..BuildStats::default()
        };
        if !points.is_empty() {
            self.build(mesh, &points, &mut stats)?;
        }
        mesh.rebuild_adjacency();
        stats.triangles = mesh.number_of_triangles();
        Ok(stats)
    }

    fn build(
        &self,
        mesh: &mut Mesh,
        points: &[(VertexKey, Point)],
        stats: &mut BuildStats,
    ) -> Result<(), ConstructionError> {
        if points.len() <= 3 {
            if let [a, b, c] = points {
                add_triangle(mesh, [a.0, b.0, c.0], stats)?;
            }
            return Ok(());
        }

        let mid = (points.len() - 1) / 2;
        let (left, right) = points.split_at(mid + 1);
        self.build(mesh, left, stats)?;
        self.build(mesh, right, stats)?;

        stats.merges += 1;
        match self.strategy {
            MergeStrategy::NearestNeighbor => merge_nearest(mesh, points, stats),
            MergeStrategy::AdvancingFront => merge_advancing_front(mesh, points, mid, stats),
        }
    }
}

/// Adds `(a, b, c)` counter-clockwise unless it is degenerate or already
/// present. Returns whether a triangle was added.
fn add_triangle(
    mesh: &mut Mesh,
    [a, b, c]: [VertexKey; 3],
    stats: &mut BuildStats,
) -> Result<bool, ConstructionError> {
    let (pa, pb, pc) = (mesh.point(a)?, mesh.point(b)?, mesh.point(c)?);
    if area(pa, pb, pc) <= mesh.tolerances().degeneracy {
        stats.skipped_degenerate += 1;
        return Ok(false);
    }
    let ccw = if orientation(pa, pb, pc) < 0.0 {
        [a, c, b]
    } else {
        [a, b, c]
    };
    if mesh.find_triangle(ccw[0], ccw[1], ccw[2]).is_some() {
        stats.skipped_duplicates += 1;
        return Ok(false);
    }
    mesh.insert_triangle(ccw[0], ccw[1], ccw[2])?;
    Ok(true)
}

fn merge_nearest(
    mesh: &mut Mesh,
    points: &[(VertexKey, Point)],
    stats: &mut BuildStats,
) -> Result<(), ConstructionError> {
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        tracing::trace!(leftmost = %first.1, rightmost = %last.1, "nearest-neighbor merge");
    }

    let mut visited = vec![false; points.len()];
    for (i, &(current, p)) in points.iter().enumerate() {
        let mut nearest: Option<(usize, f64)> = None;
        let mut second: Option<(usize, f64)> = None;
        for (j, &(_, q)) in points.iter().enumerate() {
            if !visited[j] || j == i {
                continue;
            }
            let d = p.distance(q);
            if nearest.is_none_or(|(_, best)| d < best) {
                second = nearest;
                nearest = Some((j, d));
            } else if second.is_none_or(|(_, best)| d < best) {
                second = Some((j, d));
            }
        }

        if let (Some((n1, _)), Some((n2, _))) = (nearest, second) {
            let (a, pa) = points[n1];
            let (b, pb) = points[n2];
            if orientation(pa, pb, p) > 0.0 {
                add_triangle(mesh, [a, b, current], stats)?;
            }
        }
        visited[i] = true;
    }
    Ok(())
}

fn merge_advancing_front(
    mesh: &mut Mesh,
    points: &[(VertexKey, Point)],
    mid: usize,
    stats: &mut BuildStats,
) -> Result<(), ConstructionError> {
    let (mut b0, mut b1) = (mid, mid + 1);
    let limit = 3 * points.len() + 3;
    let circle_eps = mesh.tolerances().circle;

    for step in 0..limit {
        let left = best_candidate(mesh, points, b0, b1, Side::Left);
        let right = best_candidate(mesh, points, b0, b1, Side::Right);
        let take_right = match (left, right) {
            (None, None) => {
                tracing::trace!(step, "advancing front closed");
                return Ok(());
            }
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (Some(l), Some(r)) => {
                in_circle(points[l].1, points[b0].1, points[b1].1, points[r].1, circle_eps)
                    == InCircle::INSIDE
            }
        };

        if take_right && let Some(r) = right {
            add_triangle(mesh, [points[r].0, points[b0].0, points[b1].0], stats)?;
            b0 = r;
        } else if let Some(l) = left {
            add_triangle(mesh, [points[l].0, points[b0].0, points[b1].0], stats)?;
            b1 = l;
        }
    }

    tracing::warn!(limit, "advancing-front merge hit its step limit");
    Ok(())
}

/// Candidate on `side` of the base edge `b0`-`b1` maximizing the angle the
/// base subtends at it.
fn best_candidate(
    mesh: &Mesh,
    points: &[(VertexKey, Point)],
    b0: usize,
    b1: usize,
    side: Side,
) -> Option<usize> {
    let eps = mesh.tolerances().degeneracy;
    let (k0, p0) = points[b0];
    let (k1, p1) = points[b1];

    let mut best: Option<(usize, f64)> = None;
    for (k, &(key, p)) in points.iter().enumerate() {
        if k == b0 || k == b1 {
            continue;
        }
        let o = orientation(p0, p1, p);
        let on_side = match side {
            Side::Left => o > eps,
            Side::Right => o < -eps,
        };
        if !on_side || area(p, p0, p1) <= eps {
            continue;
        }
        if mesh.find_triangle(key, k0, k1).is_some() || mesh.find_triangle(key, k1, k0).is_some() {
            continue;
        }
        let Some(theta) = angle(p, p0, p1) else {
            continue;
        };
        if best.is_none_or(|(_, top)| theta > top) {
            best = Some((k, theta));
        }
    }
    best.map(|(k, _)| k)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vertex::PointSet;
    use crate::geometry::tolerances::Tolerances;

    fn mesh_of(points: &[[f64; 2]]) -> Mesh {
        let set = PointSet::from_points(points.iter().copied()).unwrap();
        Mesh::from_point_set(&set, Tolerances::default()).unwrap()
    }

    fn assert_well_formed(mesh: &Mesh) {
        assert!(mesh.validate_triangles().is_ok());
        let triangles: Vec<_> = mesh.triangles().map(|(_, t)| t).collect();
        for (i, t) in triangles.iter().enumerate() {
            for u in &triangles[i + 1..] {
                assert!(!t.is_rotation_of(u.vertices()), "duplicate triangle {t:?}");
            }
        }
    }

    #[test]
    fn test_base_cases() {
        let mut mesh = mesh_of(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        let stats = DivideAndConquer::default().triangulate(&mut mesh).unwrap();
        assert_eq!(stats.triangles, 1);
        assert_eq!(stats.merges, 0);

        let mut collinear = mesh_of(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]);
        let stats = DivideAndConquer::default().triangulate(&mut collinear).unwrap();
        assert_eq!(stats.triangles, 0);
        assert_eq!(stats.skipped_degenerate, 1);

        let mut pair = mesh_of(&[[0.0, 0.0], [1.0, 0.0]]);
        assert_eq!(DivideAndConquer::default().triangulate(&mut pair).unwrap().triangles, 0);
    }

    #[test]
    fn test_nearest_neighbor_unit_square() {
        // Sorted: (0,0), (0,1), (1,0), (1,1). Only (1,1) closes a
        // counter-clockwise triangle with its two nearest visited points.
        let mut mesh = mesh_of(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        let stats = DivideAndConquer::new(MergeStrategy::NearestNeighbor)
            .triangulate(&mut mesh)
            .unwrap();
        assert_eq!(stats.merges, 1);
        assert_eq!(stats.triangles, 1);
        let k: Vec<_> = (0..4).map(|i| mesh.vertex_key(i).unwrap()).collect();
        assert!(mesh.find_triangle(k[1], k[2], k[3]).is_some());
        assert!(mesh.is_valid().is_ok());
    }

    #[test]
    fn test_advancing_front_terminates_with_valid_triangles() {
        let points: Vec<[f64; 2]> = (0..12)
            .map(|i| {
                let t = f64::from(i);
                [t, (t * 1.7).sin() * 3.0]
            })
            .collect();
        let mut mesh = mesh_of(&points);
        let stats = DivideAndConquer::new(MergeStrategy::AdvancingFront)
            .triangulate(&mut mesh)
            .unwrap();
        assert!(stats.merges > 0);
        assert!(stats.triangles > 0);
        assert_well_formed(&mesh);
        assert!(mesh.validate_neighbors().is_ok());
    }

    #[test]
    fn test_nearest_neighbor_produces_valid_triangles() {
        let points: Vec<[f64; 2]> = (0..20)
            .map(|i| {
                let t = f64::from(i);
                [(t * 0.37).fract() * 10.0 + t * 0.01, (t * 0.61).fract() * 10.0]
            })
            .collect();
        let mut mesh = mesh_of(&points);
        DivideAndConquer::new(MergeStrategy::NearestNeighbor)
            .triangulate(&mut mesh)
            .unwrap();
        assert_well_formed(&mesh);
        assert!(mesh.validate_neighbors().is_ok());
    }

    #[test]
    fn test_merge_strategy_serde() {
        let json = serde_json::to_string(&MergeStrategy::AdvancingFront).unwrap();
        assert_eq!(json, "\"AdvancingFront\"");
    }
}
