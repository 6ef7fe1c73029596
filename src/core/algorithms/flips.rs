//! Local Delaunay restoration by edge flips.
//!
//! After a vertex `v` is inserted, only edges near `v` can violate the empty
//! circumcircle property. [`LocalFlipOptimizer::optimize_around`] visits every
//! triangle referencing `v` and flips any edge whose opposite vertex lies
//! strictly inside the triangle's circumcircle, repeating full passes until a
//! pass performs no flip. [`LocalFlipOptimizer::optimize_all`] does the same
//! over the whole mesh. Constrained edges are never flipped.
//!
//! Lawson's flip algorithm terminates in exact arithmetic, but floating-point
//! evaluation on near-cocircular input can make two diagonals each look
//! illegal. Passes are therefore capped; hitting the cap is reported in
//! [`FlipStats::converged`], not as an error.
//!
//! # References
//!
//! - C. L. Lawson, "Software for C¹ surface interpolation", 1977.
//! - L. Guibas and J. Stolfi, "Primitives for the manipulation of general
//!   subdivisions and the computation of Voronoi diagrams", 1985.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::mesh::{Mesh, MeshError, TriangleKey, VertexKey};
use crate::geometry::predicates::{in_circumcircle, orientation};

/// Default cap on full passes around one vertex.
pub const DEFAULT_FLIP_PASS_LIMIT: usize = 1024;

/// Errors raised while optimizing around a vertex.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlipError {
    /// The vertex is not part of the mesh.
    #[error("Vertex {key:?} is not in the mesh")]
    UnknownVertex {
        /// The missing vertex
        key: VertexKey,
    },
    /// A mesh edit failed unexpectedly.
    #[error("Flip failed: {source}")]
    Mesh {
        #[from]
        /// The underlying mesh error
        source: MeshError,
    },
}

/// Outcome of one optimization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipStats {
    /// Full passes performed, including the final pass without flips.
    pub passes: usize,
    /// Total flips performed.
    pub flips: usize,
    /// `false` when the pass cap was reached while flips were still happening.
    pub converged: bool,
}

impl FlipStats {
    /// Adds another run's counts into this one.
    pub const fn absorb(&mut self, other: Self) {
        self.passes += other.passes;
        self.flips += other.flips;
        self.converged &= other.converged;
    }
}

/// Flips non-Delaunay edges around a vertex until a fixed point.
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::core::algorithms::flips::LocalFlipOptimizer;
/// use delaunay_refine::core::mesh::Mesh;
/// use delaunay_refine::core::vertex::PointSet;
/// use delaunay_refine::geometry::tolerances::Tolerances;
///
/// // Thin diamond triangulated along its long (non-Delaunay) diagonal
/// let points = PointSet::from_points([[0.0, 0.0], [1.0, -0.2], [2.0, 0.0], [1.0, 0.2]]).unwrap();
/// let mut mesh = Mesh::from_point_set(&points, Tolerances::default()).unwrap();
/// let k: Vec<_> = (0..4).map(|i| mesh.vertex_key(i).unwrap()).collect();
/// mesh.insert_triangle(k[0], k[1], k[2]).unwrap();
/// mesh.insert_triangle(k[0], k[2], k[3]).unwrap();
/// mesh.rebuild_adjacency();
///
/// let stats = LocalFlipOptimizer::default().optimize_around(&mut mesh, k[1]).unwrap();
/// assert_eq!(stats.flips, 1);
/// assert!(mesh.has_edge(k[1], k[3]));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFlipOptimizer {
    max_passes: usize,
    include_auxiliary: bool,
}

impl Default for LocalFlipOptimizer {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_FLIP_PASS_LIMIT,
            include_auxiliary: false,
        }
    }
}

impl LocalFlipOptimizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of full passes per call.
    #[must_use]
    pub const fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Also tests edges shared with auxiliary triangles. Needed while the
    /// auxiliary bounding triangle is still part of the mesh.
    #[must_use]
    pub const fn including_auxiliary(mut self, include: bool) -> Self {
        self.include_auxiliary = include;
        self
    }

    #[must_use]
    pub const fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// Restores the Delaunay property around `v`.
    ///
    /// # Errors
    ///
    /// Returns [`FlipError::UnknownVertex`] if `v` is not in the mesh, or
    /// [`FlipError::Mesh`] if the mesh is structurally inconsistent.
    pub fn optimize_around(&self, mesh: &mut Mesh, v: VertexKey) -> Result<FlipStats, FlipError> {
        self.optimize_around_from(mesh, v, None).map(|(stats, _)| stats)
    }

    /// Same as [`optimize_around`](Self::optimize_around), but finds the
    /// triangles around `v` by rotating from `hint` instead of scanning the
    /// whole mesh.
    ///
    /// Also returns a triangle incident to `v` once the flips are done, for
    /// use as the next hint.
    ///
    /// # Errors
    ///
    /// Same as [`optimize_around`](Self::optimize_around).
    pub fn optimize_around_from(
        &self,
        mesh: &mut Mesh,
        v: VertexKey,
        hint: Option<TriangleKey>,
    ) -> Result<(FlipStats, Option<TriangleKey>), FlipError> {
        if mesh.vertex(v).is_none() {
            return Err(FlipError::UnknownVertex { key: v });
        }

        let mut stats = FlipStats::default();
        let mut anchor = hint;
        while stats.passes < self.max_passes {
            stats.passes += 1;
            let mut flipped = 0usize;
            let star = mesh.vertex_star(v, anchor);
            anchor = star.first().copied();
            for key in star {
                if !mesh.contains_triangle(key) {
                    continue;
                }
                if let Some(edge) = self.illegal_edge(mesh, key)? {
                    let created = mesh.flip(key, edge)?;
                    flipped += 1;
                    if let Some(&k) = created
                        .iter()
                        .find(|&&k| mesh.triangle(k).is_some_and(|t| t.contains_vertex(v)))
                    {
                        anchor = Some(k);
                    }
                }
            }
            stats.flips += flipped;
            if flipped == 0 {
                stats.converged = true;
                return Ok((stats, anchor));
            }
        }

        tracing::warn!(
            passes = stats.passes,
            flips = stats.flips,
            "flip optimization hit the pass limit"
        );
        Ok((stats, anchor))
    }

    /// Flips illegal edges anywhere in the mesh until a pass over every
    /// triangle performs no flip.
    ///
    /// # Errors
    ///
    /// Returns [`FlipError::Mesh`] if the mesh is structurally inconsistent.
    pub fn optimize_all(&self, mesh: &mut Mesh) -> Result<FlipStats, FlipError> {
        let mut stats = FlipStats::default();
        while stats.passes < self.max_passes {
            stats.passes += 1;
            let mut flipped = 0usize;
            let keys: Vec<TriangleKey> = mesh.triangles().map(|(k, _)| k).collect();
            for key in keys {
                if !mesh.contains_triangle(key) {
                    continue;
                }
                if let Some(edge) = self.illegal_edge(mesh, key)? {
                    mesh.flip(key, edge)?;
                    flipped += 1;
                }
            }
            stats.flips += flipped;
            if flipped == 0 {
                stats.converged = true;
                tracing::debug!(passes = stats.passes, flips = stats.flips, "mesh legalized");
                return Ok(stats);
            }
        }

        tracing::warn!(
            passes = stats.passes,
            flips = stats.flips,
            "mesh legalization hit the pass limit"
        );
        Ok(stats)
    }

    /// First edge of `key` that should be flipped, if any.
    fn illegal_edge(&self, mesh: &Mesh, key: TriangleKey) -> Result<Option<usize>, MeshError> {
        let tri = mesh
            .triangle(key)
            .ok_or(MeshError::TriangleNotFound { key })?;
        let [a, b, c] = mesh.triangle_points(key)?;
        let tol = *mesh.tolerances();

        for i in 0..3 {
            let Some(n) = tri.neighbor(i) else {
                continue;
            };
            if tri.is_constrained(i) {
                continue;
            }
            let Some(other) = mesh.triangle(n) else {
                continue;
            };
            if other.is_auxiliary() && !self.include_auxiliary {
                continue;
            }
            let (u, w) = tri.edge_endpoints(i);
            let Some(j) = other.edge_index(u, w) else {
                continue;
            };
            if other.is_constrained(j) {
                continue;
            }
            let d = mesh.point(other.vertex(j))?;
            if in_circumcircle(a, b, c, d) <= tol.circle {
                continue;
            }
            // Both new triangles need area above the degeneracy tolerance.
            let apex = [a, b, c][i];
            let (pu, pw) = (mesh.point(u)?, mesh.point(w)?);
            let min_det = 2.0 * tol.degeneracy;
            if orientation(apex, pu, d) > min_det && orientation(apex, d, pw) > min_det {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vertex::{PointSet, Vertex, VertexIndex};
    use crate::geometry::point::Point;
    use crate::geometry::tolerances::Tolerances;

    fn diamond() -> (Mesh, Vec<VertexKey>) {
        let set = PointSet::from_points([[0.0, 0.0], [1.0, -0.2], [2.0, 0.0], [1.0, 0.2]])
            .unwrap();
        let mut mesh = Mesh::from_point_set(&set, Tolerances::default()).unwrap();
        let k: Vec<_> = (0..4).map(|i| mesh.vertex_key(i).unwrap()).collect();
        mesh.insert_triangle(k[0], k[1], k[2]).unwrap();
        mesh.insert_triangle(k[0], k[2], k[3]).unwrap();
        mesh.rebuild_adjacency();
        (mesh, k)
    }

    #[test]
    fn test_flip_to_delaunay() {
        let (mut mesh, k) = diamond();
        let stats = LocalFlipOptimizer::new().optimize_around(&mut mesh, k[3]).unwrap();
        assert_eq!(stats.flips, 1);
        assert_eq!(stats.passes, 2);
        assert!(stats.converged);
        assert!(mesh.has_edge(k[1], k[3]));
        assert!(mesh.is_valid().is_ok());
        assert!(mesh.validate_delaunay(1e-9).is_ok());
    }

    #[test]
    fn test_hinted_optimization_returns_incident_triangle() {
        let (mut mesh, k) = diamond();
        let start = mesh.triangles_around(k[3]).first().copied();
        let (stats, hint) = LocalFlipOptimizer::new()
            .optimize_around_from(&mut mesh, k[3], start)
            .unwrap();
        assert_eq!(stats.flips, 1);
        assert!(stats.converged);
        let hint = hint.unwrap();
        assert!(mesh.triangle(hint).unwrap().contains_vertex(k[3]));
        assert!(mesh.has_edge(k[1], k[3]));
    }

    #[test]
    fn test_optimize_all_legalizes_every_edge() {
        // Fan of thin triangles from the left end of a flat strip.
        let set = PointSet::from_points([
            [0.0, 0.0],
            [1.0, -0.2],
            [2.0, -0.2],
            [3.0, 0.0],
            [2.0, 0.2],
            [1.0, 0.2],
        ])
        .unwrap();
        let mut mesh = Mesh::from_point_set(&set, Tolerances::default()).unwrap();
        let k: Vec<_> = (0..6).map(|i| mesh.vertex_key(i).unwrap()).collect();
        for i in 1..5 {
            mesh.insert_triangle(k[0], k[i], k[i + 1]).unwrap();
        }
        mesh.rebuild_adjacency();
        assert!(mesh.validate_delaunay(1e-9).is_err());

        let stats = LocalFlipOptimizer::new().optimize_all(&mut mesh).unwrap();
        assert!(stats.flips > 0);
        assert!(stats.converged);
        assert_eq!(mesh.number_of_triangles(), 4);
        assert!(mesh.is_valid().is_ok());
        assert!(mesh.validate_delaunay(1e-9).is_ok());

        let again = LocalFlipOptimizer::new().optimize_all(&mut mesh).unwrap();
        assert_eq!(again.flips, 0);
        assert_eq!(again.passes, 1);
    }

    #[test]
    fn test_already_delaunay_is_fixed_point() {
        let (mut mesh, k) = diamond();
        let optimizer = LocalFlipOptimizer::new();
        optimizer.optimize_around(&mut mesh, k[3]).unwrap();
        let again = optimizer.optimize_around(&mut mesh, k[3]).unwrap();
        assert_eq!(again.flips, 0);
        assert_eq!(again.passes, 1);
    }

    #[test]
    fn test_constrained_edge_is_kept() {
        let (mut mesh, k) = diamond();
        mesh.mark_constrained(k[0], k[2]);
        let stats = LocalFlipOptimizer::new().optimize_around(&mut mesh, k[1]).unwrap();
        assert_eq!(stats.flips, 0);
        assert!(mesh.has_edge(k[0], k[2]));
    }

    #[test]
    fn test_auxiliary_neighbors_are_skipped_by_default() {
        let set = PointSet::from_points([[0.0, 0.0], [1.0, -0.2], [2.0, 0.0]]).unwrap();
        let mut mesh = Mesh::from_point_set(&set, Tolerances::default()).unwrap();
        let k: Vec<_> = (0..3).map(|i| mesh.vertex_key(i).unwrap()).collect();
        let aux = mesh
            .insert_vertex(Vertex::new(Point::new(1.0, 0.2), -1))
            .unwrap();
        mesh.insert_triangle(k[0], k[1], k[2]).unwrap();
        mesh.insert_triangle(k[0], k[2], aux).unwrap();
        mesh.rebuild_adjacency();

        let skipped = LocalFlipOptimizer::new().optimize_around(&mut mesh, k[1]).unwrap();
        assert_eq!(skipped.flips, 0);

        let included = LocalFlipOptimizer::new()
            .including_auxiliary(true)
            .optimize_around(&mut mesh, k[1])
            .unwrap();
        assert_eq!(included.flips, 1);
        assert!(mesh.has_edge(k[1], aux));
    }

    #[test]
    fn test_pass_limit() {
        let (mut mesh, k) = diamond();
        let stats = LocalFlipOptimizer::new()
            .with_max_passes(1)
            .optimize_around(&mut mesh, k[3])
            .unwrap();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.flips, 1);
        assert!(!stats.converged);
    }

    #[test]
    fn test_unknown_vertex() {
        let (mut mesh, _) = diamond();
        let mut bigger = Mesh::new();
        let mut stranger = None;
        for i in 0..10 {
            stranger = Some(
                bigger
                    .insert_vertex(Vertex::new(Point::new(f64::from(i), 0.0), VertexIndex::from(i)))
                    .unwrap(),
            );
        }
        let stranger = stranger.unwrap();
        assert!(mesh.vertex(stranger).is_none());
        assert_eq!(
            LocalFlipOptimizer::new().optimize_around(&mut mesh, stranger),
            Err(FlipError::UnknownVertex { key: stranger })
        );
    }

    #[test]
    fn test_stats_absorb() {
        let mut total = FlipStats {
            passes: 1,
            flips: 2,
            converged: true,
        };
        total.absorb(FlipStats {
            passes: 3,
            flips: 0,
            converged: false,
        });
        assert_eq!(total.passes, 4);
        assert_eq!(total.flips, 2);
        assert!(!total.converged);
    }
}
