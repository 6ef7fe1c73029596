//! Selection and bookkeeping shared by the unconstrained mesh builders.
//!
//! [`Construction`] picks the algorithm that turns a mesh holding only
//! vertices into a triangulation:
//!
//! - [`Construction::IncrementalFlip`] (default) inserts points one at a time
//!   inside an auxiliary bounding triangle and restores the Delaunay property
//!   with local flips; see [`incremental_insertion`](super::incremental_insertion).
//! - [`Construction::DivideAndConquer`] recursively triangulates x-sorted
//!   halves and merges them with the chosen [`MergeStrategy`]; see
//!   [`divide_and_conquer`](super::divide_and_conquer).
//!
//! Quality refinement rebuilds with the same strategy on every pass.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::algorithms::divide_and_conquer::{DivideAndConquer, MergeStrategy};
use crate::core::algorithms::flips::{FlipError, LocalFlipOptimizer};
use crate::core::algorithms::incremental_insertion::triangulate_incremental;
use crate::core::algorithms::locate::LocateError;
use crate::core::mesh::{Mesh, MeshError};

/// Errors raised while building an unconstrained mesh.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
    /// Builders start from a mesh without triangles.
    #[error("Mesh already has {triangles} triangles")]
    AlreadyTriangulated {
        /// Triangles present at the start
        triangles: usize,
    },
    /// A mesh edit failed.
    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),
    /// Point location failed.
    #[error("Location error: {0}")]
    Location(#[from] LocateError),
    /// Flip optimization failed.
    #[error("Flip error: {0}")]
    Flip(#[from] FlipError),
}

/// Counters reported by a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Vertices taken into the triangulation.
    pub inserted: usize,
    /// Vertices skipped because they coincide with an earlier one, or
    /// candidate triangles already present (divide and conquer).
    pub skipped_duplicates: usize,
    /// Candidate triangles or insertions skipped as degenerate.
    pub skipped_degenerate: usize,
    /// Triangles present after the build.
    pub triangles: usize,
    /// Edge flips performed.
    pub flips: usize,
    /// Merge steps performed by divide and conquer.
    pub merges: usize,
    /// Convex hull edges the incremental builder had to restore by flips
    /// before removing its auxiliary triangle.
    pub recovered_hull_edges: usize,
}

/// Algorithm used to build (and rebuild) the unconstrained mesh.
///
/// [`IncrementalFlip`](Self::IncrementalFlip) is the default: it is the
/// strategy whose output is always the Delaunay triangulation of the convex
/// hull, which constraint insertion and refinement rely on. Divide and
/// conquer stays available as a faster heuristic; its merges produce
/// well-formed triangles but guarantee neither the Delaunay property nor
/// full hull coverage. When it is selected,
/// [`MergeStrategy::NearestNeighbor`] is its default merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Construction {
    /// Incremental insertion with local flips inside an auxiliary triangle.
    #[default]
    IncrementalFlip,
    /// Divide and conquer over x-sorted points.
    DivideAndConquer(MergeStrategy),
}

impl Construction {
    /// Triangulates the vertices of `mesh`.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::AlreadyTriangulated`] if `mesh` already
    /// has triangles, or the error of the underlying builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use delaunay_refine::core::algorithms::construction::Construction;
    /// use delaunay_refine::core::algorithms::flips::LocalFlipOptimizer;
    /// use delaunay_refine::core::mesh::Mesh;
    /// use delaunay_refine::core::vertex::PointSet;
    /// use delaunay_refine::geometry::tolerances::Tolerances;
    ///
    /// let points = PointSet::from_points([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]).unwrap();
    /// let mut mesh = Mesh::from_point_set(&points, Tolerances::default()).unwrap();
    /// let stats = Construction::default()
    ///     .build(&mut mesh, &LocalFlipOptimizer::default())
    ///     .unwrap();
    /// assert_eq!(stats.triangles, 2);
    /// ```
    pub fn build(
        self,
        mesh: &mut Mesh,
        optimizer: &LocalFlipOptimizer,
    ) -> Result<BuildStats, ConstructionError> {
        if mesh.number_of_triangles() > 0 {
            return Err(ConstructionError::AlreadyTriangulated {
                triangles: mesh.number_of_triangles(),
            });
        }
        let stats = match self {
            Self::IncrementalFlip => triangulate_incremental(mesh, optimizer)?,
            Self::DivideAndConquer(strategy) => DivideAndConquer::new(strategy).triangulate(mesh)?,
        };
        tracing::debug!(
            construction = ?self,
            triangles = stats.triangles,
            skipped_duplicates = stats.skipped_duplicates,
            skipped_degenerate = stats.skipped_degenerate,
            "mesh built"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vertex::PointSet;
    use crate::geometry::tolerances::Tolerances;

    fn unit_square() -> Mesh {
        let set =
            PointSet::from_points([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]).unwrap();
        Mesh::from_point_set(&set, Tolerances::default()).unwrap()
    }

    #[test]
    fn test_refuses_triangulated_mesh() {
        let mut mesh = unit_square();
        let optimizer = LocalFlipOptimizer::default();
        Construction::default().build(&mut mesh, &optimizer).unwrap();
        assert_eq!(
            Construction::default().build(&mut mesh, &optimizer),
            Err(ConstructionError::AlreadyTriangulated { triangles: 2 })
        );
    }

    #[test]
    fn test_strategies_dispatch() {
        let optimizer = LocalFlipOptimizer::default();
        for construction in [
            Construction::IncrementalFlip,
            Construction::DivideAndConquer(MergeStrategy::NearestNeighbor),
            Construction::DivideAndConquer(MergeStrategy::AdvancingFront),
        ] {
            let mut mesh = unit_square();
            let stats = construction.build(&mut mesh, &optimizer).unwrap();
            assert_eq!(stats.triangles, mesh.number_of_triangles());
            assert!(stats.triangles >= 1);
            assert!(mesh.is_valid().is_ok());
        }
    }

    #[test]
    fn test_default_construction_covers_the_hull() {
        assert_eq!(Construction::default(), Construction::IncrementalFlip);
        assert_eq!(MergeStrategy::default(), MergeStrategy::NearestNeighbor);

        // Regular pentagon plus its center: 2·6 − 2 − 5 triangles.
        let mut points: Vec<[f64; 2]> = (0..5)
            .map(|i| {
                let t = f64::from(i) * std::f64::consts::TAU / 5.0;
                [t.cos(), t.sin()]
            })
            .collect();
        points.push([0.0, 0.0]);
        let set = PointSet::from_points(points).unwrap();
        let mut mesh = Mesh::from_point_set(&set, Tolerances::default()).unwrap();
        let stats = Construction::default()
            .build(&mut mesh, &LocalFlipOptimizer::default())
            .unwrap();
        assert_eq!(stats.triangles, 5);
        assert_eq!(mesh.hull_edges().len(), 5);
        assert!(mesh.validate_delaunay(1e-9).is_ok());
    }

    #[test]
    fn test_construction_serde() {
        let c = Construction::DivideAndConquer(MergeStrategy::AdvancingFront);
        let json = serde_json::to_string(&c).unwrap();
        let back: Construction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
