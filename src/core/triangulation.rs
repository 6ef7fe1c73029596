//! The driver owning a mesh from input points to refined output.
//!
//! [`Triangulation`] builds the unconstrained mesh on creation and exposes
//! constraint insertion and quality refinement as explicit calls. Every call is
//! all-or-nothing: a failing call leaves the mesh as it was before.
//!
//! # Examples
//!
//! ```rust
//! use delaunay_refine::prelude::*;
//!
//! let points = PointSet::from_points([
//!     [0.0, 0.0],
//!     [4.0, 0.0],
//!     [4.0, 3.0],
//!     [0.0, 3.0],
//!     [1.0, 1.5],
//! ])
//! .unwrap();
//! let mut tri = Triangulation::new(&points).unwrap();
//! assert_eq!(tri.mesh().number_of_triangles(), 4);
//!
//! tri.insert_constraint(Segment::new(0, 2)).unwrap();
//! let output = tri.output();
//! assert_eq!(output.segments, vec![[0, 2]]);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::algorithms::constrained_insertion::{
    ConstraintError, ConstraintInserter, ConstraintReport,
};
use crate::core::algorithms::construction::{BuildStats, Construction, ConstructionError};
use crate::core::algorithms::flips::{DEFAULT_FLIP_PASS_LIMIT, LocalFlipOptimizer};
use crate::core::algorithms::refinement::{
    QualityRefiner, RefinementError, RefinementParameters, RefinementReport,
};
use crate::core::edge::Segment;
use crate::core::mesh::{Mesh, MeshError, MeshOutput, MeshStatistics, MeshValidationError};
use crate::core::vertex::{PointSet, PointSetError};
use crate::geometry::tolerances::Tolerances;

/// Errors surfaced by the [`Triangulation`] driver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TriangulationError {
    /// The input points are invalid.
    #[error("Invalid point set: {0}")]
    PointSet(#[from] PointSetError),
    /// The configured tolerances are unusable.
    #[error("Invalid tolerances: {tolerances:?}")]
    InvalidTolerances {
        /// The rejected tolerances
        tolerances: Tolerances,
    },
    /// Loading the mesh failed.
    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),
    /// Building the unconstrained mesh failed.
    #[error("Construction failed: {0}")]
    Construction(#[from] ConstructionError),
    /// A constraint segment could not be inserted.
    #[error("Constraint insertion failed: {0}")]
    Constraint(#[from] ConstraintError),
    /// Quality refinement failed.
    #[error("Refinement failed: {0}")]
    Refinement(#[from] RefinementError),
}

/// Construction settings for a [`Triangulation`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangulationOptions {
    /// How the unconstrained mesh is built and rebuilt.
    pub construction: Construction,
    /// Tolerances carried by the mesh.
    pub tolerances: Tolerances,
    /// Cap on flip passes around one vertex.
    pub flip_pass_limit: usize,
}

impl Default for TriangulationOptions {
    fn default() -> Self {
        Self {
            construction: Construction::default(),
            tolerances: Tolerances::default(),
            flip_pass_limit: DEFAULT_FLIP_PASS_LIMIT,
        }
    }
}

impl TriangulationOptions {
    #[must_use]
    pub const fn with_construction(mut self, construction: Construction) -> Self {
        self.construction = construction;
        self
    }

    #[must_use]
    pub const fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    #[must_use]
    pub const fn with_flip_pass_limit(mut self, flip_pass_limit: usize) -> Self {
        self.flip_pass_limit = flip_pass_limit;
        self
    }

    /// The flip optimizer these options describe.
    #[must_use]
    pub fn optimizer(&self) -> LocalFlipOptimizer {
        LocalFlipOptimizer::new().with_max_passes(self.flip_pass_limit)
    }
}

/// A planar triangulation with its construction settings.
#[derive(Debug, Clone)]
pub struct Triangulation {
    mesh: Mesh,
    options: TriangulationOptions,
    build_stats: BuildStats,
}

impl Triangulation {
    /// Triangulates `points` with default options.
    ///
    /// # Errors
    ///
    /// See [`Triangulation::with_options`].
    pub fn new(points: &PointSet) -> Result<Self, TriangulationError> {
        Self::with_options(points, TriangulationOptions::default())
    }

    /// Triangulates `points` with `options`.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidTolerances`] for negative or
    /// non-finite tolerances, or the error of loading or building the mesh.
    pub fn with_options(
        points: &PointSet,
        options: TriangulationOptions,
    ) -> Result<Self, TriangulationError> {
        if !options.tolerances.is_valid() {
            return Err(TriangulationError::InvalidTolerances {
                tolerances: options.tolerances,
            });
        }
        let mut mesh = Mesh::from_point_set(points, options.tolerances)?;
        let build_stats = options.construction.build(&mut mesh, &options.optimizer())?;
        tracing::debug!(
            vertices = points.len(),
            triangles = build_stats.triangles,
            "triangulation created"
        );
        Ok(Self {
            mesh,
            options,
            build_stats,
        })
    }

    #[must_use]
    pub const fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    #[must_use]
    pub fn into_mesh(self) -> Mesh {
        self.mesh
    }

    #[must_use]
    pub const fn options(&self) -> &TriangulationOptions {
        &self.options
    }

    /// Counters from the initial build.
    #[must_use]
    pub const fn build_stats(&self) -> &BuildStats {
        &self.build_stats
    }

    /// Forces one segment into the mesh.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::Constraint`]; the mesh is unchanged.
    pub fn insert_constraint(
        &mut self,
        segment: impl Into<Segment>,
    ) -> Result<ConstraintReport, TriangulationError> {
        let inserter = ConstraintInserter::new(self.options.optimizer());
        Ok(inserter.insert(&mut self.mesh, segment.into())?)
    }

    /// Forces every segment into the mesh, in order.
    ///
    /// # Errors
    ///
    /// Returns the first failure. Segments inserted before it are rolled back
    /// too.
    pub fn insert_constraints<I>(&mut self, segments: I) -> Result<Vec<ConstraintReport>, TriangulationError>
    where
        I: IntoIterator<Item = Segment>,
    {
        let snapshot = self.mesh.clone();
        let inserter = ConstraintInserter::new(self.options.optimizer());
        let mut reports = Vec::new();
        for segment in segments {
            match inserter.insert(&mut self.mesh, segment) {
                Ok(report) => reports.push(report),
                Err(err) => {
                    self.mesh = snapshot;
                    return Err(err.into());
                }
            }
        }
        Ok(reports)
    }

    /// Refines the mesh toward `params`.
    ///
    /// Restricted edges are not preserved: every pass rebuilds the mesh from
    /// its vertices.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::Refinement`]; the mesh is unchanged.
    pub fn refine(&mut self, params: &RefinementParameters) -> Result<RefinementReport, TriangulationError> {
        let refiner = QualityRefiner::new(self.options.construction, self.options.optimizer());
        let mut working = self.mesh.clone();
        let report = refiner.refine(&mut working, params)?;
        self.mesh = working;
        tracing::debug!(
            passes = report.passes,
            points_added = report.points_added,
            converged = report.converged,
            "refinement finished"
        );
        Ok(report)
    }

    /// Vertices, triangles and segments by value.
    #[must_use]
    pub fn output(&self) -> MeshOutput {
        self.mesh.to_output()
    }

    #[must_use]
    pub fn statistics(&self) -> MeshStatistics {
        self.mesh.statistics()
    }

    /// Structural checks on the mesh.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn is_valid(&self) -> Result<(), MeshValidationError> {
        self.mesh.is_valid()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::algorithms::divide_and_conquer::MergeStrategy;
    use crate::core::algorithms::refinement::RefinementParametersBuilder;

    fn square() -> PointSet {
        PointSet::from_points([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]).unwrap()
    }

    #[test]
    fn test_new_builds_delaunay_mesh() {
        let tri = Triangulation::new(&square()).unwrap();
        assert_eq!(tri.mesh().number_of_triangles(), 2);
        assert_eq!(tri.build_stats().inserted, 4);
        assert!(tri.is_valid().is_ok());
        assert_eq!(tri.output().triangles.len(), 2);
    }

    #[test]
    fn test_options_select_construction() {
        let options = TriangulationOptions::default()
            .with_construction(Construction::DivideAndConquer(MergeStrategy::NearestNeighbor));
        let tri = Triangulation::with_options(&square(), options).unwrap();
        assert_eq!(tri.mesh().number_of_triangles(), 1);
        assert_eq!(tri.options().construction, options.construction);
    }

    #[test]
    fn test_invalid_tolerances() {
        let options = TriangulationOptions::default().with_tolerances(Tolerances {
            degeneracy: -1.0,
            ..Tolerances::default()
        });
        assert!(matches!(
            Triangulation::with_options(&square(), options),
            Err(TriangulationError::InvalidTolerances { .. })
        ));
    }

    #[test]
    fn test_insert_constraints_is_all_or_nothing() {
        let mut tri = Triangulation::new(&square()).unwrap();
        let err = tri
            .insert_constraints([Segment::new(0, 1), Segment::new(1, 9)])
            .unwrap_err();
        assert!(matches!(
            err,
            TriangulationError::Constraint(ConstraintError::UnknownVertex { index: 9 })
        ));
        assert!(tri.mesh().boundary().is_empty());
        assert!(tri.mesh().constrained_edges().is_empty());

        let reports = tri
            .insert_constraints([Segment::new(0, 1), Segment::new(1, 2)])
            .unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(tri.statistics().constrained_edges, 2);
    }

    #[test]
    fn test_refine_failure_keeps_mesh() {
        let mut tri = Triangulation::new(&square()).unwrap();
        let params = RefinementParameters {
            min_angle: 2.0,
            ..RefinementParameters::default()
        };
        assert!(matches!(
            tri.refine(&params),
            Err(TriangulationError::Refinement(RefinementError::InvalidParameters { .. }))
        ));
        assert_eq!(tri.mesh().number_of_vertices(), 4);

        let params = RefinementParametersBuilder::default()
            .max_area(0.2)
            .max_passes(5)
            .build()
            .unwrap();
        let report = tri.refine(&params).unwrap();
        assert!(report.points_added > 0);
        assert!(tri.is_valid().is_ok());
    }

    #[test]
    fn test_options_serde_roundtrip() {
        let options = TriangulationOptions::default().with_flip_pass_limit(7);
        let json = serde_json::to_string(&options).unwrap();
        let back: TriangulationOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
        assert_eq!(back.optimizer().max_passes(), 7);
    }
}
