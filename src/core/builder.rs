//! Fluent builder running the whole meshing pipeline.
//!
//! [`TriangulationBuilder`] collects the input, the construction options, the
//! constraint segments and the refinement target, then runs
//! points → unconstrained mesh → constraints → refinement in one call.
//!
//! | Situation | Recommended API |
//! |---|---|
//! | Unconstrained Delaunay mesh, default options | [`Triangulation::new`] |
//! | Custom construction or tolerances | [`Triangulation::with_options`] or this builder |
//! | Segments and/or refinement in one go | [`TriangulationBuilder`] |
//!
//! # Examples
//!
//! ```rust
//! use delaunay_refine::core::builder::TriangulationBuilder;
//! use delaunay_refine::core::algorithms::refinement::RefinementParametersBuilder;
//! use delaunay_refine::core::edge::Segment;
//! use delaunay_refine::core::vertex::PointSet;
//!
//! let h = 3f64.sqrt() / 2.0;
//! let points = PointSet::from_points([[0.0, 0.0], [1.0, 0.0], [0.5, h]]).unwrap();
//! let (tri, report) = TriangulationBuilder::new(&points)
//!     .segments([Segment::new(0, 1), Segment::new(1, 2), Segment::new(2, 0)])
//!     .refine(RefinementParametersBuilder::default().max_area(0.2).build().unwrap())
//!     .build_with_report()
//!     .unwrap();
//!
//! assert_eq!(report.constraints.len(), 3);
//! assert_eq!(report.refinement.map(|r| r.points_added), Some(1));
//! assert_eq!(tri.mesh().number_of_triangles(), 3);
//! ```

use serde::{Deserialize, Serialize};

use crate::core::algorithms::constrained_insertion::ConstraintReport;
use crate::core::algorithms::construction::{BuildStats, Construction};
use crate::core::algorithms::refinement::{RefinementParameters, RefinementReport};
use crate::core::edge::Segment;
use crate::core::triangulation::{Triangulation, TriangulationError, TriangulationOptions};
use crate::core::vertex::PointSet;
use crate::geometry::tolerances::Tolerances;

/// Everything the pipeline reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Counters from the unconstrained build.
    pub build: BuildStats,
    /// One report per inserted segment, in input order.
    pub constraints: Vec<ConstraintReport>,
    /// Refinement outcome, when refinement was requested.
    pub refinement: Option<RefinementReport>,
}

/// Builder for a [`Triangulation`] with constraints and refinement.
#[derive(Debug, Clone)]
pub struct TriangulationBuilder<'p> {
    points: &'p PointSet,
    options: TriangulationOptions,
    segments: Vec<Segment>,
    refinement: Option<RefinementParameters>,
}

impl<'p> TriangulationBuilder<'p> {
    #[must_use]
    pub fn new(points: &'p PointSet) -> Self {
        Self {
            points,
            options: TriangulationOptions::default(),
            segments: Vec::new(),
            refinement: None,
        }
    }

    #[must_use]
    pub const fn options(mut self, options: TriangulationOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn construction(mut self, construction: Construction) -> Self {
        self.options.construction = construction;
        self
    }

    #[must_use]
    pub const fn tolerances(mut self, tolerances: Tolerances) -> Self {
        self.options.tolerances = tolerances;
        self
    }

    #[must_use]
    pub const fn flip_pass_limit(mut self, flip_pass_limit: usize) -> Self {
        self.options.flip_pass_limit = flip_pass_limit;
        self
    }

    /// Adds one constraint segment.
    #[must_use]
    pub fn segment(mut self, segment: impl Into<Segment>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Adds constraint segments.
    #[must_use]
    pub fn segments<I>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = Segment>,
    {
        self.segments.extend(segments);
        self
    }

    /// Refines the mesh after the constraints are in.
    #[must_use]
    pub const fn refine(mut self, params: RefinementParameters) -> Self {
        self.refinement = Some(params);
        self
    }

    /// Runs the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first [`TriangulationError`] of any stage.
    pub fn build(self) -> Result<Triangulation, TriangulationError> {
        self.build_with_report().map(|(tri, _)| tri)
    }

    /// Runs the pipeline and returns what each stage reported.
    ///
    /// # Errors
    ///
    /// Returns the first [`TriangulationError`] of any stage.
    pub fn build_with_report(self) -> Result<(Triangulation, PipelineReport), TriangulationError> {
        let mut tri = Triangulation::with_options(self.points, self.options)?;
        let mut report = PipelineReport {
            build: *tri.build_stats(),
            ..PipelineReport::default()
        };
        if !self.segments.is_empty() {
            report.constraints = tri.insert_constraints(self.segments)?;
        }
        if let Some(params) = self.refinement {
            report.refinement = Some(tri.refine(&params)?);
        }
        Ok((tri, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::algorithms::divide_and_conquer::MergeStrategy;
    use crate::core::algorithms::refinement::RefinementParametersBuilder;

    fn square() -> PointSet {
        PointSet::from_points([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]).unwrap()
    }

    #[test]
    fn test_defaults_match_triangulation_new() {
        let points = square();
        let built = TriangulationBuilder::new(&points).build().unwrap();
        let direct = Triangulation::new(&points).unwrap();
        assert_eq!(built.output(), direct.output());
    }

    #[test]
    fn test_options_are_forwarded() {
        let points = square();
        let tri = TriangulationBuilder::new(&points)
            .construction(Construction::DivideAndConquer(MergeStrategy::AdvancingFront))
            .flip_pass_limit(3)
            .build()
            .unwrap();
        assert_eq!(
            tri.options().construction,
            Construction::DivideAndConquer(MergeStrategy::AdvancingFront)
        );
        assert_eq!(tri.options().flip_pass_limit, 3);
    }

    #[test]
    fn test_report_without_refinement() {
        let points = square();
        let (tri, report) = TriangulationBuilder::new(&points)
            .segment((0, 2))
            .build_with_report()
            .unwrap();
        assert_eq!(report.build.triangles, 2);
        assert_eq!(report.constraints.len(), 1);
        assert!(report.refinement.is_none());
        assert_eq!(tri.mesh().boundary().len(), 1);
    }

    #[test]
    fn test_failing_stage_is_reported() {
        let points = square();
        let result = TriangulationBuilder::new(&points)
            .segment((0, 7))
            .refine(RefinementParametersBuilder::default().build().unwrap())
            .build();
        assert!(matches!(result, Err(TriangulationError::Constraint(_))));
    }
}
