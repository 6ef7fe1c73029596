//! Quality refinement by circumcenter insertion and whole-mesh rebuilds.
//!
//! Each pass:
//! 1. Queues every real triangle with an angle below `min_angle` or an area
//!    above `max_area` (the queue is bounded; overflow is counted and dropped)
//! 2. Proposes the circumcenter of each queued triangle, rejecting it when the
//!    circumcenter is undefined, lies outside the boundary (even-odd test), or
//!    is closer than the clearance to an existing or already accepted point.
//!    A circumcenter whose circumcircle already holds a point accepted in the
//!    same pass is deferred; its triangle is queued again next pass if it is
//!    still bad
//! 3. Adds the accepted points to a copy of the mesh and rebuilds that copy
//!    from scratch with the configured [`Construction`]
//! 4. Replaces the live mesh with the copy once the rebuild succeeds
//!
//! Deferral keeps every edge created in a pass at least as long as the
//! circumradius of the triangle that proposed it, so the point set stops
//! growing once no bad triangle has an inside circumcenter. Clearance checks
//! go through a hash grid rather than a scan of all vertices.
//!
//! Refinement stops after the first pass that accepts no point, or after
//! `max_passes` passes. Passes are atomic: on error the mesh holds the result
//! of the last completed pass.
//!
//! The boundary is the mesh's recorded boundary list, or its hull edges when
//! nothing is recorded, taken once when refinement starts. Rebuilds keep the
//! boundary list but not the restricted-edge flags; constraint segments are
//! not re-inserted.

use std::f64::consts::FRAC_PI_3;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::algorithms::construction::{Construction, ConstructionError};
use crate::core::algorithms::flips::LocalFlipOptimizer;
use crate::core::collections::{DEFAULT_QUEUE_CAPACITY, PointGrid, RefinementQueue};
use crate::core::mesh::{Mesh, MeshError};
use crate::geometry::point::Point;
use crate::geometry::predicates::{circumcenter, point_in_polygon};
use crate::geometry::quality::QualityBounds;

/// Default minimum angle: 20 degrees, in radians.
pub const DEFAULT_MIN_ANGLE: f64 = 20.0 * std::f64::consts::PI / 180.0;

/// Default cap on refinement passes.
pub const DEFAULT_MAX_PASSES: usize = 100;

/// Fraction of the bounding-box area used as the default maximum triangle area.
pub const DEFAULT_MAX_AREA_FRACTION: f64 = 0.01;

/// Errors raised by quality refinement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RefinementError {
    /// The parameters are out of range.
    #[error("Invalid refinement parameters: {message}")]
    InvalidParameters {
        /// What is wrong
        message: String,
    },
    /// Adding Steiner points failed.
    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),
    /// Rebuilding the mesh failed.
    #[error("Rebuild failed: {0}")]
    Construction(#[from] ConstructionError),
}

/// Quality targets and limits for [`QualityRefiner::refine`].
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::core::algorithms::refinement::RefinementParametersBuilder;
///
/// let params = RefinementParametersBuilder::default()
///     .min_angle(25f64.to_radians())
///     .max_area(0.5)
///     .build()
///     .unwrap();
/// assert_eq!(params.max_area, Some(0.5));
/// assert_eq!(params.max_passes, 100);
///
/// assert!(RefinementParametersBuilder::default().max_passes(0).build().is_err());
/// ```
#[derive(Builder, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct RefinementParameters {
    /// Smallest acceptable angle, in radians.
    #[builder(default = "DEFAULT_MIN_ANGLE")]
    pub min_angle: f64,
    /// Largest acceptable triangle area. `None` uses 1% of the bounding-box
    /// area of the vertices present when refinement starts.
    #[builder(setter(strip_option), default)]
    pub max_area: Option<f64>,
    /// Pass cap.
    #[builder(default = "DEFAULT_MAX_PASSES")]
    pub max_passes: usize,
    /// Capacity of the per-pass candidate queue.
    #[builder(default = "DEFAULT_QUEUE_CAPACITY")]
    pub queue_capacity: usize,
    /// Minimum distance between a new point and any other vertex. `None`
    /// uses the mesh's clearance tolerance.
    #[builder(setter(strip_option), default)]
    pub clearance: Option<f64>,
}

impl Default for RefinementParameters {
    fn default() -> Self {
        Self {
            min_angle: DEFAULT_MIN_ANGLE,
            max_area: None,
            max_passes: DEFAULT_MAX_PASSES,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            clearance: None,
        }
    }
}

fn check_min_angle(min_angle: f64) -> Result<(), String> {
    if (0.0..=FRAC_PI_3).contains(&min_angle) {
        Ok(())
    } else {
        Err(format!("min_angle must be within [0, π/3], got {min_angle}"))
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(format!("{name} must be finite and positive, got {value}"))
    }
}

fn check_count(name: &str, value: usize) -> Result<(), String> {
    if value == 0 {
        Err(format!("{name} must be at least 1"))
    } else {
        Ok(())
    }
}

impl RefinementParametersBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(min_angle) = self.min_angle {
            check_min_angle(min_angle)?;
        }
        if let Some(Some(max_area)) = self.max_area {
            check_positive("max_area", max_area)?;
        }
        if let Some(Some(clearance)) = self.clearance {
            check_positive("clearance", clearance)?;
        }
        if let Some(max_passes) = self.max_passes {
            check_count("max_passes", max_passes)?;
        }
        if let Some(capacity) = self.queue_capacity {
            check_count("queue_capacity", capacity)?;
        }
        Ok(())
    }
}

impl RefinementParameters {
    /// Checks the same ranges as the builder.
    ///
    /// # Errors
    ///
    /// Returns [`RefinementError::InvalidParameters`] for an out-of-range value.
    pub fn validate(&self) -> Result<(), RefinementError> {
        let checks = || -> Result<(), String> {
            check_min_angle(self.min_angle)?;
            if let Some(max_area) = self.max_area {
                check_positive("max_area", max_area)?;
            }
            if let Some(clearance) = self.clearance {
                check_positive("clearance", clearance)?;
            }
            check_count("max_passes", self.max_passes)?;
            check_count("queue_capacity", self.queue_capacity)
        };
        checks().map_err(|message| RefinementError::InvalidParameters { message })
    }
}

/// Outcome of a refinement run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RefinementReport {
    /// Passes run, including the final pass that accepted nothing.
    pub passes: usize,
    /// Steiner points added over all passes.
    pub points_added: usize,
    /// Bad triangles dropped because the queue was full.
    pub dropped: usize,
    /// Candidates rejected for an undefined circumcenter.
    pub rejected_degenerate: usize,
    /// Candidates rejected for lying outside the boundary.
    pub rejected_outside: usize,
    /// Candidates rejected for crowding an existing point.
    pub rejected_crowded: usize,
    /// Candidates held back to the next pass because a point accepted earlier
    /// in the same pass lies inside their triangle's circumcircle.
    pub deferred: usize,
    /// `true` when a pass accepted no point before the pass cap.
    pub converged: bool,
    /// The maximum area actually enforced.
    pub max_area: f64,
}

/// Refines a mesh until it meets a [`QualityBounds`] target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualityRefiner {
    construction: Construction,
    optimizer: LocalFlipOptimizer,
}

impl QualityRefiner {
    /// Creates a refiner that rebuilds with `construction`.
    #[must_use]
    pub const fn new(construction: Construction, optimizer: LocalFlipOptimizer) -> Self {
        Self {
            construction,
            optimizer,
        }
    }

    /// Runs refinement passes on `mesh`.
    ///
    /// # Errors
    ///
    /// Returns [`RefinementError::InvalidParameters`] before touching the mesh,
    /// or the error of a failed pass, in which case the mesh keeps the result
    /// of the previous pass.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use delaunay_refine::core::algorithms::construction::Construction;
    /// use delaunay_refine::core::algorithms::flips::LocalFlipOptimizer;
    /// use delaunay_refine::core::algorithms::refinement::{QualityRefiner, RefinementParametersBuilder};
    /// use delaunay_refine::core::mesh::Mesh;
    /// use delaunay_refine::core::vertex::PointSet;
    /// use delaunay_refine::geometry::tolerances::Tolerances;
    ///
    /// let h = 3f64.sqrt() / 2.0;
    /// let points = PointSet::from_points([[0.0, 0.0], [1.0, 0.0], [0.5, h]]).unwrap();
    /// let mut mesh = Mesh::from_point_set(&points, Tolerances::default()).unwrap();
    /// Construction::default().build(&mut mesh, &LocalFlipOptimizer::default()).unwrap();
    ///
    /// let params = RefinementParametersBuilder::default().max_area(0.2).build().unwrap();
    /// let report = QualityRefiner::default().refine(&mut mesh, &params).unwrap();
    /// assert_eq!(report.points_added, 1);
    /// assert_eq!(mesh.number_of_triangles(), 3);
    /// assert!(report.converged);
    /// ```
    pub fn refine(
        &self,
        mesh: &mut Mesh,
        params: &RefinementParameters,
    ) -> Result<RefinementReport, RefinementError> {
        params.validate()?;
        let mut report = RefinementReport::default();
        let Some(bbox) = mesh.bounding_box() else {
            report.passes = 1;
            report.converged = true;
            return Ok(report);
        };

        let bounds = QualityBounds {
            min_angle: params.min_angle,
            max_area: params
                .max_area
                .unwrap_or(DEFAULT_MAX_AREA_FRACTION * bbox.area()),
        };
        report.max_area = bounds.max_area;
        let clearance = params.clearance.unwrap_or(mesh.tolerances().clearance);

        let boundary_edges = if mesh.boundary().is_empty() {
            mesh.hull_edges()
        } else {
            mesh.boundary().to_vec()
        };
        let boundary = mesh.edge_segments(&boundary_edges)?;

        for pass in 1..=params.max_passes {
            report.passes = pass;
            let accepted = collect_candidates(
                mesh,
                &bounds,
                &boundary,
                clearance,
                params.queue_capacity,
                &mut report,
            )?;
            if accepted.is_empty() {
                report.converged = true;
                break;
            }

            let mut next = mesh.clone();
            next.clear_triangles();
            next.reserve_vertices(accepted.len())?;
            for &point in &accepted {
                next.insert_steiner_point(point)?;
            }
            self.construction.build(&mut next, &self.optimizer)?;
            *mesh = next;

            report.points_added += accepted.len();
            tracing::info!(
                pass,
                added = accepted.len(),
                triangles = mesh.number_of_triangles(),
                "refinement pass complete"
            );
        }

        if !report.converged {
            tracing::warn!(
                passes = report.passes,
                points_added = report.points_added,
                "refinement stopped at the pass limit"
            );
        }
        Ok(report)
    }
}

/// Circumcenters accepted in one pass.
fn collect_candidates(
    mesh: &Mesh,
    bounds: &QualityBounds,
    boundary: &[(Point, Point)],
    clearance: f64,
    capacity: usize,
    report: &mut RefinementReport,
) -> Result<Vec<Point>, RefinementError> {
    let mut queue = RefinementQueue::with_capacity(capacity);
    for (key, _) in mesh.real_triangles() {
        let points = mesh.triangle_points(key)?;
        if bounds.needs_refinement(points) {
            queue.push(points);
        }
    }
    if queue.dropped() > 0 {
        tracing::warn!(
            dropped = queue.dropped(),
            capacity = queue.capacity(),
            "refinement queue overflowed"
        );
        report.dropped += queue.dropped();
    }

    let mut occupied = PointGrid::with_capacity(clearance, mesh.number_of_vertices() + queue.len());
    for (_, v) in mesh.vertices() {
        occupied.insert(v.point());
    }
    let mut claimed = PointGrid::with_capacity(bounds.max_area.sqrt(), queue.len());

    let eps = mesh.tolerances().degeneracy;
    let mut accepted: Vec<Point> = Vec::new();
    while let Some([a, b, c]) = queue.pop() {
        let Some(center) = circumcenter(a, b, c, eps) else {
            report.rejected_degenerate += 1;
            continue;
        };
        if !point_in_polygon(center, boundary.iter().copied()) {
            report.rejected_outside += 1;
            continue;
        }
        if occupied.any_within(center, clearance) {
            report.rejected_crowded += 1;
            continue;
        }
        // A point accepted earlier in this pass inside this circumcircle
        // would leave an edge shorter than the circumradius.
        if claimed.any_within(center, center.distance(a)) {
            report.deferred += 1;
            continue;
        }
        tracing::debug!(%center, "steiner point accepted");
        occupied.insert(center);
        claimed.insert(center);
        accepted.push(center);
    }
    tracing::debug!(
        accepted = accepted.len(),
        occupied = occupied.len(),
        "refinement candidates collected"
    );
    Ok(accepted)
}

// =============================================================================
// TESTS
// =============================================================================
