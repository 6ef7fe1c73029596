//! Forcing input segments into the mesh as chains of restricted edges.
//!
//! A segment `a → b` between two mesh vertices is inserted by walking from
//! `a` toward `b`. At each step the walk either
//!
//! - reaches `b` through an existing edge,
//! - follows an edge to a vertex lying on the segment further ahead, or
//! - crosses the edge opposite the current vertex: a Steiner vertex is created
//!   at the crossing, the edge's two triangles are split in two each, and the
//!   local flip optimizer runs around the new vertex.
//!
//! Every edge of the resulting chain is marked restricted on both of its
//! triangles, so later flips leave it alone, and the segment is appended to
//! the mesh's boundary list. [`crossed_triangles`] reports the triangles the
//! segment passes through before any edit.
//!
//! Insertion is atomic: on error the mesh is restored to its state before
//! the call.
//!
//! Quality refinement rebuilds the mesh from its vertices alone and does not
//! consult restricted flags, so constraints inserted before refinement may
//! not survive it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::algorithms::flips::{FlipError, LocalFlipOptimizer};
use crate::core::algorithms::locate::find_containing_triangle;
use crate::core::collections::FastHashSet;
use crate::core::edge::Segment;
use crate::core::mesh::{Mesh, MeshError, TriangleKey, VertexKey};
use crate::core::vertex::VertexIndex;
use crate::geometry::point::Point;
use crate::geometry::predicates::{orientation, segment_intersection};

/// Errors raised while inserting a constraint segment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintError {
    /// A segment endpoint does not name a mesh vertex.
    #[error("Segment endpoint {index} is not a mesh vertex")]
    UnknownVertex {
        /// The missing index
        index: VertexIndex,
    },
    /// Both endpoints are the same vertex.
    #[error("Segment {index}-{index} has zero length")]
    ZeroLength {
        /// The repeated index
        index: VertexIndex,
    },
    /// No triangle contains the start of the segment.
    #[error("Segment {a}-{b}: no triangle contains vertex {a}")]
    EndpointNotInMesh {
        /// Start index
        a: VertexIndex,
        /// End index
        b: VertexIndex,
    },
    /// The segment would cross an edge that is already restricted.
    #[error("Segment {a}-{b} crosses restricted edge {u}-{w}")]
    CrossesConstraint {
        /// Start index
        a: VertexIndex,
        /// End index
        b: VertexIndex,
        /// First endpoint of the restricted edge
        u: VertexIndex,
        /// Second endpoint of the restricted edge
        w: VertexIndex,
    },
    /// The walk found no way forward from a chain vertex.
    #[error("Segment {a}-{b} is blocked at vertex {at}")]
    Blocked {
        /// Start index
        a: VertexIndex,
        /// End index
        b: VertexIndex,
        /// The chain vertex where the walk stopped
        at: VertexIndex,
    },
    /// The walk did not reach `b` within its step budget.
    #[error("Segment {a}-{b} was not completed within {steps} steps")]
    StepLimit {
        /// Start index
        a: VertexIndex,
        /// End index
        b: VertexIndex,
        /// The step budget
        steps: usize,
    },
    /// A mesh edit failed.
    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),
    /// Flip optimization around a Steiner vertex failed.
    #[error("Flip error: {0}")]
    Flip(#[from] FlipError),
}

/// What a successful insertion did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintReport {
    /// The inserted segment.
    pub segment: Segment,
    /// Triangles the segment passed through before insertion.
    pub crossed_triangles: usize,
    /// Vertex indices along the segment, from start to end.
    pub chain: Vec<VertexIndex>,
    /// Indices of the Steiner vertices created on the segment.
    pub steiner_points: Vec<VertexIndex>,
    /// Flips performed around the Steiner vertices.
    pub flips: usize,
    /// `true` when the segment was already a single mesh edge.
    pub already_present: bool,
}

/// Triangles the segment `a → b` passes through.
///
/// Starts from the first triangle (in arena order) containing `a`, then
/// expands breadth-first through neighbors whose shared edge the segment
/// intersects. Each triangle appears once.
///
/// # Errors
///
/// Returns [`MeshError::VertexNotFound`] for a stale vertex key.
pub fn crossed_triangles(
    mesh: &Mesh,
    a: VertexKey,
    b: VertexKey,
) -> Result<Vec<TriangleKey>, MeshError> {
    let (pa, pb) = (mesh.point(a)?, mesh.point(b)?);
    let Some(start) = find_containing_triangle(mesh, pa) else {
        return Ok(Vec::new());
    };
    let eps = mesh.tolerances().degeneracy;

    let mut found = vec![start];
    let mut seen: FastHashSet<TriangleKey> = FastHashSet::default();
    seen.insert(start);
    let mut frontier = VecDeque::from([start]);
    while let Some(key) = frontier.pop_front() {
        let Some(tri) = mesh.triangle(key) else {
            continue;
        };
        for i in 0..3 {
            let Some(n) = tri.neighbor(i) else {
                continue;
            };
            if seen.contains(&n) {
                continue;
            }
            let (u, w) = tri.edge_endpoints(i);
            let (pu, pw) = (mesh.point(u)?, mesh.point(w)?);
            if segment_intersection(pa, pb, pu, pw, eps).is_some() {
                seen.insert(n);
                found.push(n);
                frontier.push_back(n);
            }
        }
    }
    Ok(found)
}

/// Inserts constraint segments into a triangulated mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstraintInserter {
    optimizer: LocalFlipOptimizer,
}

impl ConstraintInserter {
    /// Creates an inserter that restores the Delaunay property around
    /// Steiner vertices with `optimizer`.
    #[must_use]
    pub const fn new(optimizer: LocalFlipOptimizer) -> Self {
        Self { optimizer }
    }

    /// Forces `segment` into `mesh`.
    ///
    /// A Steiner vertex lies on the edge it is created for, so it goes in
    /// through [`Mesh::split_edge`]: the two triangles sharing that edge
    /// become two each, rather than one triangle becoming a fan of three.
    ///
    /// # Errors
    ///
    /// Returns a [`ConstraintError`] when an endpoint is unknown, the segment
    /// has zero length, the walk is blocked or the mesh is inconsistent. The
    /// mesh is left unchanged in every error case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use delaunay_refine::core::algorithms::constrained_insertion::ConstraintInserter;
    /// use delaunay_refine::core::algorithms::construction::Construction;
    /// use delaunay_refine::core::algorithms::flips::LocalFlipOptimizer;
    /// use delaunay_refine::core::edge::Segment;
    /// use delaunay_refine::core::mesh::Mesh;
    /// use delaunay_refine::core::vertex::PointSet;
    /// use delaunay_refine::geometry::tolerances::Tolerances;
    ///
    /// let points = PointSet::from_points([[0.0, 0.0], [4.0, 0.0], [2.0, -1.0], [2.0, 1.0]]).unwrap();
    /// let mut mesh = Mesh::from_point_set(&points, Tolerances::default()).unwrap();
    /// Construction::default().build(&mut mesh, &LocalFlipOptimizer::default()).unwrap();
    ///
    /// let report = ConstraintInserter::default().insert(&mut mesh, Segment::new(0, 1)).unwrap();
    /// assert_eq!(report.steiner_points.len(), 1);
    /// assert_eq!(report.chain.first(), Some(&0));
    /// assert_eq!(report.chain.last(), Some(&1));
    /// assert_eq!(mesh.number_of_triangles(), 4);
    /// ```
    pub fn insert(&self, mesh: &mut Mesh, segment: Segment) -> Result<ConstraintReport, ConstraintError> {
        let snapshot = mesh.clone();
        match self.insert_chain(mesh, segment) {
            Ok(report) => {
                tracing::debug!(
                    start = segment.start,
                    end = segment.end,
                    steiner = report.steiner_points.len(),
                    flips = report.flips,
                    "constraint inserted"
                );
                Ok(report)
            }
            Err(err) => {
                tracing::warn!(
                    start = segment.start,
                    end = segment.end,
                    error = %err,
                    "constraint insertion failed; mesh restored"
                );
                *mesh = snapshot;
                Err(err)
            }
        }
    }

    fn insert_chain(&self, mesh: &mut Mesh, segment: Segment) -> Result<ConstraintReport, ConstraintError> {
        let (ia, ib) = (segment.start, segment.end);
        if ia == ib {
            return Err(ConstraintError::ZeroLength { index: ia });
        }
        let a = mesh
            .vertex_key(ia)
            .ok_or(ConstraintError::UnknownVertex { index: ia })?;
        let b = mesh
            .vertex_key(ib)
            .ok_or(ConstraintError::UnknownVertex { index: ib })?;

        let crossed = crossed_triangles(mesh, a, b)?;
        if crossed.is_empty() {
            return Err(ConstraintError::EndpointNotInMesh { a: ia, b: ib });
        }

        let mut report = ConstraintReport {
            segment,
            crossed_triangles: crossed.len(),
            chain: vec![ia],
            ..ConstraintReport::default()
        };

        if mesh.has_edge(a, b) {
            mesh.mark_constrained(a, b);
            mesh.add_boundary_edge(a, b);
            report.chain.push(ib);
            report.already_present = true;
            return Ok(report);
        }

        let walk = Walk {
            a: ia,
            b: ib,
            pa: mesh.point(a)?,
            pb: mesh.point(b)?,
        };
        let steps = 2 * mesh.number_of_triangles() + mesh.number_of_vertices() + 16;
        let mut current = a;
        let mut t_current = 0.0;

        for _ in 0..steps {
            if mesh.has_edge(current, b) {
                mesh.mark_constrained(current, b);
                report.chain.push(ib);
                mesh.add_boundary_edge(a, b);
                return Ok(report);
            }

            if let Some((next, t)) = walk.vertex_ahead(mesh, current, t_current)? {
                mesh.mark_constrained(current, next);
                report.chain.push(index_of(mesh, next)?);
                current = next;
                t_current = t;
                continue;
            }

            let (key, edge, t, point) = walk.crossed_edge(mesh, current, t_current)?;
            mesh.reserve_vertices(1)?;
            let steiner = mesh.insert_steiner_point(point)?;
            mesh.split_edge(key, edge, steiner)?;
            mesh.mark_constrained(current, steiner);
            report.flips += self.optimizer.optimize_around(mesh, steiner)?.flips;

            let index = index_of(mesh, steiner)?;
            tracing::debug!(index, %point, "steiner vertex placed on segment");
            report.chain.push(index);
            report.steiner_points.push(index);
            current = steiner;
            t_current = t;
        }

        Err(ConstraintError::StepLimit { a: ia, b: ib, steps })
    }
}

fn index_of(mesh: &Mesh, key: VertexKey) -> Result<VertexIndex, MeshError> {
    mesh.vertex(key)
        .map(|v| v.index())
        .ok_or(MeshError::VertexNotFound { key })
}

/// The segment being walked.
struct Walk {
    a: VertexIndex,
    b: VertexIndex,
    pa: Point,
    pb: Point,
}

impl Walk {
    /// Position of `p` along the segment, 0 at `a` and 1 at `b`.
    fn param(&self, p: Point) -> f64 {
        let (dx, dy) = (self.pb.x() - self.pa.x(), self.pb.y() - self.pa.y());
        ((p.x() - self.pa.x()) * dx + (p.y() - self.pa.y()) * dy) / (dx * dx + dy * dy)
    }

    /// Nearest neighbor of `current` lying on the segment ahead of `t_current`.
    fn vertex_ahead(
        &self,
        mesh: &Mesh,
        current: VertexKey,
        t_current: f64,
    ) -> Result<Option<(VertexKey, f64)>, MeshError> {
        let band = 2.0 * mesh.tolerances().degeneracy;
        let mut best: Option<(VertexKey, f64)> = None;
        for w in mesh.vertex_neighbors(current) {
            let p = mesh.point(w)?;
            if orientation(self.pa, self.pb, p).abs() > band {
                continue;
            }
            let t = self.param(p);
            if t <= t_current || t > 1.0 {
                continue;
            }
            if best.is_none_or(|(_, top)| t < top) {
                best = Some((w, t));
            }
        }
        Ok(best)
    }

    /// The edge opposite `current` that the segment crosses ahead of
    /// `t_current`, with the crossing parameter and point.
    fn crossed_edge(
        &self,
        mesh: &Mesh,
        current: VertexKey,
        t_current: f64,
    ) -> Result<(TriangleKey, usize, f64, Point), ConstraintError> {
        let eps = mesh.tolerances().degeneracy;
        let band = 2.0 * eps;
        for key in mesh.triangles_around(current) {
            let tri = mesh
                .triangle(key)
                .ok_or(MeshError::TriangleNotFound { key })?;
            let Some(i) = tri.index_of(current) else {
                continue;
            };
            let (u, w) = tri.edge_endpoints(i);
            let (pu, pw) = (mesh.point(u)?, mesh.point(w)?);
            let (ou, ow) = (
                orientation(self.pa, self.pb, pu),
                orientation(self.pa, self.pb, pw),
            );
            let straddles = (ou > band && ow < -band) || (ou < -band && ow > band);
            if !straddles {
                continue;
            }
            let Some(hit) = segment_intersection(self.pa, self.pb, pu, pw, eps) else {
                continue;
            };
            if hit.t <= t_current {
                continue;
            }
            if tri.is_constrained(i) {
                return Err(ConstraintError::CrossesConstraint {
                    a: self.a,
                    b: self.b,
                    u: index_of(mesh, u)?,
                    w: index_of(mesh, w)?,
                });
            }
            return Ok((key, i, hit.t, hit.point));
        }
        Err(ConstraintError::Blocked {
            a: self.a,
            b: self.b,
            at: index_of(mesh, current)?,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
