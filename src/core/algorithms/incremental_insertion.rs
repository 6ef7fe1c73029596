//! Incremental Delaunay construction with local flips.
//!
//! The builder follows the classic Lawson scheme:
//! 1. Enclose every input point in an auxiliary triangle whose vertices carry
//!    the negative indices `-1`, `-2` and `-3`
//! 2. Insert the points in x-sorted order, locating each one by a walk that
//!    starts at the triangles created for the previous point
//! 3. Split the containing triangle in three, or the containing edge's two
//!    triangles in two each when the point lies on an edge
//! 4. Flip every non-Delaunay edge around the new vertex (edges shared with
//!    auxiliary triangles included)
//! 5. Force every convex hull edge of the inserted points into the mesh by
//!    flipping the auxiliary edges that cross it
//! 6. Remove the auxiliary triangle's vertices and every triangle touching
//!    them, then flip any edge the hull recovery left non-Delaunay
//!
//! Points coinciding with an earlier vertex are skipped and counted.
//!
//! The auxiliary vertices sit at a finite distance, so nearly collinear hull
//! points can see them inside the circumcircles of real hull triangles and
//! connect to them instead. Step 5 undoes that, so the result always covers
//! the convex hull.

use std::collections::VecDeque;

use crate::core::algorithms::construction::{BuildStats, ConstructionError};
use crate::core::algorithms::flips::{FlipStats, LocalFlipOptimizer};
use crate::core::algorithms::locate::{LocateResult, locate};
use crate::core::collections::{TriangleKeyBuffer, fast_hash_set_with_capacity};
use crate::core::edge::Edge;
use crate::core::mesh::{Mesh, MeshError, TriangleKey, VertexKey};
use crate::core::vertex::{AUXILIARY_INDICES, Vertex};
use crate::geometry::point::Point;
use crate::geometry::predicates::{Orientation, orientation_class};

/// Distance of the auxiliary vertices from the center of the input, in
/// multiples of the input's larger extent.
pub const AUXILIARY_SCALE: f64 = 20.0;

/// What happened to a single point handed to [`insert_point`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The point is now a mesh vertex.
    Inserted {
        /// A triangle incident to the new vertex, usable as the next walk hint
        hint: Option<TriangleKey>,
        /// Flips performed while restoring the Delaunay property
        flips: FlipStats,
    },
    /// The point coincides with an existing vertex.
    Duplicate(VertexKey),
    /// Splitting would have produced a degenerate triangle, or the point lies
    /// outside the mesh. The mesh is unchanged.
    Skipped,
}

/// Adds the auxiliary bounding triangle around the mesh's real vertices.
///
/// Returns `None` when the mesh has no vertices.
///
/// # Errors
///
/// Returns a [`ConstructionError::Mesh`] if one of the auxiliary indices is
/// already in use.
pub fn insert_auxiliary_triangle(mesh: &mut Mesh) -> Result<Option<TriangleKey>, ConstructionError> {
    let Some(bbox) = mesh.bounding_box() else {
        return Ok(None);
    };
    let center = bbox.center();
    let extent = bbox.max_extent();
    let delta = if extent > 0.0 { extent } else { 1.0 };
    let reach = AUXILIARY_SCALE * delta;

    let corners = [
        Point::new(center.x() - reach, center.y() - delta),
        Point::new(center.x() + reach, center.y() - delta),
        Point::new(center.x(), center.y() + reach),
    ];
    let mut keys = [VertexKey::default(); 3];
    for ((slot, point), index) in keys.iter_mut().zip(corners).zip(AUXILIARY_INDICES) {
        *slot = mesh.insert_vertex(Vertex::new(point, index))?;
    }
    let [a, b, c] = keys;
    Ok(Some(mesh.insert_triangle(a, b, c)?))
}

/// Inserts the existing vertex `v` into the triangulation and restores the
/// Delaunay property around it.
///
/// # Errors
///
/// Returns an error if location or flipping hits an inconsistent mesh.
/// Degenerate splits are reported as [`InsertOutcome::Skipped`] instead.
pub fn insert_point(
    mesh: &mut Mesh,
    v: VertexKey,
    hint: Option<TriangleKey>,
    optimizer: &LocalFlipOptimizer,
) -> Result<InsertOutcome, ConstructionError> {
    let point = mesh.point(v)?;
    let split = match locate(mesh, point, hint)? {
        LocateResult::InsideTriangle(t) => mesh
            .split_triangle(t, v)
            .map(|keys| keys.into_iter().collect::<TriangleKeyBuffer>()),
        LocateResult::OnEdge(t, i) => mesh.split_edge(t, i, v),
        LocateResult::OnVertex(existing) => return Ok(InsertOutcome::Duplicate(existing)),
        LocateResult::Outside => {
            tracing::warn!(%point, "point lies outside the mesh; skipped");
            return Ok(InsertOutcome::Skipped);
        }
    };
    let created = match split {
        Ok(created) => created,
        Err(err @ (MeshError::DegenerateTriangle { .. } | MeshError::PointNotInside { .. })) => {
            tracing::warn!(%point, error = %err, "insertion would create a degenerate triangle; skipped");
            return Ok(InsertOutcome::Skipped);
        }
        Err(err) => return Err(err.into()),
    };

    let (flips, hint) = optimizer.optimize_around_from(mesh, v, created.first().copied())?;
    Ok(InsertOutcome::Inserted { hint, flips })
}

/// Builds the Delaunay triangulation of every vertex in `mesh`.
///
/// Fewer than three vertices produce no triangles. Auxiliary vertices and
/// triangles are gone when this returns, and the triangles cover the convex
/// hull of the inserted vertices.
///
/// # Errors
///
/// Returns a [`ConstructionError`] if the mesh becomes inconsistent.
pub fn triangulate_incremental(
    mesh: &mut Mesh,
    optimizer: &LocalFlipOptimizer,
) -> Result<BuildStats, ConstructionError> {
    let mut stats = BuildStats::default();
    let mut order: Vec<(VertexKey, Point)> = mesh
        .vertices()
        .filter(|(_, v)| !v.is_auxiliary())
        .map(|(k, v)| (k, v.point()))
        .collect();
    if order.len() < 3 {
        return Ok(stats);
    }
    order.sort_by(|(_, p), (_, q)| p.x().total_cmp(&q.x()).then(p.y().total_cmp(&q.y())));

    let mut hint = insert_auxiliary_triangle(mesh)?;
    let inserting = optimizer.including_auxiliary(true);
    let mut placed: Vec<(VertexKey, Point)> = Vec::with_capacity(order.len());

    for (v, point) in order {
        match insert_point(mesh, v, hint, &inserting)? {
            InsertOutcome::Inserted { hint: next, flips } => {
                stats.inserted += 1;
                stats.flips += flips.flips;
                hint = next.or(hint);
                placed.push((v, point));
            }
            InsertOutcome::Duplicate(existing) => {
                tracing::debug!(?v, ?existing, "duplicate point skipped");
                stats.skipped_duplicates += 1;
            }
            InsertOutcome::Skipped => stats.skipped_degenerate += 1,
        }
    }

    let recovery_flips = recover_hull(mesh, &placed, &mut stats)?;
    mesh.purge_auxiliary();
    if recovery_flips > 0 {
        stats.flips += optimizer.optimize_all(mesh)?.flips;
    }
    stats.triangles = mesh.number_of_triangles();
    if stats.skipped_duplicates > 0 {
        tracing::warn!(
            duplicates = stats.skipped_duplicates,
            "duplicate points were left out of the triangulation"
        );
    }
    Ok(stats)
}

/// Convex hull of `sorted` (x-then-y order), counter-clockwise, by Andrew's
/// monotone chain.
///
/// Points within `eps` of a hull edge stay on the chain, so consecutive chain
/// vertices are always joined by an edge of the finished mesh.
fn hull_chain(sorted: &[(VertexKey, Point)], eps: f64) -> Vec<(VertexKey, Point)> {
    fn half<'a>(
        points: impl Iterator<Item = &'a (VertexKey, Point)>,
        eps: f64,
    ) -> Vec<(VertexKey, Point)> {
        let mut chain: Vec<(VertexKey, Point)> = Vec::new();
        for &(key, p) in points {
            while let [.., (_, o), (_, a)] = chain.as_slice()
                && orientation_class(*o, *a, p, eps) == Orientation::NEGATIVE
            {
                chain.pop();
            }
            chain.push((key, p));
        }
        chain
    }

    let mut lower = half(sorted.iter(), eps);
    let mut upper = half(sorted.iter().rev(), eps);
    lower.pop();
    upper.pop();
    lower.append(&mut upper);
    lower
}

/// Forces every edge of the convex hull of `placed` into the mesh while the
/// auxiliary triangle still surrounds it. Returns the flips performed.
fn recover_hull(
    mesh: &mut Mesh,
    placed: &[(VertexKey, Point)],
    stats: &mut BuildStats,
) -> Result<usize, ConstructionError> {
    let eps = mesh.tolerances().degeneracy;
    let hull = hull_chain(placed, eps);
    let doubled_area: f64 = hull
        .iter()
        .zip(hull.iter().cycle().skip(1))
        .map(|(&(_, p), &(_, q))| p.x() * q.y() - q.x() * p.y())
        .sum();
    if hull.len() < 3 || doubled_area <= eps {
        return Ok(0);
    }

    let mut flips = 0;
    for (&(a, _), &(b, _)) in hull.iter().zip(hull.iter().cycle().skip(1)) {
        match recover_edge(mesh, a, b)? {
            Some(0) => {}
            Some(n) => {
                flips += n;
                stats.recovered_hull_edges += 1;
            }
            None => tracing::warn!(?a, ?b, "hull edge could not be recovered"),
        }
    }
    if flips > 0 {
        tracing::debug!(
            edges = stats.recovered_hull_edges,
            flips,
            "recovered hull edges cut off by the auxiliary triangle"
        );
    }
    Ok(flips)
}

/// `true` when `edge` properly crosses the segment `pa`-`pb`.
fn crosses(mesh: &Mesh, edge: Edge, pa: Point, pb: Point, eps: f64) -> Result<bool, MeshError> {
    let opposite = |x: Orientation, y: Orientation| {
        matches!(
            (x, y),
            (Orientation::POSITIVE, Orientation::NEGATIVE)
                | (Orientation::NEGATIVE, Orientation::POSITIVE)
        )
    };
    let (pu, pw) = (mesh.point(edge.v0())?, mesh.point(edge.v1())?);
    Ok(opposite(orientation_class(pa, pb, pu, eps), orientation_class(pa, pb, pw, eps))
        && opposite(orientation_class(pu, pw, pa, eps), orientation_class(pu, pw, pb, eps)))
}

/// Makes `a`-`b` a mesh edge by flipping the edges crossing it (Sloan's edge
/// recovery). Returns the flips performed, or `None` if crossing edges remain
/// when the step budget runs out.
fn recover_edge(
    mesh: &mut Mesh,
    a: VertexKey,
    b: VertexKey,
) -> Result<Option<usize>, ConstructionError> {
    if mesh.has_edge(a, b) {
        return Ok(Some(0));
    }
    let (pa, pb) = (mesh.point(a)?, mesh.point(b)?);
    let eps = mesh.tolerances().degeneracy;

    let mut seen = fast_hash_set_with_capacity::<Edge>(3 * mesh.number_of_triangles() / 2);
    let mut queue: VecDeque<Edge> = VecDeque::new();
    for (_, tri) in mesh.triangles() {
        for i in 0..3 {
            let edge = tri.edge(i);
            if edge.contains(a) || edge.contains(b) || !seen.insert(edge) {
                continue;
            }
            if crosses(mesh, edge, pa, pb, eps)? {
                queue.push_back(edge);
            }
        }
    }

    let mut budget = 4 * queue.len() * queue.len() + 64;
    let mut flips = 0;
    while let Some(edge) = queue.pop_front() {
        if budget == 0 {
            return Ok(None);
        }
        budget -= 1;

        let (u, w) = edge.endpoints();
        let Some((key, i)) = mesh.find_edge(u, w) else {
            continue;
        };
        let tri = mesh.triangle(key).ok_or(MeshError::TriangleNotFound { key })?;
        let apex = tri.vertex(i);
        let Some(n) = tri.neighbor(i) else {
            return Ok(None);
        };
        let other = mesh
            .triangle(n)
            .ok_or(MeshError::TriangleNotFound { key: n })?;
        let (eu, ew) = tri.edge_endpoints(i);
        let j = other
            .edge_index(eu, ew)
            .ok_or_else(|| MeshError::InconsistentAdjacency {
                message: format!("neighbor {n:?} of {key:?} does not share edge {i}"),
            })?;
        let far = other.vertex(j);

        match mesh.flip(key, i) {
            Ok(_) => {
                flips += 1;
                let diagonal = Edge::new(apex, far);
                if !diagonal.contains(a)
                    && !diagonal.contains(b)
                    && crosses(mesh, diagonal, pa, pb, eps)?
                {
                    queue.push_back(diagonal);
                }
            }
            Err(MeshError::NonConvexQuadrilateral { .. }) => queue.push_back(edge),
            Err(err) => return Err(err.into()),
        }
    }
    Ok(mesh.has_edge(a, b).then_some(flips))
}

// =============================================================================
// TESTS
// =============================================================================
