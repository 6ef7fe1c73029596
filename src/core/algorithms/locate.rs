//! Point location in a planar mesh.
//!
//! [`locate`] walks from a hint triangle toward the query point, crossing the
//! edge the point lies beyond at each step (a visibility walk). Walks are
//! guaranteed to terminate on Delaunay meshes; on other meshes a walk may
//! cycle, in which case the search falls back to [`locate_by_scan`], a linear
//! scan over all triangles.
//!
//! # References
//!
//! - O. Devillers, S. Pion, and M. Teillaud, "Walking in a Triangulation",
//!   International Journal of Foundations of Computer Science, 2001.

use crate::core::mesh::{Mesh, MeshError, TriangleKey, VertexKey};
use crate::geometry::point::Point;
use crate::geometry::predicates::{contains_point, orientation};

/// Result of a point location query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateResult {
    /// Point is strictly inside the triangle
    InsideTriangle(TriangleKey),
    /// Point is on edge `i` of the triangle (the edge opposite vertex `i`)
    OnEdge(TriangleKey, usize),
    /// Point coincides with a vertex
    OnVertex(VertexKey),
    /// Point is outside every triangle
    Outside,
}

/// Error during point location.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocateError {
    /// The mesh has no triangles
    #[error("Cannot locate in a mesh without triangles")]
    EmptyMesh,

    /// The mesh references a missing vertex or triangle
    #[error("Mesh error during location: {source}")]
    Mesh {
        #[from]
        /// The underlying mesh error
        source: MeshError,
    },
}

/// Position of `point` relative to a single triangle.
enum Side {
    /// Strictly beyond edge `i`
    Beyond(usize),
    Located(LocateResult),
}

fn classify(mesh: &Mesh, key: TriangleKey, point: Point) -> Result<Side, MeshError> {
    let tri = mesh
        .triangle(key)
        .ok_or(MeshError::TriangleNotFound { key })?;
    let points = mesh.triangle_points(key)?;
    let eps = mesh.tolerances().degeneracy;

    if let Some(j) = (0..3).find(|&j| points[j].distance(point) <= eps) {
        return Ok(Side::Located(LocateResult::OnVertex(tri.vertex(j))));
    }

    let orient: [f64; 3] =
        std::array::from_fn(|i| orientation(points[(i + 1) % 3], points[(i + 2) % 3], point));

    // An orientation within 2·eps means a sub-triangle of area ≤ eps.
    let edge_band = 2.0 * eps;
    let beyond = (0..3)
        .filter(|&i| orient[i] < -edge_band)
        .min_by(|&a, &b| orient[a].total_cmp(&orient[b]));
    if let Some(i) = beyond {
        return Ok(Side::Beyond(i));
    }

    let on: Vec<usize> = (0..3).filter(|&i| orient[i].abs() <= edge_band).collect();
    let located = match on.as_slice() {
        [] => LocateResult::InsideTriangle(key),
        [i] => LocateResult::OnEdge(key, *i),
        _ => {
            let nearest = (0..3)
                .min_by(|&a, &b| {
                    points[a]
                        .distance_squared(point)
                        .total_cmp(&points[b].distance_squared(point))
                })
                .unwrap_or(0);
            LocateResult::OnVertex(tri.vertex(nearest))
        }
    };
    Ok(Side::Located(located))
}

/// Locates `point` by walking from `hint` (or an arbitrary triangle).
///
/// # Errors
///
/// Returns [`LocateError::EmptyMesh`] when there are no triangles, or a
/// [`LocateError::Mesh`] if the mesh references missing elements.
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::core::algorithms::locate::{LocateResult, locate};
/// use delaunay_refine::core::mesh::Mesh;
/// use delaunay_refine::core::vertex::PointSet;
/// use delaunay_refine::geometry::{point::Point, tolerances::Tolerances};
///
/// let points = PointSet::from_points([[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]]).unwrap();
/// let mut mesh = Mesh::from_point_set(&points, Tolerances::default()).unwrap();
/// let [a, b, c] = [0, 1, 2].map(|i| mesh.vertex_key(i).unwrap());
/// let t = mesh.insert_triangle(a, b, c).unwrap();
///
/// assert_eq!(locate(&mesh, Point::new(1.0, 1.0), None).unwrap(), LocateResult::InsideTriangle(t));
/// assert_eq!(locate(&mesh, Point::new(5.0, 5.0), None).unwrap(), LocateResult::Outside);
/// ```
pub fn locate(
    mesh: &Mesh,
    point: Point,
    hint: Option<TriangleKey>,
) -> Result<LocateResult, LocateError> {
    let start = hint
        .filter(|&k| mesh.contains_triangle(k))
        .or_else(|| mesh.triangles().next().map(|(k, _)| k))
        .ok_or(LocateError::EmptyMesh)?;

    let max_steps = 2 * mesh.number_of_triangles() + 16;
    let mut current = start;
    for _ in 0..max_steps {
        match classify(mesh, current, point)? {
            Side::Located(result) => return Ok(result),
            Side::Beyond(i) => match mesh.triangle(current).and_then(|t| t.neighbor(i)) {
                Some(next) => current = next,
                None => return Ok(LocateResult::Outside),
            },
        }
    }

    tracing::debug!(max_steps, "locate: walk did not settle, scanning all triangles");
    locate_by_scan(mesh, point)
}

/// Locates `point` by testing every triangle in turn.
///
/// # Errors
///
/// Returns [`LocateError::EmptyMesh`] when there are no triangles.
pub fn locate_by_scan(mesh: &Mesh, point: Point) -> Result<LocateResult, LocateError> {
    if mesh.number_of_triangles() == 0 {
        return Err(LocateError::EmptyMesh);
    }
    for (key, _) in mesh.triangles() {
        if let Side::Located(result) = classify(mesh, key, point)? {
            return Ok(result);
        }
    }
    Ok(LocateResult::Outside)
}

/// First triangle whose area-sum test contains `point`.
#[must_use]
pub fn find_containing_triangle(mesh: &Mesh, point: Point) -> Option<TriangleKey> {
    let eps = mesh.tolerances().degeneracy;
    mesh.triangles()
        .find(|(k, _)| {
            mesh.triangle_points(*k)
                .is_ok_and(|points| contains_point(points, point, eps))
        })
        .map(|(k, _)| k)
}
