//! Mesh data structure: vertex and triangle arenas with adjacency.
//!
//! The [`Mesh`] owns every vertex and triangle of a planar triangulation.
//! Both collections are slot-map arenas ([`StorageMap`]) addressed by
//! [`VertexKey`] and [`TriangleKey`]; removing an element recycles its slot
//! without invalidating any other live key, so triangles can refer to their
//! vertices and neighbors by key across arbitrary growth and removal.
//!
//! # Invariants
//!
//! A mesh produced by the algorithms in this crate satisfies the following,
//! checked by [`Mesh::is_valid`]:
//!
//! - every triangle references three distinct, existing vertices in strictly
//!   counter-clockwise order;
//! - adjacency is symmetric: if `t.neighbor(i) == Some(n)` then `n` shares
//!   `t`'s edge `i` and points back at `t` across it;
//! - vertex indices are unique.
//!
//! The Delaunay property is checked separately by
//! [`Mesh::validate_delaunay`] because it does not hold for heuristic
//! construction or after constraint insertion.
//!
//! # Local edits
//!
//! [`Mesh::split_triangle`], [`Mesh::split_edge`] and [`Mesh::flip`] validate
//! the replacement triangles before touching the arenas. On error the mesh is
//! unchanged. Constraint flags survive edits: an edge that was constrained
//! before an edit is constrained in the triangles that own it afterwards, and
//! splitting a constrained edge constrains both halves.

#![forbid(unsafe_code)]

use crate::core::collections::{
    EdgeToTrianglesMap, FastHashMap, FastHashSet, SmallBuffer, StorageMap, TriangleKeyBuffer,
    VertexKeyBuffer,
};
use crate::core::edge::Edge;
use crate::core::triangle::Triangle;
use crate::core::vertex::{PointSet, Vertex, VertexIndex};
use crate::geometry::point::{BoundingBox, Point};
use crate::geometry::predicates::{in_circumcircle, orientation};
use crate::geometry::quality::min_angle;
use crate::geometry::tolerances::Tolerances;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use thiserror::Error;

// =============================================================================
// KEYS
// =============================================================================

new_key_type! {
    /// Stable handle of a vertex in a [`Mesh`].
    pub struct VertexKey;
}

new_key_type! {
    /// Stable handle of a triangle in a [`Mesh`].
    pub struct TriangleKey;
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by mesh editing operations.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MeshError {
    /// A vertex with the same index is already present.
    #[error("Vertex index {index} already exists in the mesh")]
    DuplicateVertexIndex {
        /// The repeated index
        index: VertexIndex,
    },
    /// No vertex carries the requested index.
    #[error("No vertex with index {index}")]
    UnknownVertexIndex {
        /// The requested index
        index: VertexIndex,
    },
    /// A vertex key does not refer to a live vertex.
    #[error("Vertex {key:?} not found")]
    VertexNotFound {
        /// The stale or foreign key
        key: VertexKey,
    },
    /// A triangle key does not refer to a live triangle.
    #[error("Triangle {key:?} not found")]
    TriangleNotFound {
        /// The stale or foreign key
        key: TriangleKey,
    },
    /// A triangle would use the same vertex twice.
    #[error("Triangle uses vertex {key:?} more than once")]
    RepeatedVertex {
        /// The repeated vertex
        key: VertexKey,
    },
    /// A triangle would have (near) zero area.
    #[error("Degenerate triangle {indices:?} with area {area}")]
    DegenerateTriangle {
        /// Vertex indices of the rejected triangle
        indices: [VertexIndex; 3],
        /// Its area
        area: f64,
    },
    /// A split point is not strictly inside the triangle or edge being split.
    #[error("Point {point} is not strictly inside the split region of triangle {key:?}")]
    PointNotInside {
        /// Triangle being split
        key: TriangleKey,
        /// Offending point
        point: Point,
    },
    /// A flip was requested across a hull edge.
    #[error("Edge {edge} of triangle {key:?} has no neighbor")]
    BoundaryEdge {
        /// Triangle owning the edge
        key: TriangleKey,
        /// Edge position within the triangle
        edge: usize,
    },
    /// A flip was requested across a constrained edge.
    #[error("Edge {a}-{b} is constrained and cannot be flipped")]
    ConstrainedEdge {
        /// First endpoint index
        a: VertexIndex,
        /// Second endpoint index
        b: VertexIndex,
    },
    /// The quadrilateral around a flip edge is not strictly convex.
    #[error("Quadrilateral around edge {a}-{b} is not strictly convex")]
    NonConvexQuadrilateral {
        /// First endpoint index
        a: VertexIndex,
        /// Second endpoint index
        b: VertexIndex,
    },
    /// Neighbor pointers disagree with the triangles' vertices.
    #[error("Inconsistent adjacency: {message}")]
    InconsistentAdjacency {
        /// Description of the mismatch
        message: String,
    },
    /// Growing a collection failed.
    #[error("Could not reserve room for {additional} more {what}")]
    CapacityExhausted {
        /// Which collection
        what: &'static str,
        /// Requested additional elements
        additional: usize,
    },
}

/// Structural or geometric invariant violations found by validation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MeshValidationError {
    /// A triangle references a missing or repeated vertex.
    #[error("Invalid triangle {key:?}: {message}")]
    InvalidTriangle {
        /// The offending triangle
        key: TriangleKey,
        /// What is wrong with it
        message: String,
    },
    /// A triangle is not strictly counter-clockwise.
    #[error("Triangle {key:?} has non-positive orientation {orientation}")]
    InvalidOrientation {
        /// The offending triangle
        key: TriangleKey,
        /// Its orientation determinant
        orientation: f64,
    },
    /// Neighbor pointers are dangling or asymmetric.
    #[error("Invalid neighbor relationships: {message}")]
    InvalidNeighbors {
        /// Description of the failure
        message: String,
    },
    /// A vertex lies strictly inside a triangle's circumcircle.
    #[error("Vertex {vertex} lies inside the circumcircle of triangle {triangle:?}")]
    DelaunayViolation {
        /// Indices of the triangle's vertices
        triangle: [VertexIndex; 3],
        /// Index of the encroaching vertex
        vertex: VertexIndex,
    },
}

// =============================================================================
// OUTPUT TYPES
// =============================================================================

/// A vertex in [`MeshOutput`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputVertex {
    /// Stable vertex index
    pub index: VertexIndex,
    /// x coordinate
    pub x: f64,
    /// y coordinate
    pub y: f64,
    /// Region label: 1 for indices below the region-1 count, otherwise 2
    pub region: u8,
}

/// A finished mesh by value: vertices sorted by index and counter-clockwise
/// triangles as index triples.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshOutput {
    /// Vertices sorted by index
    pub vertices: Vec<OutputVertex>,
    /// Counter-clockwise vertex-index triples
    pub triangles: Vec<[VertexIndex; 3]>,
    /// Recorded boundary/constraint segments as index pairs
    pub segments: Vec<[VertexIndex; 2]>,
}

/// Summary counts for a mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshStatistics {
    /// Non-auxiliary vertices
    pub vertices: usize,
    /// Auxiliary vertices still present
    pub auxiliary_vertices: usize,
    /// Non-auxiliary triangles
    pub triangles: usize,
    /// Auxiliary triangles still present
    pub auxiliary_triangles: usize,
    /// Recorded boundary/constraint edges
    pub boundary_edges: usize,
    /// Distinct constrained mesh edges
    pub constrained_edges: usize,
    /// Edges on the outer hull of the non-auxiliary triangles
    pub hull_edges: usize,
    /// Smallest interior angle over non-auxiliary triangles, in radians
    pub min_angle: Option<f64>,
    /// Largest non-auxiliary triangle area
    pub max_area: f64,
}

// =============================================================================
// MESH
// =============================================================================

/// A planar triangle mesh.
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::core::mesh::Mesh;
/// use delaunay_refine::core::vertex::PointSet;
/// use delaunay_refine::geometry::tolerances::Tolerances;
///
/// let points = PointSet::from_points([[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]).unwrap();
/// let mut mesh = Mesh::from_point_set(&points, Tolerances::default()).unwrap();
///
/// let [a, b, c] = [0, 1, 2].map(|i| mesh.vertex_key(i).unwrap());
/// let t = mesh.insert_triangle(a, c, b).unwrap(); // reoriented to counter-clockwise
/// assert_eq!(mesh.number_of_triangles(), 1);
/// assert!(mesh.is_valid().is_ok());
/// assert!(mesh.triangle(t).unwrap().is_rotation_of([a, b, c]));
/// ```
#[derive(Clone, Debug)]
pub struct Mesh {
    vertices: StorageMap<VertexKey, Vertex>,
    triangles: StorageMap<TriangleKey, Triangle>,
    index_to_key: FastHashMap<VertexIndex, VertexKey>,
    boundary: Vec<Edge>,
    region1_count: usize,
    next_index: VertexIndex,
    tolerances: Tolerances,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::with_tolerances(Tolerances::default())
    }
}

impl Mesh {
    /// Creates an empty mesh with default tolerances.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty mesh using `tolerances` for every geometric decision.
    #[must_use]
    pub fn with_tolerances(tolerances: Tolerances) -> Self {
        Self {
            vertices: StorageMap::with_key(),
            triangles: StorageMap::with_key(),
            index_to_key: FastHashMap::default(),
            boundary: Vec::new(),
            region1_count: 0,
            next_index: 0,
            tolerances,
        }
    }

    /// Loads every vertex of `points` into a new mesh without triangles.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::CapacityExhausted`] if the vertex collections
    /// cannot grow.
    pub fn from_point_set(points: &PointSet, tolerances: Tolerances) -> Result<Self, MeshError> {
        let mut mesh = Self::with_tolerances(tolerances);
        mesh.reserve_vertices(points.len())?;
        for &vertex in points.vertices() {
            mesh.insert_vertex(vertex)?;
        }
        mesh.region1_count = points.region1_count();
        Ok(mesh)
    }

    #[must_use]
    pub const fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Number of leading input vertices labelled region 1.
    #[must_use]
    pub const fn region1_count(&self) -> usize {
        self.region1_count
    }

    // -------------------------------------------------------------------------
    // Vertices
    // -------------------------------------------------------------------------

    /// Reserves room for `additional` vertices.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::CapacityExhausted`] when the allocation fails.
    pub fn reserve_vertices(&mut self, additional: usize) -> Result<(), MeshError> {
        self.index_to_key
            .try_reserve(additional)
            .map_err(|_| MeshError::CapacityExhausted {
                what: "vertices",
                additional,
            })?;
        self.vertices.reserve(additional);
        Ok(())
    }

    /// Adds a vertex.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::DuplicateVertexIndex`] if the index is taken.
    pub fn insert_vertex(&mut self, vertex: Vertex) -> Result<VertexKey, MeshError> {
        let index = vertex.index();
        if self.index_to_key.contains_key(&index) {
            return Err(MeshError::DuplicateVertexIndex { index });
        }
        let key = self.vertices.insert(vertex);
        self.index_to_key.insert(index, key);
        if index >= self.next_index {
            self.next_index = index + 1;
        }
        Ok(key)
    }

    /// Adds a vertex at `point` with the next free non-negative index.
    ///
    /// # Errors
    ///
    /// Propagates [`Mesh::insert_vertex`] errors.
    pub fn insert_steiner_point(&mut self, point: Point) -> Result<VertexKey, MeshError> {
        self.insert_vertex(Vertex::new(point, self.next_index))
    }

    /// The index a newly synthesized vertex receives.
    #[must_use]
    pub const fn next_index(&self) -> VertexIndex {
        self.next_index
    }

    #[must_use]
    pub fn vertex(&self, key: VertexKey) -> Option<&Vertex> {
        self.vertices.get(key)
    }

    #[must_use]
    pub fn vertex_key(&self, index: VertexIndex) -> Option<VertexKey> {
        self.index_to_key.get(&index).copied()
    }

    /// Coordinates of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::VertexNotFound`] for a stale key.
    pub fn point(&self, key: VertexKey) -> Result<Point, MeshError> {
        self.vertices
            .get(key)
            .map(Vertex::point)
            .ok_or(MeshError::VertexNotFound { key })
    }

    /// All vertices, auxiliary ones included.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexKey, &Vertex)> {
        self.vertices.iter()
    }

    /// Number of vertices, auxiliary ones included.
    #[must_use]
    pub fn number_of_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Bounding box of the non-auxiliary vertices.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(
            self.vertices
                .values()
                .filter(|v| !v.is_auxiliary())
                .map(Vertex::point),
        )
    }

    fn index_of(&self, key: VertexKey) -> VertexIndex {
        self.vertices.get(key).map_or(VertexIndex::MIN, Vertex::index)
    }

    fn indices_of(&self, keys: [VertexKey; 3]) -> [VertexIndex; 3] {
        keys.map(|k| self.index_of(k))
    }

    // -------------------------------------------------------------------------
    // Triangles
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn triangle(&self, key: TriangleKey) -> Option<&Triangle> {
        self.triangles.get(key)
    }

    #[must_use]
    pub fn contains_triangle(&self, key: TriangleKey) -> bool {
        self.triangles.contains_key(key)
    }

    /// All triangles, auxiliary ones included.
    pub fn triangles(&self) -> impl Iterator<Item = (TriangleKey, &Triangle)> {
        self.triangles.iter()
    }

    /// Triangles that do not belong to the auxiliary bounding construct.
    pub fn real_triangles(&self) -> impl Iterator<Item = (TriangleKey, &Triangle)> {
        self.triangles.iter().filter(|(_, t)| !t.is_auxiliary())
    }

    /// Number of triangles, auxiliary ones included.
    #[must_use]
    pub fn number_of_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Coordinates of the three vertices of `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the triangle or one of its vertices is missing.
    pub fn triangle_points(&self, key: TriangleKey) -> Result<[Point; 3], MeshError> {
        let tri = self
            .triangles
            .get(key)
            .ok_or(MeshError::TriangleNotFound { key })?;
        self.points_of(tri.vertices())
    }

    fn points_of(&self, keys: [VertexKey; 3]) -> Result<[Point; 3], MeshError> {
        Ok([
            self.point(keys[0])?,
            self.point(keys[1])?,
            self.point(keys[2])?,
        ])
    }

    fn is_auxiliary_vertex(&self, key: VertexKey) -> bool {
        self.vertices.get(key).is_some_and(Vertex::is_auxiliary)
    }

    /// Checks a prospective triangle and returns its vertices in
    /// counter-clockwise order.
    fn oriented(&self, [a, b, c]: [VertexKey; 3]) -> Result<[VertexKey; 3], MeshError> {
        if a == b || a == c {
            return Err(MeshError::RepeatedVertex { key: a });
        }
        if b == c {
            return Err(MeshError::RepeatedVertex { key: b });
        }
        let [pa, pb, pc] = self.points_of([a, b, c])?;
        let det = orientation(pa, pb, pc);
        let area = det.abs() / 2.0;
        if area <= self.tolerances.degeneracy {
            return Err(MeshError::DegenerateTriangle {
                indices: self.indices_of([a, b, c]),
                area,
            });
        }
        Ok(if det < 0.0 { [a, c, b] } else { [a, b, c] })
    }

    fn store_triangle(&mut self, vertices: [VertexKey; 3]) -> TriangleKey {
        let auxiliary = vertices.iter().any(|&v| self.is_auxiliary_vertex(v));
        self.triangles.insert(Triangle::new(vertices, auxiliary))
    }

    /// Adds an unconnected triangle, reordering its vertices to
    /// counter-clockwise if necessary. Adjacency is not updated; call
    /// [`Mesh::rebuild_adjacency`] after a batch of insertions.
    ///
    /// # Errors
    ///
    /// Returns an error for missing or repeated vertices and for triangles
    /// whose area is within the degeneracy tolerance.
    pub fn insert_triangle(
        &mut self,
        a: VertexKey,
        b: VertexKey,
        c: VertexKey,
    ) -> Result<TriangleKey, MeshError> {
        let vertices = self.oriented([a, b, c])?;
        Ok(self.store_triangle(vertices))
    }

    /// Finds a triangle whose vertices are a rotation of `(a, b, c)`.
    #[must_use]
    pub fn find_triangle(&self, a: VertexKey, b: VertexKey, c: VertexKey) -> Option<TriangleKey> {
        self.triangles
            .iter()
            .find(|(_, t)| t.is_rotation_of([a, b, c]))
            .map(|(k, _)| k)
    }

    /// Removes a triangle and clears the back-references of its neighbors.
    pub fn remove_triangle(&mut self, key: TriangleKey) -> Option<Triangle> {
        let tri = self.triangles.remove(key)?;
        for n in tri.neighbors().into_iter().flatten() {
            if let Some(neighbor) = self.triangles.get_mut(n)
                && let Some(j) = neighbor.neighbor_index(key)
            {
                neighbor.set_neighbor(j, None);
            }
        }
        Some(tri)
    }

    /// Removes every triangle, keeping vertices and the boundary list.
    pub fn clear_triangles(&mut self) {
        self.triangles.clear();
    }

    // -------------------------------------------------------------------------
    // Adjacency
    // -------------------------------------------------------------------------

    /// Recomputes every neighbor pointer from scratch by matching edges.
    ///
    /// An edge owned by more than two triangles (possible only for
    /// overlapping heuristic output) links its first two owners.
    pub fn rebuild_adjacency(&mut self) {
        let mut edge_map = EdgeToTrianglesMap::default();
        for (key, tri) in self.triangles.iter() {
            for i in 0..3u8 {
                edge_map
                    .entry(tri.edge(usize::from(i)))
                    .or_default()
                    .push((key, i));
            }
        }

        for tri in self.triangles.values_mut() {
            tri.clear_neighbors();
        }

        let mut overshared = 0usize;
        for owners in edge_map.values() {
            if owners.len() > 2 {
                overshared += 1;
            }
            if let [(a, i), (b, j), ..] = owners.as_slice() {
                if let Some(t) = self.triangles.get_mut(*a) {
                    t.set_neighbor(usize::from(*i), Some(*b));
                }
                if let Some(t) = self.triangles.get_mut(*b) {
                    t.set_neighbor(usize::from(*j), Some(*a));
                }
            }
        }

        if overshared > 0 {
            tracing::debug!(
                overshared,
                "rebuild_adjacency: edges shared by more than two triangles"
            );
        }
    }

    /// Wires `created` to each other and to `external` by matching edges.
    fn wire_local(&mut self, created: &[TriangleKey], external: &[TriangleKey]) {
        let mut edge_map = EdgeToTrianglesMap::default();
        for &key in created.iter().chain(external) {
            let Some(tri) = self.triangles.get(key) else {
                continue;
            };
            for i in 0..3u8 {
                edge_map
                    .entry(tri.edge(usize::from(i)))
                    .or_default()
                    .push((key, i));
            }
        }

        for &key in created {
            for i in 0..3usize {
                let Some(edge) = self.triangles.get(key).map(|t| t.edge(i)) else {
                    continue;
                };
                let other = edge_map
                    .get(&edge)
                    .and_then(|owners| owners.iter().find(|(k, _)| *k != key).copied());
                if let Some(t) = self.triangles.get_mut(key) {
                    t.set_neighbor(i, other.map(|(k, _)| k));
                }
                if let Some((k, j)) = other
                    && let Some(t) = self.triangles.get_mut(k)
                {
                    t.set_neighbor(usize::from(j), Some(key));
                }
            }
        }
    }

    /// Triangles having `v` as a vertex, found by scanning all triangles.
    #[must_use]
    pub fn triangles_around(&self, v: VertexKey) -> TriangleKeyBuffer {
        self.triangles
            .iter()
            .filter(|(_, t)| t.contains_vertex(v))
            .map(|(k, _)| k)
            .collect()
    }

    /// Triangles having `v` as a vertex, found by rotating around `v` through
    /// neighbor links from `hint`.
    ///
    /// Falls back to [`Mesh::triangles_around`] when `hint` is missing, stale
    /// or not incident to `v`. The rotation only reaches triangles connected
    /// to `hint` across edges incident to `v`.
    #[must_use]
    pub fn vertex_star(&self, v: VertexKey, hint: Option<TriangleKey>) -> TriangleKeyBuffer {
        let Some(start) =
            hint.filter(|&k| self.triangles.get(k).is_some_and(|t| t.contains_vertex(v)))
        else {
            return self.triangles_around(v);
        };

        let mut out = TriangleKeyBuffer::new();
        out.push(start);
        // Step 1 turns counter-clockwise around `v`, step 2 clockwise.
        for step in [1, 2] {
            let mut current = start;
            while let Some(tri) = self.triangles.get(current)
                && let Some(j) = tri.index_of(v)
                && let Some(next) = tri.neighbor((j + step) % 3)
            {
                if next == start {
                    return out;
                }
                if out.contains(&next) {
                    break;
                }
                out.push(next);
                current = next;
            }
        }
        out
    }

    /// Vertices sharing an edge with `v`.
    #[must_use]
    pub fn vertex_neighbors(&self, v: VertexKey) -> VertexKeyBuffer {
        let mut out = VertexKeyBuffer::new();
        for (_, tri) in self.triangles.iter() {
            if tri.contains_vertex(v) {
                for w in tri.vertices() {
                    if w != v && !out.contains(&w) {
                        out.push(w);
                    }
                }
            }
        }
        out
    }

    /// A triangle owning the edge `a`-`b` and the edge's position in it.
    #[must_use]
    pub fn find_edge(&self, a: VertexKey, b: VertexKey) -> Option<(TriangleKey, usize)> {
        self.triangles
            .iter()
            .find_map(|(k, t)| t.edge_index(a, b).map(|i| (k, i)))
    }

    #[must_use]
    pub fn has_edge(&self, a: VertexKey, b: VertexKey) -> bool {
        self.find_edge(a, b).is_some()
    }

    // -------------------------------------------------------------------------
    // Constraints and boundary
    // -------------------------------------------------------------------------

    /// Marks edge `a`-`b` constrained on every triangle owning it.
    ///
    /// Returns how many triangle edges were marked (0, 1 or 2).
    pub fn mark_constrained(&mut self, a: VertexKey, b: VertexKey) -> usize {
        let mut marked = 0;
        for tri in self.triangles.values_mut() {
            if let Some(i) = tri.edge_index(a, b) {
                tri.set_constrained(i, true);
                marked += 1;
            }
        }
        marked
    }

    /// Whether the edge `a`-`b` exists and is constrained.
    #[must_use]
    pub fn is_constrained_edge(&self, a: VertexKey, b: VertexKey) -> bool {
        self.triangles.values().any(|t| {
            t.edge_index(a, b)
                .is_some_and(|i| t.is_constrained(i))
        })
    }

    /// Distinct constrained edges.
    #[must_use]
    pub fn constrained_edges(&self) -> Vec<Edge> {
        let mut seen = FastHashSet::default();
        let mut out = Vec::new();
        for tri in self.triangles.values() {
            for i in 0..3 {
                if tri.is_constrained(i) && seen.insert(tri.edge(i)) {
                    out.push(tri.edge(i));
                }
            }
        }
        out
    }

    /// Recorded boundary/constraint edges.
    #[must_use]
    pub fn boundary(&self) -> &[Edge] {
        &self.boundary
    }

    /// Records `a`-`b` as a boundary/constraint edge. Returns `false` if it
    /// was already recorded.
    pub fn add_boundary_edge(&mut self, a: VertexKey, b: VertexKey) -> bool {
        let edge = Edge::new(a, b);
        if self.boundary.contains(&edge) {
            return false;
        }
        self.boundary.push(edge);
        true
    }

    /// Edges of non-auxiliary triangles with no non-auxiliary neighbor.
    #[must_use]
    pub fn hull_edges(&self) -> Vec<Edge> {
        let mut out = Vec::new();
        for (_, tri) in self.real_triangles() {
            for i in 0..3 {
                let open = tri.neighbor(i).is_none_or(|n| {
                    self.triangles.get(n).is_none_or(Triangle::is_auxiliary)
                });
                if open {
                    out.push(tri.edge(i));
                }
            }
        }
        out
    }

    /// Coordinates of `edges`.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::VertexNotFound`] for an edge with a removed endpoint.
    pub fn edge_segments(&self, edges: &[Edge]) -> Result<Vec<(Point, Point)>, MeshError> {
        edges
            .iter()
            .map(|e| Ok((self.point(e.v0())?, self.point(e.v1())?)))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Local edits
    // -------------------------------------------------------------------------

    /// Replaces `old` triangles by `new` ones, carrying constraint flags and
    /// wiring adjacency locally. Validates everything before mutating.
    fn replace_triangles(
        &mut self,
        old: &[TriangleKey],
        new: &[[VertexKey; 3]],
        extra_constrained: &[Edge],
    ) -> Result<TriangleKeyBuffer, MeshError> {
        let oriented = new
            .iter()
            .map(|&t| self.oriented(t))
            .collect::<Result<SmallBuffer<[VertexKey; 3], 4>, _>>()?;

        let mut constrained: SmallBuffer<Edge, 8> = extra_constrained.iter().copied().collect();
        let mut external = TriangleKeyBuffer::new();
        for &key in old {
            let tri = self
                .triangles
                .get(key)
                .ok_or(MeshError::TriangleNotFound { key })?;
            for i in 0..3 {
                if tri.is_constrained(i) {
                    constrained.push(tri.edge(i));
                }
                if let Some(n) = tri.neighbor(i)
                    && !old.contains(&n)
                    && !external.contains(&n)
                {
                    external.push(n);
                }
            }
        }

        for &key in old {
            self.remove_triangle(key);
        }

        let mut created = TriangleKeyBuffer::new();
        for vertices in oriented {
            let key = self.store_triangle(vertices);
            if let Some(tri) = self.triangles.get_mut(key) {
                for i in 0..3 {
                    if constrained.contains(&tri.edge(i)) {
                        tri.set_constrained(i, true);
                    }
                }
            }
            created.push(key);
        }

        self.wire_local(&created, &external);
        Ok(created)
    }

    /// Splits triangle `key` into three by connecting its vertices to `v`,
    /// which must lie strictly inside it.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::PointNotInside`] if `v` is on or outside an edge,
    /// or the errors of [`Mesh::insert_triangle`] for degenerate results.
    pub fn split_triangle(
        &mut self,
        key: TriangleKey,
        v: VertexKey,
    ) -> Result<[TriangleKey; 3], MeshError> {
        let [a, b, c] = self
            .triangles
            .get(key)
            .ok_or(MeshError::TriangleNotFound { key })?
            .vertices();
        let [pa, pb, pc] = self.points_of([a, b, c])?;
        let p = self.point(v)?;
        let eps = self.tolerances.degeneracy;
        if orientation(pa, pb, p) <= eps
            || orientation(pb, pc, p) <= eps
            || orientation(pc, pa, p) <= eps
        {
            return Err(MeshError::PointNotInside { key, point: p });
        }

        let created = self.replace_triangles(&[key], &[[v, a, b], [v, b, c], [v, c, a]], &[])?;
        Ok([created[0], created[1], created[2]])
    }

    /// Splits edge `edge` of triangle `key` at `v`, which must lie strictly
    /// between the edge's endpoints. Both the triangle and its neighbor across
    /// the edge (if any) are split in two, giving 2 or 4 triangles.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::PointNotInside`] if `v` does not project strictly
    /// inside the edge, or the errors of [`Mesh::insert_triangle`] for
    /// degenerate results.
    pub fn split_edge(
        &mut self,
        key: TriangleKey,
        edge: usize,
        v: VertexKey,
    ) -> Result<TriangleKeyBuffer, MeshError> {
        let tri = self
            .triangles
            .get(key)
            .ok_or(MeshError::TriangleNotFound { key })?;
        let apex = tri.vertex(edge);
        let (u, w) = tri.edge_endpoints(edge);
        let was_constrained = tri.is_constrained(edge);
        let neighbor = tri.neighbor(edge);

        let (pu, pw, p) = (self.point(u)?, self.point(w)?, self.point(v)?);
        let along = (p.x() - pu.x()) * (pw.x() - pu.x()) + (p.y() - pu.y()) * (pw.y() - pu.y());
        let back = (p.x() - pw.x()) * (pu.x() - pw.x()) + (p.y() - pw.y()) * (pu.y() - pw.y());
        if along <= 0.0 || back <= 0.0 {
            return Err(MeshError::PointNotInside { key, point: p });
        }

        let mut old: SmallBuffer<TriangleKey, 2> = SmallBuffer::new();
        old.push(key);
        let mut new: SmallBuffer<[VertexKey; 3], 4> = SmallBuffer::new();
        new.push([apex, u, v]);
        new.push([apex, v, w]);

        if let Some(n) = neighbor {
            let other = self
                .triangles
                .get(n)
                .ok_or(MeshError::TriangleNotFound { key: n })?;
            let j = other
                .edge_index(u, w)
                .ok_or_else(|| MeshError::InconsistentAdjacency {
                    message: format!("neighbor {n:?} of {key:?} does not share edge {edge}"),
                })?;
            let opposite = other.vertex(j);
            old.push(n);
            new.push([opposite, w, v]);
            new.push([opposite, v, u]);
        }

        let halves = [Edge::new(u, v), Edge::new(v, w)];
        let extra: &[Edge] = if was_constrained { &halves } else { &[] };
        self.replace_triangles(&old, &new, extra)
    }

    /// Replaces the edge `edge` of triangle `key` by the other diagonal of the
    /// quadrilateral formed with its neighbor.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::BoundaryEdge`] on a hull edge,
    /// [`MeshError::ConstrainedEdge`] on a constrained edge and
    /// [`MeshError::NonConvexQuadrilateral`] when the other diagonal would
    /// produce inverted or degenerate triangles.
    pub fn flip(&mut self, key: TriangleKey, edge: usize) -> Result<[TriangleKey; 2], MeshError> {
        let tri = self
            .triangles
            .get(key)
            .ok_or(MeshError::TriangleNotFound { key })?;
        let n = tri
            .neighbor(edge)
            .ok_or(MeshError::BoundaryEdge { key, edge })?;
        let a = tri.vertex(edge);
        let (b, c) = tri.edge_endpoints(edge);

        let other = self
            .triangles
            .get(n)
            .ok_or(MeshError::TriangleNotFound { key: n })?;
        let j = other
            .edge_index(b, c)
            .ok_or_else(|| MeshError::InconsistentAdjacency {
                message: format!("neighbor {n:?} of {key:?} does not share edge {edge}"),
            })?;
        if tri.is_constrained(edge) || other.is_constrained(j) {
            return Err(MeshError::ConstrainedEdge {
                a: self.index_of(b),
                b: self.index_of(c),
            });
        }
        let d = other.vertex(j);

        let [pa, pb, pc] = self.points_of([a, b, c])?;
        let pd = self.point(d)?;
        let eps = self.tolerances.degeneracy;
        if orientation(pa, pb, pd) <= eps || orientation(pa, pd, pc) <= eps {
            return Err(MeshError::NonConvexQuadrilateral {
                a: self.index_of(b),
                b: self.index_of(c),
            });
        }

        let created = self.replace_triangles(&[key, n], &[[a, b, d], [a, d, c]], &[])?;
        Ok([created[0], created[1]])
    }

    /// Removes all auxiliary triangles and vertices. Returns the number of
    /// triangles removed.
    pub fn purge_auxiliary(&mut self) -> usize {
        let doomed: Vec<TriangleKey> = self
            .triangles
            .iter()
            .filter(|(_, t)| t.is_auxiliary())
            .map(|(k, _)| k)
            .collect();
        for &key in &doomed {
            self.remove_triangle(key);
        }

        let auxiliary: Vec<(VertexKey, VertexIndex)> = self
            .vertices
            .iter()
            .filter(|(_, v)| v.is_auxiliary())
            .map(|(k, v)| (k, v.index()))
            .collect();
        for (key, index) in auxiliary {
            self.vertices.remove(key);
            self.index_to_key.remove(&index);
            self.boundary.retain(|e| !e.contains(key));
        }

        tracing::debug!(removed = doomed.len(), "purged auxiliary triangles");
        doomed.len()
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Checks that every triangle has three distinct live vertices in strictly
    /// counter-clockwise order.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate_triangles(&self) -> Result<(), MeshValidationError> {
        for (key, tri) in self.triangles.iter() {
            let [a, b, c] = tri.vertices();
            if a == b || b == c || a == c {
                return Err(MeshValidationError::InvalidTriangle {
                    key,
                    message: "repeated vertex".to_string(),
                });
            }
            let [pa, pb, pc] =
                self.points_of([a, b, c])
                    .map_err(|e| MeshValidationError::InvalidTriangle {
                        key,
                        message: e.to_string(),
                    })?;
            let det = orientation(pa, pb, pc);
            if det <= 0.0 {
                return Err(MeshValidationError::InvalidOrientation {
                    key,
                    orientation: det,
                });
            }
        }
        Ok(())
    }

    /// Checks that neighbor pointers are live, share the right edge and are
    /// mutual.
    ///
    /// # Errors
    ///
    /// Returns [`MeshValidationError::InvalidNeighbors`] on the first problem.
    pub fn validate_neighbors(&self) -> Result<(), MeshValidationError> {
        for (key, tri) in self.triangles.iter() {
            for i in 0..3 {
                let Some(n) = tri.neighbor(i) else {
                    continue;
                };
                let Some(other) = self.triangles.get(n) else {
                    return Err(MeshValidationError::InvalidNeighbors {
                        message: format!("{key:?} points at missing triangle {n:?}"),
                    });
                };
                let (a, b) = tri.edge_endpoints(i);
                let Some(j) = other.edge_index(a, b) else {
                    return Err(MeshValidationError::InvalidNeighbors {
                        message: format!("{key:?} and {n:?} do not share edge {i}"),
                    });
                };
                if other.neighbor(j) != Some(key) {
                    return Err(MeshValidationError::InvalidNeighbors {
                        message: format!("{n:?} does not point back at {key:?}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Runs all structural checks.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn is_valid(&self) -> Result<(), MeshValidationError> {
        self.validate_triangles()?;
        self.validate_neighbors()
    }

    /// Pairs `(triangle, vertex)` where a non-auxiliary vertex lies inside the
    /// circumcircle of a non-auxiliary triangle by more than `tolerance`.
    #[must_use]
    pub fn find_delaunay_violations(&self, tolerance: f64) -> Vec<(TriangleKey, VertexKey)> {
        let mut out = Vec::new();
        for (key, tri) in self.real_triangles() {
            let Ok([a, b, c]) = self.points_of(tri.vertices()) else {
                continue;
            };
            for (vkey, vertex) in self.vertices.iter() {
                if vertex.is_auxiliary() || tri.contains_vertex(vkey) {
                    continue;
                }
                if in_circumcircle(a, b, c, vertex.point()) > tolerance {
                    out.push((key, vkey));
                }
            }
        }
        out
    }

    /// Global empty-circumcircle check.
    ///
    /// # Errors
    ///
    /// Returns [`MeshValidationError::DelaunayViolation`] for the first
    /// encroached triangle.
    pub fn validate_delaunay(&self, tolerance: f64) -> Result<(), MeshValidationError> {
        match self.find_delaunay_violations(tolerance).first() {
            Some(&(t, v)) => Err(MeshValidationError::DelaunayViolation {
                triangle: self
                    .triangles
                    .get(t)
                    .map_or([VertexIndex::MIN; 3], |tri| self.indices_of(tri.vertices())),
                vertex: self.index_of(v),
            }),
            None => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------------

    /// Summary counts and quality extremes.
    #[must_use]
    pub fn statistics(&self) -> MeshStatistics {
        let mut stats = MeshStatistics {
            boundary_edges: self.boundary.len(),
            constrained_edges: self.constrained_edges().len(),
            hull_edges: self.hull_edges().len(),
            ..MeshStatistics::default()
        };
        for vertex in self.vertices.values() {
            if vertex.is_auxiliary() {
                stats.auxiliary_vertices += 1;
            } else {
                stats.vertices += 1;
            }
        }
        for (_, tri) in self.triangles.iter() {
            if tri.is_auxiliary() {
                stats.auxiliary_triangles += 1;
                continue;
            }
            stats.triangles += 1;
            if let Ok(points) = self.points_of(tri.vertices()) {
                let [a, b, c] = points;
                stats.max_area = stats.max_area.max(orientation(a, b, c).abs() / 2.0);
                if let Some(angle) = min_angle(points) {
                    stats.min_angle = Some(stats.min_angle.map_or(angle, |m| m.min(angle)));
                }
            }
        }
        stats
    }

    /// Extracts the mesh by value.
    ///
    /// Auxiliary vertices and triangles are left out, as are triangles
    /// referring to a vertex with a negative index.
    #[must_use]
    pub fn to_output(&self) -> MeshOutput {
        let mut vertices: Vec<OutputVertex> = self
            .vertices
            .values()
            .filter(|v| !v.is_auxiliary())
            .map(|v| OutputVertex {
                index: v.index(),
                x: v.point().x(),
                y: v.point().y(),
                region: match usize::try_from(v.index()) {
                    Ok(i) if i < self.region1_count => 1,
                    _ => 2,
                },
            })
            .collect();
        vertices.sort_by_key(|v| v.index);

        let mut skipped = 0usize;
        let mut triangles = Vec::with_capacity(self.triangles.len());
        for (_, tri) in self.real_triangles() {
            let indices = self.indices_of(tri.vertices());
            if indices.iter().any(|&i| i < 0) {
                skipped += 1;
                continue;
            }
            triangles.push(indices);
        }
        if skipped > 0 {
            tracing::warn!(skipped, "to_output: skipped triangles with invalid vertex indices");
        }

        let segments = self
            .boundary
            .iter()
            .map(|e| [self.index_of(e.v0()), self.index_of(e.v1())])
            .collect();

        MeshOutput {
            vertices,
            triangles,
            segments,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mesh_of(points: &[[f64; 2]]) -> (Mesh, Vec<VertexKey>) {
        let set = PointSet::from_points(points.iter().copied()).unwrap();
        let mesh = Mesh::from_point_set(&set, Tolerances::default()).unwrap();
        let keys = (0..points.len())
            .map(|i| mesh.vertex_key(i as VertexIndex).unwrap())
            .collect();
        (mesh, keys)
    }

    /// Unit square split along the (0,0)-(1,1) diagonal.
    fn square() -> (Mesh, Vec<VertexKey>) {
        let (mut mesh, k) = mesh_of(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        mesh.insert_triangle(k[0], k[1], k[2]).unwrap();
        mesh.insert_triangle(k[0], k[2], k[3]).unwrap();
        mesh.rebuild_adjacency();
        (mesh, k)
    }

    #[test]
    fn test_insert_vertex_tracks_indices() {
        let mut mesh = Mesh::new();
        let a = mesh.insert_vertex(Vertex::new(Point::new(0.0, 0.0), 4)).unwrap();
        assert_eq!(mesh.vertex_key(4), Some(a));
        assert_eq!(mesh.next_index(), 5);
        assert_eq!(
            mesh.insert_vertex(Vertex::new(Point::new(1.0, 0.0), 4)),
            Err(MeshError::DuplicateVertexIndex { index: 4 })
        );
        let s = mesh.insert_steiner_point(Point::new(2.0, 0.0)).unwrap();
        assert_eq!(mesh.vertex(s).unwrap().index(), 5);
        // Auxiliary indices do not move the counter
        mesh.insert_vertex(Vertex::new(Point::new(9.0, 9.0), -1)).unwrap();
        assert_eq!(mesh.next_index(), 6);
    }

    #[test]
    fn test_insert_triangle_orients_and_rejects_degenerate() {
        let (mut mesh, k) = mesh_of(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [2.0, 0.0]]);
        let t = mesh.insert_triangle(k[0], k[2], k[1]).unwrap();
        let [a, b, c] = mesh.triangle_points(t).unwrap();
        assert!(orientation(a, b, c) > 0.0);

        assert!(matches!(
            mesh.insert_triangle(k[0], k[1], k[3]),
            Err(MeshError::DegenerateTriangle { .. })
        ));
        assert_eq!(
            mesh.insert_triangle(k[0], k[0], k[1]),
            Err(MeshError::RepeatedVertex { key: k[0] })
        );
        assert_eq!(mesh.number_of_triangles(), 1);
    }

    #[test]
    fn test_find_triangle_matches_rotations_only() {
        let (mesh, k) = square();
        assert!(mesh.find_triangle(k[1], k[2], k[0]).is_some());
        assert!(mesh.find_triangle(k[0], k[2], k[1]).is_none());
    }

    #[test]
    fn test_rebuild_adjacency_links_shared_diagonal() {
        let (mesh, k) = square();
        assert!(mesh.is_valid().is_ok());
        let (t, i) = mesh.find_edge(k[0], k[2]).unwrap();
        let n = mesh.triangle(t).unwrap().neighbor(i).unwrap();
        assert!(mesh.triangle(n).unwrap().contains_vertex(k[3]) || mesh.triangle(n).unwrap().contains_vertex(k[1]));
        assert_eq!(mesh.hull_edges().len(), 4);
    }

    #[test]
    fn test_split_triangle() {
        let (mut mesh, k) = mesh_of(&[[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]]);
        let t = mesh.insert_triangle(k[0], k[1], k[2]).unwrap();
        let v = mesh.insert_steiner_point(Point::new(1.0, 1.0)).unwrap();
        let created = mesh.split_triangle(t, v).unwrap();
        assert_eq!(mesh.number_of_triangles(), 3);
        assert!(!mesh.contains_triangle(t) || created.contains(&t));
        assert!(mesh.is_valid().is_ok());
        assert_eq!(mesh.triangles_around(v).len(), 3);
        assert_eq!(mesh.vertex_neighbors(v).len(), 3);
    }

    #[test]
    fn test_vertex_star_walks_closed_and_open_fans() {
        let (mut mesh, k) = mesh_of(&[[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]]);
        let t = mesh.insert_triangle(k[0], k[1], k[2]).unwrap();
        mesh.insert_triangle(k[0], k[2], k[3]).unwrap();
        mesh.rebuild_adjacency();
        let v = mesh.insert_steiner_point(Point::new(3.0, 1.0)).unwrap();
        let created = mesh.split_triangle(t, v).unwrap();

        let mut around: Vec<_> = mesh.vertex_star(v, Some(created[1])).to_vec();
        let mut scanned: Vec<_> = mesh.triangles_around(v).to_vec();
        around.sort_unstable();
        scanned.sort_unstable();
        assert_eq!(around, scanned);

        // A hull vertex has an open fan, reached from either end.
        let corner = k[0];
        for (start, tri) in mesh.triangles() {
            if tri.contains_vertex(corner) {
                assert_eq!(
                    mesh.vertex_star(corner, Some(start)).len(),
                    mesh.triangles_around(corner).len()
                );
            }
        }

        // A hint away from the vertex falls back to scanning.
        let away = mesh
            .triangles()
            .find(|(_, t)| !t.contains_vertex(v))
            .map(|(key, _)| key);
        assert_eq!(mesh.vertex_star(v, away).len(), 3);
        assert_eq!(mesh.vertex_star(v, None).len(), 3);
    }

    #[test]
    fn test_split_triangle_rejects_point_on_edge() {
        let (mut mesh, k) = mesh_of(&[[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]]);
        let t = mesh.insert_triangle(k[0], k[1], k[2]).unwrap();
        let v = mesh.insert_steiner_point(Point::new(2.0, 0.0)).unwrap();
        assert!(matches!(
            mesh.split_triangle(t, v),
            Err(MeshError::PointNotInside { .. })
        ));
        assert_eq!(mesh.number_of_triangles(), 1);
    }

    #[test]
    fn test_split_interior_edge_keeps_constraint_on_both_halves() {
        let (mut mesh, k) = square();
        assert_eq!(mesh.mark_constrained(k[0], k[2]), 2);
        let (t, i) = mesh.find_edge(k[0], k[2]).unwrap();
        let v = mesh.insert_steiner_point(Point::new(0.5, 0.5)).unwrap();

        let created = mesh.split_edge(t, i, v).unwrap();
        assert_eq!(created.len(), 4);
        assert_eq!(mesh.number_of_triangles(), 4);
        assert!(mesh.is_valid().is_ok());
        assert!(mesh.is_constrained_edge(k[0], v));
        assert!(mesh.is_constrained_edge(v, k[2]));
        assert!(!mesh.is_constrained_edge(k[1], v));
        assert_eq!(mesh.constrained_edges().len(), 2);
    }

    #[test]
    fn test_split_hull_edge() {
        let (mut mesh, k) = square();
        let (t, i) = mesh.find_edge(k[0], k[1]).unwrap();
        let v = mesh.insert_steiner_point(Point::new(0.5, 0.0)).unwrap();
        let created = mesh.split_edge(t, i, v).unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(mesh.number_of_triangles(), 3);
        assert!(mesh.is_valid().is_ok());
        assert_eq!(mesh.hull_edges().len(), 5);
    }

    #[test]
    fn test_split_edge_rejects_point_beyond_endpoint() {
        let (mut mesh, k) = square();
        let (t, i) = mesh.find_edge(k[0], k[1]).unwrap();
        let v = mesh.insert_steiner_point(Point::new(1.5, 0.0)).unwrap();
        assert!(matches!(
            mesh.split_edge(t, i, v),
            Err(MeshError::PointNotInside { .. })
        ));
        assert!(mesh.is_valid().is_ok());
    }

    #[test]
    fn test_flip_swaps_diagonal() {
        let (mut mesh, k) = square();
        let (t, i) = mesh.find_edge(k[0], k[2]).unwrap();
        mesh.flip(t, i).unwrap();
        assert!(!mesh.has_edge(k[0], k[2]));
        assert!(mesh.has_edge(k[1], k[3]));
        assert!(mesh.is_valid().is_ok());
    }

    #[test]
    fn test_flip_refuses_constrained_boundary_and_concave() {
        let (mut mesh, k) = square();
        let (t, i) = mesh.find_edge(k[0], k[1]).unwrap();
        assert!(matches!(mesh.flip(t, i), Err(MeshError::BoundaryEdge { .. })));

        mesh.mark_constrained(k[0], k[2]);
        let (t, i) = mesh.find_edge(k[0], k[2]).unwrap();
        assert!(matches!(mesh.flip(t, i), Err(MeshError::ConstrainedEdge { .. })));

        // Dart-shaped quadrilateral: the other diagonal lies outside
        let (mut dart, d) = mesh_of(&[[0.0, 0.0], [2.0, 1.0], [0.0, 2.0], [0.5, 1.0]]);
        dart.insert_triangle(d[0], d[1], d[3]).unwrap();
        dart.insert_triangle(d[3], d[1], d[2]).unwrap();
        dart.rebuild_adjacency();
        let (t, i) = dart.find_edge(d[1], d[3]).unwrap();
        assert!(matches!(
            dart.flip(t, i),
            Err(MeshError::NonConvexQuadrilateral { .. })
        ));
        assert_eq!(dart.number_of_triangles(), 2);
    }

    #[test]
    fn test_purge_auxiliary() {
        let (mut mesh, k) = mesh_of(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        let aux = mesh
            .insert_vertex(Vertex::new(Point::new(5.0, 5.0), -1))
            .unwrap();
        mesh.insert_triangle(k[0], k[1], k[2]).unwrap();
        mesh.insert_triangle(k[1], aux, k[2]).unwrap();
        mesh.rebuild_adjacency();
        assert_eq!(mesh.statistics().auxiliary_triangles, 1);

        assert_eq!(mesh.purge_auxiliary(), 1);
        assert_eq!(mesh.number_of_triangles(), 1);
        assert_eq!(mesh.number_of_vertices(), 3);
        assert!(mesh.vertex_key(-1).is_none());
        assert!(mesh.is_valid().is_ok());
        assert_eq!(mesh.hull_edges().len(), 3);
    }

    #[test]
    fn test_validate_delaunay_detects_bad_diagonal() {
        // Thin diamond triangulated along its long diagonal
        let (mut mesh, k) = mesh_of(&[[0.0, 0.0], [1.0, -0.2], [2.0, 0.0], [1.0, 0.2]]);
        mesh.insert_triangle(k[0], k[1], k[2]).unwrap();
        mesh.insert_triangle(k[0], k[2], k[3]).unwrap();
        mesh.rebuild_adjacency();
        assert!(mesh.is_valid().is_ok());
        assert!(matches!(
            mesh.validate_delaunay(1e-9),
            Err(MeshValidationError::DelaunayViolation { .. })
        ));

        let (t, i) = mesh.find_edge(k[0], k[2]).unwrap();
        mesh.flip(t, i).unwrap();
        assert!(mesh.validate_delaunay(1e-9).is_ok());
    }

    #[test]
    fn test_validation_reports_inverted_triangle() {
        let (mesh, _) = square();
        let mut broken = mesh.clone();
        let key = broken.triangles().next().map(|(k, _)| k).unwrap();
        let tri = broken.triangles.get_mut(key).unwrap();
        let [a, b, c] = tri.vertices();
        *tri = Triangle::new([a, c, b], false);
        assert!(matches!(
            broken.validate_triangles(),
            Err(MeshValidationError::InvalidOrientation { .. })
        ));
    }

    #[test]
    fn test_output_regions_and_segments() {
        let set = PointSet::from_regions([[0.0, 0.0], [1.0, 0.0]], [[0.0, 1.0]]).unwrap();
        let mut mesh = Mesh::from_point_set(&set, Tolerances::default()).unwrap();
        let k: Vec<_> = (0..3).map(|i| mesh.vertex_key(i).unwrap()).collect();
        mesh.insert_triangle(k[0], k[1], k[2]).unwrap();
        mesh.add_boundary_edge(k[0], k[1]);
        assert!(!mesh.add_boundary_edge(k[1], k[0]));

        let out = mesh.to_output();
        assert_eq!(out.vertices.len(), 3);
        assert_eq!(
            out.vertices.iter().map(|v| v.region).collect::<Vec<_>>(),
            vec![1, 1, 2]
        );
        assert_eq!(out.triangles.len(), 1);
        let mut tri = out.triangles[0];
        tri.sort_unstable();
        assert_eq!(tri, [0, 1, 2]);
        assert_eq!(out.segments.len(), 1);

        let json = serde_json::to_string(&out).unwrap();
        let back: MeshOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, out);
    }

    #[test]
    fn test_statistics() {
        let (mesh, _) = square();
        let stats = mesh.statistics();
        assert_eq!(stats.vertices, 4);
        assert_eq!(stats.triangles, 2);
        assert_eq!(stats.hull_edges, 4);
        assert_eq!(stats.constrained_edges, 0);
        assert_relative_eq!(stats.max_area, 0.5);
        assert_relative_eq!(stats.min_angle.unwrap(), std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
    }

    #[test]
    fn test_stale_keys_are_reported() {
        let (mut mesh, k) = square();
        let (t, _) = mesh.find_edge(k[0], k[1]).unwrap();
        mesh.remove_triangle(t).unwrap();
        assert_eq!(
            mesh.triangle_points(t),
            Err(MeshError::TriangleNotFound { key: t })
        );
        assert!(mesh.is_valid().is_ok());
    }
}
