//! Triangles of a planar mesh.
//!
//! A [`Triangle`] stores three vertex keys in counter-clockwise order and, for
//! each edge, the adjacent triangle and a constraint flag. Edge `i` is the
//! edge opposite vertex `i`, running from vertex `i + 1` to vertex `i + 2`
//! (mod 3); `neighbors[i]` and `constrained[i]` refer to that edge.

use crate::core::edge::Edge;
use crate::core::mesh::{TriangleKey, VertexKey};

/// A mesh triangle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Triangle {
    vertices: [VertexKey; 3],
    neighbors: [Option<TriangleKey>; 3],
    auxiliary: bool,
    constrained: [bool; 3],
}

impl Triangle {
    /// Creates an unconnected triangle. `auxiliary` marks membership in the
    /// bounding construct.
    #[must_use]
    pub const fn new(vertices: [VertexKey; 3], auxiliary: bool) -> Self {
        Self {
            vertices,
            neighbors: [None; 3],
            auxiliary,
            constrained: [false; 3],
        }
    }

    #[inline]
    #[must_use]
    pub const fn vertices(&self) -> [VertexKey; 3] {
        self.vertices
    }

    #[inline]
    #[must_use]
    pub const fn vertex(&self, i: usize) -> VertexKey {
        self.vertices[i % 3]
    }

    #[inline]
    #[must_use]
    pub const fn neighbors(&self) -> [Option<TriangleKey>; 3] {
        self.neighbors
    }

    /// The triangle across edge `i`.
    #[inline]
    #[must_use]
    pub const fn neighbor(&self, i: usize) -> Option<TriangleKey> {
        self.neighbors[i % 3]
    }

    #[inline]
    #[must_use]
    pub const fn is_auxiliary(&self) -> bool {
        self.auxiliary
    }

    /// Whether edge `i` was forced by a constraint segment.
    #[inline]
    #[must_use]
    pub const fn is_constrained(&self, i: usize) -> bool {
        self.constrained[i % 3]
    }

    #[must_use]
    pub const fn constrained(&self) -> [bool; 3] {
        self.constrained
    }

    #[must_use]
    pub fn contains_vertex(&self, v: VertexKey) -> bool {
        self.vertices.contains(&v)
    }

    /// Position of `v` within this triangle.
    #[must_use]
    pub fn index_of(&self, v: VertexKey) -> Option<usize> {
        self.vertices.iter().position(|&w| w == v)
    }

    /// Endpoints of edge `i` in counter-clockwise order.
    #[must_use]
    pub const fn edge_endpoints(&self, i: usize) -> (VertexKey, VertexKey) {
        (self.vertices[(i + 1) % 3], self.vertices[(i + 2) % 3])
    }

    /// Canonical key of edge `i`.
    #[must_use]
    pub fn edge(&self, i: usize) -> Edge {
        let (a, b) = self.edge_endpoints(i);
        Edge::new(a, b)
    }

    /// Index of the edge joining `a` and `b` (either direction).
    #[must_use]
    pub fn edge_index(&self, a: VertexKey, b: VertexKey) -> Option<usize> {
        let ia = self.index_of(a)?;
        let ib = self.index_of(b)?;
        (ia != ib).then(|| 3 - ia - ib)
    }

    /// Index of the edge shared with `neighbor`.
    #[must_use]
    pub fn neighbor_index(&self, neighbor: TriangleKey) -> Option<usize> {
        self.neighbors.iter().position(|&n| n == Some(neighbor))
    }

    /// Returns `true` if `vertices` is a cyclic rotation of this triangle's
    /// vertices (same winding).
    #[must_use]
    pub fn is_rotation_of(&self, vertices: [VertexKey; 3]) -> bool {
        (0..3).any(|r| {
            (0..3).all(|i| self.vertices[(i + r) % 3] == vertices[i])
        })
    }

    pub(crate) const fn set_neighbor(&mut self, i: usize, neighbor: Option<TriangleKey>) {
        self.neighbors[i] = neighbor;
    }

    pub(crate) const fn set_constrained(&mut self, i: usize, constrained: bool) {
        self.constrained[i] = constrained;
    }

    pub(crate) const fn clear_neighbors(&mut self) {
        self.neighbors = [None; 3];
    }
}
