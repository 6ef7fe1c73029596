//! Undirected mesh edges and input constraint segments.
//!
//! An [`Edge`] identifies a mesh edge by its two endpoint [`VertexKey`]s in
//! canonical order, so `(a, b)` and `(b, a)` compare and hash equal. A
//! [`Segment`] is the input-side counterpart: a pair of stable vertex indices
//! that must appear as a chain of mesh edges.
//!
//! `Edge` ordering follows the internal slot-map key order and is not stable
//! across processes.

use crate::core::mesh::VertexKey;
use crate::core::vertex::VertexIndex;
use serde::{Deserialize, Serialize};
use slotmap::Key;

/// Canonical undirected edge.
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::core::edge::Edge;
/// use delaunay_refine::core::mesh::VertexKey;
/// use slotmap::KeyData;
///
/// let a = VertexKey::from(KeyData::from_ffi(1));
/// let b = VertexKey::from(KeyData::from_ffi(2));
/// assert_eq!(Edge::new(a, b), Edge::new(b, a));
/// assert_eq!(Edge::new(b, a).endpoints(), (a, b));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    v0: VertexKey,
    v1: VertexKey,
}

impl Edge {
    /// Creates the canonical edge between `a` and `b`.
    #[must_use]
    pub fn new(a: VertexKey, b: VertexKey) -> Self {
        if a.data().as_ffi() <= b.data().as_ffi() {
            Self { v0: a, v1: b }
        } else {
            Self { v0: b, v1: a }
        }
    }

    #[inline]
    #[must_use]
    pub const fn v0(self) -> VertexKey {
        self.v0
    }

    #[inline]
    #[must_use]
    pub const fn v1(self) -> VertexKey {
        self.v1
    }

    #[inline]
    #[must_use]
    pub const fn endpoints(self) -> (VertexKey, VertexKey) {
        (self.v0, self.v1)
    }

    #[inline]
    #[must_use]
    pub fn contains(self, v: VertexKey) -> bool {
        self.v0 == v || self.v1 == v
    }

    /// The endpoint that is not `v`, or `None` if `v` is not an endpoint.
    #[must_use]
    pub fn other(self, v: VertexKey) -> Option<VertexKey> {
        if self.v0 == v {
            Some(self.v1)
        } else if self.v1 == v {
            Some(self.v0)
        } else {
            None
        }
    }
}

impl From<(VertexKey, VertexKey)> for Edge {
    fn from((a, b): (VertexKey, VertexKey)) -> Self {
        Self::new(a, b)
    }
}

/// A required segment between two input vertices.
///
/// The `marker` is an opaque boundary label carried through unchanged.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint index.
    pub start: VertexIndex,
    /// Second endpoint index.
    pub end: VertexIndex,
    /// Boundary marker.
    pub marker: i32,
}

impl Segment {
    #[must_use]
    pub const fn new(start: VertexIndex, end: VertexIndex) -> Self {
        Self {
            start,
            end,
            marker: 0,
        }
    }

    #[must_use]
    pub const fn with_marker(mut self, marker: i32) -> Self {
        self.marker = marker;
        self
    }
}

impl From<(VertexIndex, VertexIndex)> for Segment {
    fn from((start, end): (VertexIndex, VertexIndex)) -> Self {
        Self::new(start, end)
    }
}
