use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use smallvec::SmallVec;

#[cfg(not(feature = "dense-slotmap"))]
use slotmap::SlotMap;

#[cfg(feature = "dense-slotmap")]
use slotmap::DenseSlotMap;

use crate::core::edge::Edge;
use crate::core::mesh::{TriangleKey, VertexKey};

/// Position of an edge within a triangle: edge `i` is opposite vertex `i`.
pub type EdgeIndex = u8;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Arena backend for the vertex and triangle collections of a
/// [`Mesh`](crate::core::mesh::Mesh).
///
/// `DenseSlotMap` under the default `dense-slotmap` feature, `SlotMap` with
/// `--no-default-features`. Both recycle freed slots through an internal free
/// list and keep live keys valid across growth and removal.
#[cfg(not(feature = "dense-slotmap"))]
pub type StorageMap<K, V> = SlotMap<K, V>;

#[cfg(feature = "dense-slotmap")]
pub type StorageMap<K, V> = DenseSlotMap<K, V>;

// =============================================================================
// HASHING
// =============================================================================

/// `HashMap` with the non-cryptographic `FxHasher`.
///
/// Not DoS-resistant; keys here are always internal handles.
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::core::collections::FastHashMap;
///
/// let mut map: FastHashMap<i64, usize> = FastHashMap::default();
/// map.insert(-1, 0);
/// assert_eq!(map.get(&-1), Some(&0));
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// `HashSet` with the non-cryptographic `FxHasher`.
pub type FastHashSet<T> = FxHashSet<T>;

/// Creates a [`FastHashMap`] with room for `capacity` entries.
#[must_use]
pub fn fast_hash_map_with_capacity<K, V>(capacity: usize) -> FastHashMap<K, V> {
    FastHashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default())
}

/// Creates a [`FastHashSet`] with room for `capacity` entries.
#[must_use]
pub fn fast_hash_set_with_capacity<T>(capacity: usize) -> FastHashSet<T> {
    FastHashSet::with_capacity_and_hasher(capacity, FxBuildHasher::default())
}

// =============================================================================
// SMALL BUFFERS
// =============================================================================

/// Inline-first vector: stack storage up to `N` elements, heap beyond.
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::core::collections::SmallBuffer;
///
/// let mut buffer: SmallBuffer<i32, 4> = SmallBuffer::new();
/// buffer.extend([1, 2, 3]);
/// assert!(!buffer.spilled());
/// ```
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

/// Typical vertex degree in a planar Delaunay mesh is about six.
pub const TYPICAL_VERTEX_DEGREE: usize = 8;

/// Triangles incident to one vertex.
pub type TriangleKeyBuffer = SmallBuffer<TriangleKey, TYPICAL_VERTEX_DEGREE>;

/// Vertices adjacent to one vertex.
pub type VertexKeyBuffer = SmallBuffer<VertexKey, TYPICAL_VERTEX_DEGREE>;

/// Edge → owning `(triangle, edge index)` pairs. A manifold edge has at most two.
pub type EdgeToTrianglesMap = FastHashMap<Edge, SmallBuffer<(TriangleKey, EdgeIndex), 2>>;
