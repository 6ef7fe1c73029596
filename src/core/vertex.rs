//! Mesh vertices and validated input point sets.
//!
//! A [`Vertex`] pairs a [`Point`] with a stable integer index. Indices `>= 0`
//! identify input and Steiner vertices; the negative indices `-1`, `-2`, `-3`
//! are reserved for the auxiliary bounding triangle used during construction
//! and never survive into a finished mesh.

use crate::core::collections::FastHashSet;
use crate::geometry::point::{BoundingBox, Point};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable vertex identity as it appears in input and output.
pub type VertexIndex = i64;

/// Indices of the three auxiliary bounding vertices.
pub const AUXILIARY_INDICES: [VertexIndex; 3] = [-1, -2, -3];

// =============================================================================
// VERTEX
// =============================================================================

/// A point together with its stable index.
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::core::vertex::Vertex;
/// use delaunay_refine::geometry::point::Point;
///
/// let v = Vertex::new(Point::new(1.0, 2.0), 7);
/// assert_eq!(v.index(), 7);
/// assert!(!v.is_auxiliary());
/// assert!(Vertex::new(Point::new(0.0, 0.0), -1).is_auxiliary());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    point: Point,
    index: VertexIndex,
}

impl Vertex {
    #[must_use]
    pub const fn new(point: Point, index: VertexIndex) -> Self {
        Self { point, index }
    }

    #[must_use]
    pub const fn point(&self) -> Point {
        self.point
    }

    #[must_use]
    pub const fn index(&self) -> VertexIndex {
        self.index
    }

    /// Auxiliary vertices carry negative indices.
    #[must_use]
    pub const fn is_auxiliary(&self) -> bool {
        self.index < 0
    }
}

// =============================================================================
// POINT SET
// =============================================================================

/// Errors raised while validating an input point set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointSetError {
    /// A coordinate is `NaN` or infinite.
    #[error("Vertex {index} has a non-finite coordinate")]
    NonFiniteCoordinate {
        /// Index of the offending vertex
        index: VertexIndex,
    },
    /// Negative indices are reserved for auxiliary vertices.
    #[error("Vertex index {index} is negative; negative indices are reserved")]
    NegativeIndex {
        /// The offending index
        index: VertexIndex,
    },
    /// Two vertices share an index.
    #[error("Vertex index {index} appears more than once")]
    DuplicateIndex {
        /// The repeated index
        index: VertexIndex,
    },
    /// The region-1 count exceeds the number of vertices.
    #[error("Region-1 count {count} exceeds the number of vertices ({len})")]
    RegionCountOutOfRange {
        /// Requested region-1 count
        count: usize,
        /// Number of vertices in the set
        len: usize,
    },
}

/// Validated input for mesh construction.
///
/// Holds the vertices in input order and the number of leading vertices that
/// belong to "region 1". The region split is only a label: it is passed
/// through to [`MeshOutput`](crate::core::mesh::MeshOutput) and never
/// influences the algorithms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    vertices: Vec<Vertex>,
    region1_count: usize,
}

impl PointSet {
    /// Validates explicitly indexed vertices.
    ///
    /// # Errors
    ///
    /// Returns a [`PointSetError`] for non-finite coordinates, negative or
    /// repeated indices, or a region-1 count larger than the set.
    pub fn new(vertices: Vec<Vertex>, region1_count: usize) -> Result<Self, PointSetError> {
        if region1_count > vertices.len() {
            return Err(PointSetError::RegionCountOutOfRange {
                count: region1_count,
                len: vertices.len(),
            });
        }
        let mut seen = FastHashSet::default();
        for v in &vertices {
            if v.index < 0 {
                return Err(PointSetError::NegativeIndex { index: v.index });
            }
            if !v.point.is_finite() {
                return Err(PointSetError::NonFiniteCoordinate { index: v.index });
            }
            if !seen.insert(v.index) {
                return Err(PointSetError::DuplicateIndex { index: v.index });
            }
        }
        Ok(Self {
            vertices,
            region1_count,
        })
    }

    /// Indexes `points` sequentially from zero, all in region 1.
    ///
    /// # Errors
    ///
    /// Returns [`PointSetError::NonFiniteCoordinate`] for `NaN`/`∞` input.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use delaunay_refine::core::vertex::PointSet;
    ///
    /// let set = PointSet::from_points([[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]).unwrap();
    /// assert_eq!(set.len(), 3);
    /// assert_eq!(set.region1_count(), 3);
    /// assert_eq!(set.vertices()[2].index(), 2);
    /// ```
    pub fn from_points<I, P>(points: I) -> Result<Self, PointSetError>
    where
        I: IntoIterator<Item = P>,
        P: Into<Point>,
    {
        let vertices: Vec<Vertex> = (0..)
            .zip(points)
            .map(|(index, p)| Vertex::new(p.into(), index))
            .collect();
        let count = vertices.len();
        Self::new(vertices, count)
    }

    /// Indexes `region1` followed by `region2` sequentially from zero.
    ///
    /// # Errors
    ///
    /// Returns [`PointSetError::NonFiniteCoordinate`] for `NaN`/`∞` input.
    pub fn from_regions<P: Into<Point>>(
        region1: impl IntoIterator<Item = P>,
        region2: impl IntoIterator<Item = P>,
    ) -> Result<Self, PointSetError> {
        let first: Vec<Point> = region1.into_iter().map(Into::into).collect();
        let count = first.len();
        let vertices: Vec<Vertex> = (0..)
            .zip(first.into_iter().chain(region2.into_iter().map(Into::into)))
            .map(|(index, p)| Vertex::new(p, index))
            .collect();
        Self::new(vertices, count)
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[must_use]
    pub const fn region1_count(&self) -> usize {
        self.region1_count
    }

    /// Bounding box of all points, `None` when empty.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices.iter().map(Vertex::point))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points_assigns_sequential_indices() {
        let set = PointSet::from_points([(0.0, 0.0), (2.0, 1.0)]).unwrap();
        let indices: Vec<_> = set.vertices().iter().map(Vertex::index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert!(!set.is_empty());
        assert_eq!(set.bounding_box().unwrap().area(), 2.0);
    }

    #[test]
    fn test_from_regions_records_split() {
        let set = PointSet::from_regions([[0.0, 0.0], [1.0, 0.0]], [[0.0, 1.0]]).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.region1_count(), 2);
        assert_eq!(set.vertices()[2].point(), Point::new(0.0, 1.0));
    }

    #[test]
    fn test_rejects_non_finite() {
        let result = PointSet::from_points([[0.0, 0.0], [f64::NAN, 1.0]]);
        assert_eq!(
            result,
            Err(PointSetError::NonFiniteCoordinate { index: 1 })
        );
    }

    #[test]
    fn test_rejects_reserved_and_repeated_indices() {
        let p = Point::new(0.0, 0.0);
        assert_eq!(
            PointSet::new(vec![Vertex::new(p, -2)], 0),
            Err(PointSetError::NegativeIndex { index: -2 })
        );
        assert_eq!(
            PointSet::new(vec![Vertex::new(p, 4), Vertex::new(Point::new(1.0, 0.0), 4)], 0),
            Err(PointSetError::DuplicateIndex { index: 4 })
        );
    }

    #[test]
    fn test_rejects_region_count_out_of_range() {
        let err = PointSet::new(vec![Vertex::new(Point::new(0.0, 0.0), 0)], 2).unwrap_err();
        assert_eq!(err, PointSetError::RegionCountOutOfRange { count: 2, len: 1 });
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_empty_set() {
        let set = PointSet::from_points(Vec::<[f64; 2]>::new()).unwrap();
        assert!(set.is_empty());
        assert!(set.bounding_box().is_none());
    }
}
