//! Planar points and axis-aligned bounding boxes.
//!
//! Coordinates are plain `f64`. Equality is the IEEE 754 one; use
//! [`Point::is_finite`] to reject `NaN`/`∞` input before it reaches the
//! predicates.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// POINT
// =============================================================================

/// A point in the plane.
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::geometry::point::Point;
///
/// let p = Point::new(3.0, 4.0);
/// assert_eq!(p.x(), 3.0);
/// assert_eq!(p.distance(Point::new(0.0, 0.0)), 5.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    /// Creates a point from its coordinates.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The x coordinate.
    #[inline]
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// The y coordinate.
    #[inline]
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Both coordinates as an array.
    #[inline]
    #[must_use]
    pub const fn coords(&self) -> [f64; 2] {
        [self.x, self.y]
    }

    /// Returns `true` when neither coordinate is `NaN` or infinite.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Squared Euclidean distance to `other`.
    #[inline]
    #[must_use]
    pub fn distance_squared(&self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to `other`.
    #[inline]
    #[must_use]
    pub fn distance(&self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Point reached by moving from `self` toward `other` by the fraction `t`.
    #[inline]
    #[must_use]
    pub fn lerp(&self, other: Self, t: f64) -> Self {
        Self::new(
            (other.x - self.x).mul_add(t, self.x),
            (other.y - self.y).mul_add(t, self.y),
        )
    }
}

impl From<[f64; 2]> for Point {
    fn from(coords: [f64; 2]) -> Self {
        Self::new(coords[0], coords[1])
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        p.coords()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// =============================================================================
// BOUNDING BOX
// =============================================================================

/// Axis-aligned bounding box of a point cloud.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    min: Point,
    max: Point,
}

impl BoundingBox {
    /// Smallest box containing every point, or `None` for an empty input.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use delaunay_refine::geometry::point::{BoundingBox, Point};
    ///
    /// let bbox = BoundingBox::from_points([Point::new(0.0, 1.0), Point::new(2.0, -1.0)]).unwrap();
    /// assert_eq!(bbox.width(), 2.0);
    /// assert_eq!(bbox.height(), 2.0);
    /// assert_eq!(bbox.center(), Point::new(1.0, 0.0));
    /// ```
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min, mut max) = (first, first);
        for p in iter {
            min = Point::new(min.x.min(p.x), min.y.min(p.y));
            max = Point::new(max.x.max(p.x), max.y.max(p.y));
        }
        Some(Self { min, max })
    }

    /// Lower-left corner.
    #[must_use]
    pub const fn min(&self) -> Point {
        self.min
    }

    /// Upper-right corner.
    #[must_use]
    pub const fn max(&self) -> Point {
        self.max
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// The larger of width and height.
    #[must_use]
    pub fn max_extent(&self) -> f64 {
        self.width().max(self.height())
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

// =============================================================================
// TESTS
// =============================================================================
