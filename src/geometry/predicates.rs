//! Geometric predicates for planar triangulations.
//!
//! Every function here is pure and evaluated in plain `f64` arithmetic. The
//! raw determinant values are returned where callers need to compare against
//! a configurable tolerance (see [`Tolerances`](crate::geometry::tolerances::Tolerances));
//! the classification helpers ([`orientation_class`], [`in_circle`]) wrap the
//! comparison for the common cases.

#![forbid(unsafe_code)]

use crate::geometry::point::Point;
use std::fmt;

// =============================================================================
// CLASSIFICATION ENUMS
// =============================================================================

/// Position of a query point relative to a circumcircle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InCircle {
    /// The point is outside the circumcircle
    OUTSIDE,
    /// The point is on the circumcircle (within tolerance)
    BOUNDARY,
    /// The point is strictly inside the circumcircle
    INSIDE,
}

impl fmt::Display for InCircle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OUTSIDE => write!(f, "OUTSIDE"),
            Self::BOUNDARY => write!(f, "BOUNDARY"),
            Self::INSIDE => write!(f, "INSIDE"),
        }
    }
}

/// Turn direction of an ordered point triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Clockwise (determinant < 0)
    NEGATIVE,
    /// Collinear (determinant ≈ 0)
    DEGENERATE,
    /// Counter-clockwise (determinant > 0)
    POSITIVE,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NEGATIVE => write!(f, "NEGATIVE"),
            Self::DEGENERATE => write!(f, "DEGENERATE"),
            Self::POSITIVE => write!(f, "POSITIVE"),
        }
    }
}

// =============================================================================
// ORIENTATION AND AREA
// =============================================================================

/// Signed cross product `(p2 − p1) × (p3 − p1)`.
///
/// Positive for a counter-clockwise turn, negative for clockwise, zero for
/// collinear points. The magnitude is twice the triangle's area.
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::geometry::{point::Point, predicates::orientation};
///
/// let o = orientation(Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 1.0));
/// assert_eq!(o, 1.0);
/// ```
#[inline]
#[must_use]
pub fn orientation(p1: Point, p2: Point, p3: Point) -> f64 {
    (p2.x() - p1.x()) * (p3.y() - p1.y()) - (p2.y() - p1.y()) * (p3.x() - p1.x())
}

/// Classifies [`orientation`] against `epsilon`.
#[must_use]
pub fn orientation_class(p1: Point, p2: Point, p3: Point, epsilon: f64) -> Orientation {
    let det = orientation(p1, p2, p3);
    if det > epsilon {
        Orientation::POSITIVE
    } else if det < -epsilon {
        Orientation::NEGATIVE
    } else {
        Orientation::DEGENERATE
    }
}

/// Unsigned area of the triangle `(p1, p2, p3)`.
#[inline]
#[must_use]
pub fn area(p1: Point, p2: Point, p3: Point) -> f64 {
    orientation(p1, p2, p3).abs() / 2.0
}

// =============================================================================
// CIRCUMCIRCLE PREDICATES
// =============================================================================

/// In-circle determinant of `q` against the triangle `(p1, p2, p3)`.
///
/// Evaluates the 3×3 determinant whose rows are `(pᵢ − q, |pᵢ − q|²)`. For a
/// counter-clockwise triangle the result is positive when `q` lies strictly
/// inside the circumcircle, negative when outside and zero on the circle. The
/// sign flips for clockwise input; see [`in_circle`] for an
/// orientation-independent classification.
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::geometry::{point::Point, predicates::in_circumcircle};
///
/// let (a, b, c) = (Point::new(1.0, 0.0), Point::new(0.0, 1.0), Point::new(-1.0, 0.0));
/// assert!(in_circumcircle(a, b, c, Point::new(0.0, 0.0)) > 0.0);
/// assert!(in_circumcircle(a, b, c, Point::new(2.0, 2.0)) < 0.0);
/// ```
#[must_use]
pub fn in_circumcircle(p1: Point, p2: Point, p3: Point, q: Point) -> f64 {
    let (adx, ady) = (p1.x() - q.x(), p1.y() - q.y());
    let (bdx, bdy) = (p2.x() - q.x(), p2.y() - q.y());
    let (cdx, cdy) = (p3.x() - q.x(), p3.y() - q.y());

    let al = adx * adx + ady * ady;
    let bl = bdx * bdx + bdy * bdy;
    let cl = cdx * cdx + cdy * cdy;

    adx * (bdy * cl - bl * cdy) - ady * (bdx * cl - bl * cdx) + al * (bdx * cdy - bdy * cdx)
}

/// Classifies `q` against the circumcircle of `(p1, p2, p3)` in either winding.
///
/// Returns [`InCircle::BOUNDARY`] for a degenerate triangle, which has no
/// finite circumcircle.
#[must_use]
pub fn in_circle(p1: Point, p2: Point, p3: Point, q: Point, epsilon: f64) -> InCircle {
    let orient = orientation(p1, p2, p3);
    if orient == 0.0 {
        return InCircle::BOUNDARY;
    }
    let det = in_circumcircle(p1, p2, p3, q) * orient.signum();
    if det > epsilon {
        InCircle::INSIDE
    } else if det < -epsilon {
        InCircle::OUTSIDE
    } else {
        InCircle::BOUNDARY
    }
}

/// Center of the circle through `p1`, `p2` and `p3`.
///
/// Returns `None` when the doubled-area denominator is within `epsilon` of
/// zero, i.e. for collinear or coincident input.
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::geometry::{point::Point, predicates::circumcenter};
///
/// let c = circumcenter(Point::new(0.0, 0.0), Point::new(2.0, 0.0), Point::new(0.0, 2.0), 1e-10);
/// assert_eq!(c, Some(Point::new(1.0, 1.0)));
///
/// let collinear = circumcenter(Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(2.0, 0.0), 1e-10);
/// assert!(collinear.is_none());
/// ```
#[must_use]
pub fn circumcenter(p1: Point, p2: Point, p3: Point, epsilon: f64) -> Option<Point> {
    let (x1, y1) = (p1.x(), p1.y());
    let (x2, y2) = (p2.x(), p2.y());
    let (x3, y3) = (p3.x(), p3.y());

    let d = 2.0 * (x1 * (y2 - y3) + x2 * (y3 - y1) + x3 * (y1 - y2));
    if d.abs() < epsilon {
        return None;
    }

    let s1 = x1 * x1 + y1 * y1;
    let s2 = x2 * x2 + y2 * y2;
    let s3 = x3 * x3 + y3 * y3;

    let ux = (s1 * (y2 - y3) + s2 * (y3 - y1) + s3 * (y1 - y2)) / d;
    let uy = (s1 * (x3 - x2) + s2 * (x1 - x3) + s3 * (x2 - x1)) / d;
    Some(Point::new(ux, uy))
}

// =============================================================================
// CONTAINMENT AND ANGLES
// =============================================================================

/// Area-sum containment test.
///
/// `p` is inside (or on) the triangle when the three sub-triangle areas it
/// forms with the triangle's edges add up to the triangle's area within
/// `epsilon`.
#[must_use]
pub fn contains_point(triangle: [Point; 3], p: Point, epsilon: f64) -> bool {
    let [a, b, c] = triangle;
    let whole = area(a, b, c);
    let parts = area(p, b, c) + area(a, p, c) + area(a, b, p);
    (whole - parts).abs() < epsilon
}

/// Angle at `p1` between the rays toward `p2` and `p3`, in radians.
///
/// The cosine is clamped to `[-1, 1]` before the arc-cosine. Returns `None`
/// when either ray has zero length.
///
/// # Examples
///
/// ```rust
/// use approx::assert_relative_eq;
/// use delaunay_refine::geometry::{point::Point, predicates::angle};
///
/// let right = angle(Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 3.0)).unwrap();
/// assert_relative_eq!(right, std::f64::consts::FRAC_PI_2);
/// assert!(angle(Point::new(0.0, 0.0), Point::new(0.0, 0.0), Point::new(1.0, 1.0)).is_none());
/// ```
#[must_use]
pub fn angle(p1: Point, p2: Point, p3: Point) -> Option<f64> {
    let (dx1, dy1) = (p2.x() - p1.x(), p2.y() - p1.y());
    let (dx2, dy2) = (p3.x() - p1.x(), p3.y() - p1.y());

    let len1 = dx1.hypot(dy1);
    let len2 = dx2.hypot(dy2);
    if len1 == 0.0 || len2 == 0.0 {
        return None;
    }

    let cos = ((dx1 * dx2 + dy1 * dy2) / (len1 * len2)).clamp(-1.0, 1.0);
    Some(cos.acos())
}

// =============================================================================
// SEGMENTS AND POLYGONS
// =============================================================================

/// Intersection of two closed segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentIntersection {
    /// The intersection point.
    pub point: Point,
    /// Parameter along the first segment, in `[0, 1]`.
    pub t: f64,
    /// Parameter along the second segment, in `[0, 1]`.
    pub u: f64,
}

/// Intersects segment `p1 → p2` with segment `p3 → p4`.
///
/// Returns `None` for parallel (or nearly parallel, denominator within
/// `epsilon`) segments and for lines crossing outside either segment.
#[must_use]
pub fn segment_intersection(
    p1: Point,
    p2: Point,
    p3: Point,
    p4: Point,
    epsilon: f64,
) -> Option<SegmentIntersection> {
    let denom = (p4.y() - p3.y()) * (p2.x() - p1.x()) - (p4.x() - p3.x()) * (p2.y() - p1.y());
    if denom.abs() < epsilon {
        return None;
    }

    let t = ((p4.x() - p3.x()) * (p1.y() - p3.y()) - (p4.y() - p3.y()) * (p1.x() - p3.x())) / denom;
    let u = ((p2.x() - p1.x()) * (p1.y() - p3.y()) - (p2.y() - p1.y()) * (p1.x() - p3.x())) / denom;

    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(SegmentIntersection {
            point: p1.lerp(p2, t),
            t,
            u,
        })
    } else {
        None
    }
}

/// Even-odd ray-crossing test of `p` against an unordered set of edges.
///
/// A horizontal ray is cast from `p` toward `+x`; `p` is inside when it
/// crosses an odd number of edges. Edges need not form a single closed loop.
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::geometry::{point::Point, predicates::point_in_polygon};
///
/// let square = [
///     (Point::new(0.0, 0.0), Point::new(1.0, 0.0)),
///     (Point::new(1.0, 0.0), Point::new(1.0, 1.0)),
///     (Point::new(1.0, 1.0), Point::new(0.0, 1.0)),
///     (Point::new(0.0, 1.0), Point::new(0.0, 0.0)),
/// ];
/// assert!(point_in_polygon(Point::new(0.5, 0.5), square));
/// assert!(!point_in_polygon(Point::new(1.5, 0.5), square));
/// ```
pub fn point_in_polygon<I>(p: Point, edges: I) -> bool
where
    I: IntoIterator<Item = (Point, Point)>,
{
    let mut inside = false;
    for (a, b) in edges {
        if (a.y() > p.y()) != (b.y() > p.y()) {
            let x_cross = (b.x() - a.x()) * (p.y() - a.y()) / (b.y() - a.y()) + a.x();
            if p.x() < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

// =============================================================================
// TESTS
// =============================================================================
