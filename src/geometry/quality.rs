//! Shape quality measures for planar triangles.
//!
//! A triangle is acceptable when its smallest interior angle is at least a
//! configured minimum and its area does not exceed a configured maximum.
//! These are the two criteria driving Steiner point insertion in
//! [`refinement`](crate::core::algorithms::refinement).

use crate::geometry::{
    point::Point,
    predicates::{angle, area},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during quality metric computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QualityError {
    /// Two vertices coincide, so at least one interior angle is undefined.
    #[error("Degenerate triangle: {message}")]
    DegenerateTriangle {
        /// Description of the degeneracy
        message: String,
    },
}

/// The three interior angles of a triangle in radians, in vertex order.
///
/// # Errors
///
/// Returns [`QualityError::DegenerateTriangle`] if two vertices coincide.
///
/// # Examples
///
/// ```rust
/// use approx::assert_relative_eq;
/// use delaunay_refine::geometry::{point::Point, quality::triangle_angles};
///
/// let angles = triangle_angles([
///     Point::new(0.0, 0.0),
///     Point::new(1.0, 0.0),
///     Point::new(0.0, 1.0),
/// ])
/// .unwrap();
/// assert_relative_eq!(angles.iter().sum::<f64>(), std::f64::consts::PI);
/// ```
pub fn triangle_angles(points: [Point; 3]) -> Result<[f64; 3], QualityError> {
    let [a, b, c] = points;
    match (angle(a, b, c), angle(b, c, a), angle(c, a, b)) {
        (Some(alpha), Some(beta), Some(gamma)) => Ok([alpha, beta, gamma]),
        _ => Err(QualityError::DegenerateTriangle {
            message: format!("coincident vertices among {a}, {b}, {c}"),
        }),
    }
}

/// Smallest interior angle, or `None` for a triangle with coincident vertices.
#[must_use]
pub fn min_angle(points: [Point; 3]) -> Option<f64> {
    triangle_angles(points)
        .ok()
        .map(|angles| angles.into_iter().fold(f64::INFINITY, f64::min))
}

/// Quality thresholds a triangle must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityBounds {
    /// Minimum interior angle in radians.
    pub min_angle: f64,
    /// Maximum area.
    pub max_area: f64,
}

impl QualityBounds {
    /// Returns `true` if the triangle violates either bound.
    ///
    /// A triangle whose angles cannot be computed (coincident vertices) always
    /// needs refinement.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use delaunay_refine::geometry::{point::Point, quality::QualityBounds};
    ///
    /// let bounds = QualityBounds { min_angle: 20f64.to_radians(), max_area: 1.0 };
    /// let sliver = [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.5, 0.01)];
    /// assert!(bounds.needs_refinement(sliver));
    ///
    /// let good = [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.5, 0.8)];
    /// assert!(!bounds.needs_refinement(good));
    /// ```
    #[must_use]
    pub fn needs_refinement(&self, points: [Point; 3]) -> bool {
        let Some(smallest) = min_angle(points) else {
            return true;
        };
        let [a, b, c] = points;
        smallest < self.min_angle || area(a, b, c) > self.max_area
    }
}

// =============================================================================
// TESTS
// =============================================================================
