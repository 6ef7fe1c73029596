//! Numeric tolerances shared by every predicate and algorithm.
//!
//! All geometric decisions in this crate are plain floating-point evaluations
//! compared against fixed epsilons. The epsilons live here, in one
//! configuration value carried by the mesh, instead of being scattered as
//! literals.

use serde::{Deserialize, Serialize};

/// Areas, orientation magnitudes and denominators at or below this are degenerate.
pub const DEFAULT_DEGENERACY_EPSILON: f64 = 1e-10;

/// A point is strictly inside a circumcircle when the in-circle determinant exceeds this.
pub const DEFAULT_CIRCLE_EPSILON: f64 = 1e-10;

/// Minimum distance between a Steiner candidate and any existing vertex.
pub const DEFAULT_CLEARANCE: f64 = 1e-3;

/// Tolerance set used by a [`Mesh`](crate::core::mesh::Mesh) and the
/// algorithms operating on it.
///
/// # Examples
///
/// ```rust
/// use delaunay_refine::geometry::tolerances::Tolerances;
///
/// let tol = Tolerances::default();
/// assert_eq!(tol.degeneracy, 1e-10);
/// assert_eq!(tol.clearance, 1e-3);
///
/// let loose = Tolerances { degeneracy: 1e-8, ..Tolerances::default() };
/// assert!(loose.is_degenerate(5e-9));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Threshold for zero area, collinearity and parallel lines.
    pub degeneracy: f64,
    /// Threshold for the in-circle determinant.
    pub circle: f64,
    /// Minimum spacing enforced when accepting Steiner points.
    pub clearance: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            degeneracy: DEFAULT_DEGENERACY_EPSILON,
            circle: DEFAULT_CIRCLE_EPSILON,
            clearance: DEFAULT_CLEARANCE,
        }
    }
}

impl Tolerances {
    /// Returns `true` when `value` is within the degeneracy tolerance of zero.
    #[inline]
    #[must_use]
    pub fn is_degenerate(&self, value: f64) -> bool {
        value.abs() <= self.degeneracy
    }

    /// Returns `true` when every tolerance is finite and non-negative.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.degeneracy, self.circle, self.clearance]
            .iter()
            .all(|t| t.is_finite() && *t >= 0.0)
    }
}
