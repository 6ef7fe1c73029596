//! Uniform hash grid over planar points.
//!
//! Points are bucketed by `floor(coord / cell_size)`. A query for points
//! within `radius` of a center visits only the cells that radius can reach,
//! or every bucket once that neighborhood has more cells than the grid has
//! points.
//!
//! The grid is ephemeral: refinement builds one per pass from the current
//! vertices and the points accepted so far in that pass.

use super::{FastHashMap, SmallBuffer, fast_hash_map_with_capacity};
use crate::geometry::point::Point;

const BUCKET_INLINE_CAPACITY: usize = 4;

type CellKey = (i64, i64);

/// Hash grid answering "is any stored point closer than `radius`?".
#[derive(Clone, Debug)]
pub(in crate::core) struct PointGrid {
    cell_size: f64,
    len: usize,
    cells: FastHashMap<CellKey, SmallBuffer<Point, BUCKET_INLINE_CAPACITY>>,
}

impl PointGrid {
    /// Creates an empty grid. A non-finite or non-positive `cell_size` is
    /// replaced by 1.
    pub(in crate::core) fn with_capacity(cell_size: f64, capacity: usize) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            1.0
        };
        Self {
            cell_size,
            len: 0,
            cells: fast_hash_map_with_capacity(capacity),
        }
    }

    pub(in crate::core) const fn len(&self) -> usize {
        self.len
    }

    // `as` saturates, so far-out coordinates share edge cells. Queries still
    // compare true distances, and saturation never separates two cells.
    #[allow(clippy::cast_possible_truncation)]
    fn cell_of(&self, p: Point) -> CellKey {
        (
            (p.x() / self.cell_size).floor() as i64,
            (p.y() / self.cell_size).floor() as i64,
        )
    }

    pub(in crate::core) fn insert(&mut self, p: Point) {
        let key = self.cell_of(p);
        self.cells.entry(key).or_default().push(p);
        self.len += 1;
    }

    /// `true` if a stored point lies strictly closer than `radius` to `center`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub(in crate::core) fn any_within(&self, center: Point, radius: f64) -> bool {
        if self.len == 0 || radius.is_nan() || radius <= 0.0 {
            return false;
        }
        let within = |p: &Point| p.distance(center) < radius;

        let reach = (radius / self.cell_size).ceil().max(1.0);
        let side = 2.0 * reach + 1.0;
        if !side.is_finite() || side * side > self.len as f64 {
            return self.cells.values().flatten().any(within);
        }

        let reach = reach as i64;
        let (cx, cy) = self.cell_of(center);
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                let key = (cx.saturating_add(dx), cy.saturating_add(dy));
                if self.cells.get(&key).is_some_and(|bucket| bucket.iter().any(within)) {
                    return true;
                }
            }
        }
        false
    }
}

// =============================================================================
// TESTS
// =============================================================================
