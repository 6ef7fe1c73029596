//! # delaunay-refine
//!
//! Planar Delaunay triangulation of a point set, with forced constraint
//! segments and quality refinement by circumcenter insertion.
//!
//! # Features
//!
//! - Incremental insertion into an enclosing triangle with local edge flips
//! - Divide-and-conquer construction with two merge strategies
//! - Constraint segments forced into the mesh, splitting crossed edges with
//!   Steiner points
//! - Quality refinement toward a minimum angle and a maximum area
//! - Slot-map storage with stable vertex and triangle keys
//! - Serialization/Deserialization with [serde](https://serde.rs)
//!
//! # Basic Usage
//!
//! ```rust
//! use delaunay_refine::prelude::*;
//!
//! let points = PointSet::from_points([
//!     [0.0, 0.0],
//!     [1.0, 0.0],
//!     [1.0, 1.0],
//!     [0.0, 1.0],
//! ])
//! .unwrap();
//!
//! let tri = Triangulation::new(&points).unwrap();
//! assert_eq!(tri.mesh().number_of_vertices(), 4);
//! assert_eq!(tri.mesh().number_of_triangles(), 2);
//! assert!(tri.is_valid().is_ok());
//! ```
//!
//! # Constraints and Refinement
//!
//! ```rust
//! use delaunay_refine::prelude::*;
//!
//! let points = PointSet::from_points([
//!     [0.0, 0.0],
//!     [4.0, 0.0],
//!     [4.0, 3.0],
//!     [0.0, 3.0],
//! ])
//! .unwrap();
//!
//! let params = RefinementParametersBuilder::default()
//!     .max_area(1.0)
//!     .build()
//!     .unwrap();
//! let tri = TriangulationBuilder::new(&points)
//!     .segments([
//!         Segment::new(0, 1),
//!         Segment::new(1, 2),
//!         Segment::new(2, 3),
//!         Segment::new(3, 0),
//!     ])
//!     .refine(params)
//!     .build()
//!     .unwrap();
//!
//! assert!(tri.mesh().number_of_vertices() > 4);
//! for points in tri.mesh().real_triangles().map(|(key, _)| tri.mesh().triangle_points(key)) {
//!     let points = points.unwrap();
//!     assert!(area(points[0], points[1], points[2]) > 0.0);
//! }
//! ```
//!
//! # Triangulation Invariants
//!
//! After construction with [`Construction::IncrementalFlip`]:
//!
//! - every triangle is counter-clockwise with positive area;
//! - neighbor links are symmetric and agree on the shared edge;
//! - no vertex lies strictly inside the circumcircle of a triangle, up to the
//!   circle tolerance;
//! - triangles, vertices and hull edges satisfy Euler's formula.
//!
//! Constraint insertion keeps the first two and gives up the empty-circle
//! property along restricted edges. Refinement rebuilds the mesh from its
//! vertices on every pass, so restricted flags do not survive it.

// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// The `core` module contains the mesh, its vertices, triangles and edges, and
/// the algorithms that build and edit it.
pub mod core {
    /// Construction, flipping, constraint insertion and refinement
    pub mod algorithms {
        /// Forcing segments into the mesh
        pub mod constrained_insertion;
        /// Construction strategy selection
        pub mod construction;
        pub mod divide_and_conquer;
        /// Lawson edge flips around a vertex
        pub mod flips;
        /// Incremental insertion into an enclosing triangle
        pub mod incremental_insertion;
        /// Point location (neighbor walk)
        pub mod locate;
        /// Quality refinement by circumcenter insertion
        pub mod refinement;
    }
    pub mod builder;
    /// Collection aliases and the bounded refinement queue
    pub mod collections;
    pub mod edge;
    pub mod mesh;
    pub mod triangle;
    pub mod triangulation;
    pub mod vertex;
    // Re-export the `core` modules.
    pub use builder::*;
    pub use edge::*;
    pub use mesh::*;
    pub use triangle::*;
    pub use triangulation::*;
    pub use vertex::*;
    // Note: collections module not re-exported here to avoid namespace pollution
}

/// Points, predicates, tolerances and quality measures.
pub mod geometry {
    pub mod point;
    pub mod predicates;
    /// Triangle quality measures
    pub mod quality;
    pub mod tolerances;
    pub use point::*;
    pub use predicates::*;
    pub use quality::*;
    pub use tolerances::*;
}

/// A prelude module that re-exports commonly used types.
/// This makes it easier to import the most commonly used items from the crate.
pub mod prelude {
    // Re-export from core
    pub use crate::core::{
        algorithms::{
            constrained_insertion::{ConstraintError, ConstraintInserter, ConstraintReport},
            construction::{BuildStats, Construction, ConstructionError},
            divide_and_conquer::{DivideAndConquer, MergeStrategy},
            flips::{FlipError, FlipStats, LocalFlipOptimizer},
            locate::{LocateError, LocateResult, locate},
            refinement::{
                QualityRefiner, RefinementError, RefinementParameters,
                RefinementParametersBuilder, RefinementReport,
            },
        },
        builder::*,
        edge::*,
        mesh::*,
        triangle::*,
        triangulation::*,
        vertex::*,
    };

    // Re-export commonly used collection types from core::collections
    pub use crate::core::collections::{
        FastHashMap, FastHashSet, SmallBuffer, fast_hash_map_with_capacity,
        fast_hash_set_with_capacity,
    };

    // Re-export from geometry
    pub use crate::geometry::{point::*, predicates::*, quality::*, tolerances::*};
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{
        core::{mesh::Mesh, triangulation::Triangulation, vertex::PointSet},
        geometry::Point,
        is_normal,
    };

    #[test]
    fn normal_types() {
        assert!(is_normal::<Point>());
        assert!(is_normal::<PointSet>());
        assert!(is_normal::<Mesh>());
        assert!(is_normal::<Triangulation>());
    }

    #[test]
    fn test_prelude_collections_exports() {
        use crate::prelude::*;

        let mut map: FastHashMap<u64, usize> = FastHashMap::default();
        map.insert(123, 456);
        assert_eq!(map.get(&123), Some(&456));

        let mut set: FastHashSet<u64> = FastHashSet::default();
        set.insert(789);
        assert!(set.contains(&789));

        let mut buffer: SmallBuffer<i32, 8> = SmallBuffer::new();
        buffer.push(42);
        assert_eq!(buffer.len(), 1);

        let map_with_cap = fast_hash_map_with_capacity::<u64, usize>(100);
        assert!(map_with_cap.capacity() >= 100);

        let set_with_cap = fast_hash_set_with_capacity::<u64>(50);
        assert!(set_with_cap.capacity() >= 50);
    }

    #[test]
    fn test_prelude_quality_exports() {
        use crate::prelude::*;

        let points = PointSet::from_points([[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]).unwrap();
        let tri = Triangulation::new(&points).unwrap();
        let (key, _) = tri.mesh().real_triangles().next().unwrap();
        let corners = tri.mesh().triangle_points(key).unwrap();

        let angles = triangle_angles(corners).unwrap();
        let total: f64 = angles.iter().sum();
        assert!((total - std::f64::consts::PI).abs() < 1e-12);
        assert!(min_angle(corners).unwrap() > 0.0);
    }
}
