//! Collection types used throughout the mesh data structures.
//!
//! - [`StorageMap`]: slot-map arena backend (feature-selected)
//! - [`FastHashMap`]/[`FastHashSet`]: `FxHasher`-based maps for internal keys
//! - [`SmallBuffer`]: stack-first small vectors for per-vertex/per-edge work
//! - [`RefinementQueue`]: the capacity-bounded refinement worklist
//! - `PointGrid`: hash grid for the refinement clearance checks

mod aliases;
mod bounded_queue;
mod point_grid;

pub use aliases::*;
pub use bounded_queue::*;
pub(in crate::core) use point_grid::PointGrid;
