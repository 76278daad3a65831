//! Vector storage and nearest-neighbor search.
//!
//! # Module Structure
//!
//! - `core`: Core data structures (distance metrics, dense embedding matrices)
//! - `index`: Index structures behind the [`index::NeighborIndex`] trait
//!   (exact flat scan, approximate random-projection forest)

pub mod core;
pub mod index;

pub use self::core::distance::DistanceMetric;
pub use self::core::embedding::Embeddings;
pub use self::index::{Neighbor, NeighborIndex};
