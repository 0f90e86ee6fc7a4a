//! Vector similarity index used to find neighboring idioms.
//!
//! # Module Structure
//!
//! - `core`: vector representation and distance metrics
//! - `index`: the [`VectorIndex`] capability (upsert / query)
//! - `flat`: exact, file-backed implementation

pub mod core;
pub mod flat;
pub mod index;

pub use self::core::distance::DistanceMetric;
pub use self::core::vector::Vector;
pub use self::flat::{FlatIndexOptions, FlatVectorIndex};
pub use self::index::{QueryHit, VectorIndex};
