//! Core data structures for vector search.

pub mod distance;
pub mod vector;
