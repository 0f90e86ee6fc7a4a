//! Cross-reference links between idioms in the book.

pub mod injector;

pub use injector::{LinkInjector, LinkStats, LinkedDocument};
