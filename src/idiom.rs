//! Idiom records: extraction from the book and the durable JSON store.

pub mod extractor;
pub mod record;
pub mod store;

pub use extractor::RecordExtractor;
pub use record::IdiomRecord;
pub use store::RecordStore;
