//! Retrieval documents derived from idiom records.

pub mod serializer;

pub use serializer::{DocumentMetadata, RetrievalDocument, SerializedCorpus};
