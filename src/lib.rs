//! # Idiolink
//!
//! Finds synonyms among the idioms of a phrase book and links them together.
//!
//! ## Pipeline
//!
//! - Extract idiom records (phrase, interpretation, examples) from the HTML book
//! - Serialize each record into a retrieval document
//! - Retrieve each idiom's nearest neighbors from a vector index
//! - Expand neighbors to two hops and refine them with a ranking model
//! - Insert "See also:" links into a copy of the book

pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod idiom;
pub mod link;
pub mod pipeline;
pub mod retry;
pub mod synonym;
pub mod util;
pub mod vector;

pub mod prelude {
    pub use crate::config::{ApiKey, PipelineConfig};
    pub use crate::document::SerializedCorpus;
    pub use crate::embedding::TextEmbedder;
    pub use crate::error::{IdiolinkError, Result};
    pub use crate::idiom::{IdiomRecord, RecordExtractor, RecordStore};
    pub use crate::link::LinkInjector;
    pub use crate::synonym::{
        NeighborRetriever, Ranker, RefinementRequester, SelfExclusion, SynonymMap,
        expand_two_hop,
    };
    pub use crate::vector::{FlatVectorIndex, VectorIndex};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
