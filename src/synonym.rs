//! Synonym discovery: one-hop retrieval, two-hop expansion and refinement.

pub mod expander;
pub mod map;
pub mod openai_ranker;
pub mod ranker;
pub mod refiner;
pub mod retriever;

pub use expander::expand_two_hop;
pub use map::{RefinedSynonymMap, SynonymMap};
pub use openai_ranker::OpenAIRanker;
pub use ranker::{Ranker, RankingRequest};
pub use refiner::RefinementRequester;
pub use retriever::{NeighborRetriever, SelfExclusion};
