//! The ranking capability used to refine synonym candidates.

use async_trait::async_trait;

use crate::error::Result;

/// A natural-language ranking request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingRequest {
    /// Role instructions for the model.
    pub system: String,
    /// The request itself, embedding the phrase and its candidates.
    pub prompt: String,
}

/// Anything that answers a [`RankingRequest`] with free-form text, such as a
/// chat model.
#[async_trait]
pub trait Ranker: Send + Sync {
    async fn rank(&self, request: &RankingRequest) -> Result<String>;

    /// Name of the underlying model, for logging.
    fn name(&self) -> &str {
        "unknown"
    }
}
