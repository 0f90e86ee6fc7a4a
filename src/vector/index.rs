//! The vector index capability used by the retrieval stage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::serializer::DocumentMetadata;
use crate::error::Result;

/// One ranked query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    /// Identifier the document was upserted under.
    pub id: String,
    pub metadata: DocumentMetadata,
    /// Distance to the query; lower is more similar.
    pub distance: f32,
}

/// A similarity index over text documents.
///
/// Implementations embed documents on upsert and the query text on query,
/// and return hits ordered from most to least similar.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace documents. The three slices are parallel.
    async fn upsert(
        &mut self,
        documents: &[String],
        metadatas: &[DocumentMetadata],
        ids: &[String],
    ) -> Result<()>;

    /// The `top_k` nearest documents to `text`.
    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<QueryHit>>;

    /// Number of documents in the index.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
