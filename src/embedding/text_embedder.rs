//! Text embedding trait for the retrieval stage.

use async_trait::async_trait;

use crate::error::Result;
use crate::vector::core::vector::Vector;

/// Trait for converting text to vector embeddings.
///
/// The vector index uses one embedder for both documents and queries, so a
/// document queried against an index containing itself lands at distance
/// (close to) zero.
///
/// # Custom implementation
///
/// ```
/// use async_trait::async_trait;
/// use idiolink::embedding::text_embedder::TextEmbedder;
/// use idiolink::error::Result;
/// use idiolink::vector::core::vector::Vector;
///
/// struct ConstantEmbedder;
///
/// #[async_trait]
/// impl TextEmbedder for ConstantEmbedder {
///     async fn embed(&self, _text: &str) -> Result<Vector> {
///         Ok(Vector::new(vec![1.0, 0.0]))
///     }
///
///     fn dimension(&self) -> usize {
///         2
///     }
/// }
/// ```
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Generate an embedding vector for the given text.
    async fn embed(&self, text: &str) -> Result<Vector>;

    /// Generate embeddings for multiple texts in batch.
    ///
    /// The default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vector>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Number of dimensions in the generated vectors.
    fn dimension(&self) -> usize;

    /// Name of the underlying model, for logging.
    fn name(&self) -> &str {
        "unknown"
    }
}
