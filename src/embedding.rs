//! Text embedding support for the vector index.
//!
//! The pipeline only depends on the [`text_embedder::TextEmbedder`] trait.
//! [`openai_text_embedder::OpenAITextEmbedder`] talks to any OpenAI
//! compatible embeddings endpoint.

pub mod openai_text_embedder;
pub mod text_embedder;

pub use openai_text_embedder::OpenAITextEmbedder;
pub use text_embedder::TextEmbedder;
