//! Configuration for the idiom linking pipeline.
//!
//! Every component receives its settings explicitly at construction time.
//! Credentials are resolved once by the caller and handed over as an opaque
//! [`ApiKey`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IdiolinkError, Result};
use crate::retry::RetryPolicy;
use crate::synonym::retriever::SelfExclusion;
use crate::vector::core::distance::DistanceMetric;

/// Number of synonyms retrieved per idiom.
pub const DEFAULT_SYNONYM_COUNT: usize = 6;

/// Opaque API credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(key: S) -> Result<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(IdiolinkError::invalid_config("API key is empty"));
        }
        Ok(Self(key))
    }

    /// The raw token, for building the authorization header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Settings for the text embedding service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model name.
    pub model: String,
    /// Base URL of an OpenAI compatible API.
    pub base_url: String,
    /// Requested output dimension. `None` keeps the model default.
    pub dimension: Option<usize>,
    /// Number of documents sent per embedding request.
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            dimension: None,
            batch_size: 64,
        }
    }
}

/// Settings for the synonym ranking model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Chat model name.
    pub model: String,
    /// Base URL of an OpenAI compatible API.
    pub base_url: String,
    /// Ask the model for a JSON-schema constrained answer.
    pub structured_output: bool,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            structured_output: false,
        }
    }
}

/// Configuration for a full pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// The idiom book to read.
    pub source_document: PathBuf,
    /// Durable store of extracted records.
    pub record_store: PathBuf,
    /// Directory holding the vector index.
    pub index_dir: PathBuf,
    /// Collection name inside the index directory.
    pub collection: String,
    /// Distance used to rank neighbors. An existing collection keeps the
    /// metric it was built with.
    pub metric: DistanceMetric,
    /// Where the linked copy of the book is written.
    pub linked_document: PathBuf,
    /// One-hop synonyms file.
    pub synonyms_file: PathBuf,
    /// Refined synonyms file.
    pub refined_synonyms_file: PathBuf,
    /// Neighbors kept per idiom (K).
    pub synonym_count: usize,
    /// How a document's own match is removed from its neighbors.
    pub self_exclusion: SelfExclusion,
    /// Phrases processed concurrently by retrieval and refinement.
    pub concurrency: usize,
    /// Per-request deadline in milliseconds.
    pub request_timeout_ms: u64,
    pub retry: RetryPolicy,
    pub embedding: EmbeddingConfig,
    pub ranking: RankingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_document: PathBuf::from("./Most_Common_American_Idioms.html"),
            record_store: PathBuf::from("./idioms.json"),
            index_dir: PathBuf::from("./idioms-db"),
            collection: "idioms".to_string(),
            metric: DistanceMetric::Cosine,
            linked_document: PathBuf::from("./Most_Common_American_Idioms_With_Synonyms.html"),
            synonyms_file: PathBuf::from("./synonyms.json"),
            refined_synonyms_file: PathBuf::from("./refined_synonyms.json"),
            synonym_count: DEFAULT_SYNONYM_COUNT,
            self_exclusion: SelfExclusion::default(),
            concurrency: 1,
            request_timeout_ms: 60_000,
            retry: RetryPolicy::default(),
            embedding: EmbeddingConfig::default(),
            ranking: RankingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration file. Missing keys take their default values.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| IdiolinkError::from_io(e, path))?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values that would otherwise fail deep inside a run.
    pub fn validate(&self) -> Result<()> {
        if self.synonym_count == 0 {
            return Err(IdiolinkError::invalid_config(
                "synonym_count must be at least 1",
            ));
        }
        if self.concurrency == 0 {
            return Err(IdiolinkError::invalid_config(
                "concurrency must be at least 1",
            ));
        }
        if self.collection.trim().is_empty() {
            return Err(IdiolinkError::invalid_config("collection name is empty"));
        }
        if self.embedding.batch_size == 0 {
            return Err(IdiolinkError::invalid_config(
                "embedding.batch_size must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// File backing the vector index collection.
    pub fn collection_path(&self) -> PathBuf {
        self.index_dir.join(format!("{}.json", self.collection))
    }
}
