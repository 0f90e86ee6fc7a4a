//! Persistent flat (exact) vector index.
//!
//! Every document is embedded on upsert and stored with its metadata in a
//! single JSON collection file. Queries embed the query text and rank all
//! stored vectors by distance. Equal distances keep insertion order, so
//! results are deterministic for a given collection.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::document::serializer::DocumentMetadata;
use crate::embedding::text_embedder::TextEmbedder;
use crate::error::{IdiolinkError, Result};
use crate::retry::RetryPolicy;
use crate::util::write_json_pretty;
use crate::vector::core::distance::DistanceMetric;
use crate::vector::core::vector::Vector;
use crate::vector::index::{QueryHit, VectorIndex};

/// Options for opening a [`FlatVectorIndex`].
#[derive(Debug, Clone)]
pub struct FlatIndexOptions {
    pub metric: DistanceMetric,
    /// Documents embedded per request.
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub timeout: Duration,
}

impl Default for FlatIndexOptions {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::Cosine,
            batch_size: 64,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    id: String,
    document: String,
    metadata: DocumentMetadata,
    vector: Vector,
}

#[derive(Debug, Serialize, Deserialize)]
struct CollectionFile {
    model: String,
    metric: DistanceMetric,
    updated_at: DateTime<Utc>,
    entries: Vec<StoredEntry>,
}

/// Exact nearest-neighbor index persisted to a JSON collection file.
pub struct FlatVectorIndex {
    path: PathBuf,
    embedder: Arc<dyn TextEmbedder>,
    options: FlatIndexOptions,
    entries: Vec<StoredEntry>,
    positions: HashMap<String, usize>,
}

impl FlatVectorIndex {
    /// Open the collection at `path`, creating an empty one if it does not
    /// exist yet. A collection built with a different model or metric is
    /// rejected.
    pub fn open<P: Into<PathBuf>>(
        path: P,
        embedder: Arc<dyn TextEmbedder>,
        options: FlatIndexOptions,
    ) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => {
                let collection: CollectionFile = serde_json::from_str(&content)?;
                if collection.model != embedder.name() || collection.metric != options.metric {
                    return Err(IdiolinkError::invalid_config(format!(
                        "collection {} was built with {} / {}, not {} / {}",
                        path.display(),
                        collection.model,
                        collection.metric.name(),
                        embedder.name(),
                        options.metric.name()
                    )));
                }
                debug!(
                    "Loaded {} entries from {}",
                    collection.entries.len(),
                    path.display()
                );
                collection.entries
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let positions = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.id.clone(), position))
            .collect();

        Ok(Self {
            path,
            embedder,
            options,
            entries,
            positions,
        })
    }

    /// Open an existing collection. A missing file is
    /// [`IdiolinkError::NotFound`].
    pub fn open_existing<P: Into<PathBuf>>(
        path: P,
        embedder: Arc<dyn TextEmbedder>,
        options: FlatIndexOptions,
    ) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(IdiolinkError::not_found(path));
        }
        Self::open(path, embedder, options)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        let collection = CollectionFile {
            model: self.embedder.name().to_string(),
            metric: self.options.metric,
            updated_at: Utc::now(),
            entries: self.entries.clone(),
        };
        write_json_pretty(&self.path, &collection)
    }

    async fn embed_with_retry(&self, texts: &[&str]) -> Result<Vec<Vector>> {
        let embedder: &dyn TextEmbedder = self.embedder.as_ref();
        self.options
            .retry
            .run("embedding request", self.options.timeout, move || {
                embedder.embed_batch(texts)
            })
            .await
    }
}

#[async_trait]
impl VectorIndex for FlatVectorIndex {
    async fn upsert(
        &mut self,
        documents: &[String],
        metadatas: &[DocumentMetadata],
        ids: &[String],
    ) -> Result<()> {
        if documents.len() != metadatas.len() || documents.len() != ids.len() {
            return Err(IdiolinkError::other(format!(
                "upsert needs parallel inputs: {} documents, {} metadatas, {} ids",
                documents.len(),
                metadatas.len(),
                ids.len()
            )));
        }

        let start = Instant::now();
        let batch_size = self.options.batch_size.max(1);
        for (batch, offset) in (0..documents.len()).step_by(batch_size).enumerate() {
            let end = (offset + batch_size).min(documents.len());
            let texts: Vec<&str> = documents[offset..end].iter().map(String::as_str).collect();
            let vectors = self.embed_with_retry(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(IdiolinkError::embedding(format!(
                    "embedder returned {} vectors for {} documents",
                    vectors.len(),
                    texts.len()
                )));
            }

            let dimension = self.embedder.dimension();
            for vector in &vectors {
                vector.validate_dimension(dimension)?;
                if !vector.is_valid() {
                    return Err(IdiolinkError::embedding(
                        "embedder returned a vector with NaN or infinite values",
                    ));
                }
            }

            for (i, vector) in (offset..end).zip(vectors) {
                let entry = StoredEntry {
                    id: ids[i].clone(),
                    document: documents[i].clone(),
                    metadata: metadatas[i].clone(),
                    vector,
                };
                match self.positions.get(&entry.id) {
                    Some(&position) => self.entries[position] = entry,
                    None => {
                        self.positions.insert(entry.id.clone(), self.entries.len());
                        self.entries.push(entry);
                    }
                }
            }

            self.persist()?;
            debug!("Upserted batch {} ({} of {})", batch + 1, end, documents.len());
        }

        info!(
            "Upserted {} documents into {} in {:.1}s",
            documents.len(),
            self.path.display(),
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    async fn query(&self, text: &str, top_k: usize) -> Result<Vec<QueryHit>> {
        if self.entries.is_empty() {
            return Err(IdiolinkError::retrieval(format!(
                "collection {} is empty",
                self.path.display()
            )));
        }

        let query = self
            .embed_with_retry(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| IdiolinkError::embedding("no vector returned for query"))?;

        let stored: Vec<&[f32]> = self
            .entries
            .iter()
            .map(|entry| entry.vector.data.as_slice())
            .collect();
        let distances = self
            .options
            .metric
            .batch_distance_parallel(&query.data, &stored)?;

        let mut ranked: Vec<(usize, f32)> = distances.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        Ok(ranked
            .into_iter()
            .take(top_k)
            .map(|(position, distance)| {
                let entry = &self.entries[position];
                QueryHit {
                    id: entry.id.clone(),
                    metadata: entry.metadata.clone(),
                    distance,
                }
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Embeds text by counting a few marker words.
    struct KeywordEmbedder;

    #[async_trait]
    impl TextEmbedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vector> {
            let count = |word: &str| text.matches(word).count() as f32;
            Ok(Vector::new(vec![count("die"), count("luck"), count("sleep")]))
        }

        fn dimension(&self) -> usize {
            3
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    fn metadata(phrase: &str, id: usize) -> DocumentMetadata {
        DocumentMetadata {
            phrase: phrase.to_string(),
            id: id.to_string(),
        }
    }

    async fn sample_index(path: &Path) -> FlatVectorIndex {
        let mut index =
            FlatVectorIndex::open(path, Arc::new(KeywordEmbedder), FlatIndexOptions::default())
                .unwrap();
        index
            .upsert(
                &[
                    "kick the bucket. to die".to_string(),
                    "break a leg. good luck".to_string(),
                    "pass away. to die die".to_string(),
                ],
                &[
                    metadata("kick the bucket", 1),
                    metadata("break a leg", 2),
                    metadata("pass away", 3),
                ],
                &["id0".to_string(), "id1".to_string(), "id2".to_string()],
            )
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn test_query_ranks_by_distance() {
        let temp_dir = TempDir::new().unwrap();
        let index = sample_index(&temp_dir.path().join("idioms.json")).await;

        let hits = index.query("to die", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        // Both "die" documents are at cosine distance 0; insertion order wins.
        assert_eq!(hits[0].metadata.phrase, "kick the bucket");
        assert_eq!(hits[1].metadata.phrase, "pass away");
        assert_eq!(hits[2].metadata.phrase, "break a leg");
        assert!(hits[0].distance <= hits[2].distance);
    }

    #[tokio::test]
    async fn test_collection_is_persisted() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db").join("idioms.json");
        sample_index(&path).await;

        let reopened = FlatVectorIndex::open_existing(
            &path,
            Arc::new(KeywordEmbedder),
            FlatIndexOptions::default(),
        )
        .unwrap();
        assert_eq!(reopened.len(), 3);
        let hits = reopened.query("good luck", 1).await.unwrap();
        assert_eq!(hits[0].id, "id1");
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let temp_dir = TempDir::new().unwrap();
        let mut index = sample_index(&temp_dir.path().join("idioms.json")).await;

        index
            .upsert(
                &["break a leg. sleep".to_string()],
                &[metadata("break a leg", 2)],
                &["id1".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(index.len(), 3);
        let hits = index.query("sleep", 1).await.unwrap();
        assert_eq!(hits[0].id, "id1");
    }

    #[tokio::test]
    async fn test_empty_index_query_fails() {
        let temp_dir = TempDir::new().unwrap();
        let index = FlatVectorIndex::open(
            temp_dir.path().join("idioms.json"),
            Arc::new(KeywordEmbedder),
            FlatIndexOptions::default(),
        )
        .unwrap();

        assert!(index.is_empty());
        assert!(matches!(
            index.query("anything", 3).await,
            Err(IdiolinkError::Retrieval(_))
        ));
    }

    #[tokio::test]
    async fn test_mismatched_inputs_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut index = FlatVectorIndex::open(
            temp_dir.path().join("idioms.json"),
            Arc::new(KeywordEmbedder),
            FlatIndexOptions::default(),
        )
        .unwrap();

        let result = index
            .upsert(&["a".to_string()], &[], &["id0".to_string()])
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_open_existing_missing() {
        let temp_dir = TempDir::new().unwrap();
        let result = FlatVectorIndex::open_existing(
            temp_dir.path().join("idioms.json"),
            Arc::new(KeywordEmbedder),
            FlatIndexOptions::default(),
        );
        assert!(matches!(result, Err(IdiolinkError::NotFound(_))));
    }
}
