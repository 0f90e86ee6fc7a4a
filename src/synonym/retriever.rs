//! One-hop neighbor retrieval against the vector index.
//!
//! Every document is queried against an index that contains that same
//! document, asking for `K + 1` hits. The document's own entry is expected to
//! come back first and is removed, leaving `K` neighbors.

use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_SYNONYM_COUNT;
use crate::document::serializer::{SerializedCorpus, index_id};
use crate::error::{IdiolinkError, Result};
use crate::retry::RetryPolicy;
use crate::synonym::map::SynonymMap;
use crate::vector::index::{QueryHit, VectorIndex};

/// How a document's own match is removed from its query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfExclusion {
    /// Drop the first hit, assuming the document is its own nearest match.
    /// Ties or near-duplicate documents can break that assumption.
    #[default]
    DropFirst,
    /// Drop hits carrying the document's own index id.
    FilterById,
}

impl SelfExclusion {
    /// Apply the policy to the `K + 1` hits of the document at `position`.
    pub fn apply(&self, hits: Vec<QueryHit>, position: usize, k: usize) -> Vec<QueryHit> {
        match self {
            SelfExclusion::DropFirst => hits.into_iter().skip(1).take(k).collect(),
            SelfExclusion::FilterById => {
                let own_id = index_id(position);
                hits.into_iter()
                    .filter(|hit| hit.id != own_id)
                    .take(k)
                    .collect()
            }
        }
    }
}

/// Builds the one-hop [`SynonymMap`] for a serialized corpus.
pub struct NeighborRetriever<'a> {
    index: &'a dyn VectorIndex,
    synonym_count: usize,
    self_exclusion: SelfExclusion,
    retry: RetryPolicy,
    timeout: Duration,
    concurrency: usize,
}

impl<'a> NeighborRetriever<'a> {
    pub fn new(index: &'a dyn VectorIndex) -> Self {
        Self {
            index,
            synonym_count: DEFAULT_SYNONYM_COUNT,
            self_exclusion: SelfExclusion::default(),
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(60),
            concurrency: 1,
        }
    }

    pub fn with_synonym_count(mut self, synonym_count: usize) -> Self {
        self.synonym_count = synonym_count;
        self
    }

    pub fn with_self_exclusion(mut self, self_exclusion: SelfExclusion) -> Self {
        self.self_exclusion = self_exclusion;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy, timeout: Duration) -> Self {
        self.retry = retry;
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Query the neighbors of every document. The first failure aborts the
    /// whole pass.
    pub async fn retrieve(&self, corpus: &SerializedCorpus) -> Result<SynonymMap> {
        if corpus.is_empty() {
            warn!("No documents to retrieve neighbors for");
            return Ok(SynonymMap::new());
        }
        if self.index.is_empty() {
            return Err(IdiolinkError::retrieval(
                "the vector index is empty; run create-db first",
            ));
        }

        let entries: Vec<(String, Vec<String>)> = stream::iter(0..corpus.len())
            .map(|position| self.neighbors_of(corpus, position))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        info!("Retrieved neighbors for {} idioms", entries.len());
        Ok(entries.into_iter().collect())
    }

    /// The phrase at `position` and its `K` nearest neighbors.
    pub async fn neighbors_of(
        &self,
        corpus: &SerializedCorpus,
        position: usize,
    ) -> Result<(String, Vec<String>)> {
        let phrase = &corpus.metadata[position].phrase;
        let text = corpus.documents[position].text.as_str();
        let index = self.index;
        let top_k = self.synonym_count + 1;

        let hits = self
            .retry
            .run("vector query", self.timeout, move || index.query(text, top_k))
            .await
            .map_err(|e| match e {
                IdiolinkError::Retrieval(_) => e,
                other => IdiolinkError::retrieval(format!("query for {phrase:?} failed: {other}")),
            })?;

        if hits.is_empty() {
            return Err(IdiolinkError::retrieval(format!(
                "query for {phrase:?} returned no results"
            )));
        }
        if self.self_exclusion == SelfExclusion::DropFirst && hits[0].metadata.phrase != *phrase {
            debug!(
                "Nearest hit for {phrase:?} is {:?}, not itself; dropping it anyway",
                hits[0].metadata.phrase
            );
        }

        let neighbors = self
            .self_exclusion
            .apply(hits, position, self.synonym_count)
            .into_iter()
            .map(|hit| hit.metadata.phrase)
            .collect();

        Ok((phrase.clone(), neighbors))
    }
}
