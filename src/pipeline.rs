//! Command-level orchestration of the idiom linking workflow.
//!
//! Each function runs one command end to end against a [`PipelineConfig`]:
//!
//! 1. [`parse_html`]: book → record store
//! 2. [`create_db`]: record store → vector index
//! 3. [`synonyms`]: record store + index → one-hop synonyms file
//! 4. [`refine`]: synonyms file → two-hop expansion → refined synonyms file
//! 5. [`link`]: book + synonyms file → linked copy of the book
//!
//! [`update_html`] chains 3 and 5. External capabilities (embedder, index,
//! ranker) are built by the caller and passed in. Failures are logged with
//! the operation name and the file involved before being returned.

use std::ffi::OsString;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::document::serializer::SerializedCorpus;
use crate::embedding::text_embedder::TextEmbedder;
use crate::error::Result;
use crate::idiom::extractor::RecordExtractor;
use crate::idiom::store::RecordStore;
use crate::link::injector::{LinkInjector, LinkStats};
use crate::synonym::expander::expand_two_hop;
use crate::synonym::map::SynonymMap;
use crate::synonym::ranker::Ranker;
use crate::synonym::refiner::{RefinementRequester, clear_checkpoint};
use crate::synonym::retriever::NeighborRetriever;
use crate::vector::flat::{FlatIndexOptions, FlatVectorIndex};
use crate::vector::index::VectorIndex;

/// Outcome of [`parse_html`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseSummary {
    pub source: PathBuf,
    pub record_store: PathBuf,
    pub records: usize,
}

/// Outcome of [`create_db`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSummary {
    pub collection: PathBuf,
    pub documents: usize,
    pub duration_ms: u64,
}

/// Outcome of [`synonyms`] and [`refine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynonymSummary {
    pub output: PathBuf,
    pub phrases: usize,
    pub duration_ms: u64,
}

/// Outcome of [`link`] and [`update_html`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSummary {
    pub output: PathBuf,
    #[serde(flatten)]
    pub stats: LinkStats,
}

/// Log a failed command step with its context and pass the error on.
fn logged<T>(operation: &str, path: impl Display, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        error!("{operation} failed ({path}): {e}");
    }
    result
}

/// Checkpoint file kept next to a refinement output: `<output>.partial`.
pub fn checkpoint_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

/// Index options derived from the pipeline configuration.
pub fn index_options(config: &PipelineConfig) -> FlatIndexOptions {
    FlatIndexOptions {
        metric: config.metric,
        batch_size: config.embedding.batch_size,
        retry: config.retry,
        timeout: config.request_timeout(),
    }
}

/// Open the collection built by [`create_db`].
pub fn open_index(
    config: &PipelineConfig,
    embedder: Arc<dyn TextEmbedder>,
) -> Result<FlatVectorIndex> {
    let path = config.collection_path();
    logged(
        "open index",
        path.display(),
        FlatVectorIndex::open_existing(&path, embedder, index_options(config)),
    )
}

/// Extract idiom records from the book into the record store.
pub fn parse_html(config: &PipelineConfig) -> Result<ParseSummary> {
    let source = &config.source_document;
    info!("Parsing idioms from {}", source.display());

    let records = logged(
        "parse-html",
        source.display(),
        RecordExtractor::new().and_then(|extractor| extractor.extract_file(source)),
    )?;

    let store = RecordStore::new(&config.record_store);
    logged("parse-html", store.path().display(), store.save(&records))?;

    Ok(ParseSummary {
        source: source.clone(),
        record_store: config.record_store.clone(),
        records: records.len(),
    })
}

/// Embed every stored record into the vector index.
pub async fn create_db(
    config: &PipelineConfig,
    embedder: Arc<dyn TextEmbedder>,
) -> Result<IndexSummary> {
    let start = Instant::now();
    let store = RecordStore::new(&config.record_store);
    let corpus = logged(
        "create-db",
        store.path().display(),
        SerializedCorpus::from_store(&store),
    )?;

    let path = config.collection_path();
    info!(
        "Indexing {} documents into {} with {}",
        corpus.len(),
        path.display(),
        embedder.name()
    );
    let mut index = logged(
        "create-db",
        path.display(),
        FlatVectorIndex::open(&path, embedder, index_options(config)),
    )?;
    logged(
        "create-db",
        path.display(),
        index
            .upsert(&corpus.texts(), &corpus.metadata, &corpus.ids())
            .await,
    )?;

    Ok(IndexSummary {
        collection: path,
        documents: index.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Retrieve the one-hop neighbors of every stored idiom.
pub async fn retrieve_synonyms(
    config: &PipelineConfig,
    index: &dyn VectorIndex,
) -> Result<SynonymMap> {
    let store = RecordStore::new(&config.record_store);
    let corpus = logged(
        "synonyms",
        store.path().display(),
        SerializedCorpus::from_store(&store),
    )?;

    let retriever = NeighborRetriever::new(index)
        .with_synonym_count(config.synonym_count)
        .with_self_exclusion(config.self_exclusion)
        .with_retry(config.retry, config.request_timeout())
        .with_concurrency(config.concurrency);

    logged(
        "synonyms",
        config.collection_path().display(),
        retriever.retrieve(&corpus).await,
    )
}

/// Retrieve one-hop neighbors and write them to the synonyms file.
pub async fn synonyms(config: &PipelineConfig, index: &dyn VectorIndex) -> Result<SynonymSummary> {
    let start = Instant::now();
    let map = retrieve_synonyms(config, index).await?;
    let output = &config.synonyms_file;
    logged("synonyms", output.display(), map.save(output))?;
    info!("Wrote synonyms for {} idioms to {}", map.len(), output.display());

    Ok(SynonymSummary {
        output: output.clone(),
        phrases: map.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Expand the synonyms file to two hops and refine it with `ranker`.
///
/// Progress is checkpointed next to the output file, so an interrupted run
/// resumes where it stopped. With `restart` an existing checkpoint is
/// discarded first.
pub async fn refine(
    config: &PipelineConfig,
    ranker: &dyn Ranker,
    restart: bool,
) -> Result<SynonymSummary> {
    let start = Instant::now();
    let input = &config.synonyms_file;
    let output = &config.refined_synonyms_file;
    let checkpoint = checkpoint_path(output);

    let one_hop = logged("refine", input.display(), SynonymMap::load(input))?;
    let two_hop = expand_two_hop(&one_hop);
    info!(
        "Refining {} phrases with {} (checkpoint {})",
        two_hop.len(),
        ranker.name(),
        checkpoint.display()
    );

    if restart {
        logged("refine", checkpoint.display(), clear_checkpoint(&checkpoint))?;
    }

    let requester = RefinementRequester::new(ranker)
        .with_retry(config.retry, config.request_timeout())
        .with_concurrency(config.concurrency);
    let refined = logged(
        "refine",
        checkpoint.display(),
        requester
            .refine_all(&two_hop, Some(checkpoint.as_path()))
            .await,
    )?;

    logged("refine", output.display(), refined.save(output))?;
    logged("refine", checkpoint.display(), clear_checkpoint(&checkpoint))?;
    info!("Wrote refined synonyms to {}", output.display());

    Ok(SynonymSummary {
        output: output.clone(),
        phrases: refined.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Write a linked copy of the book using the synonym map stored at `links`.
pub fn link(config: &PipelineConfig, links: &Path) -> Result<LinkSummary> {
    let map = logged("link", links.display(), SynonymMap::load(links))?;
    link_map(config, &map)
}

fn link_map(config: &PipelineConfig, map: &SynonymMap) -> Result<LinkSummary> {
    let source = &config.source_document;
    let output = &config.linked_document;
    info!(
        "Linking {} idioms from {} into {}",
        map.len(),
        source.display(),
        output.display()
    );

    let stats = logged(
        "link",
        source.display(),
        LinkInjector::new().inject_file(source, output, map),
    )?;

    Ok(LinkSummary {
        output: output.clone(),
        stats,
    })
}

/// Retrieve one-hop synonyms, save them and link them into the book.
pub async fn update_html(config: &PipelineConfig, index: &dyn VectorIndex) -> Result<LinkSummary> {
    let map = retrieve_synonyms(config, index).await?;
    let synonyms_file = &config.synonyms_file;
    logged("update-html", synonyms_file.display(), map.save(synonyms_file))?;
    link_map(config, &map)
}
