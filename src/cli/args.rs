//! Command line argument parsing for the idiolink CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::synonym::retriever::SelfExclusion;
use crate::vector::core::distance::DistanceMetric;

/// Idiolink - cross-link the idioms of a phrase book with their synonyms
#[derive(Parser, Debug, Clone)]
#[command(name = "idiolink")]
#[command(about = "Find idiom synonyms by vector similarity and link them into the book")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct IdiolinkArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Pipeline configuration file (JSON); flags override its values
    #[arg(short, long, value_name = "CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl IdiolinkArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Extract idiom records from the HTML book
    #[command(name = "parse-html")]
    ParseHtml(ParseHtmlArgs),

    /// Embed the extracted records into the vector index
    #[command(name = "create-db")]
    CreateDb(CreateDbArgs),

    /// Retrieve one-hop synonyms for every idiom
    Synonyms(SynonymsArgs),

    /// Expand synonyms to two hops and refine them with a chat model
    Refine(RefineArgs),

    /// Insert "See also" links from a synonyms file into a copy of the book
    Link(LinkArgs),

    /// Retrieve synonyms and link them into a copy of the book
    #[command(name = "update-html")]
    UpdateHtml(UpdateHtmlArgs),
}

impl Command {
    /// The command name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ParseHtml(_) => "parse-html",
            Command::CreateDb(_) => "create-db",
            Command::Synonyms(_) => "synonyms",
            Command::Refine(_) => "refine",
            Command::Link(_) => "link",
            Command::UpdateHtml(_) => "update-html",
        }
    }

    /// Whether the command talks to the OpenAI API.
    pub fn needs_api_key(&self) -> bool {
        !matches!(self, Command::ParseHtml(_) | Command::Link(_))
    }

    /// Apply the command's flags on top of `config`.
    pub fn apply(&self, config: &mut PipelineConfig) {
        match self {
            Command::ParseHtml(args) => {
                args.source.apply(config);
                args.store.apply(config);
            }
            Command::CreateDb(args) => {
                args.store.apply(config);
                args.index.apply(config);
            }
            Command::Synonyms(args) => {
                args.store.apply(config);
                args.index.apply(config);
                args.retrieval.apply(config);
                if let Some(output) = &args.output {
                    config.synonyms_file = output.clone();
                }
            }
            Command::Refine(args) => {
                if let Some(input) = &args.input {
                    config.synonyms_file = input.clone();
                }
                if let Some(output) = &args.output {
                    config.refined_synonyms_file = output.clone();
                }
                if let Some(model) = &args.model {
                    config.ranking.model = model.clone();
                }
                if args.structured_output {
                    config.ranking.structured_output = true;
                }
                if let Some(concurrency) = args.concurrency {
                    config.concurrency = concurrency;
                }
            }
            Command::Link(args) => {
                args.source.apply(config);
                if let Some(output) = &args.output {
                    config.linked_document = output.clone();
                }
            }
            Command::UpdateHtml(args) => {
                args.source.apply(config);
                args.store.apply(config);
                args.index.apply(config);
                args.retrieval.apply(config);
                if let Some(output) = &args.output {
                    config.linked_document = output.clone();
                }
            }
        }
    }
}

/// Location of the HTML book
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Path to the idiom book (HTML)
    #[arg(short, long, value_name = "HTML_FILE")]
    pub source: Option<PathBuf>,
}

impl SourceArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(source) = &self.source {
            config.source_document = source.clone();
        }
    }
}

/// Location of the record store
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Path to the extracted records (JSON)
    #[arg(long, value_name = "JSON_FILE")]
    pub store: Option<PathBuf>,
}

impl StoreArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(store) = &self.store {
            config.record_store = store.clone();
        }
    }
}

/// Vector index location and embedding model
#[derive(Args, Debug, Clone, Default)]
pub struct IndexArgs {
    /// Directory holding the vector index
    #[arg(long, value_name = "DIR")]
    pub index_dir: Option<PathBuf>,

    /// Collection name inside the index directory
    #[arg(long)]
    pub collection: Option<String>,

    /// Embedding model
    #[arg(long)]
    pub embedding_model: Option<String>,

    /// Distance used to rank neighbors
    #[arg(long, value_enum)]
    pub metric: Option<MetricMode>,
}

impl IndexArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(index_dir) = &self.index_dir {
            config.index_dir = index_dir.clone();
        }
        if let Some(collection) = &self.collection {
            config.collection = collection.clone();
        }
        if let Some(model) = &self.embedding_model {
            config.embedding.model = model.clone();
        }
        if let Some(metric) = self.metric {
            config.metric = metric.into();
        }
    }
}

/// Neighbor retrieval settings
#[derive(Args, Debug, Clone, Default)]
pub struct RetrievalArgs {
    /// Number of synonyms kept per idiom
    #[arg(short = 'k', long)]
    pub count: Option<usize>,

    /// How an idiom's own match is removed from its neighbors
    #[arg(long, value_enum)]
    pub self_exclusion: Option<SelfExclusionMode>,

    /// Idioms queried concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,
}

impl RetrievalArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(count) = self.count {
            config.synonym_count = count;
        }
        if let Some(mode) = self.self_exclusion {
            config.self_exclusion = mode.into();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
    }
}

/// Arguments for extracting records
#[derive(Parser, Debug, Clone)]
pub struct ParseHtmlArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Arguments for building the vector index
#[derive(Parser, Debug, Clone)]
pub struct CreateDbArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub index: IndexArgs,
}

/// Arguments for one-hop retrieval
#[derive(Parser, Debug, Clone)]
pub struct SynonymsArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub index: IndexArgs,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,

    /// Where to write the synonyms (JSON)
    #[arg(short, long, value_name = "JSON_FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for refinement
#[derive(Parser, Debug, Clone)]
pub struct RefineArgs {
    /// One-hop synonyms to expand (JSON)
    #[arg(short, long, value_name = "JSON_FILE")]
    pub input: Option<PathBuf>,

    /// Where to write the refined synonyms (JSON)
    #[arg(short, long, value_name = "JSON_FILE")]
    pub output: Option<PathBuf>,

    /// Chat model used for ranking
    #[arg(short, long)]
    pub model: Option<String>,

    /// Request a JSON-schema constrained answer
    #[arg(long)]
    pub structured_output: bool,

    /// Phrases refined concurrently
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Discard a checkpoint left by an interrupted run
    #[arg(long)]
    pub restart: bool,
}

/// Arguments for link injection
#[derive(Parser, Debug, Clone)]
pub struct LinkArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Synonyms to link (JSON); defaults to the refined synonyms file
    #[arg(long, value_name = "JSON_FILE")]
    pub synonyms: Option<PathBuf>,

    /// Link the one-hop synonyms file instead of the refined one
    #[arg(long, conflicts_with = "synonyms")]
    pub one_hop: bool,

    /// Where to write the linked book (HTML)
    #[arg(short, long, value_name = "HTML_FILE")]
    pub output: Option<PathBuf>,
}

impl LinkArgs {
    /// The synonyms file to link, given the effective configuration.
    pub fn synonyms_path(&self, config: &PipelineConfig) -> PathBuf {
        match (&self.synonyms, self.one_hop) {
            (Some(path), _) => path.clone(),
            (None, true) => config.synonyms_file.clone(),
            (None, false) => config.refined_synonyms_file.clone(),
        }
    }
}

/// Arguments for the retrieve-and-link workflow
#[derive(Parser, Debug, Clone)]
pub struct UpdateHtmlArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub index: IndexArgs,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,

    /// Where to write the linked book (HTML)
    #[arg(short, long, value_name = "HTML_FILE")]
    pub output: Option<PathBuf>,
}

/// Self-exclusion modes available in CLI
#[derive(ValueEnum, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelfExclusionMode {
    /// Drop the nearest hit
    DropFirst,
    /// Drop hits carrying the idiom's own id
    FilterById,
}

impl From<SelfExclusionMode> for SelfExclusion {
    fn from(mode: SelfExclusionMode) -> Self {
        match mode {
            SelfExclusionMode::DropFirst => SelfExclusion::DropFirst,
            SelfExclusionMode::FilterById => SelfExclusion::FilterById,
        }
    }
}

/// Distance metrics available in CLI
#[derive(ValueEnum, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricMode {
    /// Cosine distance
    Cosine,
    /// Euclidean distance
    Euclidean,
    /// Negated inner product
    DotProduct,
}

impl From<MetricMode> for DistanceMetric {
    fn from(mode: MetricMode) -> Self {
        match mode {
            MetricMode::Cosine => DistanceMetric::Cosine,
            MetricMode::Euclidean => DistanceMetric::Euclidean,
            MetricMode::DotProduct => DistanceMetric::DotProduct,
        }
    }
}

/// Output formats available in CLI
#[derive(ValueEnum, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}
