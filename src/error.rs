//! Error types for the idiolink pipeline.
//!
//! All fallible operations return [`IdiolinkError`]. The variants follow the
//! stages of the pipeline so that a command can report which step failed:
//! a missing input file, an unexpected document structure, an unreachable or
//! empty index, or a ranking response that could not be parsed.
//!
//! # Examples
//!
//! ```
//! use idiolink::error::{IdiolinkError, Result};
//!
//! fn lookup() -> Result<()> {
//!     Err(IdiolinkError::retrieval("index is empty"))
//! }
//!
//! assert_eq!(
//!     lookup().unwrap_err().to_string(),
//!     "Retrieval error: index is empty"
//! );
//! ```

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The main error type for idiolink operations.
#[derive(Error, Debug)]
pub enum IdiolinkError {
    /// A required input file does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The source document has an unexpected structure.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The vector index is unreachable, empty or returned unusable results.
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// The ranking response did not contain a usable synonyms blob.
    #[error("Refinement parse error: {0}")]
    RefinementParse(String),

    /// The embedding capability failed.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The ranking capability failed before returning a response.
    #[error("Ranking error: {0}")]
    Ranking(String),

    /// Configuration is missing or inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A request did not complete within its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with IdiolinkError.
pub type Result<T> = std::result::Result<T, IdiolinkError>;

impl IdiolinkError {
    /// Create a new not found error.
    pub fn not_found<P: AsRef<Path>>(path: P) -> Self {
        IdiolinkError::NotFound(path.as_ref().to_path_buf())
    }

    /// Create a new parse error.
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        IdiolinkError::Parse(msg.into())
    }

    /// Create a new retrieval error.
    pub fn retrieval<S: Into<String>>(msg: S) -> Self {
        IdiolinkError::Retrieval(msg.into())
    }

    /// Create a new refinement parse error.
    pub fn refinement_parse<S: Into<String>>(msg: S) -> Self {
        IdiolinkError::RefinementParse(msg.into())
    }

    /// Create a new embedding error.
    pub fn embedding<S: Into<String>>(msg: S) -> Self {
        IdiolinkError::Embedding(msg.into())
    }

    /// Create a new ranking error.
    pub fn ranking<S: Into<String>>(msg: S) -> Self {
        IdiolinkError::Ranking(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        IdiolinkError::InvalidConfig(msg.into())
    }

    /// Create a new timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        IdiolinkError::Timeout(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        IdiolinkError::Other(msg.into())
    }

    /// Map an I/O error raised while opening `path`, turning a missing file
    /// into [`IdiolinkError::NotFound`].
    pub fn from_io<P: AsRef<Path>>(err: io::Error, path: P) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            IdiolinkError::not_found(path)
        } else {
            IdiolinkError::Io(err)
        }
    }

    /// Whether a retry of the same request could succeed.
    ///
    /// Transport failures, timeouts and failed capability calls are
    /// transient. Everything that depends only on local input is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            IdiolinkError::Timeout(_)
            | IdiolinkError::Embedding(_)
            | IdiolinkError::Ranking(_) => true,
            IdiolinkError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
