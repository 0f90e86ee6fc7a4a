//! The idiom record extracted from the book.

use serde::{Deserialize, Serialize};

/// One idiom entry.
///
/// `id` is assigned in document order starting at 1 and is stable for a
/// given source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdiomRecord {
    pub id: u32,
    /// Canonical idiom text, never empty.
    pub phrase: String,
    /// Plain-language meaning; empty when the book has none.
    #[serde(default)]
    pub interpretation: String,
    /// Example sentences in document order.
    #[serde(default)]
    pub examples: Vec<String>,
}

impl IdiomRecord {
    pub fn new<S: Into<String>>(id: u32, phrase: S) -> Self {
        Self {
            id,
            phrase: phrase.into(),
            interpretation: String::new(),
            examples: Vec::new(),
        }
    }

    pub fn with_interpretation<S: Into<String>>(mut self, interpretation: S) -> Self {
        self.interpretation = interpretation.into();
        self
    }

    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }
}
