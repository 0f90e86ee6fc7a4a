//! Flattening of idiom records into retrieval documents.
//!
//! Each record becomes one free-text document
//! `"{phrase}. {interpretation} For examples. {examples joined by spaces}"`
//! plus a metadata entry `{phrase, id}`. Position `i` of the documents
//! always corresponds to position `i` of the metadata and to index id
//! `id{i}`.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::idiom::record::IdiomRecord;
use crate::idiom::store::RecordStore;

/// Separator between the phrase and the rest of the document text.
pub const PHRASE_SEPARATOR: &str = ". ";

/// Free text indexed for one idiom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalDocument {
    /// The record's phrase.
    pub phrase: String,
    pub text: String,
}

/// Metadata stored alongside a document in the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub phrase: String,
    /// The record id, as a string.
    pub id: String,
}

/// Build the retrieval text for a record.
pub fn document_text(record: &IdiomRecord) -> String {
    format!(
        "{}{PHRASE_SEPARATOR}{} For examples. {}",
        record.phrase,
        record.interpretation,
        record.examples.join(" ")
    )
}

/// Recover the phrase from a retrieval text: everything up to the first
/// `". "`.
pub fn phrase_of(text: &str) -> &str {
    text.split_once(PHRASE_SEPARATOR)
        .map(|(phrase, _)| phrase)
        .unwrap_or(text)
}

/// Index identifier for the document at `position`.
pub fn index_id(position: usize) -> String {
    format!("id{position}")
}

/// Documents and metadata in record order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializedCorpus {
    pub documents: Vec<RetrievalDocument>,
    pub metadata: Vec<DocumentMetadata>,
}

impl SerializedCorpus {
    pub fn from_records(records: &[IdiomRecord]) -> Self {
        let (documents, metadata) = records
            .iter()
            .map(|record| {
                (
                    RetrievalDocument {
                        phrase: record.phrase.clone(),
                        text: document_text(record),
                    },
                    DocumentMetadata {
                        phrase: record.phrase.clone(),
                        id: record.id.to_string(),
                    },
                )
            })
            .unzip();
        Self {
            documents,
            metadata,
        }
    }

    /// Serialize the records held by `store`.
    pub fn from_store(store: &RecordStore) -> Result<Self> {
        Ok(Self::from_records(&store.load()?))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn texts(&self) -> Vec<String> {
        self.documents.iter().map(|doc| doc.text.clone()).collect()
    }

    /// Index identifiers `id0..idN` in document order.
    pub fn ids(&self) -> Vec<String> {
        (0..self.documents.len()).map(index_id).collect()
    }
}
