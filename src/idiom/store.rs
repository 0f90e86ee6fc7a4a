//! Durable JSON store for extracted records.
//!
//! Extraction writes the store once; indexing and linking read it back, so
//! the index can be rebuilt without parsing the book again.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{IdiolinkError, Result};
use crate::idiom::record::IdiomRecord;
use crate::util::write_json_pretty;

/// A JSON array of [`IdiomRecord`] on disk.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the store contents with `records`.
    pub fn save(&self, records: &[IdiomRecord]) -> Result<()> {
        write_json_pretty(&self.path, records)?;
        info!(
            "Wrote {} idiom records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Read all records. A missing store is [`IdiolinkError::NotFound`].
    pub fn load(&self) -> Result<Vec<IdiomRecord>> {
        let content =
            fs::read_to_string(&self.path).map_err(|e| IdiolinkError::from_io(e, &self.path))?;
        let records: Vec<IdiomRecord> = serde_json::from_str(&content)?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordStore::new(temp_dir.path().join("idioms.json"));
        let records = vec![
            IdiomRecord::new(1, "kick the bucket").with_examples(["He kicked the bucket."]),
            IdiomRecord::new(2, "pass away").with_interpretation("to die"),
        ];

        store.save(&records).unwrap();
        assert_eq!(store.load().unwrap(), records);
    }

    #[test]
    fn test_unicode_is_written_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordStore::new(temp_dir.path().join("idioms.json"));
        store
            .save(&[IdiomRecord::new(1, "déjà vu")])
            .unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("déjà vu"));
    }

    #[test]
    fn test_missing_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordStore::new(temp_dir.path().join("absent.json"));
        assert!(matches!(store.load(), Err(IdiolinkError::NotFound(_))));
    }
}
