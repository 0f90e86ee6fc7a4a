//! Phrase → neighbor phrases mapping.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IdiolinkError, Result};
use crate::util::write_json_pretty;

/// Mapping from a phrase to its neighbor phrases, most similar first.
///
/// The same shape serves the one-hop retrieval result, the two-hop
/// expansion and the refined result. On disk it is a JSON object of
/// phrase → array of phrase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynonymMap(BTreeMap<String, Vec<String>>);

/// A map whose entries were re-ranked by the ranking model.
pub type RefinedSynonymMap = SynonymMap;

impl SynonymMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, phrase: S, neighbors: Vec<String>) {
        self.0.insert(phrase.into(), neighbors);
    }

    pub fn get(&self, phrase: &str) -> Option<&[String]> {
        self.0.get(phrase).map(Vec::as_slice)
    }

    pub fn contains(&self, phrase: &str) -> bool {
        self.0.contains_key(phrase)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    pub fn phrases(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read a map written by [`SynonymMap::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| IdiolinkError::from_io(e, path))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the map as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json_pretty(path, self)
    }
}

impl FromIterator<(String, Vec<String>)> for SynonymMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for SynonymMap {
    type Item = (String, Vec<String>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
