//! Refinement of two-hop candidates with a ranking model.
//!
//! For each phrase the model is asked to pick the 3–6 closest candidates,
//! optionally add 1–3 of its own, and answer with a JSON blob
//! `{"synonyms": [...]}` ordered from most to least similar. The answer is
//! free-form text; only the span from the first `{` to the last `}` is
//! parsed.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use log::{info, warn};
use serde::Deserialize;

use crate::error::{IdiolinkError, Result};
use crate::retry::RetryPolicy;
use crate::synonym::map::{RefinedSynonymMap, SynonymMap};
use crate::synonym::ranker::{Ranker, RankingRequest};

/// Fewest synonyms accepted per phrase.
pub const MIN_REFINED_SYNONYMS: usize = 3;
/// Most synonyms accepted per phrase: up to six picks plus three additions.
pub const MAX_REFINED_SYNONYMS: usize = 9;

const SYSTEM_PROMPT: &str = "You are an English coach to help us find synonyms.";

#[derive(Debug, Deserialize)]
struct RankingAnswer {
    synonyms: Vec<String>,
}

/// Build the ranking request for `phrase` and its candidates.
pub fn build_request(phrase: &str, candidates: &[String]) -> Result<RankingRequest> {
    let candidate_list = serde_json::to_string_pretty(candidates)?;
    let prompt = format!(
        "Analyze the phrases below and return the 3 to 6 synonyms whose meaning is \
         closest to '{phrase}', chosen from:\n{candidate_list}\n\n\
         You may then add 1 to 3 extra synonyms that are even closer in meaning. \
         Order the list from most similar to least similar.\n\
         Answer with a JSON blob between three backticks, like this:\n\
         ```\n{{\"synonyms\":[\"synonym-1\",...,\"synonym-n\"]}}\n```\n\
         Always respond with a valid JSON blob."
    );
    Ok(RankingRequest {
        system: SYSTEM_PROMPT.to_string(),
        prompt,
    })
}

/// The span of `response` from the first `{` to the last `}`.
pub fn extract_json_blob(response: &str) -> Result<&str> {
    let start = response
        .find('{')
        .ok_or_else(|| IdiolinkError::refinement_parse("response contains no '{'"))?;
    let end = response
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| IdiolinkError::refinement_parse("response contains no closing '}'"))?;
    Ok(&response[start..=end])
}

fn parse_blob(blob: &str) -> Result<Vec<String>> {
    let answer: RankingAnswer = serde_json::from_str(blob).map_err(|e| {
        IdiolinkError::refinement_parse(format!("invalid synonyms blob {blob:?}: {e}"))
    })?;
    Ok(answer.synonyms)
}

/// Extract the synonyms list from a free-form ranking answer.
///
/// Text before the first `{` and after the last `}` is discarded.
pub fn parse_ranking_response(response: &str) -> Result<Vec<String>> {
    parse_blob(extract_json_blob(response)?)
}

/// Drop the phrase itself, blanks and repeats, then enforce the size bound.
fn finalize(phrase: &str, synonyms: Vec<String>) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let refined: Vec<String> = synonyms
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != phrase)
        .filter(|s| seen.insert(s.clone()))
        .collect();

    if !(MIN_REFINED_SYNONYMS..=MAX_REFINED_SYNONYMS).contains(&refined.len()) {
        return Err(IdiolinkError::refinement_parse(format!(
            "expected {MIN_REFINED_SYNONYMS} to {MAX_REFINED_SYNONYMS} synonyms for {phrase:?}, got {}",
            refined.len()
        )));
    }
    Ok(refined)
}

/// Asks a [`Ranker`] to refine each phrase's candidates.
pub struct RefinementRequester<'a> {
    ranker: &'a dyn Ranker,
    retry: RetryPolicy,
    timeout: Duration,
    concurrency: usize,
}

impl<'a> RefinementRequester<'a> {
    pub fn new(ranker: &'a dyn Ranker) -> Self {
        Self {
            ranker,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(60),
            concurrency: 1,
        }
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

    /// Refine one phrase. The phrase itself is removed from the candidates
    /// before asking and from the answer afterwards.
    pub async fn refine_phrase(&self, phrase: &str, candidates: &[String]) -> Result<Vec<String>> {
        let candidates: Vec<String> = candidates
            .iter()
            .filter(|candidate| candidate.as_str() != phrase)
            .cloned()
            .collect();
        let request = build_request(phrase, &candidates)?;
        let ranker = self.ranker;
        let request_ref = &request;

        let response = self
            .retry
            .run("ranking request", self.timeout, move || {
                ranker.rank(request_ref)
            })
            .await?;

        let blob = extract_json_blob(&response)?;
        info!("Got a response for {phrase:?}: {blob}");
        finalize(phrase, parse_blob(blob)?)
    }

    /// Refine every entry of a two-hop map.
    ///
    /// The first failure aborts the batch. With a `checkpoint` path, the
    /// partial result is written after each phrase and phrases already in
    /// the checkpoint are not asked again.
    pub async fn refine_all(
        &self,
        two_hop: &SynonymMap,
        checkpoint: Option<&Path>,
    ) -> Result<RefinedSynonymMap> {
        let mut refined = match checkpoint {
            Some(path) if path.exists() => {
                let partial = SynonymMap::load(path)?;
                let stored = partial.len();
                let partial: RefinedSynonymMap = partial
                    .into_iter()
                    .filter(|(phrase, _)| two_hop.contains(phrase))
                    .collect();
                if partial.len() < stored {
                    warn!(
                        "Dropped {} checkpoint entries not in the current synonyms from {}",
                        stored - partial.len(),
                        path.display()
                    );
                }
                info!(
                    "Resuming refinement with {} phrases from {}",
                    partial.len(),
                    path.display()
                );
                partial
            }
            _ => RefinedSynonymMap::new(),
        };

        let pending: Vec<(&String, &Vec<String>)> = two_hop
            .iter()
            .filter(|(phrase, _)| !refined.contains(phrase))
            .collect();
        if pending.is_empty() {
            warn!("Nothing left to refine");
        }

        let mut results = stream::iter(pending)
            .map(|(phrase, candidates)| async move {
                self.refine_phrase(phrase, candidates)
                    .await
                    .map(|synonyms| (phrase.clone(), synonyms))
            })
            .buffered(self.concurrency);

        while let Some(result) = results.next().await {
            let (phrase, synonyms) = result?;
            refined.insert(phrase, synonyms);
            if let Some(path) = checkpoint {
                refined.save(path)?;
            }
        }

        Ok(refined)
    }
}

/// Remove a checkpoint after its result has been written.
pub fn clear_checkpoint(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_preamble_and_fence() {
        let response = "Sure! Here you go:\n```json\n{\"synonyms\": [\"pass away\", \"die\", \"croak\"]}\n```\nHope it helps.";
        assert_eq!(
            parse_ranking_response(response).unwrap(),
            ["pass away", "die", "croak"]
        );
    }

    #[test]
    fn test_extract_json_blob_keeps_raw_text() {
        let response = "Answer:\n```\n{\"synonyms\": [\"die\",  \"croak\"]}\n```";
        assert_eq!(
            extract_json_blob(response).unwrap(),
            "{\"synonyms\": [\"die\",  \"croak\"]}"
        );
        assert!(extract_json_blob("nothing").is_err());
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(
            parse_ranking_response("no json here"),
            Err(IdiolinkError::RefinementParse(_))
        ));
        assert!(matches!(
            parse_ranking_response("} backwards {"),
            Err(IdiolinkError::RefinementParse(_))
        ));
        assert!(matches!(
            parse_ranking_response("{\"words\": [\"a\"]}"),
            Err(IdiolinkError::RefinementParse(_))
        ));
        // Two blobs make the outer span invalid JSON.
        assert!(matches!(
            parse_ranking_response("{\"synonyms\": [\"a\"]} and {\"synonyms\": [\"b\"]}"),
            Err(IdiolinkError::RefinementParse(_))
        ));
    }

    #[test]
    fn test_finalize_bounds() {
        let to_vec = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(
            finalize("die", to_vec(&["die", "pass away", "croak", "pass away", " expire "]))
                .unwrap(),
            ["pass away", "croak", "expire"]
        );
        assert!(finalize("die", to_vec(&["a", "b"])).is_err());
        assert!(finalize("die", to_vec(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"])).is_err());
    }

    #[test]
    fn test_build_request_lists_candidates() {
        let request =
            build_request("kick the bucket", &["pass away".to_string(), "croak".to_string()])
                .unwrap();
        assert_eq!(request.system, SYSTEM_PROMPT);
        assert!(request.prompt.contains("'kick the bucket'"));
        assert!(request.prompt.contains("\"pass away\""));
        assert!(request.prompt.contains("{\"synonyms\":"));
    }
}
