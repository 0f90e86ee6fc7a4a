//! Structural extraction of idiom records from the idiom book.
//!
//! The book is an HTML document with one `<h2>` per idiom. The heading text
//! carries an ordinal prefix (`"12. "`). After the heading come optional
//! translation paragraphs tagged with class `cn` or `en`, then one plain
//! paragraph holding the interpretation, then a `<ul>` whose items each
//! contain a `<span lang="en">` example sentence.
//!
//! ```text
//! <h2 id="idiom-1">1. kick the bucket</h2>
//! <p class="cn">...</p>
//! <p>to die</p>
//! <ul><li><span lang="en">He <em>kicked the bucket</em>.</span></li></ul>
//! ```

use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{IdiolinkError, Result};
use crate::idiom::record::IdiomRecord;

pub(crate) const HEADING_TAG: &str = "h2";
const LIST_TAG: &str = "ul";
const PARAGRAPH_TAG: &str = "p";
const ANNOTATION_CLASSES: [&str; 2] = ["cn", "en"];

lazy_static! {
    static ref ORDINAL_PREFIX: Regex = Regex::new(r"^\s*\d+\.\s+").unwrap();
}

/// Remove the leading `"N. "` ordinal from a heading text.
pub fn strip_ordinal(heading: &str) -> &str {
    match ORDINAL_PREFIX.find(heading) {
        Some(m) => &heading[m.end()..],
        None => heading,
    }
}

/// Concatenated text of an element with whitespace runs collapsed.
pub(crate) fn collapsed_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Phrase carried by a heading element.
pub(crate) fn heading_phrase(heading: &ElementRef<'_>) -> String {
    phrase_of(&heading.text().collect::<String>())
}

/// Phrase for a heading's decoded text: whitespace collapsed, ordinal removed.
pub(crate) fn phrase_of(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    strip_ordinal(&collapsed).trim().to_string()
}

/// Extracts [`IdiomRecord`]s from the idiom book.
#[derive(Debug)]
pub struct RecordExtractor {
    headings_and_lists: Selector,
    list_items: Selector,
    example_spans: Selector,
}

impl RecordExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            headings_and_lists: parse_selector(&format!("{HEADING_TAG}, {LIST_TAG}"))?,
            list_items: parse_selector("li")?,
            example_spans: parse_selector(r#"span[lang="en"]"#)?,
        })
    }

    /// Read and extract the book at `path`.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<IdiomRecord>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| IdiolinkError::from_io(e, path))?;
        let records = self.extract(&content);
        if records.is_empty() {
            warn!(
                "No idiom headings found in {}; the document may be malformed",
                path.display()
            );
        }
        Ok(records)
    }

    /// Extract records in document order, ids starting at 1.
    ///
    /// Markup that yields no headings produces an empty list rather than an
    /// error. Headings with an empty phrase and list items without an
    /// example span are skipped with a warning.
    pub fn extract(&self, html: &str) -> Vec<IdiomRecord> {
        let document = Html::parse_document(html);
        let elements: Vec<ElementRef<'_>> = document.select(&self.headings_and_lists).collect();

        let mut records = Vec::new();
        for (position, heading) in elements.iter().enumerate() {
            if heading.value().name() != HEADING_TAG {
                continue;
            }

            let phrase = heading_phrase(heading);
            if phrase.is_empty() {
                warn!(
                    "{}",
                    IdiolinkError::parse(format!(
                        "heading {:?} has no phrase after its ordinal",
                        collapsed_text(heading)
                    ))
                );
                continue;
            }

            let examples = elements[position + 1..]
                .iter()
                .find(|el| el.value().name() == LIST_TAG)
                .map(|list| self.examples(list, &phrase))
                .unwrap_or_default();

            let id = records.len() as u32 + 1;
            debug!("Extracted idiom {id}: {phrase}");
            records.push(IdiomRecord {
                id,
                interpretation: interpretation(heading),
                phrase,
                examples,
            });
        }

        records
    }

    fn examples(&self, list: &ElementRef<'_>, phrase: &str) -> Vec<String> {
        let mut examples = Vec::new();
        for item in list.select(&self.list_items) {
            match item.select(&self.example_spans).next() {
                Some(span) => {
                    let text = span.text().collect::<String>().replace('\n', " ");
                    examples.push(text.trim().to_string());
                }
                None => warn!(
                    "{}",
                    IdiolinkError::parse(format!(
                        "example item under {phrase:?} has no English span"
                    ))
                ),
            }
        }
        examples
    }
}

/// The first plain paragraph following `heading` among its siblings, stopping
/// at the next heading or list.
fn interpretation(heading: &ElementRef<'_>) -> String {
    for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
        let element = sibling.value();
        match element.name() {
            HEADING_TAG | LIST_TAG => break,
            PARAGRAPH_TAG
                if element
                    .classes()
                    .any(|class| ANNOTATION_CLASSES.contains(&class)) =>
            {
                continue;
            }
            PARAGRAPH_TAG => return collapsed_text(&sibling),
            _ => continue,
        }
    }
    String::new()
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| IdiolinkError::parse(format!("invalid selector {selector:?}: {e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BOOK: &str = r#"<html><body>
<h2 id="idiom-1">1. kick the bucket</h2>
<p class="cn">踢水桶</p>
<p class="en">Literal: to kick a bucket</p>
<p>to die</p>
<ul>
  <li><span lang="en">He <em>kicked the
  bucket</em> last year.</span><span lang="cn">他去年死了。</span></li>
  <li><span lang="en">Don't kick the bucket yet.</span></li>
</ul>
<h2 id="idiom-2">2. pass
 away</h2>
<ul><li><span lang="en">She passed away peacefully.</span></li></ul>
<h2 id="idiom-3">3. break a leg</h2>
<p>good luck</p>
</body></html>"#;

    #[test]
    fn test_strip_ordinal() {
        assert_eq!(strip_ordinal("1. kick the bucket"), "kick the bucket");
        assert_eq!(strip_ordinal("120.  under the weather"), "under the weather");
        assert_eq!(strip_ordinal("a.k.a. nothing"), "a.k.a. nothing");
        assert_eq!(strip_ordinal("no ordinal"), "no ordinal");
    }

    #[test]
    fn test_extract_book() {
        let extractor = RecordExtractor::new().unwrap();
        let records = extractor.extract(BOOK);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].phrase, "kick the bucket");
        assert_eq!(records[0].interpretation, "to die");
        assert_eq!(
            records[0].examples,
            vec![
                "He kicked the   bucket last year.".to_string(),
                "Don't kick the bucket yet.".to_string()
            ]
        );

        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].phrase, "pass away");
        assert_eq!(records[1].interpretation, "");
        assert_eq!(records[1].examples, vec!["She passed away peacefully."]);

        assert_eq!(records[2].id, 3);
        assert_eq!(records[2].interpretation, "good luck");
        assert!(records[2].examples.is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = RecordExtractor::new().unwrap();
        assert_eq!(extractor.extract(BOOK), extractor.extract(BOOK));
    }

    #[test]
    fn test_no_headings_yields_no_records() {
        let extractor = RecordExtractor::new().unwrap();
        assert!(extractor.extract("<p>just text</p><ul><li>x</li></ul>").is_empty());
        assert!(extractor.extract("<<<not html").is_empty());
    }

    #[test]
    fn test_item_without_span_is_skipped() {
        let extractor = RecordExtractor::new().unwrap();
        let records = extractor.extract(
            r#"<h2>1. hit the sack</h2><ul><li>bare</li><li><span lang="en">I hit the sack.</span></li></ul>"#,
        );
        assert_eq!(records[0].examples, vec!["I hit the sack."]);
    }

    #[test]
    fn test_extract_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = RecordExtractor::new().unwrap();
        let err = extractor
            .extract_file(temp_dir.path().join("missing.html"))
            .unwrap_err();
        assert!(matches!(err, IdiolinkError::NotFound(_)));
    }
}
