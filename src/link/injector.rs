//! Writes "See also:" link blocks back into the idiom book.
//!
//! Two streaming passes run over the book with the same tokenizer. The
//! first locates headings, their anchors and the example list that follows
//! each heading. The second copies the book and inserts one paragraph after
//! the example list of every source idiom:
//!
//! ```text
//! <ul>...</ul><p>See also: <a href="#idiom-2">pass away</a> </p>
//! ```
//!
//! Lists are identified by their ordinal among all `<ul>` start tags, so
//! both passes agree on list positions even in malformed markup.
//!
//! The source file is never modified. Running the injector on its own output
//! appends a second block after each list.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};
use log::{debug, info, warn};
use lol_html::html_content::{ContentType, Element};
use lol_html::{RewriteStrSettings, element, rewrite_str, text};
use serde::{Deserialize, Serialize};

use crate::error::{IdiolinkError, Result};
use crate::idiom::extractor::{HEADING_TAG, phrase_of};
use crate::synonym::map::SynonymMap;
use crate::util::atomic_write;

const LIST_TAG: &str = "ul";
const HEADINGS_AND_LISTS: &str = "h2, ul";
const SEE_ALSO: &str = "See also: ";

/// Counters describing one injection run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    pub blocks_inserted: usize,
    pub links_inserted: usize,
    /// Source phrases without a heading or without a following list.
    pub sources_skipped: usize,
    /// Target phrases whose heading or anchor could not be found.
    pub targets_unresolved: usize,
}

/// The rewritten document and what was changed.
#[derive(Debug, Clone)]
pub struct LinkedDocument {
    pub html: String,
    pub stats: LinkStats,
}

#[derive(Debug)]
struct Heading {
    anchor: Option<String>,
    /// Ordinal of the first `<ul>` after the heading, if any.
    list: Option<usize>,
    /// Heading text as written, entities still encoded.
    raw_text: String,
}

/// Headings of a document, keyed by phrase.
#[derive(Debug, Default)]
struct HeadingIndex {
    headings: Vec<Heading>,
    by_phrase: HashMap<String, usize>,
}

impl HeadingIndex {
    fn find(&self, phrase: &str) -> Option<&Heading> {
        self.by_phrase.get(phrase).map(|&i| &self.headings[i])
    }
}

/// State of the heading pass.
#[derive(Debug, Default)]
struct HeadingScan {
    headings: Vec<Heading>,
    awaiting_list: Vec<usize>,
    list_ordinal: usize,
}

impl HeadingScan {
    fn open_heading(&mut self, anchor: Option<String>) {
        self.awaiting_list.push(self.headings.len());
        self.headings.push(Heading {
            anchor,
            list: None,
            raw_text: String::new(),
        });
    }

    fn open_list(&mut self) {
        for heading in self.awaiting_list.drain(..) {
            self.headings[heading].list = Some(self.list_ordinal);
        }
        self.list_ordinal += 1;
    }

    fn into_index(self) -> HeadingIndex {
        let mut by_phrase = HashMap::new();
        for (position, heading) in self.headings.iter().enumerate() {
            let phrase = phrase_of(&decode_html_entities(&heading.raw_text));
            if !phrase.is_empty() {
                by_phrase.entry(phrase).or_insert(position);
            }
        }
        HeadingIndex {
            headings: self.headings,
            by_phrase,
        }
    }
}

/// Inserts synonym link blocks into the idiom book.
#[derive(Debug, Default)]
pub struct LinkInjector;

impl LinkInjector {
    pub fn new() -> Self {
        Self
    }

    /// Read `source`, inject `links` and write the result to `output`.
    ///
    /// `output` must differ from `source`.
    pub fn inject_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        output: Q,
        links: &SynonymMap,
    ) -> Result<LinkStats> {
        let source = source.as_ref();
        let output = output.as_ref();
        if same_file(source, output) {
            return Err(IdiolinkError::invalid_config(format!(
                "refusing to overwrite the source document {}",
                source.display()
            )));
        }

        let html = fs::read_to_string(source).map_err(|e| IdiolinkError::from_io(e, source))?;
        let linked = self.inject(&html, links)?;
        atomic_write(output, &linked.html)?;

        info!(
            "Wrote {} See also blocks ({} links) to {}",
            linked.stats.blocks_inserted,
            linked.stats.links_inserted,
            output.display()
        );
        Ok(linked.stats)
    }

    /// Return a copy of `html` with one "See also:" block per source phrase.
    pub fn inject(&self, html: &str, links: &SynonymMap) -> Result<LinkedDocument> {
        let index = index_headings(html)?;
        let mut stats = LinkStats::default();
        let mut blocks: HashMap<usize, String> = HashMap::new();

        for (source, targets) in links.iter() {
            let Some(heading) = index.find(source) else {
                warn!("No heading found for {source:?}; skipping its links");
                stats.sources_skipped += 1;
                continue;
            };
            let Some(list) = heading.list else {
                warn!("No example list follows {source:?}; skipping its links");
                stats.sources_skipped += 1;
                continue;
            };

            let mut block = format!("<p>{SEE_ALSO}");
            for target in targets {
                match index.find(target).and_then(|h| h.anchor.as_deref()) {
                    Some(anchor) => {
                        block.push_str(&format!(
                            "<a href=\"#{}\">{}</a> ",
                            encode_double_quoted_attribute(anchor),
                            encode_text(target)
                        ));
                        stats.links_inserted += 1;
                    }
                    None => {
                        debug!("No anchor for {target:?}; omitting link from {source:?}");
                        stats.targets_unresolved += 1;
                    }
                }
            }
            block.push_str("</p>");

            blocks.entry(list).or_default().push_str(&block);
            stats.blocks_inserted += 1;
        }

        let mut list_ordinal = 0usize;
        let html = rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![element!(LIST_TAG, |el| {
                    if let Some(block) = blocks.get(&list_ordinal) {
                        el.after(block, ContentType::Html);
                    }
                    list_ordinal += 1;
                    Ok(())
                })],
                ..RewriteStrSettings::new()
            },
        )
        .map_err(|e| IdiolinkError::parse(format!("failed to rewrite document: {e}")))?;

        Ok(LinkedDocument { html, stats })
    }
}

fn index_headings(html: &str) -> Result<HeadingIndex> {
    let scan = RefCell::new(HeadingScan::default());
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(HEADINGS_AND_LISTS, |el| {
                    let mut scan = scan.borrow_mut();
                    if el.tag_name() == LIST_TAG {
                        scan.open_list();
                    } else {
                        scan.open_heading(anchor_of(el));
                    }
                    Ok(())
                }),
                text!(HEADING_TAG, |chunk| {
                    if let Some(heading) = scan.borrow_mut().headings.last_mut() {
                        heading.raw_text.push_str(chunk.as_str());
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::new()
        },
    )
    .map_err(|e| IdiolinkError::parse(format!("failed to scan document headings: {e}")))?;

    Ok(scan.into_inner().into_index())
}

fn anchor_of(heading: &Element<'_, '_>) -> Option<String> {
    let id = heading.get_attribute("id")?;
    let id = decode_html_entities(id.trim());
    (!id.is_empty()).then(|| id.into_owned())
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BOOK: &str = r#"<html><body>
<h2 id="idiom-1">1. kick the bucket</h2>
<p>to die</p>
<ul><li><span lang="en">He kicked the bucket.</span></li></ul>
<h2 id="idiom-2">2. pass away</h2>
<ul><li><span lang="en">She passed away peacefully.</span></li></ul>
<h2>3. no anchor</h2>
<ul><li><span lang="en">Nothing links here.</span></li></ul>
</body></html>"#;

    fn links(entries: &[(&str, &[&str])]) -> SynonymMap {
        entries
            .iter()
            .map(|(source, targets)| {
                (
                    source.to_string(),
                    targets.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_links_follow_example_lists() {
        let injector = LinkInjector::new();
        let linked = injector
            .inject(
                BOOK,
                &links(&[
                    ("kick the bucket", &["pass away"]),
                    ("pass away", &["kick the bucket"]),
                ]),
            )
            .unwrap();

        assert!(linked.html.contains(
            "</ul><p>See also: <a href=\"#idiom-2\">pass away</a> </p>\n<h2 id=\"idiom-2\">"
        ));
        assert!(linked.html.contains(
            "</ul><p>See also: <a href=\"#idiom-1\">kick the bucket</a> </p>\n<h2>3."
        ));
        assert_eq!(
            linked.stats,
            LinkStats {
                blocks_inserted: 2,
                links_inserted: 2,
                sources_skipped: 0,
                targets_unresolved: 0,
            }
        );
    }

    #[test]
    fn test_unresolved_targets_are_omitted() {
        let injector = LinkInjector::new();
        let linked = injector
            .inject(
                BOOK,
                &links(&[("kick the bucket", &["no anchor", "missing idiom", "pass away"])]),
            )
            .unwrap();

        assert!(linked
            .html
            .contains("<p>See also: <a href=\"#idiom-2\">pass away</a> </p>"));
        assert_eq!(linked.stats.links_inserted, 1);
        assert_eq!(linked.stats.targets_unresolved, 2);
    }

    #[test]
    fn test_unknown_source_is_skipped() {
        let injector = LinkInjector::new();
        let linked = injector
            .inject(BOOK, &links(&[("spill the beans", &["pass away"])]))
            .unwrap();

        assert_eq!(linked.html, BOOK);
        assert_eq!(linked.stats.sources_skipped, 1);
        assert_eq!(linked.stats.blocks_inserted, 0);
    }

    #[test]
    fn test_link_text_is_escaped() {
        let book = r#"<h2 id="a">1. rock &amp; roll</h2><ul><li>x</li></ul><h2 id="b">2. salt</h2><ul><li>y</li></ul>"#;
        let injector = LinkInjector::new();
        let linked = injector
            .inject(book, &links(&[("salt", &["rock & roll"])]))
            .unwrap();
        assert!(linked.html.contains("<a href=\"#a\">rock &amp; roll</a>"));
    }

    #[test]
    fn test_list_inside_select_keeps_block_placement() {
        // Tree builders drop the inner <ul>; both passes still count it.
        let book = format!("<form><select><ul><li>o</li></ul></select></form>\n{BOOK}");
        let injector = LinkInjector::new();
        let linked = injector
            .inject(&book, &links(&[("pass away", &["kick the bucket"])]))
            .unwrap();

        assert!(linked.html.contains(
            "She passed away peacefully.</span></li></ul><p>See also: <a href=\"#idiom-1\">kick the bucket</a> </p>"
        ));
        assert_eq!(linked.html.matches("See also:").count(), 1);
        assert_eq!(linked.stats.links_inserted, 1);
    }

    #[test]
    fn test_heading_text_across_inline_markup() {
        let book = r#"<h2 id="a">1. <em>spill</em> the
  beans</h2><ul><li>x</li></ul><h2 id="b">2. tell all</h2><ul><li>y</li></ul>"#;
        let injector = LinkInjector::new();
        let linked = injector
            .inject(book, &links(&[("tell all", &["spill the beans"])]))
            .unwrap();
        assert!(linked.html.contains("<a href=\"#a\">spill the beans</a>"));
    }

    #[test]
    fn test_rerun_appends_duplicate_blocks() {
        let injector = LinkInjector::new();
        let map = links(&[("kick the bucket", &["pass away"])]);

        let once = injector.inject(BOOK, &map).unwrap().html;
        let twice = injector.inject(&once, &map).unwrap().html;

        assert_eq!(once.matches("See also:").count(), 1);
        assert_eq!(twice.matches("See also:").count(), 2);
    }

    #[test]
    fn test_inject_file_keeps_source() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("book.html");
        let output = temp_dir.path().join("book_linked.html");
        fs::write(&source, BOOK).unwrap();

        let injector = LinkInjector::new();
        let stats = injector
            .inject_file(&source, &output, &links(&[("pass away", &["kick the bucket"])]))
            .unwrap();

        assert_eq!(stats.links_inserted, 1);
        assert_eq!(fs::read_to_string(&source).unwrap(), BOOK);
        assert!(fs::read_to_string(&output).unwrap().contains("See also:"));

        assert!(matches!(
            injector.inject_file(&source, &source, &SynonymMap::new()),
            Err(IdiolinkError::InvalidConfig(_))
        ));
        assert!(matches!(
            injector.inject_file(temp_dir.path().join("absent.html"), &output, &SynonymMap::new()),
            Err(IdiolinkError::NotFound(_))
        ));
    }
}
