//! Wikilink extraction.
//!
//! Two paths produce the same records: an AST-guided one that uses
//! markdown-rs to find code, math and frontmatter nodes and ignores links
//! inside them, and a plain regex fallback.

use std::ops::Range;

use markdown::{mdast::Node, to_mdast, Constructs, ParseOptions};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use ropey::Rope;
use tracing::debug;

use super::types::{TextRange, Wikilink};

pub static WIKILINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]").unwrap());

/// Regex extraction, skipping any match that starts inside `skip`.
pub fn extract_regex(text: &str, rope: &Rope, skip: &[Range<usize>]) -> Vec<Wikilink> {
    WIKILINK_RE
        .captures_iter(text)
        .filter(|captures| {
            captures
                .get(0)
                .is_some_and(|full| !skip.iter().any(|span| span.contains(&full.start())))
        })
        .filter_map(|captures| wikilink_from_captures(&captures, rope))
        .collect()
}

/// AST-guided extraction. Falls back to [`extract_regex`] with only the
/// frontmatter skipped when markdown-rs rejects the document.
pub fn extract_ast(text: &str, rope: &Rope, frontmatter: Option<Range<usize>>) -> Vec<Wikilink> {
    let mut skip = match literal_spans(text) {
        Some(spans) => spans,
        None => Vec::new(),
    };
    skip.extend(frontmatter);

    extract_regex(text, rope, &skip)
}

/// Byte spans of nodes whose content is literal: code, inline code, math
/// and frontmatter.
pub fn literal_spans(text: &str) -> Option<Vec<Range<usize>>> {
    let options = ParseOptions {
        constructs: Constructs {
            frontmatter: true,
            ..Constructs::gfm()
        },
        ..ParseOptions::gfm()
    };

    let ast = match to_mdast(text, &options) {
        Ok(ast) => ast,
        Err(err) => {
            debug!("markdown AST unavailable, using regex extraction: {err}");
            return None;
        }
    };

    let mut spans = Vec::new();
    collect_literal_spans(&ast, &mut spans);
    Some(spans)
}

fn collect_literal_spans(node: &Node, spans: &mut Vec<Range<usize>>) {
    match node {
        Node::Code(_)
        | Node::InlineCode(_)
        | Node::Math(_)
        | Node::InlineMath(_)
        | Node::Yaml(_)
        | Node::Toml(_) => {
            if let Some(position) = node.position() {
                spans.push(position.start.offset..position.end.offset);
            }
        }
        _ => {
            if let Some(children) = node.children() {
                for child in children {
                    collect_literal_spans(child, spans);
                }
            }
        }
    }
}

fn wikilink_from_captures(captures: &Captures, rope: &Rope) -> Option<Wikilink> {
    let full = captures.get(0)?;
    let inner = captures.get(1)?;

    let raw = inner.as_str();
    let target = raw.trim();
    if target.is_empty() {
        return None;
    }

    let leading = raw.len() - raw.trim_start().len();
    let target_start = inner.start() + leading;
    let target_end = target_start + target.len();

    let range = TextRange::from_byte_range(rope, full.range());

    Some(Wikilink {
        target: target.to_string(),
        display: captures.get(2).map(|display| display.as_str().to_string()),
        line: range.start.line,
        column: range.start.character,
        range,
        target_range: TextRange::from_byte_range(rope, target_start..target_end),
    })
}
