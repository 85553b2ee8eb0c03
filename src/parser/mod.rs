//! Markdown document parsing: frontmatter, wikilinks and tasks.

pub mod frontmatter;
pub mod tasks;
pub mod types;
pub mod value;
pub mod wikilinks;

#[cfg(test)]
mod tests;

use ropey::Rope;
use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::Position;
use tracing::warn;

use crate::error::{Error, Result};

pub use types::{byte_to_position, TaskRef, TextRange, Wikilink};
pub use value::{Frontmatter, Value};

/// How wikilinks are located in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum ExtractionMode {
    /// Parse the markdown and ignore links inside code, math and frontmatter.
    #[default]
    Ast,
    /// Scan the raw text, ignoring only the frontmatter.
    Regex,
}

/// Everything extracted from one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedDoc {
    pub frontmatter: Frontmatter,
    pub wikilinks: Vec<Wikilink>,
    pub tasks: Vec<TaskRef>,
}

impl ParsedDoc {
    /// The wikilink whose `[[...]]` span contains `position`.
    pub fn wikilink_at(&self, position: Position) -> Option<&Wikilink> {
        self.wikilinks
            .iter()
            .find(|link| link.range.includes_position(position))
    }
}

/// Parses raw file content. Content that is not UTF-8 is a parse error.
pub fn parse(bytes: &[u8], mode: ExtractionMode) -> Result<ParsedDoc> {
    let text = std::str::from_utf8(bytes)
        .map_err(|err| Error::parse(format!("document is not valid UTF-8: {err}")))?;
    parse_str(text, mode)
}

pub fn parse_str(text: &str, mode: ExtractionMode) -> Result<ParsedDoc> {
    let block = frontmatter::extract(text)?;
    let rope = Rope::from_str(text);
    let frontmatter_span = block.as_ref().map(|block| block.span.clone());

    let wikilinks = match mode {
        ExtractionMode::Ast => wikilinks::extract_ast(text, &rope, frontmatter_span.clone()),
        ExtractionMode::Regex => {
            let skip: Vec<_> = frontmatter_span.iter().cloned().collect();
            wikilinks::extract_regex(text, &rope, &skip)
        }
    };

    let mut task_skip = tasks::fenced_code_spans(text);
    task_skip.extend(frontmatter_span);
    let tasks = tasks::extract(text, &rope, &task_skip);

    Ok(ParsedDoc {
        frontmatter: block.map(|block| block.values).unwrap_or_default(),
        wikilinks,
        tasks,
    })
}

/// Like [`parse_str`], but a document that fails to parse is treated as
/// empty.
pub fn parse_or_empty(text: &str, mode: ExtractionMode) -> ParsedDoc {
    match parse_str(text, mode) {
        Ok(doc) => doc,
        Err(err) => {
            warn!("{err}; treating document as empty");
            ParsedDoc::default()
        }
    }
}
