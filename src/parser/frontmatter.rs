use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

use super::value::{Frontmatter, Value};

/// The leading `---` fenced block of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontmatterBlock {
    pub values: Frontmatter,
    /// Byte span of the whole block, fences included
    pub span: Range<usize>,
}

/// Extracts the frontmatter at the very start of `text`.
///
/// Returns `Ok(None)` when the document has no frontmatter. A block that is
/// not valid YAML is a parse error; valid YAML that is not a mapping yields
/// an empty map.
pub fn extract(text: &str) -> Result<Option<FrontmatterBlock>> {
    // find text between --- at the beginning of the file
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"\A---[ \t]*\r?\n(?:(?<metadata>(?s:.*?))\r?\n)?(?:---|\.\.\.)[ \t]*(?:\r?\n|\z)",
        )
        .unwrap()
    });

    let Some(captures) = RE.captures(text) else {
        return Ok(None);
    };
    let Some(full) = captures.get(0) else {
        return Ok(None);
    };

    let raw = captures
        .name("metadata")
        .map(|m| m.as_str())
        .unwrap_or_default();

    let values = if raw.trim().is_empty() {
        Frontmatter::new()
    } else {
        let yaml: serde_yaml::Value = serde_yaml::from_str(raw)
            .map_err(|err| Error::parse(format!("invalid frontmatter: {err}")))?;

        match Value::from(yaml) {
            Value::Map(map) => map,
            _ => Frontmatter::new(),
        }
    };

    Ok(Some(FrontmatterBlock {
        values,
        span: full.range(),
    }))
}
