//! Position types and the records the parser produces.
//!
//! - `TextRange`: an LSP range built from byte offsets
//! - `Wikilink`: one `[[target]]` or `[[target|display]]` occurrence
//! - `TaskRef`: one `- [state] text` list item

use std::ops::{Deref, Range};

use ropey::Rope;
use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::Position;

/// A wrapper around `tower_lsp::lsp_types::Range` with additional utilities.
///
/// Lines are 0-based; characters count Unicode scalar values from the start
/// of the line.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct TextRange(pub tower_lsp::lsp_types::Range);

impl TextRange {
    /// Creates a `TextRange` from a byte offset range using rope for position calculation.
    pub fn from_byte_range(rope: &Rope, range: Range<usize>) -> TextRange {
        TextRange(tower_lsp::lsp_types::Range {
            start: byte_to_position(rope, range.start),
            end: byte_to_position(rope, range.end),
        })
    }

    pub fn new(start_line: u32, start_character: u32, end_line: u32, end_character: u32) -> Self {
        TextRange(tower_lsp::lsp_types::Range {
            start: Position {
                line: start_line,
                character: start_character,
            },
            end: Position {
                line: end_line,
                character: end_character,
            },
        })
    }

    /// Inclusive on both ends, so a cursor right after `]]` still counts.
    pub fn includes_position(&self, position: Position) -> bool {
        (self.start.line < position.line
            || (self.start.line == position.line && self.start.character <= position.character))
            && (self.end.line > position.line
                || (self.end.line == position.line && self.end.character >= position.character))
    }
}

pub fn byte_to_position(rope: &Rope, byte: usize) -> Position {
    let byte = byte.min(rope.len_bytes());
    let char_idx = rope.byte_to_char(byte);
    let line = rope.char_to_line(char_idx);
    let character = char_idx - rope.line_to_char(line);

    Position {
        line: line as u32,
        character: character as u32,
    }
}

impl std::hash::Hash for TextRange {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.start.line.hash(state);
        self.0.start.character.hash(state);
        self.0.end.line.hash(state);
        self.0.end.character.hash(state);
    }
}

impl Deref for TextRange {
    type Target = tower_lsp::lsp_types::Range;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<tower_lsp::lsp_types::Range> for TextRange {
    fn from(range: tower_lsp::lsp_types::Range) -> Self {
        TextRange(range)
    }
}

/// A wikilink occurrence in a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Wikilink {
    /// Inner text before the first `|`, whitespace trimmed
    pub target: String,
    /// Text after the first `|`, verbatim
    pub display: Option<String>,
    /// Line of the opening `[[`
    pub line: u32,
    /// Column of the opening `[[`
    pub column: u32,
    /// The whole `[[...]]` construct
    #[serde(skip)]
    pub range: TextRange,
    /// Just the trimmed target text
    #[serde(skip)]
    pub target_range: TextRange,
}

/// A task list item such as `- [x] ship it`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TaskRef {
    /// The bracket body, verbatim (`" "`, `"x"`, `"wip"`, ...)
    pub state: String,
    pub text: String,
    pub line: u32,
    /// Column of the opening `[`
    pub column: u32,
    /// The bracketed marker including both brackets
    #[serde(skip)]
    pub range: TextRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_offsets_convert_to_char_columns() {
        let rope = Rope::from_str("abc\nhé [[x]]\n");
        // "hé " is 4 bytes but 3 characters
        let range = TextRange::from_byte_range(&rope, 8..13);

        assert_eq!(range.start, Position { line: 1, character: 3 });
        assert_eq!(range.end, Position { line: 1, character: 8 });
    }

    #[test]
    fn only_newline_ends_a_line() {
        let rope = Rope::from_str("intro\u{2028}more [[x]]");
        assert_eq!(byte_to_position(&rope, 13), Position { line: 0, character: 11 });

        let rope = Rope::from_str("a\u{0C}b\rc\u{85}d\n[[x]]");
        assert_eq!(rope.len_lines(), 2);
        assert_eq!(byte_to_position(&rope, 9), Position { line: 1, character: 0 });
    }

    #[test]
    fn includes_position_is_inclusive() {
        let range = TextRange::new(2, 4, 2, 10);

        assert!(range.includes_position(Position { line: 2, character: 4 }));
        assert!(range.includes_position(Position { line: 2, character: 10 }));
        assert!(!range.includes_position(Position { line: 2, character: 11 }));
        assert!(!range.includes_position(Position { line: 1, character: 5 }));
    }
}
