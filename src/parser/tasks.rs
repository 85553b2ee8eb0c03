use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use ropey::Rope;

use super::types::{TaskRef, TextRange};

static TASK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:[-*+]|\d+\.)[ \t](?<marker>\[(?<state>[^\[\]\n]*)\])(?<rest>[^\n]*)$")
        .unwrap()
});

/// Task list items outside of `skip`.
///
/// The bracket has to be followed by whitespace or the end of the line, so
/// `- [link](url)` and `- [[wiki]]` are not tasks.
pub fn extract(text: &str, rope: &Rope, skip: &[Range<usize>]) -> Vec<TaskRef> {
    TASK_RE
        .captures_iter(text)
        .filter_map(|captures| {
            let full = captures.get(0)?;
            if skip.iter().any(|span| span.contains(&full.start())) {
                return None;
            }

            let rest = captures.name("rest")?.as_str();
            if !(rest.is_empty() || rest.starts_with(char::is_whitespace)) {
                return None;
            }

            let marker = captures.name("marker")?;
            let range = TextRange::from_byte_range(rope, marker.range());

            Some(TaskRef {
                state: captures.name("state")?.as_str().to_string(),
                text: rest.trim().to_string(),
                line: range.start.line,
                column: range.start.character,
                range,
            })
        })
        .collect()
}

/// Byte spans of fenced code blocks (```` ``` ```` or `~~~`). An unclosed
/// fence runs to the end of the text.
pub fn fenced_code_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut open: Option<(usize, char, usize)> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let indent = line.len() - line.trim_start_matches(' ').len();
        let body = line[indent..].trim_end();

        if indent <= 3 {
            let fence_char = body.chars().next().filter(|c| *c == '`' || *c == '~');
            if let Some(c) = fence_char {
                let run = body.chars().take_while(|ch| *ch == c).count();
                match open {
                    None if run >= 3 => open = Some((offset, c, run)),
                    Some((start, open_char, open_run))
                        if c == open_char && run >= open_run && body.len() == run =>
                    {
                        spans.push(start..offset + line.len());
                        open = None;
                    }
                    _ => {}
                }
            }
        }

        offset += line.len();
    }

    if let Some((start, _, _)) = open {
        spans.push(start..text.len());
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks(text: &str) -> Vec<TaskRef> {
        let skip = fenced_code_spans(text);
        extract(text, &Rope::from_str(text), &skip)
    }

    #[test]
    fn test_task_states_and_text() {
        let found = tasks("- [ ] open\n* [x] done\n+ [wip] going\n1. [X] numbered");

        let states: Vec<_> = found.iter().map(|t| t.state.as_str()).collect();
        assert_eq!(states, vec![" ", "x", "wip", "X"]);
        assert_eq!(found[0].text, "open");
        assert_eq!(found[3].text, "numbered");
        assert_eq!(found[2].line, 2);
        assert_eq!(found[2].column, 2);
    }

    #[test]
    fn test_marker_range_covers_brackets() {
        let found = tasks("  - [wip] indented");

        assert_eq!(found[0].column, 4);
        assert_eq!(found[0].range.start.character, 4);
        assert_eq!(found[0].range.end.character, 9);
    }

    #[test]
    fn test_links_are_not_tasks() {
        assert!(tasks("- [link](https://example.com)\n- [[wiki]]\n- [x]trailing").is_empty());
    }

    #[test]
    fn test_marker_must_stand_alone() {
        assert!(tasks("- [wip]Work\n- [a[b]] x\n- [a]b] x").is_empty());

        let found = tasks("- [wip]\tWork\n- [a]");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].text, "Work");
        assert_eq!(found[1].state, "a");
    }

    #[test]
    fn test_empty_text_task() {
        let found = tasks("- [ ]");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "");
    }

    #[test]
    fn test_tasks_in_fences_are_skipped() {
        let found = tasks("```md\n- [ ] example\n```\n- [x] real\n~~~\n- [ ] also example");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "real");
    }

    #[test]
    fn test_fence_spans() {
        let text = "a\n```\ncode\n```\nb\n";
        assert_eq!(fenced_code_spans(text), vec![2..15]);
    }
}
