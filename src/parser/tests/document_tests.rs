use tower_lsp::lsp_types::Position;

use crate::error::Error;
use crate::parser::{parse, parse_or_empty, parse_str, ExtractionMode, Value};

#[test]
fn test_full_document() {
    let text = r"---
author: Alice
tags: [rust, notes]
priority: 2
---
# Project

- [ ] read [[docs/setup|Setup]]
- [x] write [[config]]
- [wip] review
";
    let doc = parse_str(text, ExtractionMode::Ast).unwrap();

    assert_eq!(doc.frontmatter.get("author"), Some(&Value::from("Alice")));
    assert_eq!(doc.frontmatter.get("priority"), Some(&Value::Number(2.0)));
    assert_eq!(doc.wikilinks.len(), 2);
    assert_eq!(doc.wikilinks[0].target, "docs/setup");
    assert_eq!(doc.wikilinks[0].line, 7);
    assert_eq!(doc.tasks.len(), 3);
    assert_eq!(doc.tasks[2].state, "wip");
    assert_eq!(doc.tasks[0].text, "read [[docs/setup|Setup]]");
}

#[test]
fn test_no_frontmatter_is_empty_map() {
    let doc = parse(b"just [[text]]", ExtractionMode::Regex).unwrap();
    assert!(doc.frontmatter.is_empty());
    assert_eq!(doc.wikilinks[0].target, "text");
}

#[test]
fn test_tasks_in_frontmatter_are_ignored() {
    let doc = parse_str("---\nlist: |\n  - [ ] not a task\n---\n- [ ] a task\n", ExtractionMode::Ast)
        .unwrap();

    assert_eq!(doc.tasks.len(), 1);
    assert_eq!(doc.tasks[0].line, 4);
}

#[test]
fn test_invalid_utf8_is_parse_error() {
    let result = parse(&[0xff, 0xfe, b'[', b'['], ExtractionMode::Ast);
    assert!(matches!(result, Err(Error::Parse { .. })));
}

#[test]
fn test_parse_or_empty_swallows_bad_frontmatter() {
    let doc = parse_or_empty("---\nkey: [unclosed\n---\n[[link]]", ExtractionMode::Ast);
    assert_eq!(doc, Default::default());
}

#[test]
fn test_wikilink_at_position() {
    let doc = parse_str("intro [[alpha]] and [[beta|B]]", ExtractionMode::Ast).unwrap();

    let at = |character| doc.wikilink_at(Position { line: 0, character });
    assert_eq!(at(6).map(|l| l.target.as_str()), Some("alpha"));
    assert_eq!(at(15).map(|l| l.target.as_str()), Some("alpha"));
    assert_eq!(at(18).map(|l| l.target.as_str()), None);
    assert_eq!(at(25).map(|l| l.target.as_str()), Some("beta"));
}

#[test]
fn test_serialized_shape() {
    let doc = parse_str("---\nn: 3\n---\n- [x] [[t]]", ExtractionMode::Ast).unwrap();
    let json = serde_json::to_value(&doc).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "frontmatter": {"n": 3},
            "wikilinks": [{"target": "t", "display": null, "line": 3, "column": 6}],
            "tasks": [{"state": "x", "text": "[[t]]", "line": 3, "column": 2}],
        })
    );
}

#[test]
fn test_unicode_separators_do_not_break_lines() {
    let text = "intro\u{2028}more\u{0C} [[x]]\n[[y]]";
    for mode in [ExtractionMode::Ast, ExtractionMode::Regex] {
        let doc = parse_str(text, mode).unwrap();

        assert_eq!(doc.wikilinks[0].line, 0);
        assert_eq!(doc.wikilinks[1].line, 1);
        let cursor = Position { line: 0, character: 14 };
        assert_eq!(doc.wikilink_at(cursor).map(|link| link.target.as_str()), Some("x"));
    }
}
