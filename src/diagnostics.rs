use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};

use crate::config::Settings;
use crate::index::WikilinkIndex;
use crate::parser::{ParsedDoc, TaskRef, Wikilink};

pub const WIKILINK_SOURCE: &str = "notedown-wikilink";
pub const TASK_SOURCE: &str = "notedown-task";

pub const NON_EXISTENT_TARGET: &str = "non-existent-target";
pub const AMBIGUOUS_WIKILINK: &str = "ambiguous-wikilink";
pub const INVALID_TASK_STATE: &str = "invalid-task-state";

const AMBIGUOUS_PREFIX: &str = "Ambiguous wikilink '";
const AMBIGUOUS_INFIX: &str = "' matches multiple files: ";

/// Diagnostics for one document, given the index state it was refreshed
/// into.
pub fn diagnostics(index: &WikilinkIndex, settings: &Settings, doc: &ParsedDoc) -> Vec<Diagnostic> {
    let mut diags: Vec<Diagnostic> = doc
        .wikilinks
        .iter()
        .filter_map(|link| wikilink_diagnostic(index, settings, link))
        .collect();

    if settings.task_diagnostics {
        let valid = settings.valid_task_states();
        let mut expected: Vec<&str> = valid.iter().copied().collect();
        expected.sort_unstable();

        diags.extend(
            doc.tasks
                .iter()
                .filter(|task| !valid.contains(task.state.as_str()))
                .map(|task| task_diagnostic(task, &expected)),
        );
    }

    diags
}

fn wikilink_diagnostic(index: &WikilinkIndex, settings: &Settings, link: &Wikilink) -> Option<Diagnostic> {
    let info = index.get(&link.target)?;

    let (code, message) = if !info.exists {
        if !settings.unresolved_diagnostics {
            return None;
        }
        (
            NON_EXISTENT_TARGET,
            format!("Wikilink target '{}' does not exist", link.target),
        )
    } else if info.is_ambiguous {
        if !settings.ambiguous_diagnostics {
            return None;
        }
        (
            AMBIGUOUS_WIKILINK,
            ambiguous_message(&link.target, &info.matching_files),
        )
    } else {
        return None;
    };

    Some(Diagnostic {
        range: *link.range,
        severity: Some(DiagnosticSeverity::WARNING),
        code: Some(NumberOrString::String(code.to_string())),
        source: Some(WIKILINK_SOURCE.to_string()),
        message,
        ..Default::default()
    })
}

fn task_diagnostic(task: &TaskRef, expected: &[&str]) -> Diagnostic {
    let expected = expected
        .iter()
        .map(|state| format!("'{state}'"))
        .collect::<Vec<_>>()
        .join(", ");

    Diagnostic {
        range: *task.range,
        severity: Some(DiagnosticSeverity::WARNING),
        code: Some(NumberOrString::String(INVALID_TASK_STATE.to_string())),
        source: Some(TASK_SOURCE.to_string()),
        message: format!("Invalid task state '{}'; expected one of {expected}", task.state),
        ..Default::default()
    }
}

pub fn ambiguous_message(target: &str, matching_files: &[String]) -> String {
    format!(
        "{AMBIGUOUS_PREFIX}{target}{AMBIGUOUS_INFIX}{}",
        matching_files.join(", ")
    )
}

/// Recovers the target from an ambiguity message.
pub fn target_from_ambiguous_message(message: &str) -> Option<&str> {
    let rest = message.strip_prefix(AMBIGUOUS_PREFIX)?;
    let end = rest.find(AMBIGUOUS_INFIX)?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tower_lsp::lsp_types::{Position, Range, Url};

    use super::*;
    use crate::parser::{parse_str, ExtractionMode};
    use crate::scanner::{FileRecord, FileSet};

    fn setup(text: &str, paths: &[&str]) -> (WikilinkIndex, ParsedDoc) {
        let root = PathBuf::from("/w");
        let files: FileSet = paths
            .iter()
            .filter_map(|path| FileRecord::new(&root, &root.join(path), None, 0))
            .collect();

        let doc = parse_str(text, ExtractionMode::Ast).unwrap();
        let index = WikilinkIndex::new();
        index.refresh_document(&Url::parse("file:///w/doc.md").unwrap(), &doc.wikilinks, &files);
        (index, doc)
    }

    fn code(diag: &Diagnostic) -> &str {
        match &diag.code {
            Some(NumberOrString::String(code)) => code,
            _ => "",
        }
    }

    #[test]
    fn test_non_existent_target() {
        let (index, doc) = setup("See [[missing]] here", &["other.md"]);
        let diags = diagnostics(&index, &Settings::default(), &doc);

        assert_eq!(diags.len(), 1);
        assert_eq!(code(&diags[0]), NON_EXISTENT_TARGET);
        assert_eq!(diags[0].source.as_deref(), Some(WIKILINK_SOURCE));
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(
            diags[0].range,
            Range {
                start: Position { line: 0, character: 4 },
                end: Position { line: 0, character: 15 },
            }
        );
    }

    #[test]
    fn test_ambiguous_target_message() {
        let (index, doc) = setup("[[config]]", &["api/config.md", "docs/config.md"]);
        let diags = diagnostics(&index, &Settings::default(), &doc);

        assert_eq!(diags.len(), 1);
        assert_eq!(code(&diags[0]), AMBIGUOUS_WIKILINK);
        assert_eq!(
            diags[0].message,
            "Ambiguous wikilink 'config' matches multiple files: api/config.md, docs/config.md"
        );
        assert_eq!(target_from_ambiguous_message(&diags[0].message), Some("config"));
    }

    #[test]
    fn test_resolved_target_has_no_diagnostic() {
        let (index, doc) = setup("[[config]] [[docs/config|c]]", &["docs/config.md"]);
        assert!(diagnostics(&index, &Settings::default(), &doc).is_empty());
    }

    #[test]
    fn test_invalid_task_state() {
        let (index, doc) = setup("- [ ] ok\n- [wip] Work in progress\n- [completed] done", &[]);
        let diags = diagnostics(&index, &Settings::default(), &doc);

        assert_eq!(diags.len(), 1);
        assert_eq!(code(&diags[0]), INVALID_TASK_STATE);
        assert_eq!(diags[0].source.as_deref(), Some(TASK_SOURCE));
        assert_eq!(
            diags[0].range,
            Range {
                start: Position { line: 1, character: 2 },
                end: Position { line: 1, character: 7 },
            }
        );
    }

    #[test]
    fn test_settings_disable_each_kind() {
        let (index, doc) = setup("[[missing]] [[config]]\n- [?] task", &["a/config.md", "b/config.md"]);

        let settings = Settings {
            unresolved_diagnostics: false,
            ambiguous_diagnostics: false,
            task_diagnostics: false,
            ..Settings::default()
        };
        assert!(diagnostics(&index, &settings, &doc).is_empty());
        assert_eq!(diagnostics(&index, &Settings::default(), &doc).len(), 3);
    }

    #[test]
    fn test_target_from_unrelated_message() {
        assert_eq!(target_from_ambiguous_message("Wikilink target 'x' does not exist"), None);
    }
}
