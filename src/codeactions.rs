//! Quickfixes for ambiguous wikilinks.

use std::collections::HashMap;

use tower_lsp::lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, Diagnostic, NumberOrString, Position, Range,
    TextEdit, Url, WorkspaceEdit,
};

use crate::diagnostics::{target_from_ambiguous_message, AMBIGUOUS_WIKILINK, WIKILINK_SOURCE};
use crate::index::WikilinkIndex;
use crate::scanner::strip_ext;

/// One "Link to <path>" quickfix per matching file, for every ambiguity
/// diagnostic overlapping `range`.
pub fn code_actions(
    uri: &Url,
    range: Range,
    diagnostics: &[Diagnostic],
    index: &WikilinkIndex,
) -> Vec<CodeActionOrCommand> {
    diagnostics
        .iter()
        .filter(|diag| is_ambiguity(diag) && ranges_overlap(diag.range, range))
        .flat_map(|diag| {
            let target = target_from_ambiguous_message(&diag.message).unwrap_or_default();
            let matching_files = index
                .get(target)
                .map(|info| info.matching_files)
                .unwrap_or_default();

            matching_files
                .into_iter()
                .map(|path| quickfix(uri, diag, target, &path))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn is_ambiguity(diag: &Diagnostic) -> bool {
    diag.source.as_deref() == Some(WIKILINK_SOURCE)
        && matches!(&diag.code, Some(NumberOrString::String(code)) if code == AMBIGUOUS_WIKILINK)
}

fn quickfix(uri: &Url, diag: &Diagnostic, target: &str, path: &str) -> CodeActionOrCommand {
    let edit = TextEdit {
        range: diag.range,
        new_text: format!("[[{}|{}]]", qualified_target(path), target),
    };

    CodeActionOrCommand::CodeAction(CodeAction {
        title: format!("Link to {path}"),
        kind: Some(CodeActionKind::QUICKFIX),
        diagnostics: Some(vec![diag.clone()]),
        edit: Some(WorkspaceEdit {
            changes: Some(HashMap::from([(uri.clone(), vec![edit])])),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// The unambiguous wikilink target for a relative path: `./name` for files
/// in the root, the extensionless path otherwise.
pub fn qualified_target(path: &str) -> String {
    let path = path.replace('\\', "/");
    if path.contains('/') {
        strip_ext(&path).to_string()
    } else {
        format!("./{}", strip_ext(&path))
    }
}

/// Ranges overlap when they share a character, so touching ends do not.
/// An empty range is a cursor and matches anywhere inside the other range,
/// including at either end.
pub fn ranges_overlap(a: Range, b: Range) -> bool {
    let key = |position: Position| (position.line, position.character);
    let within = |cursor: Position, range: Range| {
        key(range.start) <= key(cursor) && key(cursor) <= key(range.end)
    };

    if a.start == a.end {
        return within(a.start, b);
    }
    if b.start == b.end {
        return within(b.start, a);
    }
    key(a.start) < key(b.end) && key(b.start) < key(a.end)
}
