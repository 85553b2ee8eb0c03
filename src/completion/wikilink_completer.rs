use std::collections::HashSet;

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionTextEdit, Position, Range, TextEdit,
};

use crate::scanner::{basename, strip_ext};

use super::{Completer, Context, WikilinkContext};

pub struct WikilinkCompleter<'a> {
    context: Context<'a>,
    wikilink: WikilinkContext,
    line_nr: usize,
    /// Target of the complete link the cursor is in, if any
    under_cursor: Option<String>,
}

/// A completion candidate before it becomes a `CompletionItem`.
struct Candidate {
    label: String,
    sort_key: String,
    kind: CompletionItemKind,
    detail: String,
}

impl<'a> Completer<'a> for WikilinkCompleter<'a> {
    fn construct(context: Context<'a>, line: usize, character: usize) -> Option<Self> {
        let line_text = context.document.text.lines().nth(line).unwrap_or_default();
        let wikilink = WikilinkContext::detect(line_text, character)?;

        let under_cursor = context
            .document
            .parsed
            .wikilink_at(Position {
                line: line as u32,
                character: character as u32,
            })
            .map(|link| link.target.clone());

        Some(WikilinkCompleter {
            context,
            wikilink,
            line_nr: line,
            under_cursor,
        })
    }

    fn completions(&self) -> Vec<CompletionItem> {
        let prefix = self.wikilink.prefix.trim_start().to_lowercase();

        let mut seen = HashSet::new();
        let mut candidates: Vec<Candidate> = self
            .candidates()
            .into_iter()
            .filter(|candidate| candidate.label.to_lowercase().starts_with(&prefix))
            .filter(|candidate| seen.insert(candidate.label.clone()))
            .collect();

        candidates.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
        candidates.truncate(self.context.settings.completion_limit);

        candidates
            .into_iter()
            .map(|candidate| self.completion_item(candidate))
            .collect()
    }
}

impl WikilinkCompleter<'_> {
    fn candidates(&self) -> Vec<Candidate> {
        let files = self
            .context
            .files
            .iter()
            .filter(|record| &record.uri != self.context.uri)
            .flat_map(|record| {
                let path = record.relative_path.as_str();
                let by_name = Candidate {
                    label: strip_ext(basename(path)).to_string(),
                    sort_key: format!("0_{}", strip_ext(basename(path))),
                    kind: CompletionItemKind::FILE,
                    detail: path.to_string(),
                };
                let by_path = (!record.is_top_level()).then(|| Candidate {
                    label: strip_ext(path).to_string(),
                    sort_key: format!("1_{}", strip_ext(path)),
                    kind: CompletionItemKind::FILE,
                    detail: path.to_string(),
                });
                std::iter::once(by_name).chain(by_path)
            });

        let unresolved = self
            .context
            .index
            .non_existent_targets()
            .into_iter()
            .filter(|(_, info)| !info.referenced_by.is_empty())
            // the link being edited is its own only reference
            .filter(|(target, info)| {
                !(info.referenced_by.len() == 1 && self.under_cursor.as_ref() == Some(target))
            })
            .map(|(target, _)| Candidate {
                sort_key: format!("2_{target}"),
                label: target,
                kind: CompletionItemKind::REFERENCE,
                detail: "unresolved".to_string(),
            });

        files.chain(unresolved).collect()
    }

    fn completion_item(&self, candidate: Candidate) -> CompletionItem {
        let inserted = format!("{}{}", candidate.label, self.wikilink.rest);
        let closing = if self.wikilink.is_complete { "" } else { "]]" };

        CompletionItem {
            label: candidate.label,
            kind: Some(candidate.kind),
            detail: Some(candidate.detail),
            sort_text: Some(candidate.sort_key),
            filter_text: Some(inserted.clone()),
            text_edit: Some(CompletionTextEdit::Edit(TextEdit {
                range: Range {
                    start: Position {
                        line: self.line_nr as u32,
                        character: self.wikilink.start as u32,
                    },
                    end: Position {
                        line: self.line_nr as u32,
                        character: self.wikilink.end as u32,
                    },
                },
                new_text: format!("{inserted}{closing}"),
            })),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tower_lsp::lsp_types::{CompletionResponse, Url};

    use super::*;
    use crate::completion::get_completions;
    use crate::config::Settings;
    use crate::documents::DocumentStore;
    use crate::index::WikilinkIndex;
    use crate::parser::ExtractionMode;
    use crate::scanner::{FileRecord, FileSet};

    fn file_set(paths: &[&str]) -> FileSet {
        let root = PathBuf::from("/w");
        paths
            .iter()
            .filter_map(|path| FileRecord::new(&root, &root.join(path), None, 0))
            .collect()
    }

    fn complete(text: &str, position: Position, paths: &[&str], settings: &Settings) -> Vec<CompletionItem> {
        let uri = Url::parse("file:///w/current.md").unwrap();
        let files = file_set(paths);
        let store = DocumentStore::new(ExtractionMode::Ast);
        let document = store.open(uri.clone(), text.to_string(), 1);

        let index = WikilinkIndex::new();
        index.refresh_document(&uri, &document.parsed.wikilinks, &files);

        let context = Context {
            files: &files,
            index: &index,
            uri: &uri,
            document: &document,
            settings,
        };

        match get_completions(context, position) {
            Some(CompletionResponse::List(list)) => list.items,
            Some(CompletionResponse::Array(items)) => items,
            None => Vec::new(),
        }
    }

    fn new_text(item: &CompletionItem) -> &str {
        match &item.text_edit {
            Some(CompletionTextEdit::Edit(edit)) => &edit.new_text,
            _ => "",
        }
    }

    #[test]
    fn test_basename_and_path_candidates() {
        let items = complete(
            "[[con",
            Position { line: 0, character: 5 },
            &["current.md", "docs/config.md", "contact.md", "readme.md"],
            &Settings::default(),
        );

        let labels: Vec<_> = items.iter().map(|item| item.label.as_str()).collect();
        assert_eq!(labels, vec!["config", "contact"]);
        assert_eq!(new_text(&items[0]), "config]]");
        assert_eq!(items[0].sort_text.as_deref(), Some("0_config"));
    }

    #[test]
    fn test_path_candidates_for_qualified_prefix() {
        let items = complete(
            "[[docs/",
            Position { line: 0, character: 7 },
            &["docs/config.md", "docs/setup.md"],
            &Settings::default(),
        );

        let labels: Vec<_> = items.iter().map(|item| item.label.as_str()).collect();
        assert_eq!(labels, vec!["docs/config", "docs/setup"]);
    }

    #[test]
    fn test_complete_link_gets_no_closing_brackets() {
        let items = complete(
            "x [[Rea]] y",
            Position { line: 0, character: 7 },
            &["README.md"],
            &Settings::default(),
        );

        assert_eq!(items.len(), 1);
        assert_eq!(new_text(&items[0]), "README");
        let Some(CompletionTextEdit::Edit(edit)) = &items[0].text_edit else {
            panic!("expected a text edit");
        };
        assert_eq!(edit.range.start.character, 4);
        assert_eq!(edit.range.end.character, 7);
    }

    #[test]
    fn test_unresolved_targets_are_offered() {
        let items = complete(
            "[[todo-later]]\n[[to",
            Position { line: 1, character: 4 },
            &["topics.md"],
            &Settings::default(),
        );

        let labels: Vec<_> = items.iter().map(|item| item.label.as_str()).collect();
        assert_eq!(labels, vec!["topics", "todo-later"]);
        assert_eq!(items[1].kind, Some(CompletionItemKind::REFERENCE));
    }

    #[test]
    fn test_display_text_is_preserved() {
        let items = complete(
            "[[se|Setup",
            Position { line: 0, character: 10 },
            &["setup.md"],
            &Settings::default(),
        );

        assert_eq!(new_text(&items[0]), "setup|Setup]]");
    }

    #[test]
    fn test_duplicates_and_limit() {
        let settings = Settings {
            completion_limit: 2,
            ..Settings::default()
        };
        let items = complete(
            "[[",
            Position { line: 0, character: 2 },
            &["a/note.md", "b/note.md", "c.md"],
            &settings,
        );

        let labels: Vec<_> = items.iter().map(|item| item.label.as_str()).collect();
        assert_eq!(labels, vec!["c", "note"]);
    }

    #[test]
    fn test_outside_wikilink_gives_nothing() {
        assert!(complete(
            "plain text",
            Position { line: 0, character: 4 },
            &["a.md"],
            &Settings::default()
        )
        .is_empty());
    }
}
