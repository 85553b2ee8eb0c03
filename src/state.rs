//! Everything the editor surface needs, behind one type.
//!
//! Each method is a plain function over the scanner, the index and the
//! document store, so the protocol layer only translates parameters.

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{
    CodeActionOrCommand, CompletionResponse, Diagnostic, FileChangeType, Location, Position,
    Range, Url,
};
use tracing::{debug, info, warn};

use crate::codeactions;
use crate::commands::{self, Direction, ListItemBoundaries, ListItemMove};
use crate::completion::{self, Context};
use crate::config::Settings;
use crate::diagnostics;
use crate::documents::DocumentStore;
use crate::error::{Error, Result};
use crate::gotodef;
use crate::index::WikilinkIndex;
use crate::parser::{parse_or_empty, ExtractionMode, Wikilink};
use crate::scanner::{FileRecord, ScanSummary, Scanner};

#[derive(Debug)]
pub struct WorkspaceState {
    pub settings: Settings,
    pub scanner: Scanner,
    pub index: WikilinkIndex,
    pub documents: DocumentStore,
}

impl WorkspaceState {
    pub fn new(settings: Settings) -> Self {
        WorkspaceState {
            scanner: Scanner::new(&settings),
            index: WikilinkIndex::new(),
            documents: DocumentStore::new(settings.extraction),
            settings,
        }
    }

    /// Sets the workspace roots, scans them and builds the index.
    pub async fn initialize(&self, roots: &[String], cancel: &CancellationToken) -> Result<ScanSummary> {
        self.scanner.initialize(roots)?;
        Ok(self.rescan(cancel).await)
    }

    /// Full rescan followed by a full index rebuild.
    pub async fn rescan(&self, cancel: &CancellationToken) -> ScanSummary {
        let summary = self.scanner.scan_all(cancel).await;
        if !summary.cancelled {
            self.rebuild_index();
        }
        summary
    }

    /// Re-indexes every file from disk, except tracked documents, which are
    /// indexed from their editor content.
    pub fn rebuild_index(&self) {
        let files = self.scanner.list();
        let records: Vec<&FileRecord> = files.iter().collect();
        let mode = self.settings.extraction;

        let mut parsed: Vec<(Url, Vec<Wikilink>)> = records
            .par_iter()
            .filter(|record| !self.documents.is_tracked(&record.uri))
            .filter_map(|record| {
                let links = read_wikilinks(record, mode)?;
                Some((record.uri.clone(), links))
            })
            .collect();
        parsed.extend(self.documents.uris().into_iter().filter_map(|uri| {
            let document = self.documents.get(&uri)?;
            Some((uri, document.parsed.wikilinks))
        }));

        self.index.replace_all(&parsed, &files);

        info!(
            files = files.len(),
            targets = self.index.len(),
            "workspace index built"
        );
    }

    pub fn did_open(&self, uri: Url, text: String, version: i32) -> Vec<Diagnostic> {
        let document = self.documents.open(uri.clone(), text, version);
        self.index
            .refresh_document(&uri, &document.parsed.wikilinks, &self.scanner.list());
        diagnostics::diagnostics(&self.index, &self.settings, &document.parsed)
    }

    /// `None` when `uri` is not tracked.
    pub fn did_change(&self, uri: &Url, text: String, version: i32) -> Option<Vec<Diagnostic>> {
        let document = self.documents.change(uri, text, version)?;
        self.index
            .refresh_document(uri, &document.parsed.wikilinks, &self.scanner.list());
        Some(diagnostics::diagnostics(
            &self.index,
            &self.settings,
            &document.parsed,
        ))
    }

    /// Stops tracking `uri` and drops its references. A file still on disk
    /// is indexed again from its saved content.
    pub fn did_close(&self, uri: &Url) {
        if self.documents.close(uri).is_none() {
            return;
        }
        self.index.remove_document(uri);

        if let Some(record) = self.scanner.get(uri) {
            self.index_from_disk(&record);
        }
    }

    /// Applies external file events and returns fresh diagnostics for every
    /// tracked document. Tracked documents deleted on disk get an empty set.
    pub fn did_change_watched_files(
        &self,
        changes: &[(Url, FileChangeType)],
    ) -> Vec<(Url, Vec<Diagnostic>)> {
        let mut cleared = Vec::new();
        for (uri, change) in changes {
            match *change {
                FileChangeType::CREATED | FileChangeType::CHANGED => {
                    // the file set follows disk; tracked content stays with the editor
                    match self.scanner.add_file(uri) {
                        Ok(Some(record)) if !self.documents.is_tracked(uri) => {
                            self.index_from_disk(&record)
                        }
                        Ok(_) => {}
                        Err(err) => warn!("{err}"),
                    }
                }
                FileChangeType::DELETED => {
                    self.scanner.remove_file(uri);
                    if self.documents.external_delete(uri).is_some() {
                        cleared.push((uri.clone(), Vec::new()));
                    }
                    self.index.remove_document(uri);
                }
                other => debug!(?other, "ignoring file change"),
            }
        }

        self.index.reresolve_all(&self.scanner.list());
        cleared.extend(self.tracked_diagnostics());
        cleared
    }

    /// Adds and removes workspace roots, then rescans.
    pub async fn did_change_workspace_folders(
        &self,
        added: &[Url],
        removed: &[Url],
        cancel: &CancellationToken,
    ) -> Vec<(Url, Vec<Diagnostic>)> {
        for uri in removed {
            if let Err(err) = self.scanner.remove_root(uri.as_str()) {
                warn!("{err}");
            }
        }
        for uri in added {
            if let Err(err) = self.scanner.add_root(uri.as_str()) {
                warn!("{err}");
            }
        }

        self.rescan(cancel).await;
        self.tracked_diagnostics()
    }

    pub fn diagnostics(&self, uri: &Url) -> Option<Vec<Diagnostic>> {
        let document = self.documents.get(uri)?;
        Some(diagnostics::diagnostics(
            &self.index,
            &self.settings,
            &document.parsed,
        ))
    }

    pub fn tracked_diagnostics(&self) -> Vec<(Url, Vec<Diagnostic>)> {
        self.documents
            .uris()
            .into_iter()
            .filter_map(|uri| {
                let diags = self.diagnostics(&uri)?;
                Some((uri, diags))
            })
            .collect()
    }

    pub fn completion(&self, uri: &Url, position: Position) -> Option<CompletionResponse> {
        let document = self.documents.get(uri)?;
        let files = self.scanner.list();

        completion::get_completions(
            Context {
                files: &files,
                index: &self.index,
                uri,
                document: &document,
                settings: &self.settings,
            },
            position,
        )
    }

    pub fn code_actions(
        &self,
        uri: &Url,
        range: Range,
        diagnostics: &[Diagnostic],
    ) -> Vec<CodeActionOrCommand> {
        codeactions::code_actions(uri, range, diagnostics, &self.index)
    }

    pub fn goto_definition(&self, uri: &Url, position: Position) -> Result<Option<Location>> {
        let Some(document) = self.documents.get(uri) else {
            return Ok(None);
        };
        gotodef::goto_definition(&self.scanner, &self.index, &document, position)
    }

    pub fn list_item_boundaries(&self, uri: &Url, line: u32) -> Option<ListItemBoundaries> {
        let document = self.documents.get(uri)?;
        commands::list_item_boundaries(&document.text, line)
    }

    pub fn move_list_item(&self, uri: &Url, line: u32, direction: Direction) -> Option<ListItemMove> {
        let document = self.documents.get(uri)?;
        commands::move_list_item(&document.text, line, direction)
    }

    fn index_from_disk(&self, record: &FileRecord) {
        if let Some(links) = read_wikilinks(record, self.settings.extraction) {
            self.index
                .refresh_document(&record.uri, &links, &self.scanner.list());
        }
    }
}

fn read_wikilinks(record: &FileRecord, mode: ExtractionMode) -> Option<Vec<Wikilink>> {
    let path = record.path();
    match std::fs::read_to_string(&path) {
        Ok(text) => Some(parse_or_empty(&text, mode).wikilinks),
        Err(err) => {
            warn!("{}", Error::io(path, err));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::test_utils::{create_test_workspace_dir, write_file};

    async fn state_for(root: &std::path::Path) -> WorkspaceState {
        let state = WorkspaceState::new(Settings::default());
        state
            .initialize(
                &[root.to_string_lossy().to_string()],
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        state
    }

    fn uri(root: &std::path::Path, relative: &str) -> Url {
        Url::from_file_path(root.join(relative)).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_indexes_workspace() {
        let (_temp_dir, root) = create_test_workspace_dir();
        write_file(&root, "a.md", "[[b]] [[missing]]");
        write_file(&root, "b.md", "[[a]]");

        let state = state_for(&root).await;

        assert!(state.index.get("b").unwrap().exists);
        assert!(!state.index.get("missing").unwrap().exists);
        assert!(state
            .index
            .get("a")
            .unwrap()
            .referenced_by
            .contains(&uri(&root, "b.md")));
    }

    #[tokio::test]
    async fn test_open_change_close_cycle() {
        let (_temp_dir, root) = create_test_workspace_dir();
        write_file(&root, "a.md", "[[saved]]");
        write_file(&root, "saved.md", "");
        let state = state_for(&root).await;
        let a = uri(&root, "a.md");

        let diags = state.did_open(a.clone(), "[[unsaved]]".to_string(), 1);
        assert_eq!(diags.len(), 1);
        assert!(state.index.get("saved").unwrap().referenced_by.is_empty());

        let diags = state.did_change(&a, "[[saved]]".to_string(), 2).unwrap();
        assert!(diags.is_empty());
        assert!(state.index.get("unsaved").is_none());

        state.did_change(&a, "[[unsaved-again]]".to_string(), 3);
        state.did_close(&a);
        assert!(state.index.get("unsaved-again").is_none());
        assert!(state.index.get("saved").unwrap().referenced_by.contains(&a));
        assert!(state.did_change(&a, "x".to_string(), 4).is_none());
    }

    #[tokio::test]
    async fn test_watched_files_update_resolution() {
        let (_temp_dir, root) = create_test_workspace_dir();
        write_file(&root, "a.md", "[[later]]");
        let state = state_for(&root).await;
        let a = uri(&root, "a.md");
        state.did_open(a.clone(), "[[later]]".to_string(), 1);

        let later = write_file(&root, "later.md", "# Later");
        let later_uri = Url::from_file_path(&later).unwrap();
        let published = state.did_change_watched_files(&[(later_uri.clone(), FileChangeType::CREATED)]);

        assert_eq!(published, vec![(a.clone(), Vec::new())]);
        assert!(state.index.get("later").unwrap().exists);

        fs::remove_file(&later).unwrap();
        let published = state.did_change_watched_files(&[(later_uri, FileChangeType::DELETED)]);
        assert_eq!(published[0].1.len(), 1);
        assert!(!state.index.get("later").unwrap().exists);
    }

    #[tokio::test]
    async fn test_external_delete_of_tracked_document() {
        let (_temp_dir, root) = create_test_workspace_dir();
        let path = write_file(&root, "a.md", "[[a]]");
        let state = state_for(&root).await;
        let a = uri(&root, "a.md");
        state.did_open(a.clone(), "[[nowhere]]".to_string(), 1);

        fs::remove_file(&path).unwrap();
        let published = state.did_change_watched_files(&[(a.clone(), FileChangeType::DELETED)]);

        assert_eq!(published, vec![(a.clone(), Vec::new())]);
        assert!(!state.documents.is_tracked(&a));
        assert!(state.index.get("nowhere").is_none());
        assert!(state.scanner.get(&a).is_none());
    }

    #[tokio::test]
    async fn test_saving_new_tracked_document_adds_it_to_file_set() {
        let (_temp_dir, root) = create_test_workspace_dir();
        write_file(&root, "index.md", "[[new-note]]");
        let state = state_for(&root).await;
        let new_note = uri(&root, "new-note.md");
        state.did_open(new_note.clone(), "# New note\n[[draft]]".to_string(), 1);
        assert!(!state.index.get("new-note").unwrap().exists);

        write_file(&root, "new-note.md", "# Saved");
        state.did_change_watched_files(&[(new_note.clone(), FileChangeType::CREATED)]);

        assert!(state.scanner.get(&new_note).is_some());
        assert!(state.index.get("new-note").unwrap().exists);
        assert!(state.index.get("draft").unwrap().referenced_by.contains(&new_note));
        assert_eq!(state.documents.get(&new_note).unwrap().text, "# New note\n[[draft]]");
    }

    #[tokio::test]
    async fn test_external_change_keeps_tracked_content() {
        let (_temp_dir, root) = create_test_workspace_dir();
        let path = write_file(&root, "a.md", "[[one]]");
        let state = state_for(&root).await;
        let a = uri(&root, "a.md");
        state.did_open(a.clone(), "[[editor]]".to_string(), 1);

        fs::write(&path, "[[disk]]").unwrap();
        state.did_change_watched_files(&[(a.clone(), FileChangeType::CHANGED)]);

        assert_eq!(state.documents.get(&a).unwrap().text, "[[editor]]");
        assert!(state.index.get("disk").is_none());
    }

    #[tokio::test]
    async fn test_workspace_folders_change() {
        let (_temp_dir, root) = create_test_workspace_dir();
        let other = root.parent().unwrap().join("other");
        write_file(&root, "a.md", "[[b]]");
        write_file(&other, "b.md", "");
        let state = state_for(&root).await;
        assert!(!state.index.get("b").unwrap().exists);

        let other_uri = Url::from_directory_path(&other).unwrap();
        state
            .did_change_workspace_folders(&[other_uri.clone()], &[], &CancellationToken::new())
            .await;
        assert!(state.index.get("b").unwrap().exists);

        state
            .did_change_workspace_folders(&[], &[other_uri], &CancellationToken::new())
            .await;
        assert!(!state.index.get("b").unwrap().exists);
    }
}
