//! Documents currently open in the editor.
//!
//! ```text
//! (absent)  --open-->            (tracked, T0, V0)
//! (tracked) --change-->          (tracked, Tn, Vn)
//! (tracked) --close-->           (absent)
//! (tracked) --external delete--> (absent)
//! ```
//!
//! The editor is authoritative for tracked content: changes on disk never
//! overwrite it.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tower_lsp::lsp_types::Url;

use crate::parser::{parse_or_empty, ExtractionMode, ParsedDoc};

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedDocument {
    pub text: String,
    pub version: i32,
    /// Parse of `text`, refreshed on every change
    pub parsed: ParsedDoc,
}

impl TrackedDocument {
    fn new(text: String, version: i32, mode: ExtractionMode) -> Self {
        let parsed = parse_or_empty(&text, mode);
        TrackedDocument {
            text,
            version,
            parsed,
        }
    }
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: RwLock<HashMap<Url, TrackedDocument>>,
    mode: ExtractionMode,
}

impl DocumentStore {
    pub fn new(mode: ExtractionMode) -> Self {
        DocumentStore {
            documents: RwLock::new(HashMap::new()),
            mode,
        }
    }

    /// Starts tracking `uri`, replacing anything tracked before.
    pub fn open(&self, uri: Url, text: String, version: i32) -> TrackedDocument {
        let document = TrackedDocument::new(text, version, self.mode);
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri, document.clone());
        document
    }

    /// Replaces the content of a tracked document. Untracked URIs are
    /// ignored and yield `None`.
    pub fn change(&self, uri: &Url, text: String, version: i32) -> Option<TrackedDocument> {
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        let slot = documents.get_mut(uri)?;
        *slot = TrackedDocument::new(text, version, self.mode);
        Some(slot.clone())
    }

    pub fn close(&self, uri: &Url) -> Option<TrackedDocument> {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri)
    }

    /// Drops a document whose file was deleted on disk.
    pub fn external_delete(&self, uri: &Url) -> Option<TrackedDocument> {
        self.close(uri)
    }

    pub fn get(&self, uri: &Url) -> Option<TrackedDocument> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
    }

    pub fn is_tracked(&self, uri: &Url) -> bool {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(uri)
    }

    /// Every tracked URI, sorted.
    pub fn uris(&self) -> Vec<Url> {
        let mut uris: Vec<Url> = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        uris.sort();
        uris
    }
}
