//! Core types for the scanned file set.
//!
//! - `FileRecord`: one Markdown file found under a workspace root
//! - `FileSet`: the live collection of records, iterated in relative-path order

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tower_lsp::lsp_types::Url;

use super::helpers::{file_uri, relative_posix_path};

/// A Markdown file discovered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRecord {
    /// Canonical `file://` URI of the file
    pub uri: Url,
    /// Path relative to the containing root, always with `/` separators
    pub relative_path: String,
    pub mod_time: DateTime<Utc>,
    pub size: u64,
    /// The workspace root this record was found under
    pub root: PathBuf,
}

impl FileRecord {
    /// Builds a record for `path` under `root`, or `None` when the path is
    /// outside the root or cannot be expressed as a URI.
    pub fn new(root: &Path, path: &Path, modified: Option<SystemTime>, size: u64) -> Option<Self> {
        let relative_path = relative_posix_path(root, path)?;
        let uri = file_uri(path)?;

        Some(FileRecord {
            uri,
            relative_path,
            mod_time: DateTime::<Utc>::from(modified.unwrap_or(SystemTime::UNIX_EPOCH)),
            size,
            root: root.to_path_buf(),
        })
    }

    pub fn from_metadata(root: &Path, path: &Path, metadata: &std::fs::Metadata) -> Option<Self> {
        Self::new(root, path, metadata.modified().ok(), metadata.len())
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(&self.relative_path)
    }

    /// True when the file sits directly in its root.
    pub fn is_top_level(&self) -> bool {
        !self.relative_path.contains('/')
    }
}

/// The in-memory set of Markdown files under the workspace roots.
///
/// Records are keyed by URI; iteration follows the relative path (then URI)
/// so every consumer sees the same deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    records: BTreeMap<Url, FileRecord>,
    order: BTreeSet<(String, Url)>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: FileRecord) -> Option<FileRecord> {
        let previous = self.remove(&record.uri);
        self.order
            .insert((record.relative_path.clone(), record.uri.clone()));
        self.records.insert(record.uri.clone(), record);
        previous
    }

    pub fn remove(&mut self, uri: &Url) -> Option<FileRecord> {
        let record = self.records.remove(uri)?;
        self.order
            .remove(&(record.relative_path.clone(), record.uri.clone()));
        Some(record)
    }

    /// Drops every record that was found under `root`.
    pub fn remove_root(&mut self, root: &Path) -> usize {
        let doomed: Vec<Url> = self
            .records
            .values()
            .filter(|record| record.root == root)
            .map(|record| record.uri.clone())
            .collect();

        for uri in &doomed {
            self.remove(uri);
        }
        doomed.len()
    }

    pub fn get(&self, uri: &Url) -> Option<&FileRecord> {
        self.records.get(uri)
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.records.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in relative-path order.
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> + '_ {
        self.order
            .iter()
            .filter_map(|(_, uri)| self.records.get(uri))
    }

    pub fn find_by_relative_path(&self, relative_path: &str) -> Option<&FileRecord> {
        self.iter()
            .find(|record| record.relative_path == relative_path)
    }
}

impl FromIterator<FileRecord> for FileSet {
    fn from_iter<T: IntoIterator<Item = FileRecord>>(iter: T) -> Self {
        let mut set = FileSet::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}
