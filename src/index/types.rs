use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_lsp::lsp_types::Url;

/// Resolution state of one wikilink target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    /// At least one file matched at the most recent resolution
    pub exists: bool,
    /// Documents with at least one link to this target
    pub referenced_by: BTreeSet<Url>,
    /// Relative paths of the matching files
    pub matching_files: Vec<String>,
    pub is_ambiguous: bool,
    /// Relative path to create when nothing matches; empty otherwise
    pub suggested_uri: String,
    pub last_seen: DateTime<Utc>,
}

impl TargetInfo {
    pub(super) fn new() -> Self {
        TargetInfo {
            exists: false,
            referenced_by: BTreeSet::new(),
            matching_files: Vec::new(),
            is_ambiguous: false,
            suggested_uri: String::new(),
            last_seen: Utc::now(),
        }
    }

    /// Replaces the matching files and everything derived from them.
    pub(super) fn set_matching_files(&mut self, target: &str, files: Vec<String>) {
        self.exists = !files.is_empty();
        self.is_ambiguous = files.len() > 1;
        self.matching_files = files;
        self.suggested_uri = if self.exists {
            String::new()
        } else {
            crate::resolver::suggested_uri(target)
        };
    }

    /// Neither referenced nor backed by a file.
    pub(super) fn is_orphan(&self) -> bool {
        self.referenced_by.is_empty() && !self.exists
    }
}
