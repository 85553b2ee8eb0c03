//! Workspace scanning: turns root directories into a [`FileSet`] of Markdown
//! files and keeps it current as single files appear and disappear.

mod exclude;
mod helpers;
mod types;

pub use exclude::ExclusionPolicy;
pub use helpers::{
    basename, clean_path, file_uri, is_markdown_path, relative_posix_path, root_from_str,
    strip_ext,
};
pub use types::{FileRecord, FileSet};

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::Url;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Settings;
use crate::error::{Error, Result};

/// What a full scan did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
    pub file_count: usize,
    /// The walk stopped at `max_file_count`; the file set is partial.
    pub limit_reached: bool,
    /// The scan was cancelled and the previous file set was kept.
    pub cancelled: bool,
}

/// Owns the workspace roots and the current [`FileSet`].
///
/// Writers hold the lock only for a single structural change; readers get
/// snapshot copies through [`Scanner::list`].
#[derive(Debug, Default)]
pub struct Scanner {
    roots: RwLock<Vec<PathBuf>>,
    files: RwLock<FileSet>,
    policy: ExclusionPolicy,
}

struct WalkOutcome {
    files: FileSet,
    limit_reached: bool,
}

impl Scanner {
    pub fn new(settings: &Settings) -> Self {
        Scanner::with_policy(ExclusionPolicy::from_settings(settings))
    }

    pub fn with_policy(policy: ExclusionPolicy) -> Self {
        Scanner {
            roots: RwLock::new(Vec::new()),
            files: RwLock::new(FileSet::new()),
            policy,
        }
    }

    /// Resets the scanner to the given roots with an empty file set.
    ///
    /// Each entry is a `file://` URI or an absolute path; anything else is
    /// rejected and the scanner is left untouched.
    pub fn initialize(&self, roots: &[String]) -> Result<()> {
        let mut parsed = Vec::with_capacity(roots.len());
        for entry in roots {
            let root = root_from_str(entry)?;
            if !parsed.contains(&root) {
                parsed.push(root);
            }
        }

        *self.roots.write().unwrap_or_else(PoisonError::into_inner) = parsed;
        *self.files.write().unwrap_or_else(PoisonError::into_inner) = FileSet::new();
        Ok(())
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The first root; new files created on behalf of the editor go here.
    pub fn primary_root(&self) -> Option<PathBuf> {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .first()
            .cloned()
    }

    pub fn add_root(&self, entry: &str) -> Result<PathBuf> {
        let root = root_from_str(entry)?;
        let mut roots = self.roots.write().unwrap_or_else(PoisonError::into_inner);
        if !roots.contains(&root) {
            roots.push(root.clone());
        }
        Ok(root)
    }

    /// Forgets a root and every record found under it.
    pub fn remove_root(&self, entry: &str) -> Result<usize> {
        let root = root_from_str(entry)?;
        self.roots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|existing| existing != &root);

        let removed = self
            .files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove_root(&root);
        Ok(removed)
    }

    /// Walks every root on a blocking task and swaps the result in.
    ///
    /// The new set is built off to the side; on cancellation the current
    /// file set is left exactly as it was.
    pub async fn scan_all(&self, cancel: &CancellationToken) -> ScanSummary {
        let roots = self.roots();
        let policy = self.policy.clone();
        let walk_cancel = cancel.clone();

        let outcome = tokio::task::spawn_blocking(move || walk_roots(&roots, &policy, &walk_cancel))
            .await
            .unwrap_or_else(|err| {
                warn!("workspace scan task failed: {err}");
                None
            });

        self.install(outcome)
    }

    /// Same as [`Scanner::scan_all`] for callers without a runtime.
    pub fn scan_all_blocking(&self) -> ScanSummary {
        let outcome = walk_roots(&self.roots(), &self.policy, &CancellationToken::new());
        self.install(outcome)
    }

    fn install(&self, outcome: Option<WalkOutcome>) -> ScanSummary {
        let Some(outcome) = outcome else {
            info!("workspace scan cancelled; keeping previous file set");
            return ScanSummary {
                file_count: self.len(),
                limit_reached: false,
                cancelled: true,
            };
        };

        let file_count = outcome.files.len();
        *self.files.write().unwrap_or_else(PoisonError::into_inner) = outcome.files;
        debug!(file_count, "workspace scan complete");

        ScanSummary {
            file_count,
            limit_reached: outcome.limit_reached,
            cancelled: false,
        }
    }

    /// Records a single file. Returns `Ok(None)` when the file is not
    /// something the scanner indexes (wrong extension, excluded directory,
    /// outside every root, or the file limit is reached).
    pub fn add_file(&self, uri: &Url) -> Result<Option<FileRecord>> {
        let Ok(path) = uri.to_file_path() else {
            return Ok(None);
        };
        let path = clean_path(&path);

        if !self.policy.indexes_file(&path) {
            return Ok(None);
        }

        let Some((root, relative)) = self.locate(&path) else {
            return Ok(None);
        };
        if self.policy.excludes_relative(&relative) {
            return Ok(None);
        }

        let metadata = std::fs::metadata(&path).map_err(|err| Error::io(&path, err))?;
        if !metadata.is_file() {
            return Ok(None);
        }

        let Some(record) = FileRecord::from_metadata(&root, &path, &metadata) else {
            return Ok(None);
        };

        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        if !files.contains(&record.uri) && files.len() >= self.policy.max_file_count {
            warn!(
                "{}",
                Error::LimitExceeded {
                    limit: self.policy.max_file_count
                }
            );
            return Ok(None);
        }
        files.insert(record.clone());

        Ok(Some(record))
    }

    pub fn remove_file(&self, uri: &Url) -> Option<FileRecord> {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri)
    }

    /// Snapshot of the current file set.
    pub fn list(&self) -> FileSet {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, uri: &Url) -> Option<FileRecord> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The innermost root containing `path`, with the path relative to it.
    fn locate(&self, path: &Path) -> Option<(PathBuf, String)> {
        self.roots()
            .into_iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .and_then(|root| {
                let relative = relative_posix_path(&root, path)?;
                Some((root, relative))
            })
    }
}

/// Walks all roots, returning `None` if cancelled part way.
fn walk_roots(
    roots: &[PathBuf],
    policy: &ExclusionPolicy,
    cancel: &CancellationToken,
) -> Option<WalkOutcome> {
    let mut files = FileSet::new();

    for root in roots {
        if !root.is_dir() {
            warn!("skipping workspace root {}: not a readable directory", root.display());
            continue;
        }

        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| !policy.skips_entry(entry))
        {
            if cancel.is_cancelled() {
                return None;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry during scan: {err}");
                    continue;
                }
            };

            if !entry.file_type().is_file() || !policy.indexes_file(entry.path()) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!("cannot stat {}: {err}", entry.path().display());
                    continue;
                }
            };

            let Some(record) = FileRecord::from_metadata(root, entry.path(), &metadata) else {
                continue;
            };

            if files.len() >= policy.max_file_count && !files.contains(&record.uri) {
                warn!(
                    "{}",
                    Error::LimitExceeded {
                        limit: policy.max_file_count
                    }
                );
                return Some(WalkOutcome {
                    files,
                    limit_reached: true,
                });
            }

            files.insert(record);
        }
    }

    Some(WalkOutcome {
        files,
        limit_reached: false,
    })
}
