//! The wikilink index: target string to [`TargetInfo`].
//!
//! One coarse lock guards the whole map because a document refresh touches
//! many entries at once and must never be observed half done. Every query
//! returns owned copies.

mod types;

pub use types::TargetInfo;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tower_lsp::lsp_types::Url;
use tracing::debug;

use crate::parser::Wikilink;
use crate::resolver::{self, normalize_key};
use crate::scanner::FileSet;

#[derive(Debug, Default)]
struct IndexState {
    targets: HashMap<String, TargetInfo>,
    /// Keys each document currently references
    by_uri: HashMap<Url, HashSet<String>>,
}

impl IndexState {
    fn add_reference(&mut self, key: String, source: &Url, matching_files: Option<Vec<String>>) {
        let info = self.targets.entry(key.clone()).or_insert_with(|| {
            let mut info = TargetInfo::new();
            info.set_matching_files(&key, Vec::new());
            info
        });

        if let Some(files) = matching_files {
            info.set_matching_files(&key, files);
        }
        info.referenced_by.insert(source.clone());
        info.last_seen = Utc::now();

        self.by_uri.entry(source.clone()).or_default().insert(key);
    }

    fn remove_reference(&mut self, key: &str, source: &Url) {
        if let Some(info) = self.targets.get_mut(key) {
            info.referenced_by.remove(source);
            if info.is_orphan() {
                self.targets.remove(key);
            }
        }

        if let Some(keys) = self.by_uri.get_mut(source) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_uri.remove(source);
            }
        }
    }

    fn remove_document(&mut self, uri: &Url) {
        let Some(keys) = self.by_uri.remove(uri) else {
            return;
        };

        for key in keys {
            if let Some(info) = self.targets.get_mut(&key) {
                info.referenced_by.remove(uri);
                if info.is_orphan() {
                    self.targets.remove(&key);
                }
            }
        }
    }
}

/// Distinct keys of `wikilinks`, each with the files it resolves to.
fn resolve_links(wikilinks: &[Wikilink], files: &FileSet) -> Vec<(String, Vec<String>)> {
    let targets: BTreeSet<String> = wikilinks
        .iter()
        .map(|link| normalize_key(&link.target))
        .filter(|key| !key.is_empty())
        .collect();

    targets
        .into_iter()
        .map(|key| {
            let matching = resolve_or_empty(&key, files);
            (key, matching)
        })
        .collect()
}

/// Resolves a target, treating invalid targets as matching nothing.
fn resolve_or_empty(target: &str, files: &FileSet) -> Vec<String> {
    resolver::resolve(target, files).unwrap_or_else(|err| {
        debug!("{err}");
        Vec::new()
    })
}

#[derive(Debug, Default)]
pub struct WikilinkIndex {
    state: RwLock<IndexState>,
}

impl WikilinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records that `source` links to `target`.
    ///
    /// `Some(files)` replaces the resolution data; `None` leaves it as is.
    pub fn add_reference(&self, target: &str, source: &Url, matching_files: Option<Vec<String>>) {
        self.write()
            .add_reference(normalize_key(target), source, matching_files);
    }

    /// Drops `source` from the target's referrers. The entry goes away once
    /// nothing references it and no file backs it.
    pub fn remove_reference(&self, target: &str, source: &Url) {
        self.write().remove_reference(&normalize_key(target), source);
    }

    /// Replaces every reference attributed to `uri` with the targets of
    /// `wikilinks`, each resolved against `files`.
    pub fn refresh_document(&self, uri: &Url, wikilinks: &[Wikilink], files: &FileSet) {
        let resolved = resolve_links(wikilinks, files);

        let mut state = self.write();
        state.remove_document(uri);
        for (key, matching) in resolved {
            state.add_reference(key, uri, Some(matching));
        }
    }

    /// Swaps the whole index for one built from `documents`.
    ///
    /// The new map is built without holding the lock, so readers see either
    /// the old index or the new one, never a partial rebuild.
    pub fn replace_all(&self, documents: &[(Url, Vec<Wikilink>)], files: &FileSet) {
        let mut fresh = IndexState::default();
        for (uri, wikilinks) in documents {
            for (key, matching) in resolve_links(wikilinks, files) {
                fresh.add_reference(key, uri, Some(matching));
            }
        }

        *self.write() = fresh;
    }

    /// Removes every reference attributed to `uri`.
    pub fn remove_document(&self, uri: &Url) {
        self.write().remove_document(uri);
    }

    /// Resolves every known target again, e.g. after files were created or
    /// deleted on disk.
    pub fn reresolve_all(&self, files: &FileSet) {
        let mut state = self.write();

        for (key, info) in state.targets.iter_mut() {
            let matching = resolve_or_empty(key, files);
            info.set_matching_files(key, matching);
        }
        state.targets.retain(|_, info| !info.is_orphan());
    }

    pub fn get(&self, target: &str) -> Option<TargetInfo> {
        self.read().targets.get(&normalize_key(target)).cloned()
    }

    pub fn all_targets(&self) -> BTreeMap<String, TargetInfo> {
        self.read()
            .targets
            .iter()
            .map(|(key, info)| (key.clone(), info.clone()))
            .collect()
    }

    pub fn non_existent_targets(&self) -> BTreeMap<String, TargetInfo> {
        self.collect_where(|_, info| !info.exists)
    }

    pub fn ambiguous_targets_with_references(&self) -> BTreeMap<String, TargetInfo> {
        self.collect_where(|_, info| info.is_ambiguous && !info.referenced_by.is_empty())
    }

    /// Targets starting with `prefix`, ignoring case.
    pub fn by_prefix(&self, prefix: &str) -> BTreeMap<String, TargetInfo> {
        let prefix = prefix.to_lowercase();
        self.collect_where(|key, _| key.to_lowercase().starts_with(&prefix))
    }

    pub fn targets_referenced_by(&self, uri: &Url) -> BTreeSet<String> {
        self.read()
            .by_uri
            .get(uri)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.read().targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().targets.is_empty()
    }

    pub fn clear(&self) {
        *self.write() = IndexState::default();
    }

    fn collect_where(
        &self,
        predicate: impl Fn(&str, &TargetInfo) -> bool,
    ) -> BTreeMap<String, TargetInfo> {
        self.read()
            .targets
            .iter()
            .filter(|(key, info)| predicate(key, info))
            .map(|(key, info)| (key.clone(), info.clone()))
            .collect()
    }
}
