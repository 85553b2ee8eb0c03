use std::collections::HashSet;
use std::path::Path;

use walkdir::DirEntry;

use crate::config::Settings;

use super::helpers::is_markdown_path;

/// Decides which directories the walk descends into and which files it records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionPolicy {
    names: HashSet<String>,
    pub max_file_count: usize,
}

impl ExclusionPolicy {
    pub fn new(names: impl IntoIterator<Item = String>, max_file_count: usize) -> Self {
        ExclusionPolicy {
            names: names.into_iter().collect(),
            max_file_count,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.excluded_names.iter().cloned(), settings.max_file_count)
    }

    pub fn is_excluded_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Applied before descent; the walk root itself (depth 0) is never excluded.
    pub fn skips_entry(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }

        let Some(name) = entry.file_name().to_str() else {
            return true;
        };

        if entry.file_type().is_dir() && name.starts_with('.') {
            return true;
        }

        self.is_excluded_name(name)
    }

    /// True when `relative` (a workspace-relative POSIX path) passes through
    /// a hidden or excluded directory, or is itself an excluded name.
    pub fn excludes_relative(&self, relative: &str) -> bool {
        let segments: Vec<&str> = relative.split('/').collect();
        let Some((file_name, dirs)) = segments.split_last() else {
            return true;
        };

        dirs.iter()
            .any(|dir| dir.starts_with('.') || self.is_excluded_name(dir))
            || self.is_excluded_name(file_name)
    }

    pub fn indexes_file(&self, path: &Path) -> bool {
        is_markdown_path(path)
    }
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_hidden_and_vendor_directories() {
        let policy = ExclusionPolicy::default();

        assert!(policy.excludes_relative(".obsidian/notes.md"));
        assert!(policy.excludes_relative("node_modules/pkg/readme.md"));
        assert!(policy.excludes_relative("docs/target/out.md"));
        assert!(!policy.excludes_relative("docs/config.md"));
        assert!(!policy.excludes_relative(".hidden-file.md"));
    }

    #[test]
    fn custom_names_replace_defaults() {
        let policy = ExclusionPolicy::new(vec!["archive".to_string()], 10);

        assert!(policy.excludes_relative("archive/old.md"));
        assert!(!policy.excludes_relative("node_modules/readme.md"));
        assert_eq!(policy.max_file_count, 10);
    }
}
