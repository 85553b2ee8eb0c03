//! Path and URI helpers shared by the scanner, the resolver and the editor features.

use std::path::{Component, Path, PathBuf};

use itertools::Itertools;
use pathdiff::diff_paths;
use tower_lsp::lsp_types::Url;

use crate::error::{Error, Result};

/// Interprets a workspace root given either as a `file://` URI or as an
/// absolute filesystem path. Any other scheme is rejected.
pub fn root_from_str(entry: &str) -> Result<PathBuf> {
    let invalid = |reason: &str| {
        Error::io(
            entry,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, reason.to_string()),
        )
    };

    if entry.contains("://") {
        let url = Url::parse(entry).map_err(|_| invalid("malformed URI"))?;
        if url.scheme() != "file" {
            return Err(invalid("unsupported URI scheme"));
        }
        let path = url
            .to_file_path()
            .map_err(|_| invalid("URI does not name a local path"))?;
        return Ok(clean_path(&path));
    }

    let path = Path::new(entry);
    if !path.is_absolute() {
        return Err(invalid("root path must be absolute"));
    }
    Ok(clean_path(path))
}

/// Collapses `.` and `..` components without touching the filesystem.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            other => components.push(other),
        }
    }
    components.iter().collect()
}

/// Workspace-relative path of `path` with forward slashes, or `None` when
/// `path` does not live under `root`.
pub fn relative_posix_path(root: &Path, path: &Path) -> Option<String> {
    let diff = diff_paths(path, root)?;

    let mut segments = Vec::new();
    for component in diff.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str()?.to_string()),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if segments.is_empty() {
        return None;
    }

    Some(segments.iter().join("/"))
}

pub fn file_uri(path: &Path) -> Option<Url> {
    Url::from_file_path(clean_path(path)).ok()
}

/// True when the extension of `path`, lowercased, is `md`.
pub fn is_markdown_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

/// Removes a trailing `.md` (any case) from a POSIX path string.
pub fn strip_ext(path: &str) -> &str {
    let len = path.len();
    if len >= 3 && path.is_char_boundary(len - 3) && path[len - 3..].eq_ignore_ascii_case(".md") {
        &path[..len - 3]
    } else {
        path
    }
}

/// Final segment of a POSIX path string.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_from_str_accepts_uris_and_absolute_paths() {
        assert_eq!(
            root_from_str("file:///w/notes").unwrap(),
            PathBuf::from("/w/notes")
        );
        assert_eq!(
            root_from_str("/w/./notes/../docs").unwrap(),
            PathBuf::from("/w/docs")
        );
    }

    #[test]
    fn root_from_str_rejects_other_schemes() {
        assert!(root_from_str("https://example.com/notes").is_err());
        assert!(root_from_str("relative/dir").is_err());
    }

    #[test]
    fn relative_posix_path_uses_forward_slashes() {
        let root = Path::new("/w");
        assert_eq!(
            relative_posix_path(root, Path::new("/w/docs/config.md")).as_deref(),
            Some("docs/config.md")
        );
        assert_eq!(relative_posix_path(root, Path::new("/other/config.md")), None);
        assert_eq!(relative_posix_path(root, Path::new("/w")), None);
    }

    #[test]
    fn strip_ext_and_basename() {
        assert_eq!(strip_ext("docs/config.md"), "docs/config");
        assert_eq!(strip_ext("README.MD"), "README");
        assert_eq!(strip_ext("notes"), "notes");
        assert_eq!(strip_ext("é.md"), "é");
        assert_eq!(basename("docs/config.md"), "config.md");
        assert_eq!(basename("config.md"), "config.md");
    }

    #[test]
    fn is_markdown_path_is_case_insensitive() {
        assert!(is_markdown_path(Path::new("/w/a.md")));
        assert!(is_markdown_path(Path::new("/w/A.MD")));
        assert!(!is_markdown_path(Path::new("/w/a.markdown")));
        assert!(!is_markdown_path(Path::new("/w/md")));
    }
}
