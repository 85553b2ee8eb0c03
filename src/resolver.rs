//! Wikilink target resolution against the FileSet.

use std::path::Path;

use crate::error::{Error, Result};
use crate::scanner::{basename, strip_ext, FileSet};

/// Removes a trailing `.md` (any case).
pub fn strip_md_ext(target: &str) -> &str {
    strip_ext(target)
}

/// Index key for a target: trimmed, with backslashes as `/`.
pub fn normalize_key(target: &str) -> String {
    target.trim().replace('\\', "/")
}

/// Normalizes a target for path comparison.
///
/// Backslashes become `/` and a single leading `./` is dropped. Empty targets,
/// targets with a `..` segment and absolute or drive-prefixed targets are
/// rejected.
pub fn normalize_target(target: &str) -> Result<String> {
    let normalized = normalize_key(target);
    let normalized = normalized.strip_prefix("./").unwrap_or(&normalized);

    if normalized.is_empty()
        || is_rooted(normalized)
        || normalized.split('/').any(|segment| segment == "..")
    {
        return Err(Error::invalid_target(target));
    }

    Ok(normalized.to_string())
}

/// `/abs`, `//host/share` and `C:/x` all escape a root when joined to it.
fn is_rooted(normalized: &str) -> bool {
    let drive = matches!(normalized.as_bytes(), [letter, b':', ..] if letter.is_ascii_alphabetic());
    drive || normalized.starts_with('/') || Path::new(normalized).has_root()
}

/// Relative paths of every file `target` resolves to, in FileSet order.
///
/// A file matches when its extensionless relative path equals the
/// extensionless target, or, for bare targets (no `/`, no leading `./`),
/// when its extensionless basename does.
pub fn resolve(target: &str, files: &FileSet) -> Result<Vec<String>> {
    let normalized = normalize_target(target)?;
    let key = strip_md_ext(&normalized);
    let qualified = key.contains('/') || normalize_key(target).starts_with("./");

    let mut matches: Vec<String> = Vec::new();
    for record in files.iter() {
        let path = record.relative_path.as_str();
        let path_match = strip_ext(path) == key;
        let basename_match = !qualified && strip_ext(basename(path)) == key;

        if (path_match || basename_match) && !matches.iter().any(|seen| seen == path) {
            matches.push(path.to_string());
        }
    }

    Ok(matches)
}

/// Relative path to create for a target that resolves to nothing.
///
/// Targets that already carry an extension are used as they are; anything
/// else gets `.md`. Invalid targets have no suggestion.
pub fn suggested_uri(target: &str) -> String {
    let Ok(normalized) = normalize_target(target) else {
        return String::new();
    };

    let has_extension = Path::new(&normalized)
        .extension()
        .is_some_and(|ext| !ext.is_empty());

    if has_extension {
        normalized
    } else {
        format!("{normalized}.md")
    }
}
