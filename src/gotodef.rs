use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};

use tower_lsp::lsp_types::{Location, Position, Range, Url};
use tracing::{debug, info};

use crate::documents::TrackedDocument;
use crate::error::{Error, Result};
use crate::index::WikilinkIndex;
use crate::resolver::{resolve, suggested_uri};
use crate::scanner::{clean_path, file_uri, Scanner};

/// Jumps to the file the wikilink under the cursor resolves to.
///
/// Ambiguous targets go to the first match by relative path. A target that
/// resolves to nothing gets a new file under the first workspace root,
/// seeded with a heading; the file set and index are updated to match.
pub fn goto_definition(
    scanner: &Scanner,
    index: &WikilinkIndex,
    document: &TrackedDocument,
    cursor_position: Position,
) -> Result<Option<Location>> {
    let Some(link) = document.parsed.wikilink_at(cursor_position) else {
        return Ok(None);
    };

    let files = scanner.list();
    let matches = match resolve(&link.target, &files) {
        Ok(matches) => matches,
        Err(err) => {
            debug!("{err}");
            return Ok(None);
        }
    };

    if let Some(first) = matches.first() {
        return Ok(files
            .find_by_relative_path(first)
            .map(|record| start_of(record.uri.clone())));
    }

    let suggested = suggested_uri(&link.target);
    let Some(root) = scanner.primary_root() else {
        return Ok(None);
    };
    if suggested.is_empty() {
        return Ok(None);
    }

    let path = clean_path(&root.join(&suggested));
    if !path.starts_with(&root) {
        debug!("{} is outside {}", path.display(), root.display());
        return Ok(None);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
    }

    match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(mut file) => {
            file.write_all(format!("# {}\n\n", link.target).as_bytes())
                .map_err(|err| Error::io(&path, err))?;
            info!("created {}", path.display());
        }
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
        Err(err) => return Err(Error::io(&path, err)),
    }

    let Some(uri) = file_uri(&path) else {
        return Ok(None);
    };

    scanner.add_file(&uri)?;
    index.reresolve_all(&scanner.list());

    Ok(Some(start_of(uri)))
}

fn start_of(uri: Url) -> Location {
    Location {
        uri,
        range: Range {
            start: Position {
                line: 0,
                character: 0,
            },
            end: Position {
                line: 0,
                character: 0,
            },
        },
    }
}
