//! Error types for notedown.

use std::path::PathBuf;

use thiserror::Error;

/// Result type used across the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of failures the core can report.
///
/// Most of these never reach a user directly: wikilink problems become
/// diagnostics and filesystem errors during a scan are logged and skipped.
#[derive(Debug, Error)]
pub enum Error {
    /// The target is empty or walks out of the workspace with `..`.
    #[error("invalid wikilink target '{target}'")]
    InvalidTarget { target: String },

    #[error("parse error: {reason}")]
    Parse { reason: String },

    /// Unknown operator or malformed filter node.
    #[error("filter error: {reason}")]
    Filter { reason: String },

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file limit of {limit} reached; results are partial")]
    LimitExceeded { limit: usize },
}

impl Error {
    pub fn invalid_target(target: impl Into<String>) -> Self {
        Error::InvalidTarget {
            target: target.into(),
        }
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        Error::Parse {
            reason: reason.into(),
        }
    }

    pub fn filter(reason: impl Into<String>) -> Self {
        Error::Filter {
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
