//! Shared test utilities for notedown.
//!
//! This module provides common helpers used across multiple test modules.
//! It is only compiled when running tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::Settings;
use crate::scanner::Scanner;

/// Creates a temporary workspace directory for testing.
///
/// Returns a tuple of (TempDir, PathBuf) where:
/// - TempDir: The temp directory handle (must be kept alive for the test duration)
/// - PathBuf: The path to the workspace subdirectory
///
/// # Why this helper exists
///
/// The scanner skips hidden directories (those starting with `.`). On some
/// systems, temp directories are created under paths like `/tmp/.tmpXXXXX`.
/// Creating a non-hidden subdirectory called "workspace" keeps the fixture
/// files visible to the scanner.
pub fn create_test_workspace_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let workspace_dir = temp_dir.path().join("workspace");
    fs::create_dir(&workspace_dir).expect("Failed to create workspace subdirectory");
    (temp_dir, workspace_dir)
}

/// Writes `content` at `relative` under `root`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    fs::write(&path, content).expect("Failed to write fixture file");
    path
}

/// Creates a workspace with files written by `setup_fn` and returns a
/// scanner that has already completed a full scan of it.
pub fn create_scanned_workspace<F>(setup_fn: F) -> (TempDir, PathBuf, Scanner)
where
    F: FnOnce(&Path),
{
    let (temp_dir, workspace_dir) = create_test_workspace_dir();
    setup_fn(&workspace_dir);

    let scanner = Scanner::new(&Settings::default());
    scanner
        .initialize(&[workspace_dir.to_string_lossy().to_string()])
        .expect("Failed to initialize scanner");
    scanner.scan_all_blocking();

    (temp_dir, workspace_dir, scanner)
}
