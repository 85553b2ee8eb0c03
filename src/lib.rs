//! notedown: wikilink indexing and linking for Markdown workspaces
//!
//! This crate scans one or more workspace roots for Markdown files, parses
//! `[[target]]` / `[[target|display]]` wikilinks, task markers and YAML
//! frontmatter, and keeps an index of every link target with the files it
//! resolves to.
//!
//! # Overview
//!
//! The index drives two consumers:
//!
//! - **Language server**: completion, goto-definition (creating missing
//!   notes), diagnostics for missing and ambiguous targets, quickfixes and
//!   list item commands, served over stdio with tower-lsp
//! - **Document queries**: `ListDocuments` returns parsed documents whose
//!   frontmatter matches a filter expression
//!
//! # Architecture
//!
//! - [`scanner`]: workspace roots and the set of Markdown files in them
//! - [`parser`]: frontmatter, wikilink and task extraction
//! - [`resolver`]: wikilink target to matching files
//! - [`index`]: target to [`index::TargetInfo`], kept current per document
//! - [`filter`]: frontmatter filter expressions and the streaming evaluator
//! - [`state`]: the workspace as seen by the editor
//!
//! ```ignore
//! use notedown::config::Settings;
//! use notedown::query::{list_documents, ListDocumentsRequest};
//!
//! let request = ListDocumentsRequest {
//!     roots: vec!["/home/me/notes".to_string()],
//!     ..Default::default()
//! };
//! let response = list_documents(request, &Settings::default(), cancel).await?;
//! ```

// Core modules - files, parsing and the link index
pub mod index;
pub mod parser;
pub mod resolver;
pub mod scanner;

// Queries over parsed documents
pub mod filter;
pub mod query;

// LSP feature modules
pub mod codeactions;
pub mod commands;
pub mod completion;
pub mod diagnostics;
pub mod documents;
pub mod gotodef;
pub mod server;
pub mod state;

// Configuration and errors
pub mod config;
pub mod error;

// Test utilities (only available in test builds)
#[cfg(test)]
pub mod test_utils;
