//! `ListDocuments`: scan roots, parse every file, filter on frontmatter.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::filter::{filter_stream, FilterExpression, HasMetadata, StreamOrder};
use crate::parser::{self, ExtractionMode, Frontmatter, ParsedDoc, TaskRef, Wikilink};
use crate::scanner::{FileRecord, Scanner};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsRequest {
    /// `file://` URIs or absolute paths
    pub roots: Vec<String>,
    /// Filter in its JSON wire form; absent or `null` accepts everything
    #[serde(default)]
    pub filter: Option<serde_json::Value>,
    /// Overrides `ordered_query_output`
    #[serde(default)]
    pub ordered: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListDocumentsResponse {
    pub documents: Vec<Document>,
}

/// One parsed file as returned by the query service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Root-relative path with `/` separators
    pub path: String,
    /// Lowercase hex SHA-256 of the raw file bytes
    pub checksum: String,
    pub metadata: Frontmatter,
    pub wikilinks: Vec<Wikilink>,
    pub tasks: Vec<TaskRef>,
}

impl Document {
    /// Builds a document from raw file content. Content that fails to parse
    /// still yields a document, just without metadata, links or tasks.
    pub fn from_bytes(path: impl Into<String>, bytes: &[u8], mode: ExtractionMode) -> Self {
        let path = path.into();
        let parsed = parser::parse(bytes, mode).unwrap_or_else(|err| {
            warn!("{path}: {err}");
            ParsedDoc::default()
        });

        Document {
            checksum: checksum(bytes),
            path,
            metadata: parsed.frontmatter,
            wikilinks: parsed.wikilinks,
            tasks: parsed.tasks,
        }
    }
}

impl HasMetadata for Document {
    fn metadata(&self) -> &Frontmatter {
        &self.metadata
    }
}

pub fn checksum(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    format!("{hash:x}")
}

fn load_document(record: &FileRecord, mode: ExtractionMode) -> Option<Document> {
    let path = record.path();
    match std::fs::read(&path) {
        Ok(bytes) => Some(Document::from_bytes(&record.relative_path, &bytes, mode)),
        Err(err) => {
            warn!("{}", Error::io(path, err));
            None
        }
    }
}

/// Lists every Markdown document under the request roots that the filter
/// accepts.
///
/// The filter is decoded before touching the filesystem. Files are parsed on
/// blocking tasks, a bounded number at a time; in ordered mode results come
/// back in relative path order, otherwise in completion order.
pub async fn list_documents(
    request: ListDocumentsRequest,
    settings: &Settings,
    cancel: CancellationToken,
) -> Result<ListDocumentsResponse> {
    let expr = FilterExpression::from_json(request.filter.unwrap_or_default())?;
    let order = StreamOrder::from_flag(request.ordered.unwrap_or(settings.ordered_query_output));

    let scanner = Scanner::new(settings);
    scanner.initialize(&request.roots)?;
    let summary = scanner.scan_all(&cancel).await;
    debug!(file_count = summary.file_count, ?order, "listing documents");

    let (input_tx, input_rx) = mpsc::channel(1);
    let stream = filter_stream(input_rx, expr, cancel.clone());

    let records: Vec<FileRecord> = scanner.list().iter().cloned().collect();
    let mode = settings.extraction;
    let producer_cancel = cancel.clone();
    let window = in_flight_limit();

    tokio::spawn(async move {
        match order {
            StreamOrder::Ordered => {
                produce_ordered(records, mode, input_tx, producer_cancel, window).await
            }
            StreamOrder::Unordered => {
                produce_unordered(records, mode, input_tx, producer_cancel, window).await
            }
        }
    });

    let (documents, error) = stream.collect().await;
    match error {
        Some(err) => Err(err),
        None => Ok(ListDocumentsResponse { documents }),
    }
}

async fn send(tx: &mpsc::Sender<Document>, document: Document, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = tx.send(document) => sent.is_ok(),
    }
}

/// Upper bound on documents being read and parsed at once.
fn in_flight_limit() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

/// Keeps at most `window` loads running and forwards them in record order.
async fn produce_ordered(
    records: Vec<FileRecord>,
    mode: ExtractionMode,
    tx: mpsc::Sender<Document>,
    cancel: CancellationToken,
    window: usize,
) {
    let mut records = records.into_iter();
    let mut pending: VecDeque<JoinHandle<Option<Document>>> = VecDeque::new();

    loop {
        while pending.len() < window.max(1) && !cancel.is_cancelled() {
            let Some(record) = records.next() else {
                break;
            };
            pending.push_back(tokio::task::spawn_blocking(move || load_document(&record, mode)));
        }

        let Some(handle) = pending.pop_front() else {
            break;
        };
        let document = match handle.await {
            Ok(Some(document)) => document,
            Ok(None) => continue,
            Err(err) => {
                warn!("document task failed: {err}");
                continue;
            }
        };
        if !send(&tx, document, &cancel).await {
            break;
        }
    }
}

/// Like [`produce_ordered`], but forwards each document as soon as it loads.
async fn produce_unordered(
    records: Vec<FileRecord>,
    mode: ExtractionMode,
    tx: mpsc::Sender<Document>,
    cancel: CancellationToken,
    window: usize,
) {
    let mut records = records.into_iter();
    let mut tasks = JoinSet::new();

    loop {
        while tasks.len() < window.max(1) && !cancel.is_cancelled() {
            let Some(record) = records.next() else {
                break;
            };
            tasks.spawn_blocking(move || load_document(&record, mode));
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        let document = match joined {
            Ok(Some(document)) => document,
            Ok(None) => continue,
            Err(err) => {
                warn!("document task failed: {err}");
                continue;
            }
        };
        if !send(&tx, document, &cancel).await {
            tasks.abort_all();
            break;
        }
    }
}
