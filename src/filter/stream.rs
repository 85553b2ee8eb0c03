//! Streaming filter driver.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Error;
use crate::parser::{Frontmatter, ParsedDoc};

use super::{evaluate, FilterExpression};

/// Anything that carries frontmatter the filter can look at.
pub trait HasMetadata {
    fn metadata(&self) -> &Frontmatter;
}

impl HasMetadata for ParsedDoc {
    fn metadata(&self) -> &Frontmatter {
        &self.frontmatter
    }
}

impl HasMetadata for Frontmatter {
    fn metadata(&self) -> &Frontmatter {
        self
    }
}

/// Whether a producer feeding [`filter_stream`] keeps its input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamOrder {
    #[default]
    Ordered,
    Unordered,
}

impl StreamOrder {
    pub fn from_flag(ordered: bool) -> Self {
        if ordered {
            StreamOrder::Ordered
        } else {
            StreamOrder::Unordered
        }
    }
}

/// Output side of [`filter_stream`].
///
/// `documents` closes when the input is drained, the run is cancelled, or
/// an evaluation fails. In the last case `errors` yields exactly one error.
#[derive(Debug)]
pub struct FilterStream<T> {
    pub documents: mpsc::Receiver<T>,
    pub errors: mpsc::Receiver<Error>,
}

impl<T> FilterStream<T> {
    /// Drains both channels: every accepted document, then the error if the
    /// run failed.
    pub async fn collect(mut self) -> (Vec<T>, Option<Error>) {
        let mut documents = Vec::new();
        while let Some(document) = self.documents.recv().await {
            documents.push(document);
        }
        let error = self.errors.recv().await;
        (documents, error)
    }
}

/// Spawns a task that forwards every document from `input` that `expr`
/// accepts, in arrival order.
pub fn filter_stream<T>(
    mut input: mpsc::Receiver<T>,
    expr: Option<FilterExpression>,
    cancel: CancellationToken,
) -> FilterStream<T>
where
    T: HasMetadata + Send + 'static,
{
    let (documents_tx, documents) = mpsc::channel(1);
    let (errors_tx, errors) = mpsc::channel(1);

    tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("filter stream cancelled");
                    break;
                }
                next = input.recv() => next,
            };
            let Some(document) = next else {
                break;
            };

            match evaluate(expr.as_ref(), document.metadata()) {
                Ok(true) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        sent = documents_tx.send(document) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
                Ok(false) => {}
                Err(err) => {
                    warn!("filter evaluation failed: {err}");
                    let _ = errors_tx.send(err).await;
                    break;
                }
            }
        }
    });

    FilterStream { documents, errors }
}
