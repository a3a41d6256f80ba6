//! Audit trail for pipeline stages.
//!
//! Every stage of every item produces one [`AuditEvent`]. Sinks are append-only and must accept
//! concurrent, unordered writes without blocking the pipeline that emits them. A sink that cannot
//! persist an event logs the problem and moves on; audit failures never become item failures.

use crate::processing::PipelineStage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Result of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// The stage completed.
    Success,
    /// The stage failed, timed out, or panicked.
    Failure,
}

/// Immutable record of one pipeline stage's outcome for one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    /// Item the event belongs to.
    pub item_id: String,
    /// Stage that produced the event.
    pub stage: PipelineStage,
    /// Whether the stage succeeded.
    pub outcome: AuditOutcome,
    /// Free-form detail (character counts, scores, error messages).
    pub detail: String,
    /// When the event was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl AuditEvent {
    /// Build a success event stamped with the current time.
    pub fn success(item_id: &str, stage: PipelineStage, detail: impl Into<String>) -> Self {
        Self::new(item_id, stage, AuditOutcome::Success, detail.into())
    }

    /// Build a failure event stamped with the current time.
    pub fn failure(item_id: &str, stage: PipelineStage, detail: impl Into<String>) -> Self {
        Self::new(item_id, stage, AuditOutcome::Failure, detail.into())
    }

    fn new(item_id: &str, stage: PipelineStage, outcome: AuditOutcome, detail: String) -> Self {
        Self {
            item_id: item_id.to_string(),
            stage,
            outcome,
            detail,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Destination for audit events. Fire-and-forget.
pub trait AuditSink: Send + Sync {
    /// Record `event`. Must not block on slow persistence and must not panic.
    fn record(&self, event: AuditEvent);
}

/// Sink that emits events as structured `tracing` records under the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        tracing::info!(
            target: "audit",
            item_id = %event.item_id,
            stage = %event.stage,
            outcome = ?event.outcome,
            detail = %event.detail,
            "Audit event"
        );
    }
}

/// Sink that drops every event; used when auditing is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledAuditSink;

impl AuditSink for DisabledAuditSink {
    fn record(&self, _event: AuditEvent) {}
}

/// Sink that keeps events in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event recorded so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        lock(&self.events).clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        lock(&self.events).push(event);
    }
}

/// Errors raised while opening an audit destination.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The audit file could not be created or opened.
    #[error("failed to open audit log {path}: {source}")]
    Open {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Sink that appends one JSON document per line to a file.
///
/// `record` only enqueues; a background task owns the file handle and performs the writes.
/// Call [`JsonlAuditSink::shutdown`] to flush pending events before the process exits.
pub struct JsonlAuditSink {
    sender: Mutex<Option<mpsc::UnboundedSender<AuditEvent>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl JsonlAuditSink {
    /// Open (or create) `path` in append mode and start the writer task.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| AuditError::Open {
                    path: path.clone(),
                    source,
                })?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| AuditError::Open {
                path: path.clone(),
                source,
            })?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_events(file, receiver, path));
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            writer: Mutex::new(Some(writer)),
        })
    }

    /// Stop accepting events and wait until everything queued has been written.
    ///
    /// Events recorded afterwards are dropped with a warning.
    pub async fn shutdown(&self) {
        drop(lock(&self.sender).take());
        let writer = lock(&self.writer).take();
        if let Some(writer) = writer {
            if let Err(err) = writer.await {
                tracing::warn!(error = %err, "Audit writer task ended abnormally");
            }
        }
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, event: AuditEvent) {
        let guard = lock(&self.sender);
        let Some(sender) = guard.as_ref() else {
            tracing::warn!(item_id = %event.item_id, "Audit log closed; event dropped");
            return;
        };
        if let Err(err) = sender.send(event) {
            tracing::warn!(item_id = %err.0.item_id, "Audit writer stopped; event dropped");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn write_events(
    mut file: tokio::fs::File,
    mut receiver: mpsc::UnboundedReceiver<AuditEvent>,
    path: PathBuf,
) {
    while let Some(event) = receiver.recv().await {
        let mut line = match serde_json::to_vec(&event) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, item_id = %event.item_id, "Failed to encode audit event");
                continue;
            }
        };
        line.push(b'\n');
        if let Err(err) = file.write_all(&line).await {
            tracing::warn!(error = %err, path = %path.display(), "Failed to write audit event");
        }
    }
    if let Err(err) = file.flush().await {
        tracing::warn!(error = %err, path = %path.display(), "Failed to flush audit log");
    }
}
