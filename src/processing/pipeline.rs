//! Per-document pipeline: extraction, analysis, scoring.
//!
//! Each stage runs under the item's deadline. A failing, panicking, or late stage ends the
//! pipeline for that item only; the failure is recorded on the item and in the audit trail.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::time::Instant;

use super::insights::{MAX_EXCERPTS, justification, relevant_excerpts, summarize};
use super::scoring::SimilarityScorer;
use super::types::{DocumentItem, ItemFailure, PipelineStage, ScoredItem};
use crate::analysis::Analyzer;
use crate::audit::{AuditEvent, AuditSink};
use crate::extraction::Extractor;

const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365);

/// Lifecycle of one item inside its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Waiting for a concurrency slot.
    Pending,
    /// Extraction adapter call in flight.
    Extracting,
    /// Text available.
    Extracted,
    /// Analysis adapter call in flight.
    Analyzing,
    /// Analysis available.
    Analyzed,
    /// Terminal success.
    Scored,
    /// Terminal failure at the given stage (`None` when the stage is unknown).
    Failed(Option<PipelineStage>),
}

/// Shared, read-only inputs for every pipeline of one batch.
pub(crate) struct PipelineContext {
    pub(crate) extractor: Arc<dyn Extractor>,
    pub(crate) analyzer: Arc<dyn Analyzer>,
    pub(crate) audit: Arc<dyn AuditSink>,
    pub(crate) scorer: SimilarityScorer,
    pub(crate) target_query: String,
    pub(crate) timeout: Duration,
}

struct StateTracker<'a> {
    item_id: &'a str,
    state: ItemState,
}

impl<'a> StateTracker<'a> {
    fn new(item_id: &'a str) -> Self {
        Self {
            item_id,
            state: ItemState::Pending,
        }
    }

    fn advance(&mut self, next: ItemState) {
        tracing::trace!(item_id = self.item_id, from = ?self.state, to = ?next, "Item state change");
        self.state = next;
    }
}

/// Blank outcome for `item`; callers fill in whatever the pipeline produced.
pub(crate) fn pending_outcome(item: &DocumentItem) -> ScoredItem {
    ScoredItem {
        item_id: item.id.clone(),
        original_index: item.original_index,
        filename: item.filename.clone(),
        content_sha256: item.content_sha256.clone(),
        extracted_text: None,
        analysis: None,
        similarity_score: None,
        error: None,
        elapsed_ms: 0,
        summary: None,
        relevant_excerpts: Vec::new(),
        justification: None,
    }
}

/// Drive `item` to a terminal state. Never panics on adapter misbehaviour and never fails.
pub(crate) async fn run_pipeline(ctx: Arc<PipelineContext>, item: DocumentItem) -> ScoredItem {
    let started = Instant::now();
    let deadline = deadline_after(started, ctx.timeout);
    let mut tracker = StateTracker::new(&item.id);
    let mut outcome = pending_outcome(&item);

    if let Err(failure) = drive(&ctx, &item, deadline, &mut tracker, &mut outcome).await {
        tracker.advance(ItemState::Failed(failure.stage()));
        tracing::warn!(
            item_id = %item.id,
            filename = %item.filename,
            kind = failure.kind(),
            error = %failure,
            "Document pipeline failed"
        );
        outcome.error = Some(failure);
    }

    outcome.elapsed_ms = elapsed_ms(started);
    outcome
}

async fn drive(
    ctx: &PipelineContext,
    item: &DocumentItem,
    deadline: Instant,
    tracker: &mut StateTracker<'_>,
    outcome: &mut ScoredItem,
) -> Result<(), ItemFailure> {
    let timeout_ms = duration_ms(ctx.timeout);

    tracker.advance(ItemState::Extracting);
    let extracted = guarded(
        ctx.extractor.extract(item),
        PipelineStage::Extraction,
        deadline,
        timeout_ms,
    )
    .await
    .and_then(|result| {
        result.map_err(|err| ItemFailure::Extraction {
            reason: err.to_string(),
        })
    })
    .and_then(|text| {
        if text.trim().is_empty() {
            Err(ItemFailure::Extraction {
                reason: "no text extracted".to_string(),
            })
        } else {
            Ok(text)
        }
    });
    audit_stage(ctx, item, PipelineStage::Extraction, &extracted, |text| {
        format!("extracted {} characters", text.chars().count())
    });
    let text = extracted?;
    tracker.advance(ItemState::Extracted);
    outcome.extracted_text = Some(text.clone());

    tracker.advance(ItemState::Analyzing);
    let analyzed = guarded(
        ctx.analyzer.analyze(&text),
        PipelineStage::Analysis,
        deadline,
        timeout_ms,
    )
    .await
    .and_then(|result| {
        result.map_err(|err| ItemFailure::Analysis {
            reason: err.to_string(),
        })
    });
    audit_stage(ctx, item, PipelineStage::Analysis, &analyzed, |analysis| {
        format!(
            "category={} sentiment={:?} keywords={}",
            analysis.category,
            analysis.sentiment.label,
            analysis.keywords.len()
        )
    });
    let analysis = analyzed?;
    tracker.advance(ItemState::Analyzed);

    let score = ctx.scorer.score(&analysis, &ctx.target_query);
    ctx.audit.record(AuditEvent::success(
        &item.id,
        PipelineStage::Scoring,
        format!("score={score:.4}"),
    ));

    outcome.summary = Some(summarize(&text));
    outcome.relevant_excerpts = relevant_excerpts(&ctx.target_query, &text, MAX_EXCERPTS);
    outcome.justification = Some(justification(score));
    outcome.analysis = Some(analysis);
    outcome.similarity_score = Some(score);
    tracker.advance(ItemState::Scored);
    Ok(())
}

/// `started + timeout`, or a far-future instant when that overflows.
pub(crate) fn deadline_after(started: Instant, timeout: Duration) -> Instant {
    started
        .checked_add(timeout)
        .unwrap_or_else(|| started + FAR_FUTURE)
}

/// Await `future` until `deadline`, converting panics and expiry into item failures.
///
/// On expiry the future is dropped; work it handed to other threads is abandoned, not awaited.
pub(crate) async fn guarded<F, T>(
    future: F,
    stage: PipelineStage,
    deadline: Instant,
    timeout_ms: u64,
) -> Result<T, ItemFailure>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout_at(deadline, AssertUnwindSafe(future).catch_unwind()).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(panic)) => Err(ItemFailure::Internal {
            stage: Some(stage),
            reason: panic_message(panic.as_ref()),
        }),
        Err(_) => Err(ItemFailure::Timeout { stage, timeout_ms }),
    }
}

fn audit_stage<T>(
    ctx: &PipelineContext,
    item: &DocumentItem,
    stage: PipelineStage,
    result: &Result<T, ItemFailure>,
    describe: impl FnOnce(&T) -> String,
) {
    let event = match result {
        Ok(value) => AuditEvent::success(&item.id, stage, describe(value)),
        Err(failure) => AuditEvent::failure(&item.id, stage, failure.to_string()),
    };
    ctx.audit.record(event);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("adapter panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("adapter panicked: {message}")
    } else {
        "adapter panicked".to_string()
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    duration_ms(started.elapsed())
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
