//! Batch orchestration: validation, bounded fan-out, structured join, ranking.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use tokio::time::Instant;

use super::intake::{IntakeLimits, normalize};
use super::insights::summarize;
use super::pipeline::{
    PipelineContext, deadline_after, duration_ms, elapsed_ms, guarded, pending_outcome,
    run_pipeline,
};
use super::ranking::rank;
use super::scoring::SimilarityScorer;
use super::types::{
    BatchRequest, BatchResponse, DocumentItem, ItemFailure, PipelineStage, ScoredItem,
    TextAnalysis, TextAnalysisError, ValidationError,
};
use crate::analysis::Analyzer;
use crate::audit::{AuditEvent, AuditSink};
use crate::config::Config;
use crate::extraction::Extractor;
use crate::metrics::{BatchMetrics, MetricsSnapshot};
use crate::services::ServiceHandle;

/// Tunables the orchestrator reads on every batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchSettings {
    /// Maximum number of pipelines in flight.
    pub max_concurrency: usize,
    /// Deadline for each item's pipeline.
    pub per_item_timeout: Duration,
    /// Similarity scorer weights.
    pub scorer: SimilarityScorer,
    /// Batch and payload size limits.
    pub limits: IntakeLimits,
}

impl From<&Config> for BatchSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            per_item_timeout: Duration::from_millis(config.per_item_timeout_ms),
            scorer: SimilarityScorer::from(config),
            limits: IntakeLimits::from(config),
        }
    }
}

impl BatchSettings {
    /// Per-item timeout in whole milliseconds, saturating at `u64::MAX`.
    pub fn timeout_ms(&self) -> u64 {
        duration_ms(self.per_item_timeout)
    }
}

/// Runs batches: one pipeline per document, bounded concurrency, deterministic ranking.
///
/// Holds shared handles to the adapters and the audit sink; construct once and share through an
/// `Arc`. No state survives between batches apart from the metrics counters.
pub struct BatchOrchestrator {
    extractor: Arc<dyn Extractor>,
    analyzer: Arc<dyn Analyzer>,
    audit: Arc<dyn AuditSink>,
    settings: BatchSettings,
    metrics: Arc<BatchMetrics>,
}

/// Abstraction over batch processing used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait BatchApi: Send + Sync {
    /// Validate, process, and rank one batch.
    async fn run_batch(&self, request: BatchRequest) -> Result<BatchResponse, ValidationError>;

    /// Analyze one free-standing text under the per-item timeout.
    async fn analyze_text(&self, text: &str) -> Result<TextAnalysis, TextAnalysisError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl BatchOrchestrator {
    /// Build an orchestrator from validated configuration and initialized services.
    pub fn new(config: &Config, services: &ServiceHandle) -> Self {
        Self::from_parts(
            BatchSettings::from(config),
            services.extractor(),
            services.analyzer(),
            services.audit(),
        )
    }

    /// Build an orchestrator from explicit settings and adapters.
    pub fn from_parts(
        settings: BatchSettings,
        extractor: Arc<dyn Extractor>,
        analyzer: Arc<dyn Analyzer>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            extractor,
            analyzer,
            audit,
            settings: BatchSettings {
                max_concurrency: settings.max_concurrency.max(1),
                ..settings
            },
            metrics: Arc::new(BatchMetrics::new()),
        }
    }

    /// Effective settings.
    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Validate the batch, run every pipeline to a terminal state, then rank the outcomes.
    ///
    /// Only validation errors are returned; per-item failures are reported inside the response,
    /// which always holds exactly one entry per submitted document.
    pub async fn run_batch(&self, request: BatchRequest) -> Result<BatchResponse, ValidationError> {
        let started = Instant::now();
        let BatchRequest {
            documents,
            target_query,
        } = request;

        let batch = normalize(documents, &target_query, &self.settings.limits).inspect_err(|err| {
            self.metrics.record_rejected_batch();
            tracing::warn!(error = %err, "Rejected batch");
        })?;
        let total_files = batch.items.len();
        tracing::info!(
            total_files,
            max_concurrency = self.settings.max_concurrency,
            timeout_ms = self.settings.timeout_ms(),
            "Processing batch"
        );

        let ctx = Arc::new(PipelineContext {
            extractor: Arc::clone(&self.extractor),
            analyzer: Arc::clone(&self.analyzer),
            audit: Arc::clone(&self.audit),
            scorer: self.settings.scorer,
            target_query: batch.target_query,
            timeout: self.settings.per_item_timeout,
        });

        let mut slots: Vec<Option<ScoredItem>> = (0..total_files).map(|_| None).collect();
        let mut outcomes = stream::iter(batch.items)
            .map(|item| spawn_pipeline(Arc::clone(&ctx), item))
            .buffer_unordered(self.settings.max_concurrency);
        while let Some(outcome) = outcomes.next().await {
            let slot = &mut slots[outcome.original_index];
            debug_assert!(slot.is_none(), "pipeline outcome written twice");
            *slot = Some(outcome);
        }

        let items = rank(slots.into_iter().flatten().collect());
        debug_assert_eq!(items.len(), total_files);

        let successful_files = items
            .iter()
            .filter(|ranked| ranked.ranking_position.is_some())
            .count();
        let failed_files = total_files - successful_files;
        let processing_time_ms = elapsed_ms(started);

        self.metrics.record_batch(
            successful_files as u64,
            failed_files as u64,
            processing_time_ms,
        );
        tracing::info!(
            total_files,
            successful_files,
            failed_files,
            processing_time_ms,
            "Batch processed"
        );

        Ok(BatchResponse {
            items,
            total_files,
            successful_files,
            failed_files,
            processing_time_ms,
        })
    }

    /// Analyze `text` with the configured analyzer, outside any batch.
    ///
    /// The text is trimmed and must fit the per-document size limit. The call records one
    /// analysis-stage audit event and counts towards the usage statistics.
    pub async fn analyze_text(&self, text: &str) -> Result<TextAnalysis, TextAnalysisError> {
        let started = Instant::now();
        let result = self.analyze_trimmed(text.trim(), started).await;
        let elapsed = elapsed_ms(started);
        self.metrics.record_text_analysis(result.is_ok(), elapsed);
        match &result {
            Ok(analysis) => tracing::info!(
                word_count = analysis.word_count,
                category = %analysis.analysis.category,
                processing_time_ms = elapsed,
                "Text analyzed"
            ),
            Err(err) => tracing::warn!(error = %err, "Text analysis failed"),
        }
        result
    }

    async fn analyze_trimmed(
        &self,
        text: &str,
        started: Instant,
    ) -> Result<TextAnalysis, TextAnalysisError> {
        if text.is_empty() {
            return Err(TextAnalysisError::BlankText);
        }
        let limit = self.settings.limits.max_file_size;
        if text.len() > limit {
            return Err(TextAnalysisError::TooLong {
                len: text.len(),
                limit,
            });
        }

        let id = uuid::Uuid::new_v4().to_string();
        let analyzed = guarded(
            self.analyzer.analyze(text),
            PipelineStage::Analysis,
            deadline_after(started, self.settings.per_item_timeout),
            self.settings.timeout_ms(),
        )
        .await
        .and_then(|result| {
            result.map_err(|err| ItemFailure::Analysis {
                reason: err.to_string(),
            })
        });
        self.audit.record(match &analyzed {
            Ok(analysis) => AuditEvent::success(
                &id,
                PipelineStage::Analysis,
                format!(
                    "standalone text: category={} keywords={}",
                    analysis.category,
                    analysis.keywords.len()
                ),
            ),
            Err(failure) => AuditEvent::failure(&id, PipelineStage::Analysis, failure.to_string()),
        });

        Ok(TextAnalysis {
            word_count: text.split_whitespace().count(),
            char_count: text.chars().count(),
            summary: summarize(text),
            analysis: analyzed?,
            processing_time_ms: elapsed_ms(started),
        })
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl BatchApi for BatchOrchestrator {
    async fn run_batch(&self, request: BatchRequest) -> Result<BatchResponse, ValidationError> {
        BatchOrchestrator::run_batch(self, request).await
    }

    async fn analyze_text(&self, text: &str) -> Result<TextAnalysis, TextAnalysisError> {
        BatchOrchestrator::analyze_text(self, text).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        BatchOrchestrator::metrics_snapshot(self)
    }
}

/// Run one pipeline on its own task so blocking-heavy adapters do not serialize the batch.
async fn spawn_pipeline(ctx: Arc<PipelineContext>, item: DocumentItem) -> ScoredItem {
    let started = Instant::now();
    let fallback = pending_outcome(&item);
    match tokio::spawn(run_pipeline(ctx, item)).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(item_id = %fallback.item_id, error = %err, "Pipeline task lost");
            ScoredItem {
                error: Some(ItemFailure::Internal {
                    stage: None,
                    reason: err.to_string(),
                }),
                elapsed_ms: elapsed_ms(started),
                ..fallback
            }
        }
    }
}
