use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Thread-safe counters describing batch and text-analysis activity since startup.
#[derive(Default)]
pub struct BatchMetrics {
    batches_processed: AtomicU64,
    batches_rejected: AtomicU64,
    documents_ranked: AtomicU64,
    documents_failed: AtomicU64,
    texts_analyzed: AtomicU64,
    text_analyses_failed: AtomicU64,
    last_batch_ms: AtomicU64,
    total_processing_ms: AtomicU64,
}

impl BatchMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed batch with its ranked/failed split and wall-clock duration.
    pub fn record_batch(&self, ranked: u64, failed: u64, elapsed_ms: u64) {
        self.batches_processed.fetch_add(1, Ordering::Relaxed);
        self.documents_ranked.fetch_add(ranked, Ordering::Relaxed);
        self.documents_failed.fetch_add(failed, Ordering::Relaxed);
        self.last_batch_ms.store(elapsed_ms, Ordering::Relaxed);
        self.total_processing_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
    }

    /// Record a batch refused by validation.
    pub fn record_rejected_batch(&self) {
        self.batches_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one standalone text analysis. Only successful runs add to the processing time.
    pub fn record_text_analysis(&self, succeeded: bool, elapsed_ms: u64) {
        if succeeded {
            self.texts_analyzed.fetch_add(1, Ordering::Relaxed);
            self.total_processing_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
        } else {
            self.text_analyses_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let batches_processed = self.batches_processed.load(Ordering::Relaxed);
        MetricsSnapshot {
            batches_processed,
            batches_rejected: self.batches_rejected.load(Ordering::Relaxed),
            documents_ranked: self.documents_ranked.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            texts_analyzed: self.texts_analyzed.load(Ordering::Relaxed),
            text_analyses_failed: self.text_analyses_failed.load(Ordering::Relaxed),
            total_processing_ms: self.total_processing_ms.load(Ordering::Relaxed),
            last_batch_ms: (batches_processed > 0)
                .then(|| self.last_batch_ms.load(Ordering::Relaxed)),
        }
    }
}

/// Immutable view of batch counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Number of batches that completed (validation failures excluded).
    pub batches_processed: u64,
    /// Batches refused by validation.
    pub batches_rejected: u64,
    /// Documents that received a ranking position.
    pub documents_ranked: u64,
    /// Documents that ended in a per-item failure.
    pub documents_failed: u64,
    /// Standalone text analyses that succeeded.
    pub texts_analyzed: u64,
    /// Standalone text analyses that failed or timed out.
    pub text_analyses_failed: u64,
    /// Wall-clock time spent on completed batches and successful analyses.
    pub total_processing_ms: u64,
    /// Duration of the most recent batch, if any completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_batch_ms: Option<u64>,
}

impl MetricsSnapshot {
    /// Request-level totals, counting each batch and each text analysis as one request.
    pub fn usage(&self) -> UsageStats {
        let successful_requests = self.batches_processed + self.texts_analyzed;
        let failed_requests = self.batches_rejected + self.text_analyses_failed;
        let avg_processing_time_ms = if successful_requests == 0 {
            0.0
        } else {
            self.total_processing_ms as f64 / successful_requests as f64
        };
        UsageStats {
            total_requests: successful_requests + failed_requests,
            successful_requests,
            failed_requests,
            avg_processing_time_ms,
            total_processing_time_ms: self.total_processing_ms,
        }
    }
}

/// Aggregate request statistics reported by `GET /stats`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsageStats {
    /// Batches and text analyses received, accepted or not.
    pub total_requests: u64,
    /// Completed batches plus successful text analyses.
    pub successful_requests: u64,
    /// Rejected batches plus failed text analyses.
    pub failed_requests: u64,
    /// Mean processing time of successful requests.
    pub avg_processing_time_ms: f64,
    /// Sum of processing time over successful requests.
    pub total_processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_batches_and_documents() {
        let metrics = BatchMetrics::new();
        metrics.record_batch(2, 1, 40);
        metrics.record_batch(3, 0, 25);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches_processed, 2);
        assert_eq!(snapshot.documents_ranked, 5);
        assert_eq!(snapshot.documents_failed, 1);
        assert_eq!(snapshot.last_batch_ms, Some(25));
    }

    #[test]
    fn empty_snapshot_has_no_last_batch() {
        let metrics = BatchMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches_processed, 0);
        assert_eq!(snapshot.last_batch_ms, None);
    }

    #[test]
    fn usage_counts_batches_and_text_analyses() {
        let metrics = BatchMetrics::new();
        metrics.record_batch(2, 0, 30);
        metrics.record_rejected_batch();
        metrics.record_text_analysis(true, 10);
        metrics.record_text_analysis(false, 500);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches_rejected, 1);
        assert_eq!(snapshot.texts_analyzed, 1);
        assert_eq!(snapshot.text_analyses_failed, 1);
        assert_eq!(snapshot.total_processing_ms, 40);

        let usage = snapshot.usage();
        assert_eq!(usage.total_requests, 4);
        assert_eq!(usage.successful_requests, 2);
        assert_eq!(usage.failed_requests, 2);
        assert_eq!(usage.total_processing_time_ms, 40);
        assert!((usage.avg_processing_time_ms - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn idle_usage_has_zero_average() {
        let usage = BatchMetrics::new().snapshot().usage();
        assert_eq!(usage.total_requests, 0);
        assert_eq!(usage.avg_processing_time_ms, 0.0);
    }
}
