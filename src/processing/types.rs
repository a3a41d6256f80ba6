//! Batch, item, and outcome types shared across the pipeline.

use crate::analysis::AnalysisResult;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A document as submitted by a caller, before intake.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Name reported by the caller (multipart filename or local path).
    pub filename: String,
    /// Declared media type, if the caller supplied one.
    pub content_type: Option<String>,
    /// Raw document bytes.
    pub payload: Vec<u8>,
}

impl RawDocument {
    /// Convenience constructor for documents without a declared media type.
    pub fn new(filename: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            payload: payload.into(),
        }
    }

    /// Attach a declared media type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// One batch of documents to rank against a target query.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Documents in submission order.
    pub documents: Vec<RawDocument>,
    /// Free-text query the documents are ranked against.
    pub target_query: String,
}

/// A validated document owned by the orchestrator for the lifetime of one batch.
#[derive(Debug, Clone)]
pub struct DocumentItem {
    /// Identifier unique within the batch.
    pub id: String,
    /// Position in the submitted sequence; fixes tie-break order.
    pub original_index: usize,
    /// Caller-supplied file name.
    pub filename: String,
    /// Declared media type, if any.
    pub content_type: Option<String>,
    /// Hex-encoded SHA-256 of the payload.
    pub content_sha256: String,
    /// Raw document bytes.
    pub payload: Vec<u8>,
}

/// Rejections raised before any pipeline starts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The batch contained no documents.
    #[error("batch must contain at least one document")]
    EmptyBatch,
    /// The target query was empty after trimming.
    #[error("target query must not be blank")]
    BlankQuery,
    /// A document had no bytes.
    #[error("document #{index} ({filename}) is empty")]
    EmptyPayload {
        /// Zero-based position of the offending document.
        index: usize,
        /// File name of the offending document.
        filename: String,
    },
    /// The batch exceeded the configured document count.
    #[error("batch contains {count} documents; the limit is {limit}")]
    TooManyDocuments {
        /// Submitted document count.
        count: usize,
        /// Configured maximum.
        limit: usize,
    },
    /// A document exceeded the configured payload size.
    #[error("document #{index} ({filename}) is {size} bytes; the limit is {limit}")]
    PayloadTooLarge {
        /// Zero-based position of the offending document.
        index: usize,
        /// File name of the offending document.
        filename: String,
        /// Payload size in bytes.
        size: usize,
        /// Configured maximum in bytes.
        limit: usize,
    },
}

/// Pipeline stage that can succeed or fail for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Converting raw bytes into text.
    Extraction,
    /// Sentiment, keyword, and category analysis.
    Analysis,
    /// Similarity scoring against the target query.
    Scoring,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Extraction => "extraction",
            Self::Analysis => "analysis",
            Self::Scoring => "scoring",
        })
    }
}

/// Typed per-item failure. Never aborts the batch.
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum ItemFailure {
    /// Extraction adapter failed or produced no text.
    #[serde(rename = "extraction_failure")]
    #[error("extraction failed: {reason}")]
    Extraction {
        /// Adapter supplied reason.
        reason: String,
    },
    /// Analysis adapter failed.
    #[serde(rename = "analysis_failure")]
    #[error("analysis failed: {reason}")]
    Analysis {
        /// Adapter supplied reason.
        reason: String,
    },
    /// The item exceeded its deadline.
    #[serde(rename = "timeout_failure")]
    #[error("{stage} timed out after {timeout_ms} ms")]
    Timeout {
        /// Stage that was running when the deadline passed.
        stage: PipelineStage,
        /// Configured per-item timeout.
        timeout_ms: u64,
    },
    /// An adapter panicked or the pipeline task was lost.
    #[serde(rename = "internal_error")]
    #[error("internal error: {reason}")]
    Internal {
        /// Stage that was running, when known.
        stage: Option<PipelineStage>,
        /// Panic message or task error.
        reason: String,
    },
}

impl ItemFailure {
    /// Stage the failure is attributed to, when known.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Extraction { .. } => Some(PipelineStage::Extraction),
            Self::Analysis { .. } => Some(PipelineStage::Analysis),
            Self::Timeout { stage, .. } => Some(*stage),
            Self::Internal { stage, .. } => *stage,
        }
    }

    /// Stable machine-readable discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Extraction { .. } => "extraction_failure",
            Self::Analysis { .. } => "analysis_failure",
            Self::Timeout { .. } => "timeout_failure",
            Self::Internal { .. } => "internal_error",
        }
    }
}

/// Outcome of one document's pipeline. Exactly one of `similarity_score` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem {
    /// Identifier assigned at intake.
    pub item_id: String,
    /// Submission position.
    pub original_index: usize,
    /// Caller-supplied file name.
    pub filename: String,
    /// Hex-encoded SHA-256 of the payload.
    pub content_sha256: String,
    /// Extracted text, when extraction succeeded.
    pub extracted_text: Option<String>,
    /// Analysis output, when analysis succeeded.
    pub analysis: Option<AnalysisResult>,
    /// Relevance score in `[0, 1]`, when scoring ran.
    pub similarity_score: Option<f32>,
    /// Failure that terminated the pipeline, if any.
    pub error: Option<ItemFailure>,
    /// Wall-clock time spent in this item's pipeline.
    pub elapsed_ms: u64,
    /// Short extractive summary of the text.
    pub summary: Option<String>,
    /// Sentences that overlap the target query the most.
    pub relevant_excerpts: Vec<String>,
    /// Human readable explanation of the score.
    pub justification: Option<String>,
}

impl ScoredItem {
    /// Whether the item carries a usable similarity score.
    pub fn is_scored(&self) -> bool {
        self.similarity_score.is_some()
    }
}

/// A [`ScoredItem`] with its final position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    /// Underlying pipeline outcome.
    #[serde(flatten)]
    pub item: ScoredItem,
    /// 1-based rank for scored items; `None` for failed items.
    pub ranking_position: Option<usize>,
}

/// Final, deterministically ordered batch result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponse {
    /// Ranked items first, then failed items in submission order.
    pub items: Vec<RankedItem>,
    /// Number of submitted documents; always equals `items.len()`.
    pub total_files: usize,
    /// Items that received a ranking position.
    pub successful_files: usize,
    /// Items that ended in a failure.
    pub failed_files: usize,
    /// Wall-clock time of the whole batch.
    pub processing_time_ms: u64,
}

/// Analysis of one free-standing text, outside any batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextAnalysis {
    /// Whitespace-separated words in the trimmed text.
    pub word_count: usize,
    /// Characters in the trimmed text.
    pub char_count: usize,
    /// Extractive summary of the text.
    pub summary: String,
    /// Sentiment, keywords and category.
    #[serde(flatten)]
    pub analysis: AnalysisResult,
    /// Wall-clock time of the analysis.
    pub processing_time_ms: u64,
}

/// Why a standalone text analysis produced no result.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TextAnalysisError {
    /// The text was empty after trimming.
    #[error("text must not be blank")]
    BlankText,
    /// The text exceeded the per-document size limit.
    #[error("text is {len} bytes; the limit is {limit}")]
    TooLong {
        /// Size of the trimmed text in bytes.
        len: usize,
        /// Configured maximum.
        limit: usize,
    },
    /// The analyzer failed, panicked or ran past the per-item timeout.
    #[error(transparent)]
    Failed(#[from] ItemFailure),
}
