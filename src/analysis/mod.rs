use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

mod lexicon;

pub use lexicon::LexiconAnalyzer;

/// Errors raised by analysis backends.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Text contained nothing the analyzer could work with.
    #[error("text contains no analyzable words")]
    EmptyInput,
    /// Backend was unable to analyze the supplied text.
    #[error("analysis backend failed: {0}")]
    Backend(String),
}

/// Coarse sentiment polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    /// Mostly favourable wording.
    Positive,
    /// Balanced or no sentiment-bearing wording.
    Neutral,
    /// Mostly unfavourable wording.
    Negative,
}

/// Sentiment label with its confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sentiment {
    /// Polarity label.
    pub label: SentimentLabel,
    /// Confidence in `[0, 1]`.
    pub score: f32,
}

/// Output of an [`Analyzer`] for one extracted text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Sentiment label and score.
    pub sentiment: Sentiment,
    /// Distinct keywords describing the text.
    pub keywords: BTreeSet<String>,
    /// Single document category.
    pub category: String,
}

/// Interface implemented by analysis backends.
///
/// Implementations receive non-empty text and must be safe to call from many pipelines at once.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Derive sentiment, keywords, and category for `text`.
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, AnalysisError>;
}
