//! Document batch pipeline: intake, per-item extraction/analysis/scoring, and ranking.

pub mod insights;
pub mod intake;
mod pipeline;
pub mod ranking;
pub mod scoring;
mod service;
pub mod types;

pub use intake::{IntakeLimits, NormalizedBatch, normalize};
pub use pipeline::ItemState;
pub use ranking::rank;
pub use scoring::SimilarityScorer;
pub use service::{BatchApi, BatchOrchestrator, BatchSettings};
pub use types::{
    BatchRequest, BatchResponse, DocumentItem, ItemFailure, PipelineStage, RankedItem,
    RawDocument, ScoredItem, TextAnalysis, TextAnalysisError, ValidationError,
};
