#![deny(missing_docs)]

//! Core library for the docrank batch ranking service.

/// Sentiment, keyword, and category analysis.
pub mod analysis;
/// HTTP routing and REST handlers.
pub mod api;
/// Append-only audit trail for pipeline stages.
pub mod audit;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction from uploaded payloads.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Batch metrics helpers.
pub mod metrics;
/// Document batch pipeline: intake, per-item processing, and ranking.
pub mod processing;
/// Process-wide adapter and audit handles.
pub mod services;
