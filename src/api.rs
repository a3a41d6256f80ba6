//! HTTP surface for docrank.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /batch` – Rank a multipart batch of documents against a target query. Every part with
//!   a filename (or named `files`) is a document; the `target` field (alias `query`) carries the
//!   query. Returns one result per document, ranked items first.
//! - `GET /analyze-text?text=..` – Analyze one text without ranking it: word and character
//!   counts, summary, keywords, sentiment and category.
//! - `GET /health` – Liveness probe with the crate version.
//! - `GET /metrics` – Batch and document counters since startup.
//! - `GET /stats` – Request totals and average processing time.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! The CLI runs the same orchestrator in-process, so ranking is identical across interfaces.

use crate::analysis::AnalysisResult;
use crate::config::Config;
use crate::metrics::{MetricsSnapshot, UsageStats};
use crate::processing::{
    BatchApi, BatchRequest, BatchResponse, ItemFailure, RankedItem, RawDocument, TextAnalysis,
    TextAnalysisError, ValidationError,
};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Query, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Allowance for multipart framing and text fields on top of the document payloads.
const BODY_HEADROOM: usize = 1024 * 1024;

/// Request body limit for `POST /batch` under `config`.
pub fn body_limit(config: &Config) -> usize {
    config
        .max_batch_size
        .saturating_mul(config.max_file_size)
        .saturating_add(BODY_HEADROOM)
}

/// Build the HTTP router exposing the ranking API surface.
pub fn create_router<S>(service: Arc<S>, body_limit: usize) -> Router
where
    S: BatchApi + 'static,
{
    Router::new()
        .route("/batch", post(rank_batch::<S>))
        .route("/analyze-text", get(analyze_text::<S>))
        .route("/health", get(get_health))
        .route("/metrics", get(get_metrics::<S>))
        .route("/stats", get(get_stats::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

/// One document's outcome in the `POST /batch` response.
#[derive(Serialize)]
struct DocumentResult {
    document_id: String,
    filename: String,
    /// `completed` or `failed`.
    status: &'static str,
    extracted_text: Option<String>,
    analysis: Option<AnalysisResult>,
    similarity_score: Option<f32>,
    ranking_position: Option<usize>,
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
    elapsed_ms: u64,
    summary: Option<String>,
    relevant_excerpts: Vec<String>,
    justification: Option<String>,
}

impl From<RankedItem> for DocumentResult {
    fn from(ranked: RankedItem) -> Self {
        let RankedItem {
            item,
            ranking_position,
        } = ranked;
        let status = if ranking_position.is_some() {
            "completed"
        } else {
            "failed"
        };
        Self {
            document_id: item.item_id,
            filename: item.filename,
            status,
            extracted_text: item.extracted_text,
            analysis: item.analysis,
            similarity_score: item.similarity_score,
            ranking_position,
            error_kind: item.error.as_ref().map(|failure| failure.kind()),
            error: item.error.map(|failure| failure.to_string()),
            elapsed_ms: item.elapsed_ms,
            summary: item.summary,
            relevant_excerpts: item.relevant_excerpts,
            justification: item.justification,
        }
    }
}

/// Success response for the `POST /batch` endpoint.
#[derive(Serialize)]
struct BatchResponseBody {
    results: Vec<DocumentResult>,
    /// Wall-clock batch time in seconds.
    processing_time: f64,
    processing_time_ms: u64,
    total_files: usize,
    successful_files: usize,
    failed_files: usize,
}

impl From<BatchResponse> for BatchResponseBody {
    fn from(response: BatchResponse) -> Self {
        Self {
            results: response.items.into_iter().map(DocumentResult::from).collect(),
            processing_time: response.processing_time_ms as f64 / 1000.0,
            processing_time_ms: response.processing_time_ms,
            total_files: response.total_files,
            successful_files: response.successful_files,
            failed_files: response.failed_files,
        }
    }
}

/// Rank the uploaded documents against the target query.
///
/// Multipart parts are read in order, so result indices follow upload order. Unknown text fields
/// are ignored. Validation failures return 400 before any document is processed.
async fn rank_batch<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchResponseBody>, AppError>
where
    S: BatchApi,
{
    let mut multipart = multipart?;
    let mut documents = Vec::new();
    let mut target = None;
    let mut query = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        if filename.is_some() || name == "files" {
            let content_type = field.content_type().map(str::to_string);
            let payload = field.bytes().await?;
            let filename =
                filename.unwrap_or_else(|| format!("document-{}", documents.len() + 1));
            let mut document = RawDocument::new(filename, payload.to_vec());
            if let Some(content_type) = content_type {
                document = document.with_content_type(content_type);
            }
            documents.push(document);
        } else if name == "target" {
            target = Some(field.text().await?);
        } else if name == "query" {
            query = Some(field.text().await?);
        } else {
            tracing::debug!(field = %name, "Ignoring unknown multipart field");
        }
    }

    let request = BatchRequest {
        documents,
        target_query: target.or(query).unwrap_or_default(),
    };
    let response = service.run_batch(request).await?;
    tracing::info!(
        total_files = response.total_files,
        successful_files = response.successful_files,
        failed_files = response.failed_files,
        processing_time_ms = response.processing_time_ms,
        "Batch request completed"
    );
    Ok(Json(BatchResponseBody::from(response)))
}

#[derive(Deserialize)]
struct AnalyzeTextParams {
    #[serde(default)]
    text: String,
}

/// Response body for `GET /analyze-text`.
#[derive(Serialize)]
struct TextAnalysisBody {
    original_text: String,
    #[serde(flatten)]
    result: TextAnalysis,
}

/// Analyze a single text passed as the `text` query parameter.
async fn analyze_text<S>(
    State(service): State<Arc<S>>,
    Query(params): Query<AnalyzeTextParams>,
) -> Result<Json<TextAnalysisBody>, AppError>
where
    S: BatchApi,
{
    let result = service.analyze_text(&params.text).await?;
    Ok(Json(TextAnalysisBody {
        original_text: params.text,
        result,
    }))
}

/// Response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Return batch/document counters and the duration of the last batch.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: BatchApi,
{
    Json(service.metrics_snapshot())
}

/// Return request totals derived from the metrics counters.
async fn get_stats<S>(State(service): State<Arc<S>>) -> Json<UsageStats>
where
    S: BatchApi,
{
    Json(service.metrics_snapshot().usage())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "rank_batch",
                method: "POST",
                path: "/batch",
                description: "Rank a multipart batch of documents against a target query. Send each document as a `files` part and the query as a `target` field. Response returns { \"results\": [...], \"total_files\": number, \"successful_files\": number, \"failed_files\": number }.",
                request_example: Some(json!({
                    "files": ["contract.pdf", "notes.txt"],
                    "target": "annual revenue report"
                })),
            },
            CommandDescriptor {
                name: "analyze_text",
                method: "GET",
                path: "/analyze-text",
                description: "Analyze one text passed as the `text` query parameter. Response returns word and character counts, a summary, keywords, sentiment and category.",
                request_example: Some(json!({ "text": "Quarterly revenue grew strongly." })),
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Liveness probe returning the service status and version.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return batch and document counters useful for observability dashboards.",
                request_example: None,
            },
            CommandDescriptor {
                name: "stats",
                method: "GET",
                path: "/stats",
                description: "Return total, successful and failed request counts with the average processing time in milliseconds.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    Validation(ValidationError),
    TextAnalysis(TextAnalysisError),
    Multipart { status: StatusCode, message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::TextAnalysis(err) => (text_analysis_status(&err), err.to_string()),
            Self::Multipart { status, message } => (status, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(inner: ValidationError) -> Self {
        Self::Validation(inner)
    }
}

fn text_analysis_status(err: &TextAnalysisError) -> StatusCode {
    match err {
        TextAnalysisError::BlankText => StatusCode::BAD_REQUEST,
        TextAnalysisError::TooLong { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        TextAnalysisError::Failed(ItemFailure::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
        TextAnalysisError::Failed(ItemFailure::Analysis { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        TextAnalysisError::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<TextAnalysisError> for AppError {
    fn from(inner: TextAnalysisError) -> Self {
        Self::TextAnalysis(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Multipart {
            status: inner.status(),
            message: inner.body_text(),
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(inner: MultipartRejection) -> Self {
        Self::Multipart {
            status: inner.status(),
            message: inner.body_text(),
        }
    }
}
