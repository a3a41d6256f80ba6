use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use docrank::{
    analysis::LexiconAnalyzer,
    api,
    audit::{AuditOutcome, MemoryAuditSink},
    config::Config,
    extraction::ContentExtractor,
    processing::{BatchOrchestrator, BatchRequest, BatchSettings, RawDocument},
    services::ServiceHandle,
};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "docrank-integration";
const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

const REPORT: &str = "The annual report shows revenue growth and profit. \
Results exceeded the forecast for the period.";
const NOTES: &str = "Lunch menu for the team offsite on friday.";

struct Harness {
    app: Router,
    audit: Arc<MemoryAuditSink>,
}

fn harness() -> Harness {
    let config = Config::default();
    let audit = Arc::new(MemoryAuditSink::new());
    let services = ServiceHandle::from_parts(
        Arc::new(ContentExtractor::new()),
        Arc::new(LexiconAnalyzer::new()),
        audit.clone(),
    );
    let orchestrator = BatchOrchestrator::new(&config, &services);
    assert_eq!(*orchestrator.settings(), BatchSettings::from(&config));
    Harness {
        app: api::create_router(Arc::new(orchestrator), api::body_limit(&config)),
        audit,
    }
}

fn file_part(body: &mut Vec<u8>, filename: &str, content_type: &str, payload: &[u8]) {
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(payload);
    body.extend_from_slice(b"\r\n");
}

fn text_part(body: &mut Vec<u8>, name: &str, value: &str) {
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
        .as_bytes(),
    );
}

fn finish(mut body: Vec<u8>) -> Request<Body> {
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Request::builder()
        .method(Method::POST)
        .uri("/batch")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn mixed_batch_ranks_text_and_reports_unsupported_image() {
    let Harness { app, audit } = harness();

    let mut body = Vec::new();
    file_part(&mut body, "notes.txt", "text/plain", NOTES.as_bytes());
    file_part(&mut body, "scan.png", "image/png", PNG_HEADER);
    file_part(&mut body, "report.txt", "text/plain", REPORT.as_bytes());
    text_part(&mut body, "target", "annual revenue report");

    let response = app.oneshot(finish(body)).await.expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;

    assert_eq!(json["total_files"], 3);
    assert_eq!(json["successful_files"], 2);
    assert_eq!(json["failed_files"], 1);

    let results = json["results"].as_array().expect("results array");
    let names: Vec<_> = results
        .iter()
        .map(|result| result["filename"].as_str().expect("filename"))
        .collect();
    assert_eq!(names, vec!["report.txt", "notes.txt", "scan.png"]);

    let report = &results[0];
    assert_eq!(report["status"], "completed");
    assert_eq!(report["ranking_position"], 1);
    let report_score = report["similarity_score"].as_f64().expect("score");
    let notes_score = results[1]["similarity_score"].as_f64().expect("score");
    assert!(report_score > notes_score);
    assert!((0.0..=1.0).contains(&report_score));
    assert!(
        report["analysis"]["keywords"]
            .as_array()
            .expect("keywords")
            .iter()
            .any(|keyword| keyword == "revenue")
    );
    assert!(report["justification"].is_string());
    assert!(!report["relevant_excerpts"].as_array().expect("excerpts").is_empty());

    let image = &results[2];
    assert_eq!(image["status"], "failed");
    assert!(image["ranking_position"].is_null());
    assert!(image["similarity_score"].is_null());
    assert_eq!(image["error_kind"], "extraction_failure");

    let events = audit.events();
    assert_eq!(events.len(), 3 + 3 + 1);
    let image_id = image["document_id"].as_str().expect("document id");
    let image_events: Vec<_> = events
        .iter()
        .filter(|event| event.item_id == image_id)
        .collect();
    assert_eq!(image_events.len(), 1);
    assert_eq!(image_events[0].outcome, AuditOutcome::Failure);
}

#[tokio::test]
async fn missing_target_is_rejected_before_processing() {
    let Harness { app, audit } = harness();

    let mut body = Vec::new();
    file_part(&mut body, "report.txt", "text/plain", REPORT.as_bytes());
    text_part(&mut body, "target", "   ");

    let response = app.oneshot(finish(body)).await.expect("router response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "target query must not be blank");
    assert!(audit.events().is_empty());
}

#[tokio::test]
async fn upload_without_documents_is_rejected() {
    let Harness { app, .. } = harness();

    let mut body = Vec::new();
    text_part(&mut body, "query", "annual report");

    let response = app.oneshot(finish(body)).await.expect("router response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "batch must contain at least one document"
    );
}

#[tokio::test]
async fn jsonl_audit_file_gets_one_line_per_stage() {
    let dir = std::env::temp_dir().join(format!("docrank-it-{}", uuid::Uuid::new_v4()));
    let path = dir.join("audit.jsonl");
    let config = Config {
        audit_log_file: Some(path.clone()),
        ..Config::default()
    };

    let services = ServiceHandle::init(&config).await.expect("services start");
    let orchestrator = BatchOrchestrator::new(&config, &services);
    let response = orchestrator
        .run_batch(BatchRequest {
            documents: vec![
                RawDocument::new("report.txt", REPORT.as_bytes().to_vec()),
                RawDocument::new("scan.png", PNG_HEADER.to_vec()),
            ],
            target_query: "annual report".into(),
        })
        .await
        .expect("batch runs");
    services.shutdown().await;

    assert_eq!(response.successful_files, 1);
    let written = std::fs::read_to_string(&path).expect("audit file");
    let lines: Vec<Value> = written
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 3 + 1);
    assert!(lines.iter().all(|line| line["timestamp"].is_string()));
    assert_eq!(
        lines
            .iter()
            .filter(|line| line["outcome"] == "failure")
            .count(),
        1
    );
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn analyze_text_and_stats_share_counters() {
    let Harness { app, audit } = harness();

    let analyze = Request::builder()
        .method(Method::GET)
        .uri("/analyze-text?text=The%20annual%20report%20shows%20revenue%20growth.")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(analyze).await.expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["word_count"], 6);
    assert!(
        json["keywords"]
            .as_array()
            .expect("keywords")
            .iter()
            .any(|keyword| keyword == "revenue")
    );
    assert_eq!(audit.events().len(), 1);

    let stats = Request::builder()
        .method(Method::GET)
        .uri("/stats")
        .body(Body::empty())
        .expect("request");
    let json = json_body(app.oneshot(stats).await.expect("router response")).await;
    assert_eq!(json["total_requests"], 1);
    assert_eq!(json["successful_requests"], 1);
    assert_eq!(json["failed_requests"], 0);
}
