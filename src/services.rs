//! Process-wide service handles: adapters and the audit sink.
//!
//! Built once at startup from [`Config`] and passed to whatever needs them; nothing here is
//! stored in a global.

use std::sync::Arc;

use thiserror::Error;

use crate::analysis::{Analyzer, LexiconAnalyzer};
use crate::audit::{AuditError, AuditSink, DisabledAuditSink, JsonlAuditSink, TracingAuditSink};
use crate::config::Config;
use crate::extraction::{ContentExtractor, Extractor};

/// Failures raised while bringing services up.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The audit destination could not be opened.
    #[error(transparent)]
    Audit(#[from] AuditError),
}

/// Owned set of adapters shared by every batch.
#[derive(Clone)]
pub struct ServiceHandle {
    extractor: Arc<dyn Extractor>,
    analyzer: Arc<dyn Analyzer>,
    audit: Arc<dyn AuditSink>,
    audit_file: Option<Arc<JsonlAuditSink>>,
}

impl ServiceHandle {
    /// Initialise the built-in adapters and the configured audit sink.
    pub async fn init(config: &Config) -> Result<Self, ServiceError> {
        let (audit, audit_file): (Arc<dyn AuditSink>, Option<Arc<JsonlAuditSink>>) = match (
            config.audit_log_enabled,
            config.audit_log_file.as_ref(),
        ) {
            (false, _) => {
                tracing::info!("Audit logging disabled");
                (Arc::new(DisabledAuditSink), None)
            }
            (true, Some(path)) => {
                let sink = Arc::new(JsonlAuditSink::open(path).await?);
                tracing::info!(path = %path.display(), "Audit events written to file");
                (sink.clone(), Some(sink))
            }
            (true, None) => (Arc::new(TracingAuditSink), None),
        };

        Ok(Self {
            extractor: Arc::new(ContentExtractor::new()),
            analyzer: Arc::new(LexiconAnalyzer::new()),
            audit,
            audit_file,
        })
    }

    /// Assemble a handle from explicit adapters.
    pub fn from_parts(
        extractor: Arc<dyn Extractor>,
        analyzer: Arc<dyn Analyzer>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            extractor,
            analyzer,
            audit,
            audit_file: None,
        }
    }

    /// Text extraction adapter.
    pub fn extractor(&self) -> Arc<dyn Extractor> {
        Arc::clone(&self.extractor)
    }

    /// Text analysis adapter.
    pub fn analyzer(&self) -> Arc<dyn Analyzer> {
        Arc::clone(&self.analyzer)
    }

    /// Audit sink.
    pub fn audit(&self) -> Arc<dyn AuditSink> {
        Arc::clone(&self.audit)
    }

    /// Flush and close owned resources.
    pub async fn shutdown(self) {
        if let Some(file) = self.audit_file {
            file.shutdown().await;
        }
        tracing::debug!("Services shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditEvent;
    use crate::processing::PipelineStage;

    #[tokio::test]
    async fn file_sink_is_flushed_on_shutdown() {
        let path = std::env::temp_dir()
            .join(format!("docrank-services-{}", uuid::Uuid::new_v4()))
            .join("audit.jsonl");
        let config = Config {
            audit_log_file: Some(path.clone()),
            ..Config::default()
        };

        let services = ServiceHandle::init(&config).await.expect("services start");
        services
            .audit()
            .record(AuditEvent::success("item-1", PipelineStage::Extraction, "ok"));
        services.shutdown().await;

        let written = std::fs::read_to_string(&path).expect("audit file exists");
        assert_eq!(written.lines().count(), 1);
        assert!(written.contains("\"item_id\":\"item-1\""));
        let _ = std::fs::remove_dir_all(path.parent().expect("parent dir"));
    }

    #[tokio::test]
    async fn disabled_audit_opens_no_file() {
        let path = std::env::temp_dir().join(format!("docrank-off-{}.jsonl", uuid::Uuid::new_v4()));
        let config = Config {
            audit_log_enabled: false,
            audit_log_file: Some(path.clone()),
            ..Config::default()
        };

        let services = ServiceHandle::init(&config).await.expect("services start");
        services
            .audit()
            .record(AuditEvent::failure("item-1", PipelineStage::Analysis, "boom"));
        services.shutdown().await;

        assert!(!path.exists());
    }
}
