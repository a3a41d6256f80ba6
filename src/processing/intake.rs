//! Batch validation and item indexing.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::types::{DocumentItem, RawDocument, ValidationError};
use crate::config::Config;

/// Size limits enforced before any pipeline starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeLimits {
    /// Maximum number of documents per batch.
    pub max_batch_size: usize,
    /// Maximum payload size per document, in bytes.
    pub max_file_size: usize,
}

impl IntakeLimits {
    /// Limits that accept any non-empty batch.
    pub const UNBOUNDED: Self = Self {
        max_batch_size: usize::MAX,
        max_file_size: usize::MAX,
    };
}

impl From<&Config> for IntakeLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_batch_size: config.max_batch_size,
            max_file_size: config.max_file_size,
        }
    }
}

/// A validated batch: indexed items plus the trimmed target query.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    /// Items in submission order.
    pub items: Vec<DocumentItem>,
    /// Target query with surrounding whitespace removed.
    pub target_query: String,
}

/// Validate a batch and assign each document its identifier and submission index.
///
/// The whole batch is rejected on the first violation; no partial result is produced.
pub fn normalize(
    documents: Vec<RawDocument>,
    target_query: &str,
    limits: &IntakeLimits,
) -> Result<NormalizedBatch, ValidationError> {
    if documents.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }
    let target_query = target_query.trim();
    if target_query.is_empty() {
        return Err(ValidationError::BlankQuery);
    }
    if documents.len() > limits.max_batch_size {
        return Err(ValidationError::TooManyDocuments {
            count: documents.len(),
            limit: limits.max_batch_size,
        });
    }

    for (index, document) in documents.iter().enumerate() {
        if document.payload.is_empty() {
            return Err(ValidationError::EmptyPayload {
                index,
                filename: document.filename.clone(),
            });
        }
        if document.payload.len() > limits.max_file_size {
            return Err(ValidationError::PayloadTooLarge {
                index,
                filename: document.filename.clone(),
                size: document.payload.len(),
                limit: limits.max_file_size,
            });
        }
    }

    let items = documents
        .into_iter()
        .enumerate()
        .map(|(original_index, document)| DocumentItem {
            id: Uuid::new_v4().to_string(),
            original_index,
            filename: document.filename,
            content_type: document.content_type,
            content_sha256: hex::encode(Sha256::digest(&document.payload)),
            payload: document.payload,
        })
        .collect();

    Ok(NormalizedBatch {
        items,
        target_query: target_query.to_string(),
    })
}
