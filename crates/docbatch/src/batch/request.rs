//! Create-batch request body and its validation.

use serde::Deserialize;

use crate::batch::model::{BatchOptions, DocumentJobEntry, ExtractionType, Priority};
use crate::config::{BatchConfig, MAX_BATCH_DOCUMENTS};
use crate::error::BatchError;

const MAX_CONCURRENT: std::ops::RangeInclusive<i64> = 1..=10;
const CHUNK_SIZE: std::ops::RangeInclusive<i64> = 100..=10_000;
const MAX_DOCUMENT_ID_LEN: usize = 128;

/// Body of `POST /batch` as sent by the client.
///
/// Fields are kept loose so that [`CreateBatchRequest::validate`] can name
/// the first violated constraint instead of failing on deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchRequest {
    #[serde(default)]
    pub documents: Option<Vec<DocumentRequest>>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub options: Option<BatchOptionsRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub extraction_type: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOptionsRequest {
    #[serde(default)]
    pub max_concurrent: Option<i64>,
    #[serde(default)]
    pub chunk_size: Option<i64>,
    #[serde(default)]
    pub overlap_size: Option<i64>,
    #[serde(default)]
    pub output_format: Option<String>,
    #[serde(default)]
    pub notify_on_complete: Option<bool>,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBatch {
    pub documents: Vec<DocumentJobEntry>,
    pub workspace_id: Option<String>,
    pub options: BatchOptions,
}

impl ValidatedBatch {
    /// Distinct document ids, in first-seen order.
    pub fn unique_document_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.documents.len());
        for doc in &self.documents {
            if !ids.contains(&doc.document_id) {
                ids.push(doc.document_id.clone());
            }
        }
        ids
    }
}

fn invalid(message: impl Into<String>) -> BatchError {
    BatchError::Validation(message.into())
}

fn is_valid_document_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_DOCUMENT_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl CreateBatchRequest {
    /// Checks every constraint in order and stops at the first violation.
    pub fn validate(&self, limits: &BatchConfig) -> Result<ValidatedBatch, BatchError> {
        let documents = match &self.documents {
            Some(docs) if !docs.is_empty() => docs,
            _ => return Err(invalid("At least one document is required")),
        };
        let max_documents = limits.max_documents.min(MAX_BATCH_DOCUMENTS);
        if documents.len() > max_documents {
            return Err(invalid(format!(
                "Maximum {} documents per batch (got {})",
                max_documents,
                documents.len()
            )));
        }

        let mut entries = Vec::with_capacity(documents.len());
        for (i, doc) in documents.iter().enumerate() {
            let document_id = doc
                .document_id
                .as_deref()
                .map(str::trim)
                .ok_or_else(|| invalid(format!("documents[{}].documentId is required", i)))?;
            if !is_valid_document_id(document_id) {
                return Err(invalid(format!(
                    "documents[{}].documentId '{}' is not a valid document id",
                    i, document_id
                )));
            }

            let extraction_type: ExtractionType = doc
                .extraction_type
                .as_deref()
                .ok_or_else(|| invalid(format!("documents[{}].extractionType is required", i)))?
                .parse()
                .map_err(|_| {
                    invalid(format!(
                        "documents[{}].extractionType must be one of markdown, tables, images, all",
                        i
                    ))
                })?;

            let priority: Priority = match doc.priority.as_deref() {
                Some(p) => p.parse().map_err(|_| {
                    invalid(format!(
                        "documents[{}].priority must be one of low, normal, high",
                        i
                    ))
                })?,
                None => Priority::default(),
            };

            entries.push(
                DocumentJobEntry::new(document_id, extraction_type).with_priority(priority),
            );
        }

        let workspace_id = match self.workspace_id.as_deref().map(str::trim) {
            Some("") => return Err(invalid("workspaceId must not be empty")),
            other => other.map(str::to_string),
        };

        let options = self.validate_options(limits)?;

        Ok(ValidatedBatch {
            documents: entries,
            workspace_id,
            options,
        })
    }

    fn validate_options(&self, limits: &BatchConfig) -> Result<BatchOptions, BatchError> {
        let requested = self.options.clone().unwrap_or_default();

        let max_concurrent = match requested.max_concurrent {
            Some(n) if MAX_CONCURRENT.contains(&n) => n as usize,
            Some(_) => return Err(invalid("options.maxConcurrent must be between 1 and 10")),
            None => limits.default_max_concurrent,
        };

        let chunk_size = match requested.chunk_size {
            Some(n) if CHUNK_SIZE.contains(&n) => n as u32,
            Some(_) => return Err(invalid("options.chunkSize must be between 100 and 10000")),
            None => limits.default_chunk_size,
        };

        let overlap_size = match requested.overlap_size {
            Some(n) if n >= 0 && n < i64::from(chunk_size) => n as u32,
            Some(_) => {
                return Err(invalid(
                    "options.overlapSize must be non-negative and smaller than chunkSize",
                ))
            }
            None => limits.default_overlap_size.min(chunk_size.saturating_sub(1)),
        };

        let output_format = match requested.output_format.as_deref().map(str::trim) {
            Some("") => return Err(invalid("options.outputFormat must not be empty")),
            Some(format) => format.to_string(),
            None => limits.default_output_format.clone(),
        };

        let webhook_url = match requested.webhook_url.as_deref().map(str::trim) {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                Some(url.to_string())
            }
            Some(_) => return Err(invalid("options.webhookUrl must be an http(s) URL")),
            None => None,
        };

        Ok(BatchOptions {
            max_concurrent,
            chunk_size,
            overlap_size,
            output_format,
            notify_on_complete: requested.notify_on_complete.unwrap_or(false),
            webhook_url,
        })
    }
}
