//! Client for the external document extraction service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::model::{BatchOptions, DocumentJobEntry, ExtractionType};
use crate::config::ExtractionConfig;

/// Longest response body kept in a [`DocumentProcessingError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Error, Debug)]
pub enum DocumentProcessingError {
    #[error("Extraction request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Extraction service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid extraction response: {0}")]
    InvalidResponse(String),
}

/// One extraction call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRequest {
    pub document_id: String,
    pub extraction_type: ExtractionType,
    pub chunk_size: u32,
    pub overlap_size: u32,
    pub output_format: String,
}

impl ProcessingRequest {
    pub fn for_entry(entry: &DocumentJobEntry, options: &BatchOptions) -> Self {
        Self {
            document_id: entry.document_id.clone(),
            extraction_type: entry.extraction_type,
            chunk_size: options.chunk_size,
            overlap_size: options.overlap_size,
            output_format: options.output_format.clone(),
        }
    }
}

/// What the extraction service reported for a successful call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingSuccess {
    pub extraction_id: Option<String>,
}

/// Runs the extraction of a single document.
///
/// Implementations own their timeouts; the executor never cancels a call.
#[async_trait]
pub trait DocumentProcessingClient: Send + Sync {
    async fn process(
        &self,
        request: &ProcessingRequest,
    ) -> Result<ProcessingSuccess, DocumentProcessingError>;
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default, alias = "extraction_id", alias = "id")]
    #[serde(rename = "extractionId")]
    extraction_id: Option<String>,
}

/// [`DocumentProcessingClient`] that posts to
/// `{base_url}/api/documents/{documentId}/extract`.
#[derive(Clone)]
pub struct HttpDocumentProcessingClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpDocumentProcessingClient {
    pub fn new(config: &ExtractionConfig) -> Result<Self, DocumentProcessingError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token(),
        })
    }

    fn endpoint(&self, document_id: &str) -> String {
        format!("{}/api/documents/{}/extract", self.base_url, document_id)
    }
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[async_trait]
impl DocumentProcessingClient for HttpDocumentProcessingClient {
    async fn process(
        &self,
        request: &ProcessingRequest,
    ) -> Result<ProcessingSuccess, DocumentProcessingError> {
        let mut builder = self
            .client
            .post(self.endpoint(&request.document_id))
            .json(request);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DocumentProcessingError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        if body.trim().is_empty() {
            return Ok(ProcessingSuccess::default());
        }

        let parsed: ExtractResponse = serde_json::from_str(&body)
            .map_err(|e| DocumentProcessingError::InvalidResponse(e.to_string()))?;
        Ok(ProcessingSuccess {
            extraction_id: parsed.extraction_id,
        })
    }
}
