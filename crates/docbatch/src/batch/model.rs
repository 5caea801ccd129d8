//! Batch job records and their wire representations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a batch job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Partial,
    Cancelled,
}

impl BatchStatus {
    pub const TERMINAL: [BatchStatus; 4] = [
        BatchStatus::Completed,
        BatchStatus::Failed,
        BatchStatus::Partial,
        BatchStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Queued => "queued",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
            BatchStatus::Partial => "partial",
            BatchStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal jobs accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }

    /// Outcome of a fully executed batch.
    ///
    /// No failures is `completed`, no successes is `failed`, anything in
    /// between is `partial`.
    pub fn from_counts(processed: u32, failed: u32) -> Self {
        if failed == 0 {
            BatchStatus::Completed
        } else if processed == 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::Partial
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(BatchStatus::Queued),
            "processing" => Ok(BatchStatus::Processing),
            "completed" => Ok(BatchStatus::Completed),
            "failed" => Ok(BatchStatus::Failed),
            "partial" => Ok(BatchStatus::Partial),
            "cancelled" => Ok(BatchStatus::Cancelled),
            other => Err(format!("unknown batch status '{}'", other)),
        }
    }
}

/// State of one document inside a batch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "processing" => Ok(DocumentStatus::Processing),
            "completed" => Ok(DocumentStatus::Completed),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("unknown document status '{}'", other)),
        }
    }
}

/// What the extraction service should pull out of a document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionType {
    Markdown,
    Tables,
    Images,
    All,
}

impl ExtractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionType::Markdown => "markdown",
            ExtractionType::Tables => "tables",
            ExtractionType::Images => "images",
            ExtractionType::All => "all",
        }
    }
}

impl FromStr for ExtractionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "markdown" => Ok(ExtractionType::Markdown),
            "tables" => Ok(ExtractionType::Tables),
            "images" => Ok(ExtractionType::Images),
            "all" => Ok(ExtractionType::All),
            other => Err(format!("unknown extraction type '{}'", other)),
        }
    }
}

/// Advisory priority. Scheduling follows submission order regardless.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// Execution options fixed at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchOptions {
    pub max_concurrent: usize,
    pub chunk_size: u32,
    pub overlap_size: u32,
    pub output_format: String,
    #[serde(default)]
    pub notify_on_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl BatchOptions {
    /// Webhook target, if the caller asked to be notified.
    pub fn notification_target(&self) -> Option<&str> {
        if self.notify_on_complete {
            self.webhook_url.as_deref().filter(|url| !url.is_empty())
        } else {
            None
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            chunk_size: 1000,
            overlap_size: 200,
            output_format: "json".to_string(),
            notify_on_complete: false,
            webhook_url: None,
        }
    }
}

/// One document tracked inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentJobEntry {
    pub document_id: String,
    pub extraction_type: ExtractionType,
    pub priority: Priority,
    pub status: DocumentStatus,
    pub extraction_id: Option<String>,
    pub error: Option<String>,
    pub processing_time_ms: Option<u64>,
}

impl DocumentJobEntry {
    pub fn new(document_id: impl Into<String>, extraction_type: ExtractionType) -> Self {
        Self {
            document_id: document_id.into(),
            extraction_type,
            priority: Priority::Normal,
            status: DocumentStatus::Pending,
            extraction_id: None,
            error: None,
            processing_time_ms: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Persisted batch job.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchJob {
    pub id: String,
    pub owner_id: String,
    pub workspace_id: Option<String>,
    pub status: BatchStatus,
    pub total_documents: u32,
    pub processed_documents: u32,
    pub failed_documents: u32,
    pub documents: Vec<DocumentJobEntry>,
    pub options: BatchOptions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    /// Creates a `queued` job with a fresh id.
    pub fn new(
        owner_id: impl Into<String>,
        workspace_id: Option<String>,
        documents: Vec<DocumentJobEntry>,
        options: BatchOptions,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            workspace_id,
            status: BatchStatus::Queued,
            total_documents: documents.len() as u32,
            processed_documents: 0,
            failed_documents: 0,
            documents,
            options,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Documents that have reached an outcome.
    pub fn settled_documents(&self) -> u32 {
        self.processed_documents + self.failed_documents
    }

    pub fn to_response(&self) -> BatchStatusResponse {
        BatchStatusResponse {
            batch_id: self.id.clone(),
            status: self.status,
            total_documents: self.total_documents,
            processed_documents: self.processed_documents,
            failed_documents: self.failed_documents,
            estimated_completion_time: None,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
            completed_at: self.completed_at,
            results: self.documents.iter().map(DocumentResult::from).collect(),
        }
    }
}

/// Per-document entry of a status response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResult {
    pub document_id: String,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Milliseconds spent on the extraction call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<u64>,
}

impl From<&DocumentJobEntry> for DocumentResult {
    fn from(entry: &DocumentJobEntry) -> Self {
        Self {
            document_id: entry.document_id.clone(),
            status: entry.status,
            extraction_id: entry.extraction_id.clone(),
            error: entry.error.clone(),
            processing_time: entry.processing_time_ms,
        }
    }
}

/// Snapshot returned by create and status calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusResponse {
    pub batch_id: String,
    pub status: BatchStatus,
    pub total_documents: u32,
    pub processed_documents: u32,
    pub failed_documents: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub results: Vec<DocumentResult>,
}

/// Outcome of a single document once its extraction call settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpdate {
    /// Index of the document in the batch's ordered list.
    pub position: usize,
    pub status: DocumentStatus,
    pub extraction_id: Option<String>,
    pub error: Option<String>,
    pub processing_time_ms: u64,
}
