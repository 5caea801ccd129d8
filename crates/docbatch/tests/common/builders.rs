//! Builders and scripted collaborators for integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{Notify, Semaphore};

use docbatch::batch::CreateBatchRequest;
use docbatch::notify::{BatchNotification, NotificationDispatcher, NotificationError};
use docbatch::processing::{
    DocumentProcessingClient, DocumentProcessingError, ProcessingRequest, ProcessingSuccess,
};

/// Builder for `POST /batch` bodies.
pub struct BatchRequestBuilder {
    documents: Vec<Value>,
    workspace_id: Option<String>,
    options: serde_json::Map<String, Value>,
}

impl BatchRequestBuilder {
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
            workspace_id: None,
            options: serde_json::Map::new(),
        }
    }

    /// Adds a markdown extraction for each id.
    pub fn documents(mut self, ids: &[&str]) -> Self {
        for id in ids {
            self.documents
                .push(json!({"documentId": id, "extractionType": "markdown"}));
        }
        self
    }

    pub fn document(mut self, id: &str, extraction_type: &str, priority: Option<&str>) -> Self {
        let mut doc = json!({"documentId": id, "extractionType": extraction_type});
        if let Some(priority) = priority {
            doc["priority"] = json!(priority);
        }
        self.documents.push(doc);
        self
    }

    pub fn workspace(mut self, workspace_id: &str) -> Self {
        self.workspace_id = Some(workspace_id.to_string());
        self
    }

    pub fn max_concurrent(mut self, n: i64) -> Self {
        self.options.insert("maxConcurrent".to_string(), json!(n));
        self
    }

    pub fn webhook(mut self, url: &str) -> Self {
        self.options.insert("notifyOnComplete".to_string(), json!(true));
        self.options.insert("webhookUrl".to_string(), json!(url));
        self
    }

    pub fn to_json(&self) -> Value {
        let mut body = json!({"documents": self.documents});
        if let Some(ws) = &self.workspace_id {
            body["workspaceId"] = json!(ws);
        }
        if !self.options.is_empty() {
            body["options"] = Value::Object(self.options.clone());
        }
        body
    }

    pub fn build(&self) -> CreateBatchRequest {
        serde_json::from_value(self.to_json()).expect("valid request body")
    }
}

/// Succeeds every document except the listed ones.
#[derive(Default)]
pub struct ScriptedClient {
    failing: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn failing(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|id| id.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DocumentProcessingClient for ScriptedClient {
    async fn process(
        &self,
        request: &ProcessingRequest,
    ) -> Result<ProcessingSuccess, DocumentProcessingError> {
        self.calls.lock().unwrap().push(request.document_id.clone());
        if self.failing.contains(&request.document_id) {
            return Err(DocumentProcessingError::Status {
                status: 500,
                body: format!("cannot extract {}", request.document_id),
            });
        }
        Ok(ProcessingSuccess {
            extraction_id: Some(format!("ext-{}", request.document_id)),
        })
    }
}

/// Holds one document's call open until the test releases it.
pub struct GatedClient {
    blocked: String,
    pub started: Notify,
    release: Semaphore,
}

impl GatedClient {
    pub fn blocking(document_id: &str) -> Self {
        Self {
            blocked: document_id.to_string(),
            started: Notify::new(),
            release: Semaphore::new(0),
        }
    }

    pub fn release(&self) {
        self.release.add_permits(1);
    }
}

#[async_trait]
impl DocumentProcessingClient for GatedClient {
    async fn process(
        &self,
        request: &ProcessingRequest,
    ) -> Result<ProcessingSuccess, DocumentProcessingError> {
        if request.document_id == self.blocked {
            self.started.notify_one();
            let _permit = self
                .release
                .acquire()
                .await
                .map_err(|e| DocumentProcessingError::InvalidResponse(e.to_string()))?;
        }
        Ok(ProcessingSuccess::default())
    }
}

/// Records every notification.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<BatchNotification>>,
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn notify(
        &self,
        _webhook_url: &str,
        notification: &BatchNotification,
    ) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
