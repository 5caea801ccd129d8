use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cancel::CancelRegistry;
use super::executor::{BatchExecutor, RunOutcome};
use super::model::{BatchJob, BatchStatusResponse};
use super::request::CreateBatchRequest;
use crate::auth::Caller;
use crate::config::BatchConfig;
use crate::db::{DocumentAccess, DocumentRecord, JobRepository};
use crate::error::BatchError;
use crate::notify::NotificationDispatcher;
use crate::processing::DocumentProcessingClient;

/// A batch accepted by [`BatchJobController::create_batch`].
#[derive(Debug)]
pub struct SubmittedBatch {
    /// The `202 Accepted` body.
    pub response: BatchStatusResponse,
    /// Handle of the detached executor run. Dropping it does not stop the run.
    pub run: JoinHandle<RunOutcome>,
}

/// Entry point of the batch API: create, poll and cancel.
#[derive(Clone)]
pub struct BatchJobController {
    jobs: Arc<dyn JobRepository>,
    documents: Arc<dyn DocumentAccess>,
    executor: BatchExecutor,
    registry: CancelRegistry,
    limits: BatchConfig,
}

fn require_caller(caller: Option<&Caller>) -> Result<&Caller, BatchError> {
    caller.ok_or_else(|| BatchError::Authentication("a valid API key is required".to_string()))
}

fn require_batch_id(batch_id: &str) -> Result<&str, BatchError> {
    let batch_id = batch_id.trim();
    if batch_id.is_empty() {
        return Err(BatchError::Validation("batchId is required".to_string()));
    }
    Ok(batch_id)
}

impl BatchJobController {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        documents: Arc<dyn DocumentAccess>,
        client: Arc<dyn DocumentProcessingClient>,
        notifier: Arc<dyn NotificationDispatcher>,
        limits: BatchConfig,
    ) -> Self {
        let registry = CancelRegistry::new();
        let executor = BatchExecutor::new(jobs.clone(), client, notifier, registry.clone());
        Self {
            jobs,
            documents,
            executor,
            registry,
            limits,
        }
    }

    /// Validates, authorizes and persists a batch, then starts it in the
    /// background.
    ///
    /// Checks run in this order: request shape, caller identity, workspace
    /// access, document existence and read access. Nothing is persisted
    /// unless all of them pass.
    pub async fn create_batch(
        &self,
        request: &CreateBatchRequest,
        caller: Option<&Caller>,
    ) -> Result<SubmittedBatch, BatchError> {
        let batch = request.validate(&self.limits)?;
        let caller = require_caller(caller)?;

        if let Some(workspace_id) = &batch.workspace_id {
            self.authorize_workspace(workspace_id, caller).await?;
        }
        self.authorize_documents(&batch.unique_document_ids(), caller)
            .await?;

        let job = BatchJob::new(
            caller.user_id.clone(),
            batch.workspace_id,
            batch.documents,
            batch.options,
        );
        self.jobs.insert(&job).await?;

        let mut response = job.to_response();
        let eta = self.limits.seconds_per_document * u64::from(job.total_documents);
        response.estimated_completion_time = Some(Utc::now() + Duration::seconds(eta as i64));

        info!(
            batch_id = %job.id,
            owner_id = %job.owner_id,
            documents = job.total_documents,
            max_concurrent = job.options.max_concurrent,
            "Batch queued"
        );

        let token = self.registry.register(&job.id);
        let executor = self.executor.clone();
        let run = tokio::spawn(async move { executor.run(job, token).await });

        Ok(SubmittedBatch { response, run })
    }

    /// Current snapshot of a batch owned by the caller.
    pub async fn get_batch_status(
        &self,
        batch_id: &str,
        caller: Option<&Caller>,
    ) -> Result<BatchStatusResponse, BatchError> {
        let caller = require_caller(caller)?;
        let batch_id = require_batch_id(batch_id)?;

        self.jobs
            .find_for_owner(batch_id, &caller.user_id)
            .await?
            .map(|job| job.to_response())
            .ok_or_else(|| BatchError::NotFound(format!("Batch {} not found", batch_id)))
    }

    /// Moves a queued or processing batch to `cancelled`.
    ///
    /// In-flight extraction calls finish; the executor stops before its
    /// next window and discards what the current one reports.
    pub async fn cancel_batch(
        &self,
        batch_id: &str,
        caller: Option<&Caller>,
    ) -> Result<bool, BatchError> {
        let caller = require_caller(caller)?;
        let batch_id = require_batch_id(batch_id)?;

        if !self.jobs.cancel(batch_id, &caller.user_id).await? {
            return Err(BatchError::NotFound(format!(
                "Batch {} not found or not cancellable",
                batch_id
            )));
        }

        if !self.registry.cancel(batch_id) {
            debug!(batch_id, "No running executor to signal");
        }
        info!(batch_id, "Batch cancelled");
        Ok(true)
    }

    /// Loads a document the caller may read.
    pub async fn authorize_document(
        &self,
        document_id: &str,
        caller: Option<&Caller>,
    ) -> Result<DocumentRecord, BatchError> {
        let caller = require_caller(caller)?;
        let document = self
            .documents
            .find_document(document_id)
            .await?
            .ok_or_else(|| BatchError::NotFound(format!("Document {} not found", document_id)))?;

        if !self.documents.can_read(&caller.user_id, &document).await? {
            return Err(BatchError::Authorization(format!(
                "Access denied to document {}",
                document_id
            )));
        }
        Ok(document)
    }

    async fn authorize_workspace(
        &self,
        workspace_id: &str,
        caller: &Caller,
    ) -> Result<(), BatchError> {
        if self
            .documents
            .is_workspace_member(workspace_id, &caller.user_id)
            .await?
        {
            return Ok(());
        }
        let owner = self.documents.workspace_owner(workspace_id).await?;
        if owner.as_deref() == Some(caller.user_id.as_str()) {
            return Ok(());
        }

        warn!(workspace_id, user_id = %caller.user_id, "Workspace access denied");
        Err(BatchError::Authorization(format!(
            "Access denied to workspace {}",
            workspace_id
        )))
    }

    async fn authorize_documents(&self, ids: &[String], caller: &Caller) -> Result<(), BatchError> {
        let found: HashMap<String, DocumentRecord> = self
            .documents
            .find_documents(ids)
            .await?
            .into_iter()
            .map(|doc| (doc.id.clone(), doc))
            .collect();

        if found.len() != ids.len() {
            return Err(BatchError::Authorization(
                "One or more documents not found or access denied".to_string(),
            ));
        }

        for id in ids {
            let Some(document) = found.get(id) else {
                return Err(BatchError::Authorization(format!(
                    "Document {} not found or access denied",
                    id
                )));
            };
            if !self.documents.can_read(&caller.user_id, document).await? {
                warn!(document_id = %id, user_id = %caller.user_id, "Document access denied");
                return Err(BatchError::Authorization(format!(
                    "Access denied to document {}",
                    id
                )));
            }
        }
        Ok(())
    }
}
