use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::cancel::{CancelRegistry, CancelToken};
use super::model::{
    BatchJob, BatchOptions, BatchStatus, DocumentJobEntry, DocumentStatus, DocumentUpdate,
};
use crate::db::{DatabaseError, JobRepository};
use crate::notify::{BatchNotification, NotificationDispatcher};
use crate::processing::{DocumentProcessingClient, ProcessingRequest};

/// How an executor run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every window ran and the job was moved to this terminal status.
    Finished(BatchStatus),
    /// The job was cancelled before all windows ran.
    Cancelled,
    /// The job was no longer `queued` when the run started.
    Skipped,
    /// Storage failed mid-run; the job is left as last persisted.
    Aborted,
}

/// Runs the documents of one batch in windows of `max_concurrent`.
///
/// A window is dispatched in full, awaited in full, then persisted in one
/// transaction before the next window starts.
#[derive(Clone)]
pub struct BatchExecutor {
    jobs: Arc<dyn JobRepository>,
    client: Arc<dyn DocumentProcessingClient>,
    notifier: Arc<dyn NotificationDispatcher>,
    registry: CancelRegistry,
}

impl BatchExecutor {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        client: Arc<dyn DocumentProcessingClient>,
        notifier: Arc<dyn NotificationDispatcher>,
        registry: CancelRegistry,
    ) -> Self {
        Self {
            jobs,
            client,
            notifier,
            registry,
        }
    }

    /// Executes `job` to completion or cancellation.
    ///
    /// Never returns an error: storage failures are logged and end the run.
    /// The job's cancel token is always dropped from the registry on exit.
    pub async fn run(&self, job: BatchJob, token: CancelToken) -> RunOutcome {
        let span = info_span!("batch", batch_id = %job.id, documents = job.total_documents);
        let outcome = match self.execute(&job, &token).instrument(span).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(batch_id = %job.id, error = %e, "Batch run aborted by storage error");
                RunOutcome::Aborted
            }
        };
        self.registry.remove(&job.id);
        outcome
    }

    async fn execute(
        &self,
        job: &BatchJob,
        token: &CancelToken,
    ) -> Result<RunOutcome, DatabaseError> {
        if !self.jobs.mark_processing(&job.id).await? {
            debug!("Job is no longer queued, skipping");
            return Ok(RunOutcome::Skipped);
        }
        info!("Batch processing started");

        let window_size = job.options.max_concurrent.max(1);
        let positions: Vec<usize> = (0..job.documents.len()).collect();
        let mut processed = 0u32;
        let mut failed = 0u32;

        for (index, window) in positions.chunks(window_size).enumerate() {
            if token.is_cancelled() {
                info!(window = index, "Cancellation observed, stopping");
                return Ok(RunOutcome::Cancelled);
            }

            self.jobs.mark_documents_processing(&job.id, window).await?;

            let updates = join_all(window.iter().map(|&position| {
                self.process_document(position, &job.documents[position], &job.options)
            }))
            .await;

            if !self.jobs.record_window(&job.id, &updates).await? {
                info!(window = index, "Job became terminal while the window ran, results discarded");
                return Ok(RunOutcome::Cancelled);
            }

            for update in &updates {
                match update.status {
                    DocumentStatus::Failed => failed += 1,
                    _ => processed += 1,
                }
            }
            debug!(window = index, processed, failed, "Window recorded");
        }

        let status = BatchStatus::from_counts(processed, failed);
        if !self.jobs.finish(&job.id, status).await? {
            return Ok(RunOutcome::Cancelled);
        }
        info!(%status, processed, failed, "Batch finished");

        if let Some(url) = job.options.notification_target() {
            let notification = BatchNotification {
                batch_id: job.id.clone(),
                status,
                total_documents: job.total_documents,
                processed_documents: processed,
                failed_documents: failed,
            };
            if let Err(e) = self.notifier.notify(url, &notification).await {
                warn!(error = %e, "Completion webhook failed");
            }
        }

        Ok(RunOutcome::Finished(status))
    }

    async fn process_document(
        &self,
        position: usize,
        entry: &DocumentJobEntry,
        options: &BatchOptions,
    ) -> DocumentUpdate {
        let request = ProcessingRequest::for_entry(entry, options);
        let started = Instant::now();
        let result = self.client.process(&request).await;
        let processing_time_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(success) => DocumentUpdate {
                position,
                status: DocumentStatus::Completed,
                extraction_id: success.extraction_id,
                error: None,
                processing_time_ms,
            },
            Err(e) => {
                warn!(document_id = %entry.document_id, error = %e, "Document extraction failed");
                DocumentUpdate {
                    position,
                    status: DocumentStatus::Failed,
                    extraction_id: None,
                    error: Some(e.to_string()),
                    processing_time_ms,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::model::ExtractionType;
    use crate::db::{Database, SqliteJobRepository};
    use crate::notify::NotificationError;
    use crate::processing::{DocumentProcessingError, ProcessingSuccess};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fails the listed documents, succeeds the rest, and tracks peak concurrency.
    #[derive(Default)]
    struct ScriptedClient {
        failing: Vec<String>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentProcessingClient for ScriptedClient {
        async fn process(
            &self,
            request: &ProcessingRequest,
        ) -> Result<ProcessingSuccess, DocumentProcessingError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(request.document_id.clone());
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(&request.document_id) {
                Err(DocumentProcessingError::Status {
                    status: 500,
                    body: "extraction crashed".to_string(),
                })
            } else {
                Ok(ProcessingSuccess {
                    extraction_id: Some(format!("ext-{}", request.document_id)),
                })
            }
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, BatchNotification)>>,
    }

    #[async_trait]
    impl NotificationDispatcher for RecordingNotifier {
        async fn notify(
            &self,
            webhook_url: &str,
            notification: &BatchNotification,
        ) -> Result<(), NotificationError> {
            self.sent
                .lock()
                .unwrap()
                .push((webhook_url.to_string(), notification.clone()));
            Ok(())
        }
    }

    fn job(n: usize, options: BatchOptions) -> BatchJob {
        let docs = (1..=n)
            .map(|i| DocumentJobEntry::new(format!("d{}", i), ExtractionType::Markdown))
            .collect();
        BatchJob::new("owner-1", None, docs, options)
    }

    fn notifying(max_concurrent: usize) -> BatchOptions {
        BatchOptions {
            max_concurrent,
            notify_on_complete: true,
            webhook_url: Some("https://hooks.example.com/done".to_string()),
            ..BatchOptions::default()
        }
    }

    struct Harness {
        jobs: Arc<SqliteJobRepository>,
        client: Arc<ScriptedClient>,
        notifier: Arc<RecordingNotifier>,
        registry: CancelRegistry,
        executor: BatchExecutor,
    }

    fn harness(client: ScriptedClient) -> Harness {
        let jobs = Arc::new(SqliteJobRepository::new(Database::open_in_memory().unwrap()));
        let client = Arc::new(client);
        let notifier = Arc::new(RecordingNotifier::default());
        let registry = CancelRegistry::new();
        let executor = BatchExecutor::new(
            jobs.clone(),
            client.clone(),
            notifier.clone(),
            registry.clone(),
        );
        Harness {
            jobs,
            client,
            notifier,
            registry,
            executor,
        }
    }

    #[tokio::test]
    async fn test_mixed_outcomes_finish_partial_and_notify() {
        let h = harness(ScriptedClient {
            failing: vec!["d2".to_string()],
            ..ScriptedClient::default()
        });
        let job = job(3, notifying(3));
        h.jobs.insert(&job).await.unwrap();
        let token = h.registry.register(&job.id);

        let outcome = h.executor.run(job.clone(), token).await;
        assert_eq!(outcome, RunOutcome::Finished(BatchStatus::Partial));

        let stored = h.jobs.find(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BatchStatus::Partial);
        assert_eq!(stored.processed_documents, 2);
        assert_eq!(stored.failed_documents, 1);
        assert!(stored.completed_at.is_some());
        assert_eq!(stored.documents[0].extraction_id.as_deref(), Some("ext-d1"));
        assert_eq!(stored.documents[1].status, DocumentStatus::Failed);
        assert!(stored.documents[1]
            .error
            .as_deref()
            .unwrap()
            .contains("extraction crashed"));

        let sent = h.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "https://hooks.example.com/done");
        assert_eq!(sent[0].1.status, BatchStatus::Partial);
        assert_eq!(sent[0].1.processed_documents, 2);
        assert!(!h.registry.is_tracked(&job.id));
    }

    #[tokio::test]
    async fn test_windows_bound_concurrency_and_keep_order() {
        let h = harness(ScriptedClient::default());
        let job = job(7, BatchOptions {
            max_concurrent: 2,
            ..BatchOptions::default()
        });
        h.jobs.insert(&job).await.unwrap();

        let outcome = h.executor.run(job.clone(), CancelToken::new()).await;
        assert_eq!(outcome, RunOutcome::Finished(BatchStatus::Completed));
        assert_eq!(h.client.peak.load(Ordering::SeqCst), 2);

        // Windows start in submission order.
        let calls = h.client.calls.lock().unwrap().clone();
        let mut first_window: Vec<_> = calls[..2].to_vec();
        first_window.sort();
        assert_eq!(first_window, vec!["d1", "d2"]);
        assert_eq!(calls[6], "d7");

        assert!(h.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_failures_finish_failed() {
        let h = harness(ScriptedClient {
            failing: vec!["d1".to_string(), "d2".to_string()],
            ..ScriptedClient::default()
        });
        let job = job(2, BatchOptions::default());
        h.jobs.insert(&job).await.unwrap();

        let outcome = h.executor.run(job.clone(), CancelToken::new()).await;
        assert_eq!(outcome, RunOutcome::Finished(BatchStatus::Failed));
    }

    #[tokio::test]
    async fn test_cancelled_job_is_skipped_without_calls() {
        let h = harness(ScriptedClient::default());
        let job = job(2, notifying(1));
        h.jobs.insert(&job).await.unwrap();
        assert!(h.jobs.cancel(&job.id, "owner-1").await.unwrap());
        let token = h.registry.register(&job.id);
        h.registry.cancel(&job.id);

        let outcome = h.executor.run(job.clone(), token).await;
        assert_eq!(outcome, RunOutcome::Skipped);
        assert!(h.client.calls.lock().unwrap().is_empty());
        assert!(h.notifier.sent.lock().unwrap().is_empty());
        assert!(!h.registry.is_tracked(&job.id));
    }

    #[tokio::test]
    async fn test_token_stops_before_next_window() {
        let h = harness(ScriptedClient::default());
        let job = job(3, notifying(1));
        h.jobs.insert(&job).await.unwrap();
        let token = CancelToken::new();

        let run = {
            let executor = h.executor.clone();
            let job = job.clone();
            let token = token.clone();
            tokio::spawn(async move { executor.run(job, token).await })
        };

        // Wait for the first window to be recorded, then cancel.
        loop {
            let stored = h.jobs.find(&job.id).await.unwrap().unwrap();
            if stored.settled_documents() >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(h.jobs.cancel(&job.id, "owner-1").await.unwrap());
        token.cancel();

        assert_eq!(run.await.unwrap(), RunOutcome::Cancelled);
        let stored = h.jobs.find(&job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BatchStatus::Cancelled);
        assert!(stored.settled_documents() >= 1);
        assert!(stored.settled_documents() < 3);
        assert!(h.notifier.sent.lock().unwrap().is_empty());
    }
}
