//! End-to-end batch lifecycle through the controller.

mod common;

use std::sync::Arc;

use common::{BatchRequestBuilder, GatedClient, RecordingNotifier, ScriptedClient, TestHarness};
use docbatch::auth::Caller;
use docbatch::batch::{BatchStatus, DocumentStatus, RunOutcome};
use docbatch::config::{ExtractionConfig, NotificationConfig};
use docbatch::{BatchError, HttpDocumentProcessingClient, WebhookNotifier};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn validation_message(err: BatchError) -> String {
    match err {
        BatchError::Validation(message) => message,
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn window_with_one_failure_ends_partial() {
    let notifier = Arc::new(RecordingNotifier::default());
    let h = TestHarness::new(Arc::new(ScriptedClient::failing(&["d2"])), notifier.clone())
        .with_documents(&["d1", "d2", "d3"]);

    let submitted = h
        .controller
        .create_batch(
            &BatchRequestBuilder::new()
                .documents(&["d1", "d2", "d3"])
                .max_concurrent(3)
                .webhook("https://hooks.example.com/batches")
                .build(),
            Some(&h.owner()),
        )
        .await
        .unwrap();
    let batch_id = submitted.response.batch_id.clone();

    assert_eq!(
        submitted.run.await.unwrap(),
        RunOutcome::Finished(BatchStatus::Partial)
    );

    let status = h
        .controller
        .get_batch_status(&batch_id, Some(&h.owner()))
        .await
        .unwrap();
    assert_eq!(status.status, BatchStatus::Partial);
    assert_eq!(status.processed_documents, 2);
    assert_eq!(status.failed_documents, 1);
    assert_eq!(status.total_documents, 3);
    assert!(status.completed_at.is_some());

    let d2 = &status.results[1];
    assert_eq!(d2.document_id, "d2");
    assert_eq!(d2.status, DocumentStatus::Failed);
    assert!(d2.error.as_deref().unwrap().contains("cannot extract d2"));
    assert_eq!(status.results[0].extraction_id.as_deref(), Some("ext-d1"));
    assert!(status.results.iter().all(|r| r.processing_time.is_some()));

    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].batch_id, batch_id);
    assert_eq!(sent[0].status, BatchStatus::Partial);
}

#[tokio::test]
async fn cancel_while_processing_keeps_progress() {
    let client = Arc::new(GatedClient::blocking("d2"));
    let notifier = Arc::new(RecordingNotifier::default());
    let h = TestHarness::new(client.clone(), notifier.clone()).with_documents(&["d1", "d2", "d3"]);
    let owner = h.owner();

    let submitted = h
        .controller
        .create_batch(
            &BatchRequestBuilder::new()
                .documents(&["d1", "d2", "d3"])
                .max_concurrent(1)
                .webhook("https://hooks.example.com/batches")
                .build(),
            Some(&owner),
        )
        .await
        .unwrap();
    let batch_id = submitted.response.batch_id.clone();

    // d1's window is recorded; d2 is in flight.
    client.started.notified().await;
    let before = h
        .controller
        .get_batch_status(&batch_id, Some(&owner))
        .await
        .unwrap();
    assert_eq!(before.status, BatchStatus::Processing);
    assert_eq!(before.processed_documents, 1);
    assert_eq!(before.results[1].status, DocumentStatus::Processing);

    assert!(h.controller.cancel_batch(&batch_id, Some(&owner)).await.unwrap());
    client.release();
    assert_eq!(submitted.run.await.unwrap(), RunOutcome::Cancelled);

    let after = h
        .controller
        .get_batch_status(&batch_id, Some(&owner))
        .await
        .unwrap();
    assert_eq!(after.status, BatchStatus::Cancelled);
    assert_eq!(after.processed_documents, 1);
    assert_eq!(after.failed_documents, 0);
    // d2 was in flight when the batch was cancelled; its late result is dropped.
    assert_eq!(after.results[1].status, DocumentStatus::Pending);
    assert!(after.results[1].extraction_id.is_none());
    assert_eq!(after.results[2].status, DocumentStatus::Pending);
    assert!(after.completed_at.is_some());
    assert!(notifier.sent.lock().unwrap().is_empty());

    // A second cancel finds nothing cancellable.
    let err = h
        .controller
        .cancel_batch(&batch_id, Some(&owner))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn status_polls_are_idempotent() {
    let h = TestHarness::new(
        Arc::new(ScriptedClient::default()),
        Arc::new(RecordingNotifier::default()),
    )
    .with_documents(&["d1", "d2"]);

    let submitted = h
        .controller
        .create_batch(
            &BatchRequestBuilder::new().documents(&["d1", "d2"]).build(),
            Some(&h.owner()),
        )
        .await
        .unwrap();
    let batch_id = submitted.response.batch_id.clone();
    submitted.run.await.unwrap();

    let first = h
        .controller
        .get_batch_status(&batch_id, Some(&h.owner()))
        .await
        .unwrap();
    let second = h
        .controller
        .get_batch_status(&batch_id, Some(&h.owner()))
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.status, BatchStatus::Completed);
    assert_eq!(
        first.processed_documents + first.failed_documents,
        first.total_documents
    );
}

#[tokio::test]
async fn rejects_oversized_batches_and_bad_concurrency() {
    let h = TestHarness::new(
        Arc::new(ScriptedClient::default()),
        Arc::new(RecordingNotifier::default()),
    );
    let owner = h.owner();

    let ids: Vec<String> = (0..101).map(|i| format!("doc-{}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let err = h
        .controller
        .create_batch(
            &BatchRequestBuilder::new().documents(&id_refs).build(),
            Some(&owner),
        )
        .await
        .unwrap_err();
    assert!(validation_message(err).contains("100"));

    for bad in [0, 11] {
        let err = h
            .controller
            .create_batch(
                &BatchRequestBuilder::new()
                    .documents(&["d1"])
                    .max_concurrent(bad)
                    .build(),
                Some(&owner),
            )
            .await
            .unwrap_err();
        assert!(validation_message(err).contains("maxConcurrent"));
    }
}

#[tokio::test]
async fn authentication_and_access_failures() {
    let h = TestHarness::new(
        Arc::new(ScriptedClient::default()),
        Arc::new(RecordingNotifier::default()),
    )
    .with_documents(&["d1"]);
    h.add_workspace("ws-1", "carol", &["bob"]);
    h.add_document("shared", "carol", Some("ws-1"));

    let request = BatchRequestBuilder::new().documents(&["d1"]).build();
    let err = h.controller.create_batch(&request, None).await.unwrap_err();
    assert!(matches!(err, BatchError::Authentication(_)));

    let err = h
        .controller
        .create_batch(&request, Some(&Caller::new("bob")))
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::Authorization(ref m) if m.contains("d1")));

    let in_workspace = BatchRequestBuilder::new()
        .workspace("ws-1")
        .documents(&["shared"])
        .build();
    assert!(h
        .controller
        .create_batch(&in_workspace, Some(&Caller::new("bob")))
        .await
        .is_ok());
    let err = h
        .controller
        .create_batch(&in_workspace, Some(&h.owner()))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 403);

    let unknown = BatchRequestBuilder::new().documents(&["d1", "ghost"]).build();
    let err = h
        .controller
        .create_batch(&unknown, Some(&h.owner()))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
}

#[tokio::test]
async fn http_collaborators_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/documents/d1/extract"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"extractionId": "x-1"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/documents/d2/extract"))
        .respond_with(ResponseTemplate::new(422).set_body_string("unsupported file"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hooks/done"))
        .and(body_partial_json(serde_json::json!({
            "status": "partial",
            "totalDocuments": 2,
            "processedDocuments": 1,
            "failedDocuments": 1
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpDocumentProcessingClient::new(&ExtractionConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        api_token_env: None,
    })
    .unwrap();
    let notifier = WebhookNotifier::new(&NotificationConfig::default()).unwrap();
    let h = TestHarness::new(Arc::new(client), Arc::new(notifier)).with_documents(&["d1", "d2"]);

    let submitted = h
        .controller
        .create_batch(
            &BatchRequestBuilder::new()
                .document("d1", "tables", Some("high"))
                .document("d2", "all", None)
                .webhook(&format!("{}/hooks/done", server.uri()))
                .build(),
            Some(&h.owner()),
        )
        .await
        .unwrap();
    let batch_id = submitted.response.batch_id.clone();
    submitted.run.await.unwrap();

    let status = h
        .controller
        .get_batch_status(&batch_id, Some(&h.owner()))
        .await
        .unwrap();
    assert_eq!(status.status, BatchStatus::Partial);
    assert_eq!(status.results[0].extraction_id.as_deref(), Some("x-1"));
    assert!(status.results[1]
        .error
        .as_deref()
        .unwrap()
        .contains("422"));
}
