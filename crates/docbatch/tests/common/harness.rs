//! In-memory environment for controller tests.

#![allow(dead_code)]

use std::sync::Arc;

use docbatch::auth::Caller;
use docbatch::batch::BatchJobController;
use docbatch::config::BatchConfig;
use docbatch::db::document_repo::{add_workspace_member, insert_document, insert_workspace};
use docbatch::db::{Database, DocumentRecord, SqliteDocumentAccess, SqliteJobRepository};
use docbatch::notify::NotificationDispatcher;
use docbatch::processing::DocumentProcessingClient;

pub const OWNER: &str = "alice";

/// A migrated in-memory database plus a controller over it.
pub struct TestHarness {
    pub db: Database,
    pub controller: BatchJobController,
}

impl TestHarness {
    pub fn new(
        client: Arc<dyn DocumentProcessingClient>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        let db = Database::open_in_memory().expect("in-memory database");
        let controller = BatchJobController::new(
            Arc::new(SqliteJobRepository::new(db.clone())),
            Arc::new(SqliteDocumentAccess::new(db.clone())),
            client,
            notifier,
            BatchConfig::default(),
        );
        Self { db, controller }
    }

    /// Creates documents owned by [`OWNER`].
    pub fn with_documents(self, ids: &[&str]) -> Self {
        for id in ids {
            self.add_document(id, OWNER, None);
        }
        self
    }

    pub fn add_document(&self, id: &str, owner: &str, workspace_id: Option<&str>) {
        insert_document(
            &self.db,
            &DocumentRecord {
                id: id.to_string(),
                owner_id: owner.to_string(),
                workspace_id: workspace_id.map(str::to_string),
                filename: format!("{}.pdf", id),
            },
        )
        .expect("insert document");
    }

    pub fn add_workspace(&self, id: &str, owner: &str, members: &[&str]) {
        insert_workspace(&self.db, id, owner, id).expect("insert workspace");
        for member in members {
            add_workspace_member(&self.db, id, member).expect("add member");
        }
    }

    pub fn owner(&self) -> Caller {
        Caller::new(OWNER)
    }
}
