//! Shared handler state.

use std::sync::Arc;

use anyhow::{Context, Result};
use docbatch::classifier::{ChunkClassifier, ClassificationService};
use docbatch::db::{Database, SqliteChunkRepository, SqliteDocumentAccess, SqliteJobRepository};
use docbatch::{ApiKeyAuthenticator, BatchJobController, Config, HttpDocumentProcessingClient, WebhookNotifier};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub controller: BatchJobController,
    pub classification: Arc<ClassificationService>,
    pub authenticator: Arc<ApiKeyAuthenticator>,
}

impl AppState {
    /// Opens the database and wires every component from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let path = config
            .resolved_database_path()
            .context("Could not determine a database path; set database_path")?;
        let db = Database::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        info!(path = %path.display(), "Database ready");

        Self::with_database(config, db)
    }

    pub fn with_database(config: &Config, db: Database) -> Result<Self> {
        let client = HttpDocumentProcessingClient::new(&config.extraction)
            .context("Failed to build extraction client")?;
        let notifier = WebhookNotifier::new(&config.notifications)
            .context("Failed to build webhook client")?;

        let controller = BatchJobController::new(
            Arc::new(SqliteJobRepository::new(db.clone())),
            Arc::new(SqliteDocumentAccess::new(db.clone())),
            Arc::new(client),
            Arc::new(notifier),
            config.batch.clone(),
        );

        let classification = ClassificationService::new(
            Arc::new(ChunkClassifier::default()),
            Arc::new(SqliteChunkRepository::new(db)),
            &config.classification,
        );

        Ok(Self {
            controller,
            classification: Arc::new(classification),
            authenticator: Arc::new(ApiKeyAuthenticator::from_config(&config.auth)),
        })
    }
}
