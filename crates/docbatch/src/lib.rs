pub mod auth;
pub mod batch;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod notify;
pub mod processing;

pub use auth::{ApiKeyAuthenticator, Caller};
pub use batch::{BatchExecutor, BatchJobController, BatchStatus, CreateBatchRequest};
pub use classifier::{ChunkClassificationResult, ChunkClassifier, ChunkType, ClassificationService};
pub use config::{load_config, Config};
pub use db::Database;
pub use error::{BatchError, ConfigError};
pub use logging::init_logging;
pub use notify::{NotificationDispatcher, WebhookNotifier};
pub use processing::{DocumentProcessingClient, HttpDocumentProcessingClient};
