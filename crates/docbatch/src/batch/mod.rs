pub mod cancel;
pub mod controller;
pub mod executor;
pub mod model;
pub mod request;

pub use cancel::{CancelRegistry, CancelToken};
pub use controller::{BatchJobController, SubmittedBatch};
pub use executor::{BatchExecutor, RunOutcome};
pub use model::{
    BatchJob, BatchOptions, BatchStatus, BatchStatusResponse, DocumentJobEntry, DocumentResult,
    DocumentStatus, DocumentUpdate, ExtractionType, Priority,
};
pub use request::{BatchOptionsRequest, CreateBatchRequest, DocumentRequest, ValidatedBatch};
