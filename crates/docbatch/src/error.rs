use std::path::PathBuf;
use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Request-time failures of the batch API.
///
/// Everything here is returned synchronously to the caller. Failures that
/// happen while a batch runs are recorded per document instead.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Authentication required: {0}")]
    Authentication(String),

    #[error("Access denied: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] DatabaseError),
}

impl BatchError {
    /// HTTP status the error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            BatchError::Validation(_) => 400,
            BatchError::Authentication(_) => 401,
            BatchError::Authorization(_) => 403,
            BatchError::NotFound(_) => 404,
            BatchError::Persistence(_) => 500,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            BatchError::Validation(_) => "VALIDATION_ERROR",
            BatchError::Authentication(_) => "AUTHENTICATION_ERROR",
            BatchError::Authorization(_) => "AUTHORIZATION_ERROR",
            BatchError::NotFound(_) => "NOT_FOUND",
            BatchError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }
}
