//! Error bodies and status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docbatch::classifier::ClassificationError;
use docbatch::BatchError;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Failure of a handler, rendered as `{code, message}` with a matching status.
#[derive(Debug)]
pub enum ApiError {
    Batch(BatchError),
    Classification(ClassificationError),
}

impl From<BatchError> for ApiError {
    fn from(e: BatchError) -> Self {
        ApiError::Batch(e)
    }
}

impl From<ClassificationError> for ApiError {
    fn from(e: ClassificationError) -> Self {
        ApiError::Classification(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Batch(e) => (
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                ErrorResponse::new(e.code(), e.to_string()),
            ),
            ApiError::Classification(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("CLASSIFICATION_ERROR", e.to_string()),
            ),
        };

        if status.is_server_error() {
            error!(code = %body.code, "{}", body.message);
        }
        (status, Json(body)).into_response()
    }
}
