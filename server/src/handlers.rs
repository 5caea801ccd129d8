//! Request handlers for the batch API.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use docbatch::batch::BatchStatusResponse;
use docbatch::{BatchError, Caller, CreateBatchRequest};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Caller resolved from the `Authorization` header, if any.
///
/// Missing credentials are not rejected here; the controller decides when
/// identity is required.
pub struct MaybeCaller(pub Option<Caller>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeCaller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        Ok(MaybeCaller(state.authenticator.authenticate(authorization)))
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    #[serde(rename = "batchId", default)]
    pub batch_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReclassifyResponse {
    pub document_id: String,
    pub classified: usize,
    pub errors: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /batch`
pub async fn create_batch(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    body: Bytes,
) -> Result<(StatusCode, Json<BatchStatusResponse>), ApiError> {
    let request: CreateBatchRequest = serde_json::from_slice(&body)
        .map_err(|e| BatchError::Validation(format!("Invalid request body: {}", e)))?;

    let submitted = state
        .controller
        .create_batch(&request, caller.as_ref())
        .await?;
    debug!(batch_id = %submitted.response.batch_id, "Batch accepted");

    Ok((StatusCode::ACCEPTED, Json(submitted.response)))
}

/// `GET /batch?batchId=...`
pub async fn get_batch(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    Query(query): Query<BatchQuery>,
) -> Result<Json<BatchStatusResponse>, ApiError> {
    let batch_id = query.batch_id.unwrap_or_default();
    let status = state
        .controller
        .get_batch_status(&batch_id, caller.as_ref())
        .await?;
    Ok(Json(status))
}

/// `DELETE /batch?batchId=...`
pub async fn cancel_batch(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    Query(query): Query<BatchQuery>,
) -> Result<Json<CancelResponse>, ApiError> {
    let batch_id = query.batch_id.unwrap_or_default();
    let success = state
        .controller
        .cancel_batch(&batch_id, caller.as_ref())
        .await?;
    Ok(Json(CancelResponse { success }))
}

/// `POST /documents/:document_id/reclassify`
pub async fn reclassify_document(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    Path(document_id): Path<String>,
) -> Result<Json<ReclassifyResponse>, ApiError> {
    let document = state
        .controller
        .authorize_document(&document_id, caller.as_ref())
        .await?;
    let summary = state.classification.reclassify_document(&document.id).await?;

    Ok(Json(ReclassifyResponse {
        document_id: document.id,
        classified: summary.classified,
        errors: summary.errors,
    }))
}
