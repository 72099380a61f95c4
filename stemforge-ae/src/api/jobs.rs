//! Job submission and status endpoints

use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::JobRecord;
use crate::AppState;

/// Response to a successful submission
#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
}

/// Response to a cancellation request
#[derive(Debug, Serialize)]
pub struct CancelJobResponse {
    pub job_id: Uuid,
    pub message: String,
}

/// POST /api/jobs
///
/// Accepts a multipart form with a `file` part (the audio to process)
/// and an optional `model` part (separation model id). Returns the job
/// id immediately; processing continues in the background.
pub async fn submit_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<SubmitJobResponse>> {
    let mut file_name: Option<String> = None;
    let mut bytes: Option<axum::body::Bytes> = None;
    let mut model: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                file_name = field.file_name().map(str::to_string);
                bytes = Some(field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("failed to read file part: {}", e))
                })?);
            }
            Some("model") => {
                model = Some(field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("failed to read model part: {}", e))
                })?);
            }
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| ApiError::BadRequest("missing 'file' field".to_string()))?;
    let file_name = file_name
        .ok_or_else(|| ApiError::BadRequest("'file' field has no filename".to_string()))?;

    let job_id = state
        .manager
        .submit(&file_name, &bytes, model.as_deref())
        .await?;
    Ok(Json(SubmitJobResponse { job_id }))
}

/// GET /api/jobs/:job_id
///
/// Current job record snapshot. Clients poll this until they observe a
/// terminal state.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobRecord>> {
    let record = state.manager.get(job_id)?;
    Ok(Json(record))
}

/// POST /api/jobs/:job_id/cancel
///
/// Requests cooperative cancellation. Returns 409 for jobs that are
/// already terminal.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<CancelJobResponse>> {
    state.manager.cancel(job_id).await.map_err(|e| match e {
        stemforge_common::Error::InvalidInput(msg) => ApiError::Conflict(msg),
        other => ApiError::from(other),
    })?;
    Ok(Json(CancelJobResponse {
        job_id,
        message: "cancellation requested".to_string(),
    }))
}

/// Build job routes
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/api/jobs", post(submit_job))
        .route("/api/jobs/:job_id", get(get_job_status))
        .route("/api/jobs/:job_id/cancel", post(cancel_job))
}
