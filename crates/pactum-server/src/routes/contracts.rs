//! Contract submission, polling and retrieval endpoints.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use pactum_core::{JobOutcome, JobPage, JobQuery, JobStatus, JobStatusReport};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Multipart field holding the uploaded contract.
const FILE_FIELD: &str = "file";

/// Response for an accepted submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub status_url: String,
}

impl SubmitResponse {
    fn accepted(job_id: String) -> (StatusCode, Json<Self>) {
        let status_url = format!("/contracts/{}/status", job_id);
        (
            StatusCode::ACCEPTED,
            Json(Self {
                job_id,
                status: JobStatus::Pending,
                status_url,
            }),
        )
    }
}

/// Submit a contract.
/// POST /contracts (multipart, field `file`)
pub async fn submit_contract(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("contract").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Could not read upload: {}", e)))?;
        if bytes.len() > state.max_upload_bytes {
            return Err(ApiError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                format!("Upload exceeds {} bytes", state.max_upload_bytes),
            ));
        }

        let job_id = state
            .service
            .submit(bytes.to_vec(), &filename, content_type.as_deref())
            .await?;
        return Ok(SubmitResponse::accepted(job_id));
    }

    Err(ApiError::bad_request(format!(
        "Missing multipart field '{}'",
        FILE_FIELD
    )))
}

/// List contract jobs.
/// GET /contracts?status=&filename=&q=&uploaded_from=&uploaded_to=&sort_by=&order=&limit=&offset=
pub async fn list_contracts(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
) -> ApiResult<Json<JobPage>> {
    Ok(Json(state.service.list(&query).await?))
}

/// Get the result and gaps of a completed job.
/// GET /contracts/:id
pub async fn get_contract(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobOutcome>> {
    Ok(Json(state.service.result(&id).await?))
}

/// Get a job's status.
/// GET /contracts/:id/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobStatusReport>> {
    Ok(Json(state.service.status(&id).await?))
}

/// Download the original upload.
/// GET /contracts/:id/download
pub async fn download_original(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let original = state.service.original(&id).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        original.filename.replace(['"', '\\', '\r', '\n'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, original.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        original.bytes,
    )
        .into_response())
}

/// Resubmit a failed or stuck job.
/// POST /contracts/:id/retry
pub async fn retry_contract(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let job_id = state.service.resubmit(&id).await?;
    Ok(SubmitResponse::accepted(job_id))
}
