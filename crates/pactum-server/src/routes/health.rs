//! Liveness and queue depth.

use axum::{extract::State, Json};
use pactum_core::{JobQuery, JobStatus};
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` while workers run, `stopping` after shutdown began.
    pub status: &'static str,
    pub workers: usize,
    /// Jobs waiting for a worker.
    pub pending_jobs: usize,
    /// Jobs a worker is running now.
    pub processing_jobs: usize,
    pub version: &'static str,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let workers = state.worker_count().await;
    let pending_jobs = count(&state, JobStatus::Pending).await?;
    let processing_jobs = count(&state, JobStatus::Processing).await?;

    Ok(Json(HealthResponse {
        status: if workers.is_some() { "healthy" } else { "stopping" },
        workers: workers.unwrap_or(0),
        pending_jobs,
        processing_jobs,
        version: env!("CARGO_PKG_VERSION"),
    }))
}

async fn count(state: &AppState, status: JobStatus) -> ApiResult<usize> {
    let query = JobQuery::default().with_status(status).page(1, 0);
    Ok(state.service.list(&query).await?.total)
}
