use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::types::{BuildJobRequest, BuildJobResponse, LogsResponse};
use super::AppState;
use crate::error::ApiError;

/// `POST /api/buildjob`
pub(super) async fn create_build_job(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<BuildJobResponse>), ApiError> {
    let request: BuildJobRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "rejecting malformed build job request");
        ApiError::Validation("Invalid request body".to_string())
    })?;
    let spec = request.into_spec()?;

    let created = state.jobs.create(spec).await?;
    info!(
        job = %created.job_name,
        job_id = %created.job_id,
        manifest = %created.manifest_path.display(),
        "build job created"
    );

    Ok((StatusCode::CREATED, Json(BuildJobResponse::from(created))))
}

/// `GET /api/buildjob/{job_name}/logs`
pub(super) async fn get_job_logs(
    State(state): State<AppState>,
    Path(job_name): Path<String>,
) -> Result<Json<LogsResponse>, ApiError> {
    let logs = state
        .jobs
        .logs()
        .get_job_logs(&job_name)
        .await
        .ok_or(ApiError::NotFound)?;

    Ok(Json(LogsResponse::running(job_name, logs)))
}

pub(super) async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "buildjob",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub(super) async fn ready(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ready",
        "service": "buildjob",
        "version": env!("CARGO_PKG_VERSION"),
        "submitter": state.jobs.submitter_name(),
        "jobs_tracked": state.jobs.logs().job_count().await
    }))
}
