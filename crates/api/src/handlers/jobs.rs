//! Handlers for job submission and polling.
//!
//! Submission allocates a `pending` job, hands the payload to a detached
//! worker and answers `202` straight away. Polling sweeps expired jobs,
//! then reports the current snapshot.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use toonify_core::error::CoreError;
use toonify_core::job::JobSnapshot;
use toonify_core::types::{JobId, RawJson};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Body returned by `POST /submit`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: JobId,
}

/// Query string accepted by `GET /status`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub job_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse the raw request body as the opaque upstream payload.
///
/// The body is accepted whatever its `Content-Type`, so long as it is
/// JSON. An empty body or a bare `null` counts as absent. The text is kept
/// as-is so the upstream sees exactly what the caller sent.
fn parse_payload(body: &[u8]) -> AppResult<RawJson> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("Request body is required".into()));
    }

    let payload: RawJson = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Request body is not valid JSON: {e}")))?;

    if payload.get() == "null" {
        return Err(AppError::BadRequest("Request body is required".into()));
    }

    Ok(payload)
}

/// Sweep, then look the job up.
async fn find_snapshot(state: &AppState, job_id: String) -> AppResult<JobSnapshot> {
    state.store.sweep_expired(state.config.job_retention).await;

    let job = state.store.get(&job_id).await;

    job.map(|job| job.snapshot())
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /submit
///
/// Returns 202 with the new job id. The upstream call runs in the
/// background; poll `/status` for the outcome.
pub async fn submit_job(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let payload = parse_payload(&body)?;
    let job_id = state.store.allocate().await?;

    state.runner.spawn(job_id.clone(), payload);

    tracing::info!(job_id = %job_id, "Job submitted");

    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { job_id })))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /status?jobId={id}
///
/// 400 if `jobId` is missing, 404 if the job is unknown or expired.
/// Upstream failures are reported as `status: "error"` with a 200.
pub async fn job_status(
    State(state): State<AppState>,
    Query(params): Query<StatusQuery>,
) -> AppResult<Json<JobSnapshot>> {
    let job_id = params
        .job_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("jobId query parameter is required".into()))?;

    Ok(Json(find_snapshot(&state, job_id).await?))
}

/// GET /jobs/{id}
///
/// Path-parameter form of [`job_status`].
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<JobSnapshot>> {
    Ok(Json(find_snapshot(&state, job_id).await?))
}
