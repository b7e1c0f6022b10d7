use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Job submission and polling routes.
///
/// ```text
/// POST   /submit          -> submit_job
/// GET    /status          -> job_status
/// GET    /jobs/{id}       -> get_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/submit", post(jobs::submit_job))
        .route("/status", get(jobs::job_status))
        .route("/jobs/{id}", get(jobs::get_job))
}
