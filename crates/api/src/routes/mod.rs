pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the job route tree.
///
/// Route hierarchy:
///
/// ```text
/// /submit                                          submit a job (POST)
/// /status?jobId={id}                               poll a job (GET)
/// /jobs/{id}                                       poll a job by path (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(jobs::router())
}
