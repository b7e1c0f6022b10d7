use std::sync::Arc;

use toonify_comic::{ComicApi, ComicGenerator, Retrying};
use toonify_store::JobStore;
use toonify_worker::JobRunner;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (retention window, timeouts).
    pub config: Arc<ServerConfig>,
    /// The only owner of job records.
    pub store: Arc<dyn JobStore>,
    /// Spawns the detached upstream call for each submission.
    pub runner: JobRunner,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn JobStore>,
        generator: Arc<dyn ComicGenerator>,
    ) -> Self {
        let runner =
            JobRunner::new(Arc::clone(&store), generator).with_deadline(config.job_deadline());
        Self {
            config: Arc::new(config),
            store,
            runner,
        }
    }
}

/// Build the production comic client, wrapped in the retry decorator when
/// more than one attempt is configured.
pub fn comic_generator(config: &ServerConfig) -> Arc<dyn ComicGenerator> {
    let api = ComicApi::new(config.comic_api_url.clone(), config.upstream_timeout);
    if config.retry.is_enabled() {
        Arc::new(Retrying::new(api, config.retry.clone()))
    } else {
        Arc::new(api)
    }
}
