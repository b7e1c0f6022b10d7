//! Detached per-job background worker.
//!
//! Each submitted job gets one Tokio task that calls the comic service and
//! writes the outcome into the [`JobStore`]. The store is the task's only
//! output: every failure path, including a timeout or a panic inside the
//! generator, ends in [`JobStore::mark_error`], so no job stays `pending`
//! past the deadline.
//!
//! Spawned tasks are tracked so shutdown can [`JobRunner::drain`] them.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use toonify_comic::ComicGenerator;
use toonify_core::types::{JobId, RawJson};
use toonify_store::JobStore;

/// Default hard limit on one job's upstream call.
pub const DEFAULT_JOB_DEADLINE: Duration = Duration::from_secs(300);

/// Spawns and runs background jobs.
///
/// Cheap to clone; all state is behind `Arc`. Clones share one task
/// tracker.
#[derive(Clone)]
pub struct JobRunner {
    store: Arc<dyn JobStore>,
    generator: Arc<dyn ComicGenerator>,
    deadline: Duration,
    tracker: TaskTracker,
}

impl JobRunner {
    pub fn new(store: Arc<dyn JobStore>, generator: Arc<dyn ComicGenerator>) -> Self {
        Self {
            store,
            generator,
            deadline: DEFAULT_JOB_DEADLINE,
            tracker: TaskTracker::new(),
        }
    }

    /// Override the hard deadline for the whole upstream call, retries
    /// included.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Number of spawned jobs that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Start `job_id` on its own task and return immediately.
    pub fn spawn(&self, job_id: JobId, payload: RawJson) -> JoinHandle<()> {
        let runner = self.clone();
        self.tracker.spawn(async move { runner.run(job_id, payload).await })
    }

    /// Wait up to `timeout` for every spawned job to finish.
    ///
    /// Returns `true` if nothing was left running. Jobs still running
    /// after the timeout are left to die with the runtime.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok()
    }

    /// Run `job_id` to completion on the current task.
    pub async fn run(&self, job_id: JobId, payload: RawJson) {
        tracing::debug!(job_id = %job_id, "Calling comic service");

        let call = AssertUnwindSafe(self.generator.generate(&payload)).catch_unwind();

        let message = match tokio::time::timeout(self.deadline, call).await {
            Ok(Ok(Ok(result))) => {
                if self.store.mark_completed(&job_id, result).await {
                    tracing::info!(job_id = %job_id, "Job completed");
                }
                return;
            }
            Ok(Ok(Err(e))) => e.to_string(),
            Ok(Err(_panic)) => "Comic generation aborted unexpectedly".to_string(),
            Err(_elapsed) => format!(
                "Comic service did not respond within {}s",
                self.deadline.as_secs_f64()
            ),
        };

        tracing::warn!(job_id = %job_id, error = %message, "Job failed");
        self.store.mark_error(&job_id, message).await;
    }
}
