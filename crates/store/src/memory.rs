use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use toonify_core::clock::{Clock, SystemClock};
use toonify_core::error::CoreError;
use toonify_core::job::Job;
use toonify_core::types::{new_job_id, JobId, RawJson};

use crate::JobStore;

/// How many fresh ids `allocate` draws before giving up on a collision.
const MAX_ALLOCATE_ATTEMPTS: usize = 8;

type IdSource = Box<dyn Fn() -> JobId + Send + Sync>;

/// Process-local job registry.
///
/// A single `RwLock` serializes every structural change (insert, transition,
/// sweep). Reads take the shared lock and clone the record out.
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
    clock: Arc<dyn Clock>,
    next_id: IdSource,
}

impl InMemoryJobStore {
    /// Store backed by the system clock and random v4 ids.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            clock,
            next_id: Box::new(new_job_id),
        }
    }

    /// Replace the id generator. Only useful in tests that need to force
    /// collisions.
    pub fn with_id_source(
        mut self,
        next_id: impl Fn() -> JobId + Send + Sync + 'static,
    ) -> Self {
        self.next_id = Box::new(next_id);
        self
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn allocate(&self) -> Result<JobId, CoreError> {
        let mut jobs = self.jobs.write().await;

        for _ in 0..MAX_ALLOCATE_ATTEMPTS {
            let id = (self.next_id)();
            if let Entry::Vacant(slot) = jobs.entry(id.clone()) {
                slot.insert(Job::new(id.clone(), self.clock.now()));
                return Ok(id);
            }
            tracing::warn!(job_id = %id, "Job id collision, drawing another");
        }

        Err(CoreError::Internal(format!(
            "could not allocate a unique job id after {MAX_ALLOCATE_ATTEMPTS} attempts"
        )))
    }

    async fn get(&self, id: &str) -> Option<Job> {
        self.jobs.read().await.get(id).cloned()
    }

    async fn mark_completed(&self, id: &str, result: RawJson) -> bool {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(id) else {
            tracing::debug!(job_id = %id, "Completion for untracked job dropped");
            return false;
        };
        match job.complete(result) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Ignoring completion");
                false
            }
        }
    }

    async fn mark_error(&self, id: &str, message: String) -> bool {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(id) else {
            tracing::debug!(job_id = %id, "Failure for untracked job dropped");
            return false;
        };
        match job.fail(message) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Ignoring failure");
                false
            }
        }
    }

    async fn sweep_expired(&self, retention: Duration) -> usize {
        let now = self.clock.now();
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| !job.is_expired(now, retention));
        let removed = before - jobs.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = jobs.len(), "Swept expired jobs");
        }
        removed
    }

    async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}
