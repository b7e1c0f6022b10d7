//! Job registry for in-flight comic generations.
//!
//! [`JobStore`] is the seam the API and worker talk to. The only shipped
//! implementation is [`InMemoryJobStore`]; nothing survives a restart.

mod memory;

use std::time::Duration;

use async_trait::async_trait;
use toonify_core::error::CoreError;
use toonify_core::job::Job;
use toonify_core::types::{JobId, RawJson};

pub use memory::InMemoryJobStore;

/// Owner of every [`Job`] record.
///
/// Callers only ever see cloned snapshots. Marking a job that no longer
/// exists is a no-op and never re-creates it.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new `pending` job and return its id.
    async fn allocate(&self) -> Result<JobId, CoreError>;

    /// Look up a job by id. `None` covers both "never existed" and "expired".
    async fn get(&self, id: &str) -> Option<Job>;

    /// Record a successful outcome. Returns `true` if the transition happened.
    async fn mark_completed(&self, id: &str, result: RawJson) -> bool;

    /// Record a failure. Returns `true` if the transition happened.
    async fn mark_error(&self, id: &str, message: String) -> bool;

    /// Remove every job older than `retention`. Returns how many were removed.
    async fn sweep_expired(&self, retention: Duration) -> usize;

    /// Number of jobs currently tracked.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
