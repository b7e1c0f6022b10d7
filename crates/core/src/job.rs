//! The job record and its one-way status machine.
//!
//! ```text
//! pending --(upstream succeeds)--> completed
//! pending --(upstream fails)-----> error
//! ```
//!
//! Both right-hand states are terminal. Removal on expiry is handled by the
//! store and is not a status.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobId, RawJson, Timestamp};

/// Wire name for a job that has not finished yet.
pub const JOB_STATUS_PENDING: &str = "pending";

/// Wire name for a job whose upstream call succeeded.
pub const JOB_STATUS_COMPLETED: &str = "completed";

/// Wire name for a job whose upstream call failed.
pub const JOB_STATUS_ERROR: &str = "error";

/// Current state of a job, carrying the outcome once there is one.
#[derive(Debug, Clone)]
pub enum JobStatus {
    Pending,
    /// Opaque payload returned by the comic service, byte for byte.
    Completed(RawJson),
    /// Human-readable failure description.
    Error(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => JOB_STATUS_PENDING,
            JobStatus::Completed(_) => JOB_STATUS_COMPLETED,
            JobStatus::Error(_) => JOB_STATUS_ERROR,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

impl PartialEq for JobStatus {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (JobStatus::Pending, JobStatus::Pending) => true,
            (JobStatus::Completed(a), JobStatus::Completed(b)) => a.get() == b.get(),
            (JobStatus::Error(a), JobStatus::Error(b)) => a == b,
            _ => false,
        }
    }
}

/// A tracked asynchronous submission.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: Timestamp,
}

impl Job {
    /// A freshly allocated job, always `pending`.
    pub fn new(id: JobId, created_at: Timestamp) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            created_at,
        }
    }

    /// Transition `pending -> completed`.
    ///
    /// Fails with [`CoreError::Conflict`] if the job already reached a
    /// terminal state; the existing outcome is left untouched.
    pub fn complete(&mut self, result: RawJson) -> Result<(), CoreError> {
        self.transition(JobStatus::Completed(result))
    }

    /// Transition `pending -> error`.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), CoreError> {
        self.transition(JobStatus::Error(message.into()))
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "job {} is already {} and cannot become {}",
                self.id,
                self.status.as_str(),
                next.as_str(),
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Age of the job at `now`. A `created_at` in the future counts as zero.
    pub fn age(&self, now: Timestamp) -> Duration {
        (now - self.created_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the job's age strictly exceeds `retention`.
    pub fn is_expired(&self, now: Timestamp, retention: Duration) -> bool {
        self.age(now) > retention
    }

    /// Client-facing projection. Internal fields such as `created_at` are
    /// never included.
    pub fn snapshot(&self) -> JobSnapshot {
        let (result, error_message) = match &self.status {
            JobStatus::Pending => (None, None),
            JobStatus::Completed(value) => (Some(value.clone()), None),
            JobStatus::Error(message) => (None, Some(message.clone())),
        };
        JobSnapshot {
            status: self.status.as_str().to_string(),
            result,
            error_message,
        }
    }
}

/// JSON body returned by the status endpoint.
///
/// `result` is present only for `completed`, `errorMessage` only for `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RawJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
