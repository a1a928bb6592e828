//! Job domain types for work items in the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ulid::Ulid;

use crate::registry::RegistryKind;

/// Unique identifier for a job.
///
/// Callers may supply their own token; otherwise a ULID is generated so ids
/// sort chronologically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new().to_string().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&JobId> for JobId {
    fn from(value: &JobId) -> Self {
        value.clone()
    }
}

impl From<&Job> for JobId {
    fn from(job: &Job) -> Self {
        job.id.clone()
    }
}

/// Current status of a job in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a worker.
    Queued,
    /// Waiting for a dependency to finish.
    Deferred,
    /// Waiting for its scheduled time.
    Scheduled,
    /// Picked up by a worker.
    Started,
    Finished,
    Failed,
    Stopped,
    Canceled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 8] = [
        JobStatus::Queued,
        JobStatus::Deferred,
        JobStatus::Scheduled,
        JobStatus::Started,
        JobStatus::Finished,
        JobStatus::Failed,
        JobStatus::Stopped,
        JobStatus::Canceled,
    ];

    /// Check if the job is in a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Finished | JobStatus::Failed | JobStatus::Stopped | JobStatus::Canceled
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;

        match (self, next) {
            (Finished | Failed | Stopped | Canceled, _) => false,
            (_, Canceled) => true,
            (Deferred | Scheduled, Queued) => true,
            (Queued, Started) => true,
            (Queued | Started, Stopped) => true,
            (Started, Finished | Failed) => true,
            (Queued | Deferred | Scheduled | Started, _) => false,
        }
    }

    /// The registry that tracks jobs in this status, if any.
    pub fn registry(self) -> Option<RegistryKind> {
        match self {
            JobStatus::Started => Some(RegistryKind::Started),
            JobStatus::Finished => Some(RegistryKind::Finished),
            JobStatus::Failed => Some(RegistryKind::Failed),
            JobStatus::Deferred => Some(RegistryKind::Deferred),
            JobStatus::Scheduled => Some(RegistryKind::Scheduled),
            JobStatus::Canceled => Some(RegistryKind::Canceled),
            JobStatus::Queued | JobStatus::Stopped => None,
        }
    }

    /// Get a simple status string for display.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Deferred => "deferred",
            JobStatus::Scheduled => "scheduled",
            JobStatus::Started => "started",
            JobStatus::Finished => "finished",
            JobStatus::Failed => "failed",
            JobStatus::Stopped => "stopped",
            JobStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| JobError::UnknownStatus(s.to_string()))
    }
}

/// Errors raised by job state changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("invalid job operation: cannot move job {id} from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("unknown job status: {0}")]
    UnknownStatus(String),
}

/// A job represents a unit of work to be executed by a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Name of the queue that owns this job.
    pub origin: String,
    /// Registered task name used to resolve the handler.
    pub target: String,
    pub status: JobStatus,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub enqueued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Handler output, set only on success.
    pub result: Option<Value>,
    /// Failure text, set only on failure.
    pub error: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Job this one waits on while deferred.
    pub dependency_id: Option<JobId>,
    /// Stored for display; never enforced.
    pub timeout: Option<u64>,
    pub worker_name: Option<String>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl Job {
    /// Create a job in its initial status.
    pub fn new(
        id: JobId,
        origin: impl Into<String>,
        target: impl Into<String>,
        status: JobStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            origin: origin.into(),
            target: target.into(),
            status,
            args: Vec::new(),
            kwargs: Map::new(),
            created_at: now,
            enqueued_at: (status == JobStatus::Queued).then_some(now),
            started_at: None,
            ended_at: None,
            result: None,
            error: None,
            scheduled_at: None,
            dependency_id: None,
            timeout: None,
            worker_name: None,
            meta: Map::new(),
        }
    }

    /// Move the job to `status`, stamping the matching phase timestamp.
    ///
    /// `_persist` is accepted for call compatibility; storing the job is the
    /// owning queue's concern.
    pub fn set_status(&mut self, status: JobStatus, _persist: bool) -> Result<(), JobError> {
        if !self.status.can_transition_to(status) {
            return Err(JobError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: status,
            });
        }

        let now = Utc::now();
        self.status = status;
        match status {
            JobStatus::Queued => self.enqueued_at = Some(now),
            JobStatus::Started => self.started_at = Some(now),
            s if s.is_terminal() => self.ended_at = Some(now),
            _ => {}
        }
        Ok(())
    }

    pub fn is_queued(&self) -> bool {
        self.status == JobStatus::Queued
    }

    pub fn is_deferred(&self) -> bool {
        self.status == JobStatus::Deferred
    }

    pub fn is_scheduled(&self) -> bool {
        self.status == JobStatus::Scheduled
    }

    pub fn is_started(&self) -> bool {
        self.status == JobStatus::Started
    }

    pub fn is_finished(&self) -> bool {
        self.status == JobStatus::Finished
    }

    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }

    pub fn is_stopped(&self) -> bool {
        self.status == JobStatus::Stopped
    }

    pub fn is_canceled(&self) -> bool {
        self.status == JobStatus::Canceled
    }

    /// Target descriptor shown in listings, e.g. `reports.render()`.
    pub fn func_name(&self) -> String {
        format!("{}()", self.target)
    }

    pub fn description(&self) -> &str {
        &self.target
    }

    /// Wall-clock time between start and end, when both are known.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}
