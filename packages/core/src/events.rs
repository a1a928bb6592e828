//! Event types for observing job lifecycle changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JobId, JobStatus};

/// Events emitted by queues and workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    /// A job was added to a queue.
    JobEnqueued {
        job_id: JobId,
        queue: String,
        status: JobStatus,
        timestamp: DateTime<Utc>,
    },
    /// A job moved between lifecycle states.
    JobStatusChanged {
        job_id: JobId,
        queue: String,
        old_status: JobStatus,
        new_status: JobStatus,
        timestamp: DateTime<Utc>,
    },
    /// A worker began a burst drain.
    DrainStarted {
        worker: String,
        queues: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    /// A worker finished a burst drain.
    DrainFinished {
        worker: String,
        succeeded: u64,
        failed: u64,
        timestamp: DateTime<Utc>,
    },
}

impl JobEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            JobEvent::JobEnqueued { timestamp, .. } => *timestamp,
            JobEvent::JobStatusChanged { timestamp, .. } => *timestamp,
            JobEvent::DrainStarted { timestamp, .. } => *timestamp,
            JobEvent::DrainFinished { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job ID associated with this event, if any.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            JobEvent::JobEnqueued { job_id, .. } => Some(job_id),
            JobEvent::JobStatusChanged { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            JobEvent::JobEnqueued { job_id, queue, status, .. } => {
                format!("Job {} enqueued to {} as {}", job_id, queue, status)
            }
            JobEvent::JobStatusChanged {
                job_id, new_status, ..
            } => format!("Job {} -> {}", job_id, new_status),
            JobEvent::DrainStarted { worker, queues, .. } => {
                format!("Worker {} draining {}", worker, queues.join(", "))
            }
            JobEvent::DrainFinished {
                worker,
                succeeded,
                failed,
                ..
            } => format!(
                "Worker {} drained: {} succeeded, {} failed",
                worker, succeeded, failed
            ),
        }
    }
}
