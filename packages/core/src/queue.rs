//! Queue-facing request and statistics types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::JobId;

/// Everything a producer supplies when enqueuing a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Registered task name.
    pub target: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    /// Enqueue as deferred until this job finishes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<JobId>,
    /// Caller-chosen id; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

impl JobRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Insert a single keyword argument.
    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    pub fn depends_on(mut self, job_id: impl Into<JobId>) -> Self {
        self.depends_on = Some(job_id.into());
        self
    }

    pub fn with_job_id(mut self, job_id: impl Into<JobId>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Some(timeout_secs);
        self
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = meta;
        self
    }
}

/// Point-in-time counts for one queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatistics {
    pub name: String,
    /// Jobs currently owned by the queue.
    pub jobs: u64,
    /// Position in the configured queue list.
    pub index: usize,
    pub started_jobs: u64,
    pub failed_jobs: u64,
    pub finished_jobs: u64,
    pub deferred_jobs: u64,
    pub scheduled_jobs: u64,
    pub canceled_jobs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest_job_timestamp: Option<DateTime<Utc>>,
}

/// Aggregate view over every configured queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    /// Workers known to the process.
    pub workers: u64,
    pub queues: Vec<QueueStatistics>,
    /// Sum of `jobs` across queues.
    pub jobs: u64,
}

impl Statistics {
    pub fn queue(&self, name: &str) -> Option<&QueueStatistics> {
        self.queues.iter().find(|q| q.name == name)
    }
}
