//! Error types for queue and worker operations.

use db::DbError;
use queue_core::{JobError, JobId};

/// Errors returned by queue, registry and worker operations.
///
/// Failures raised by a task handler are not represented here: they are
/// recorded on the job itself.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("No such job: {0}")]
    NoSuchJob(JobId),

    #[error("Job {0} already exists")]
    DuplicateJob(JobId),

    #[error("Job {job_id} belongs to queue '{origin}', not '{queue}'")]
    ForeignJob {
        job_id: JobId,
        origin: String,
        queue: String,
    },

    #[error(transparent)]
    InvalidJobOperation(#[from] JobError),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;
