//! Job lookups and admin operations across the configured queues.
//!
//! Every operation that takes a bare job id searches the configured queues in
//! index order and reports [`ApiError::NotFound`] when none owns it.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use broker::{Broker, Queue};
use queue_core::{Job, JobId, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::settings::QueueSettings;

/// Jobs of `queue` for the ids that still exist, in the given order.
pub async fn get_jobs(queue: &Queue, job_ids: &[JobId]) -> ApiResult<Vec<Job>> {
    let mut jobs = Vec::with_capacity(job_ids.len());
    for id in job_ids {
        if let Some(job) = queue.fetch_job(id).await? {
            jobs.push(job);
        }
    }
    Ok(jobs)
}

/// Jobs of `queue` currently in the registry for `status`.
///
/// Unknown statuses, and statuses with no registry (`queued`, `stopped`),
/// are reported as not found.
pub async fn get_jobs_from_status(queue: &Queue, status: &str) -> ApiResult<Vec<Job>> {
    let kind = JobStatus::from_str(status)
        .ok()
        .and_then(JobStatus::registry)
        .ok_or_else(|| ApiError::NotFound(format!("no registry for status '{status}'")))?;

    let registry = queue.registry(kind);
    let mut ids = registry.get_job_ids().await?;
    ids.sort();

    let mut jobs = get_jobs(queue, &ids).await?;
    for job in &mut jobs {
        if let Some(when) = registry.scheduled_time(job) {
            job.scheduled_at = Some(when);
        }
    }
    Ok(jobs)
}

/// Find the configured queue that owns `id`.
async fn locate(broker: &Broker, settings: &QueueSettings, id: &JobId) -> ApiResult<(Arc<Queue>, Job)> {
    for queue in settings.queues(broker) {
        if let Some(job) = queue.fetch_job(id).await? {
            return Ok((queue, job));
        }
    }
    Err(ApiError::NotFound(format!("Job {id} not found")))
}

pub async fn fetch_job(broker: &Broker, settings: &QueueSettings, id: &JobId) -> ApiResult<Job> {
    locate(broker, settings, id).await.map(|(_, job)| job)
}

pub async fn job_exists(broker: &Broker, settings: &QueueSettings, id: &JobId) -> ApiResult<bool> {
    match locate(broker, settings, id).await {
        Ok(_) => Ok(true),
        Err(ApiError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Every job in every configured queue, queue by queue in FIFO order.
pub async fn all_jobs(broker: &Broker, settings: &QueueSettings) -> ApiResult<Vec<Job>> {
    let mut seen = HashSet::new();
    let mut jobs = Vec::new();
    for queue in settings.queues(broker) {
        for job in queue.jobs().await? {
            if seen.insert(job.id.clone()) {
                jobs.push(job);
            }
        }
    }
    Ok(jobs)
}

pub async fn delete_job(broker: &Broker, settings: &QueueSettings, id: &JobId) -> ApiResult<()> {
    let (queue, _) = locate(broker, settings, id).await?;
    queue.delete_job(id).await?;
    Ok(())
}

/// Move a deferred or scheduled job to QUEUED.
pub async fn requeue_job(broker: &Broker, settings: &QueueSettings, id: &JobId) -> ApiResult<Job> {
    let (queue, _) = locate(broker, settings, id).await?;
    Ok(queue.requeue_job(id).await?)
}

/// Same as [`requeue_job`]; kept as a separate entry point for callers that
/// distinguish the two.
pub async fn enqueue_job(broker: &Broker, settings: &QueueSettings, id: &JobId) -> ApiResult<Job> {
    requeue_job(broker, settings, id).await
}

/// Mark a job STOPPED and return the ids that were stopped.
pub async fn stop_job(broker: &Broker, settings: &QueueSettings, id: &JobId) -> ApiResult<Vec<JobId>> {
    let (queue, _) = locate(broker, settings, id).await?;
    let stopped = queue.stop_job(id).await?;
    tracing::info!(job_id = %stopped.id, queue = %queue.name(), "Job stopped");
    Ok(vec![stopped.id])
}
