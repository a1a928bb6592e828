//! Aggregate queue statistics.

use broker::Broker;
use queue_core::{QueueStatistics, RegistryKind, Statistics};

use crate::error::ApiResult;
use crate::settings::QueueSettings;

/// Counts for every configured queue plus process-wide totals.
///
/// Reads only; nothing is created or moved.
pub async fn get_statistics(broker: &Broker, settings: &QueueSettings) -> ApiResult<Statistics> {
    let mut queues = Vec::with_capacity(settings.names().len());

    for (index, queue) in settings.queues(broker).into_iter().enumerate() {
        let count = |kind| {
            let registry = queue.registry(kind);
            async move { registry.count().await }
        };

        let oldest_job_timestamp = queue
            .jobs()
            .await?
            .iter()
            .filter_map(|job| job.enqueued_at)
            .min();

        queues.push(QueueStatistics {
            name: queue.name().to_string(),
            jobs: queue.count().await?,
            index,
            started_jobs: count(RegistryKind::Started).await?,
            failed_jobs: count(RegistryKind::Failed).await?,
            finished_jobs: count(RegistryKind::Finished).await?,
            deferred_jobs: count(RegistryKind::Deferred).await?,
            scheduled_jobs: count(RegistryKind::Scheduled).await?,
            canceled_jobs: count(RegistryKind::Canceled).await?,
            oldest_job_timestamp,
        });
    }

    let jobs = queues.iter().map(|q| q.jobs).sum();
    Ok(Statistics {
        workers: broker.worker_count() as u64,
        queues,
        jobs,
    })
}
