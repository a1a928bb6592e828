//! Durable per-phase job id registries.

use chrono::{DateTime, Utc};
use db::DbError;
use db::repositories::RegistryRepository;
use queue_core::{Job, JobId, RegistryKind};

use crate::connection::Connection;

/// The set of job ids in one lifecycle phase of one queue.
///
/// Membership only changes as a side effect of status transitions made
/// through [`crate::Queue::set_job_status`], plus the scheduled insert done
/// by [`crate::Queue::enqueue_at`].
#[derive(Debug, Clone)]
pub struct Registry {
    kind: RegistryKind,
    queue: String,
    connection: Connection,
}

impl Registry {
    pub fn new(kind: RegistryKind, queue: impl Into<String>, connection: Connection) -> Self {
        Self {
            kind,
            queue: queue.into(),
            connection,
        }
    }

    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    /// Name of the queue this registry belongs to.
    pub fn name(&self) -> &str {
        &self.queue
    }

    pub async fn add(&self, job_or_id: impl Into<JobId>) -> Result<(), DbError> {
        let job_id = job_or_id.into();
        RegistryRepository::add(self.connection.database(), self.kind, &self.queue, &job_id).await
    }

    pub async fn remove(&self, job_id: &JobId) -> Result<(), DbError> {
        RegistryRepository::remove(self.connection.database(), self.kind, &self.queue, job_id)
            .await
    }

    /// Full membership, unordered.
    pub async fn get_job_ids(&self) -> Result<Vec<JobId>, DbError> {
        RegistryRepository::members(self.connection.database(), self.kind, &self.queue).await
    }

    pub async fn contains(&self, job_id: &JobId) -> Result<bool, DbError> {
        RegistryRepository::contains(self.connection.database(), self.kind, &self.queue, job_id)
            .await
    }

    pub async fn count(&self) -> Result<u64, DbError> {
        RegistryRepository::count(self.connection.database(), self.kind, &self.queue).await
    }

    /// When a scheduled job is due. Only meaningful for the scheduled registry.
    pub fn scheduled_time(&self, job: &Job) -> Option<DateTime<Utc>> {
        match self.kind {
            RegistryKind::Scheduled => job.scheduled_at,
            _ => None,
        }
    }
}
