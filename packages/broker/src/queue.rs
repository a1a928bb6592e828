//! Named FIFO queues backed by the durable store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use db::repositories::{JobRepository, QueueRepository, RegistryRepository};
use queue_core::{Job, JobError, JobEvent, JobId, JobRequest, JobStatus, RegistryKind};
use tokio::sync::{Mutex, RwLock, broadcast};

use crate::connection::Connection;
use crate::error::{QueueError, QueueResult};
use crate::registry::Registry;

/// A named durable FIFO container of jobs.
///
/// The ordering and the job documents live in the store; `index` is a
/// write-through cache of the documents this handle has touched, so a fresh
/// handle over an existing store still sees every job.
pub struct Queue {
    name: String,
    connection: Connection,
    index: RwLock<HashMap<JobId, Job>>,
    transition_lock: Mutex<()>,
    event_tx: Option<broadcast::Sender<JobEvent>>,
}

impl Queue {
    pub fn new(name: impl Into<String>, connection: Connection) -> Self {
        Self {
            name: name.into(),
            connection,
            index: RwLock::new(HashMap::new()),
            transition_lock: Mutex::new(()),
            event_tx: None,
        }
    }

    /// Publish lifecycle events on `tx`.
    pub fn with_event_tx(mut self, tx: broadcast::Sender<JobEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Registry for one lifecycle phase of this queue.
    pub fn registry(&self, kind: RegistryKind) -> Registry {
        self.connection.registry(kind, self.name.clone())
    }

    /// Add a job to the end of the queue.
    ///
    /// The job starts DEFERRED when the request names a dependency and QUEUED
    /// otherwise.
    pub async fn enqueue(&self, request: JobRequest) -> QueueResult<Job> {
        let status = if request.depends_on.is_some() {
            JobStatus::Deferred
        } else {
            JobStatus::Queued
        };
        let job = self.build_job(request, status).await?;
        self.store_new(job).await
    }

    /// Add a job that becomes due at `when`.
    ///
    /// The job starts SCHEDULED and is recorded in the scheduled registry.
    /// Promotion at the due time is left to an external scheduler.
    pub async fn enqueue_at(&self, when: DateTime<Utc>, request: JobRequest) -> QueueResult<Job> {
        let mut job = self.build_job(request, JobStatus::Scheduled).await?;
        job.scheduled_at = Some(when);

        let job = self.store_new(job).await?;
        self.registry(RegistryKind::Scheduled).add(&job.id).await?;
        Ok(job)
    }

    async fn build_job(&self, request: JobRequest, status: JobStatus) -> QueueResult<Job> {
        let JobRequest {
            target,
            args,
            kwargs,
            depends_on,
            job_id,
            timeout,
            meta,
        } = request;

        let id = job_id.unwrap_or_default();
        if self.index.read().await.contains_key(&id)
            || JobRepository::exists(self.connection.database(), &id).await?
        {
            return Err(QueueError::DuplicateJob(id));
        }

        let mut job = Job::new(id, self.name.clone(), target, status);
        job.args = args;
        job.kwargs = kwargs;
        job.dependency_id = depends_on;
        job.timeout = timeout;
        job.meta = meta;
        Ok(job)
    }

    async fn store_new(&self, job: Job) -> QueueResult<Job> {
        let db = self.connection.database();
        JobRepository::put(db, &job).await?;
        QueueRepository::push(db, &self.name, &job.id).await?;
        self.index.write().await.insert(job.id.clone(), job.clone());

        tracing::info!(
            queue = %self.name,
            job_id = %job.id,
            target = %job.target,
            status = %job.status,
            "Job enqueued"
        );
        self.emit(JobEvent::JobEnqueued {
            job_id: job.id.clone(),
            queue: self.name.clone(),
            status: job.status,
            timestamp: Utc::now(),
        });
        Ok(job)
    }

    /// Look a job up by id without side effects on its state.
    ///
    /// Jobs owned by another queue are not returned.
    pub async fn fetch_job(&self, id: &JobId) -> QueueResult<Option<Job>> {
        if let Some(job) = self.index.read().await.get(id) {
            return Ok(Some(job.clone()));
        }
        self.reload_job(id).await
    }

    /// Read a job straight from the store, refreshing the cached copy.
    pub async fn reload_job(&self, id: &JobId) -> QueueResult<Option<Job>> {
        let job = JobRepository::get(self.connection.database(), id)
            .await?
            .filter(|job| job.origin == self.name);

        let mut index = self.index.write().await;
        match &job {
            Some(job) => {
                index.insert(job.id.clone(), job.clone());
            }
            None => {
                index.remove(id);
            }
        }
        Ok(job)
    }

    /// Ids in FIFO order, including entries whose job has since been removed.
    pub async fn job_ids(&self) -> QueueResult<Vec<JobId>> {
        Ok(QueueRepository::job_ids(self.connection.database(), &self.name).await?)
    }

    /// Jobs in FIFO order. Ordering entries with no job behind them are skipped.
    pub async fn jobs(&self) -> QueueResult<Vec<Job>> {
        let db = self.connection.database();
        let ids = QueueRepository::job_ids(db, &self.name).await?;
        let mut documents = JobRepository::list_for_queue(db, &self.name).await?;

        let jobs: Vec<Job> = ids
            .iter()
            .filter_map(|id| documents.remove(id))
            .collect();

        let mut index = self.index.write().await;
        for job in &jobs {
            index.insert(job.id.clone(), job.clone());
        }
        Ok(jobs)
    }

    /// Number of jobs owned by this queue.
    pub async fn count(&self) -> QueueResult<u64> {
        Ok(JobRepository::count_for_queue(self.connection.database(), &self.name).await?)
    }

    /// Drop the ordering and every job owned by this queue.
    ///
    /// Registry sets are left alone.
    pub async fn empty(&self) -> QueueResult<()> {
        let db = self.connection.database();
        QueueRepository::clear(db, &self.name).await?;
        JobRepository::delete_for_queue(db, &self.name).await?;
        self.index.write().await.clear();

        tracing::info!(queue = %self.name, "Queue emptied");
        Ok(())
    }

    /// Move a job to `status` and keep registry membership in step.
    ///
    /// The transition is checked against the stored record, not the caller's
    /// copy: when the stored status differs from `job.status`, or changes
    /// before the write lands, this fails with `InvalidJobOperation` and
    /// nothing is changed. Otherwise the document is written, the id leaves
    /// the old phase's registry and joins the new one, and `job` is updated
    /// in place.
    pub async fn set_job_status(&self, job: &mut Job, status: JobStatus) -> QueueResult<()> {
        self.check_owner(job)?;
        let _guard = self.transition_lock.lock().await;
        let db = self.connection.database();

        let stored = JobRepository::get(db, &job.id)
            .await?
            .filter(|stored| stored.origin == self.name)
            .ok_or_else(|| QueueError::NoSuchJob(job.id.clone()))?;
        let old_status = stored.status;
        if old_status != job.status {
            self.index.write().await.insert(stored.id.clone(), stored);
            return Err(conflict(&job.id, old_status, status));
        }

        let mut updated = job.clone();
        updated.set_status(status, true)?;
        if !JobRepository::update_if_status(db, &updated, old_status).await? {
            self.index.write().await.remove(&job.id);
            return Err(conflict(&job.id, old_status, status));
        }

        let from = old_status.registry();
        let to = status.registry();
        if from != to {
            if let Some(kind) = from {
                RegistryRepository::remove(db, kind, &self.name, &job.id).await?;
            }
            if let Some(kind) = to {
                RegistryRepository::add(db, kind, &self.name, &job.id).await?;
            }
        }
        self.index.write().await.insert(updated.id.clone(), updated.clone());
        *job = updated;

        tracing::debug!(
            queue = %self.name,
            job_id = %job.id,
            from = %old_status,
            to = %status,
            "Job status changed"
        );
        self.emit(JobEvent::JobStatusChanged {
            job_id: job.id.clone(),
            queue: self.name.clone(),
            old_status,
            new_status: status,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn transition(&self, id: &JobId, status: JobStatus) -> QueueResult<Job> {
        let mut job = self
            .reload_job(id)
            .await?
            .ok_or_else(|| QueueError::NoSuchJob(id.clone()))?;
        self.set_job_status(&mut job, status).await?;
        Ok(job)
    }

    /// Mark a queued or running job STOPPED. A running handler is not interrupted.
    pub async fn stop_job(&self, id: &JobId) -> QueueResult<Job> {
        self.transition(id, JobStatus::Stopped).await
    }

    /// Mark any non-terminal job CANCELED.
    pub async fn cancel_job(&self, id: &JobId) -> QueueResult<Job> {
        self.transition(id, JobStatus::Canceled).await
    }

    /// Promote a deferred or scheduled job to QUEUED.
    pub async fn requeue_job(&self, id: &JobId) -> QueueResult<Job> {
        self.transition(id, JobStatus::Queued).await
    }

    /// Remove a job's document, its ordering entry and its registry membership.
    pub async fn delete_job(&self, id: &JobId) -> QueueResult<Job> {
        let _guard = self.transition_lock.lock().await;
        let job = self
            .reload_job(id)
            .await?
            .ok_or_else(|| QueueError::NoSuchJob(id.clone()))?;

        let db = self.connection.database();
        if let Some(kind) = job.status.registry() {
            RegistryRepository::remove(db, kind, &self.name, id).await?;
        }
        QueueRepository::remove(db, &self.name, id).await?;
        JobRepository::delete(db, id).await?;
        self.index.write().await.remove(id);

        tracing::info!(queue = %self.name, job_id = %id, "Job deleted");
        Ok(job)
    }

    fn check_owner(&self, job: &Job) -> QueueResult<()> {
        if job.origin == self.name {
            Ok(())
        } else {
            Err(QueueError::ForeignJob {
                job_id: job.id.clone(),
                origin: job.origin.clone(),
                queue: self.name.clone(),
            })
        }
    }

    fn emit(&self, event: JobEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

/// The stored status is not the one the caller started from.
fn conflict(id: &JobId, stored: JobStatus, to: JobStatus) -> QueueError {
    QueueError::InvalidJobOperation(JobError::InvalidTransition {
        id: id.clone(),
        from: stored,
        to,
    })
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue").field("name", &self.name).finish()
    }
}
