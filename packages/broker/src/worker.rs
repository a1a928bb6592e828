//! Burst-mode worker that drains its queues.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use queue_core::{Job, JobEvent, JobId, JobStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{QueueError, QueueResult};
use crate::handler::JobHandlerRegistry;
use crate::queue::Queue;

/// Prefix of every worker key.
pub const WORKER_KEY_PREFIX: &str = "rq:worker:";

/// Run state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Busy,
}

/// Outcome counts of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Jobs that reached STARTED.
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Snapshotted jobs left untouched: no longer queued, or no handler.
    pub skipped: u64,
    /// Jobs whose outcome was dropped because they were stopped or canceled
    /// while running.
    pub discarded: u64,
}

#[derive(Debug)]
struct Status {
    state: WorkerState,
    current_job: Option<JobId>,
    birth_date: Option<DateTime<Utc>>,
}

/// Executes ready jobs from an ordered list of queues.
pub struct Worker {
    name: String,
    queues: Vec<Arc<Queue>>,
    handlers: Arc<JobHandlerRegistry>,
    event_tx: Option<broadcast::Sender<JobEvent>>,
    status: Mutex<Status>,
    successful_jobs: AtomicU64,
    failed_jobs: AtomicU64,
    working_time_us: AtomicU64,
    drain_lock: tokio::sync::Mutex<()>,
}

enum Outcome {
    Succeeded,
    Failed,
    Discarded,
}

impl Worker {
    pub fn new(
        name: impl Into<String>,
        queues: Vec<Arc<Queue>>,
        handlers: Arc<JobHandlerRegistry>,
    ) -> Self {
        Self {
            name: name.into(),
            queues,
            handlers,
            event_tx: None,
            status: Mutex::new(Status {
                state: WorkerState::Idle,
                current_job: None,
                birth_date: None,
            }),
            successful_jobs: AtomicU64::new(0),
            failed_jobs: AtomicU64::new(0),
            working_time_us: AtomicU64::new(0),
            drain_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Publish drain events on `tx`.
    pub fn with_event_tx(mut self, tx: broadcast::Sender<JobEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory key, `rq:worker:<name>`.
    pub fn key(&self) -> String {
        key_for(&self.name)
    }

    pub fn queues(&self) -> &[Arc<Queue>] {
        &self.queues
    }

    pub fn queue_names(&self) -> Vec<String> {
        self.queues.iter().map(|q| q.name().to_string()).collect()
    }

    /// Id of the job being executed right now, if any.
    pub fn current_job(&self) -> Option<JobId> {
        self.lock_status().current_job.clone()
    }

    pub fn state(&self) -> WorkerState {
        self.lock_status().state
    }

    pub fn successful_job_count(&self) -> u64 {
        self.successful_jobs.load(Ordering::Relaxed)
    }

    pub fn failed_job_count(&self) -> u64 {
        self.failed_jobs.load(Ordering::Relaxed)
    }

    /// Time spent inside handlers across all drains.
    pub fn total_working_time(&self) -> Duration {
        Duration::from_micros(self.working_time_us.load(Ordering::Relaxed))
    }

    pub fn birth_date(&self) -> Option<DateTime<Utc>> {
        self.lock_status().birth_date
    }

    /// Record the worker's birth date. Later calls keep the first date.
    pub fn register_birth(&self) {
        let mut status = self.lock_status();
        if status.birth_date.is_none() {
            status.birth_date = Some(Utc::now());
        }
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_current(&self, job: Option<&JobId>) {
        let mut status = self.lock_status();
        status.current_job = job.cloned();
        status.state = if job.is_some() {
            WorkerState::Busy
        } else {
            WorkerState::Idle
        };
    }

    /// Drain every assigned queue once.
    ///
    /// Does nothing unless `burst` is set. Each queue is snapshotted when the
    /// pass reaches it, so jobs enqueued afterwards wait for the next drain.
    /// Jobs run one at a time on the calling task; a failing or panicking
    /// handler only fails its own job. Concurrent calls on the same worker
    /// are serialized.
    pub async fn work(&self, burst: bool) -> QueueResult<DrainReport> {
        let mut report = DrainReport::default();
        if !burst {
            tracing::debug!(worker = %self.name, "Non-burst work requested, nothing to do");
            return Ok(report);
        }

        let _guard = self.drain_lock.lock().await;
        self.register_birth();

        tracing::info!(worker = %self.name, queues = ?self.queue_names(), "Drain started");
        self.emit(JobEvent::DrainStarted {
            worker: self.name.clone(),
            queues: self.queue_names(),
            timestamp: Utc::now(),
        });

        let result = self.drain(&mut report).await;
        self.set_current(None);
        result?;

        tracing::info!(
            worker = %self.name,
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "Drain finished"
        );
        self.emit(JobEvent::DrainFinished {
            worker: self.name.clone(),
            succeeded: report.succeeded,
            failed: report.failed,
            timestamp: Utc::now(),
        });
        Ok(report)
    }

    async fn drain(&self, report: &mut DrainReport) -> QueueResult<()> {
        for queue in &self.queues {
            let snapshot = queue.jobs().await?;
            tracing::debug!(
                worker = %self.name,
                queue = %queue.name(),
                jobs = snapshot.len(),
                "Queue snapshot taken"
            );

            for entry in snapshot {
                // Another drain or a producer may have moved it since the snapshot.
                let Some(job) = queue.reload_job(&entry.id).await? else {
                    report.skipped += 1;
                    continue;
                };
                if !job.is_queued() {
                    report.skipped += 1;
                    continue;
                }

                match self.perform(queue, job).await? {
                    Some(Outcome::Succeeded) => {
                        report.processed += 1;
                        report.succeeded += 1;
                    }
                    Some(Outcome::Failed) => {
                        report.processed += 1;
                        report.failed += 1;
                    }
                    Some(Outcome::Discarded) => {
                        report.processed += 1;
                        report.discarded += 1;
                    }
                    None => report.skipped += 1,
                }
            }
        }
        Ok(())
    }

    async fn perform(&self, queue: &Queue, mut job: Job) -> QueueResult<Option<Outcome>> {
        if !self.handlers.contains(&job.target) {
            tracing::warn!(
                worker = %self.name,
                job_id = %job.id,
                target = %job.target,
                "No handler registered for target, skipping job"
            );
            return Ok(None);
        }

        // Losing the claim means another worker started it or it was stopped
        // or canceled since the reload.
        job.worker_name = Some(self.name.clone());
        match queue.set_job_status(&mut job, JobStatus::Started).await {
            Ok(()) => {}
            Err(QueueError::InvalidJobOperation(error)) => {
                tracing::debug!(worker = %self.name, job_id = %job.id, %error, "Job not claimed");
                return Ok(None);
            }
            Err(error) => return Err(error),
        }
        self.set_current(Some(&job.id));

        let started = Instant::now();
        let outcome = self
            .handlers
            .invoke(&job)
            .await
            .unwrap_or_else(|| Err(format!("no handler registered for {}", job.target)));
        self.add_working_time(started.elapsed());
        self.set_current(None);

        // A stop or cancel recorded while the handler ran wins over its outcome.
        let Some(mut current) = queue.reload_job(&job.id).await? else {
            tracing::warn!(job_id = %job.id, "Job removed while running, outcome discarded");
            return Ok(Some(Outcome::Discarded));
        };
        if !current.is_started() {
            return Ok(Some(self.discard(&current)));
        }

        let (status, succeeded) = match outcome {
            Ok(value) => {
                current.result = Some(value);
                (JobStatus::Finished, true)
            }
            Err(error) => {
                current.error = Some(error);
                (JobStatus::Failed, false)
            }
        };
        match queue.set_job_status(&mut current, status).await {
            Ok(()) => {}
            Err(QueueError::InvalidJobOperation(_)) => {
                let current = queue.reload_job(&job.id).await?.unwrap_or(current);
                return Ok(Some(self.discard(&current)));
            }
            Err(error) => return Err(error),
        }

        if succeeded {
            self.successful_jobs.fetch_add(1, Ordering::Relaxed);
            tracing::info!(job_id = %current.id, target = %current.target, "Job finished");
            Ok(Some(Outcome::Succeeded))
        } else {
            self.failed_jobs.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                job_id = %current.id,
                target = %current.target,
                error = current.error.as_deref().unwrap_or_default(),
                "Job failed"
            );
            Ok(Some(Outcome::Failed))
        }
    }

    fn discard(&self, current: &Job) -> Outcome {
        tracing::warn!(
            worker = %self.name,
            job_id = %current.id,
            status = %current.status,
            "Job left STARTED while running, outcome discarded"
        );
        Outcome::Discarded
    }

    fn add_working_time(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.working_time_us.fetch_add(micros, Ordering::Relaxed);
    }

    fn emit(&self, event: JobEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("queues", &self.queue_names())
            .field("state", &self.state())
            .finish()
    }
}

/// Directory key for a worker name.
pub fn key_for(name: &str) -> String {
    format!("{WORKER_KEY_PREFIX}{name}")
}
