//! Process-wide directory of queues and workers.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use db::repositories::{JobRepository, QueueRepository, RegistryRepository};
use db::{Database, DbConfig};
use queue_core::{Job, JobEvent, JobId};
use tokio::sync::broadcast;

use crate::connection::Connection;
use crate::error::QueueResult;
use crate::handler::JobHandlerRegistry;
use crate::queue::Queue;
use crate::worker::{Worker, key_for};

const EVENT_CAPACITY: usize = 1024;

/// Owns the store connection, the handler registry and one handle per queue
/// and worker name.
///
/// Create one per process at the composition root and pass it by reference;
/// every `get_*` call returns the same shared handle for the same name.
pub struct Broker {
    connection: Connection,
    handlers: Arc<JobHandlerRegistry>,
    queues: Mutex<HashMap<String, Arc<Queue>>>,
    workers: Mutex<HashMap<String, Arc<Worker>>>,
    event_tx: broadcast::Sender<JobEvent>,
}

impl Broker {
    pub fn new(db: Database, handlers: JobHandlerRegistry) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            connection: Connection::new(db),
            handlers: Arc::new(handlers),
            queues: Mutex::new(HashMap::new()),
            workers: Mutex::new(HashMap::new()),
            event_tx,
        }
    }

    /// Connect to the store described by `config` and prepare its schema.
    pub async fn connect(config: &DbConfig, handlers: JobHandlerRegistry) -> QueueResult<Self> {
        let db = db::init(config).await?;
        Ok(Self::new(db, handlers))
    }

    pub fn get_connection(&self) -> Connection {
        self.connection.clone()
    }

    /// Alias of [`Broker::get_connection`] kept for callers written against
    /// a Redis-backed broker.
    pub fn get_redis_connection(&self) -> Connection {
        self.get_connection()
    }

    pub fn handlers(&self) -> &Arc<JobHandlerRegistry> {
        &self.handlers
    }

    /// Receive queue and worker lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// The queue named `name`, created on first use.
    pub fn get_queue(&self, name: &str) -> Arc<Queue> {
        lock(&self.queues)
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(queue = name, "Opening queue");
                Arc::new(
                    Queue::new(name, self.connection.clone()).with_event_tx(self.event_tx.clone()),
                )
            })
            .clone()
    }

    /// Queue handles opened so far, sorted by name.
    pub fn queues(&self) -> Vec<Arc<Queue>> {
        let mut queues: Vec<_> = lock(&self.queues).values().cloned().collect();
        queues.sort_by(|a, b| a.name().cmp(b.name()));
        queues
    }

    /// Names of every queue that has ever stored an ordering.
    pub async fn stored_queue_names(&self) -> QueueResult<Vec<String>> {
        Ok(QueueRepository::names(self.connection.database()).await?)
    }

    /// The worker for a single queue.
    ///
    /// Without a name the worker is named after the queue (key
    /// `rq:worker:<queue>`), so repeated calls return the same worker.
    pub fn get_worker(&self, queue_name: &str, name: Option<&str>) -> Arc<Worker> {
        self.create_worker(&[queue_name], name)
    }

    /// The worker named `name` draining `queue_names` in the given order.
    /// Without a name it is called after its queues, joined by `-`.
    ///
    /// Workers are singletons per name: when the name is already registered
    /// the existing worker is returned and `queue_names` is ignored.
    pub fn create_worker(&self, queue_names: &[&str], name: Option<&str>) -> Arc<Worker> {
        let name = match name {
            Some(name) => name.to_string(),
            None => queue_names.join("-"),
        };
        let key = key_for(&name);

        if let Some(worker) = lock(&self.workers).get(&key) {
            return worker.clone();
        }

        let queues = queue_names.iter().map(|q| self.get_queue(q)).collect();
        let worker = Arc::new(
            Worker::new(name, queues, self.handlers.clone()).with_event_tx(self.event_tx.clone()),
        );

        let mut workers = lock(&self.workers);
        let worker = workers.entry(key).or_insert(worker).clone();
        tracing::info!(worker = %worker.name(), key = %worker.key(), "Worker registered");
        worker
    }

    pub fn worker_count(&self) -> usize {
        lock(&self.workers).len()
    }

    /// Every registered worker, sorted by name.
    pub fn all_workers(&self) -> Vec<Arc<Worker>> {
        let mut workers: Vec<_> = lock(&self.workers).values().cloned().collect();
        workers.sort_by(|a, b| a.name().cmp(b.name()));
        workers
    }

    /// Look a worker up by its `rq:worker:<name>` key.
    pub fn find_worker_by_key(&self, key: &str) -> Option<Arc<Worker>> {
        lock(&self.workers).get(key).cloned()
    }

    /// Find a job in whichever queue owns it.
    pub async fn fetch_job(&self, id: &JobId) -> QueueResult<Option<Job>> {
        match JobRepository::get(self.connection.database(), id).await? {
            Some(job) => self.get_queue(&job.origin).fetch_job(id).await,
            None => Ok(None),
        }
    }

    pub async fn job_exists(&self, id: &JobId) -> QueueResult<bool> {
        Ok(JobRepository::exists(self.connection.database(), id).await?)
    }

    /// Empty every known queue and drop its registries.
    pub async fn flushall(&self) -> QueueResult<()> {
        let db = self.connection.database();
        let mut names: BTreeSet<String> = self.stored_queue_names().await?.into_iter().collect();
        names.extend(self.queues().iter().map(|q| q.name().to_string()));

        for name in names {
            self.get_queue(&name).empty().await?;
            RegistryRepository::clear_queue(db, &name).await?;
        }
        tracing::info!("All queues flushed");
        Ok(())
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("connection", &self.connection)
            .field("handlers", &self.handlers)
            .field("workers", &self.worker_count())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
