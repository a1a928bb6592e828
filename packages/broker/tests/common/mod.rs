#![allow(dead_code)]

use std::error::Error;

use broker::{
    Broker, Connection, FnHandler, HandlerError, HandlerFuture, JobHandlerRegistry, Queue,
    job_handler,
};
use db::{Database, DbConfig};
use queue_core::{Job, JobId, JobRequest, RegistryKind};
use serde_json::{Value, json};

pub type TestResult = Result<(), Box<dyn Error>>;

/// Fresh, schema-initialized in-memory datastore.
pub async fn setup_db() -> Result<Database, Box<dyn Error>> {
    Ok(db::init(&DbConfig::memory()).await?)
}

/// Handlers shared by the broker tests.
///
/// - `tests.add` sums its numeric args
/// - `tests.fail` always fails
/// - `tests.panic` panics
/// - `tests.spawn` enqueues a `tests.add` job on its own queue
/// - `tests.stop_self` stops its own job before returning
pub fn handlers(db: &Database) -> Result<JobHandlerRegistry, HandlerError> {
    let mut handlers = JobHandlerRegistry::new();

    handlers.register(job_handler!("tests.add", |job| {
        let sum: i64 = job.args.iter().filter_map(Value::as_i64).sum();
        Ok(json!(sum))
    }))?;
    handlers.register(job_handler!("tests.fail", |job| {
        Err(format!("refusing to run {}", job.id))
    }))?;
    handlers.register(job_handler!("tests.panic", |job| {
        if job.args.is_empty() {
            panic!("handler blew up");
        }
        Ok(Value::Null)
    }))?;

    let spawn_db = db.clone();
    handlers.register(FnHandler::new("tests.spawn", move |job: Job| {
        let queue = Queue::new(job.origin.clone(), Connection::new(spawn_db.clone()));
        Box::pin(async move {
            let child = queue
                .enqueue(JobRequest::new("tests.add").with_job_id("spawned"))
                .await
                .map_err(|e| e.to_string())?;
            Ok::<_, String>(json!(child.id))
        }) as HandlerFuture
    }))?;

    let stop_db = db.clone();
    handlers.register(FnHandler::new("tests.stop_self", move |job: Job| {
        let queue = Queue::new(job.origin.clone(), Connection::new(stop_db.clone()));
        let id = job.id.clone();
        Box::pin(async move {
            queue.stop_job(&id).await.map_err(|e| e.to_string())?;
            Ok::<_, String>(json!("finished anyway"))
        }) as HandlerFuture
    }))?;

    Ok(handlers)
}

/// Broker over a fresh datastore with the test handlers installed.
pub async fn setup_broker() -> Result<(Broker, Database), Box<dyn Error>> {
    let db = setup_db().await?;
    let broker = Broker::new(db.clone(), handlers(&db)?);
    Ok((broker, db))
}

/// Every registry of `queue` that currently holds `id`.
pub async fn registries_holding(
    queue: &Queue,
    id: &JobId,
) -> Result<Vec<RegistryKind>, Box<dyn Error>> {
    let mut holding = Vec::new();
    for kind in RegistryKind::ALL {
        if queue.registry(kind).contains(id).await? {
            holding.push(kind);
        }
    }
    Ok(holding)
}
