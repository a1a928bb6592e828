//! Queue runtime: durable queues, lifecycle registries and burst workers.
//!
//! # Architecture
//!
//! - `Broker` - process-wide directory of queue and worker handles
//! - `Queue` - named FIFO container that creates jobs and moves their status
//! - `Registry` - set of job ids in one lifecycle phase of one queue
//! - `Worker` - drains its queues once per `work(true)` call
//! - `WorkerActor` - runs a worker's drains on its own actor task
//!
//! # Usage
//!
//! ```ignore
//! use broker::{Broker, JobHandlerRegistry, job_handler};
//! use queue_core::JobRequest;
//!
//! let mut handlers = JobHandlerRegistry::new();
//! handlers.register(job_handler!("echo", |job| Ok(serde_json::json!(job.args))))?;
//!
//! let broker = Broker::new(db, handlers);
//! broker.get_queue("default").enqueue(JobRequest::new("echo")).await?;
//! let report = broker.get_worker("default", None).work(true).await?;
//! ```

mod broker;
mod connection;
mod error;
mod handler;
mod messages;
mod queue;
mod registry;
mod worker;
mod worker_actor;

pub use broker::Broker;
pub use connection::Connection;
pub use error::{QueueError, QueueResult};
pub use handler::{
    FnHandler, HandlerError, HandlerFuture, HandlerResult, JobHandler, JobHandlerRegistry,
};
pub use messages::{WorkerMessage, WorkerSnapshot};
pub use queue::Queue;
pub use registry::Registry;
pub use worker::{DrainReport, WORKER_KEY_PREFIX, Worker, WorkerState, key_for};
pub use worker_actor::{WorkerActor, WorkerActorState, spawn_worker_actor};

// Used by the `job_handler!` macro.
pub use queue_core::Job;

// Re-export ractor types for convenience
pub use ractor::{Actor, ActorRef, RpcReplyPort, rpc};
