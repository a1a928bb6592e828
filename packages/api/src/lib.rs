//! Producer-facing surface of the task queue.
//!
//! This crate contains:
//! - Broker bootstrap from configuration (`init_broker`, `BrokerConfig`)
//! - The configured queue list (`QueueSettings`)
//! - Aggregate statistics (`get_statistics`)
//! - Job lookups and admin operations across queues (`jobs`)

mod config;
mod error;
mod init;
pub mod jobs;
mod settings;
mod stats;

pub use config::BrokerConfig;
pub use error::{ApiError, ApiResult};
pub use init::{demo_handlers, init_broker};
pub use settings::{DEFAULT_QUEUES, QueueSettings};
pub use stats::get_statistics;

// Re-export core types for convenience
pub use queue_core::{Job, JobEvent, JobId, JobRequest, JobStatus, QueueStatistics, Statistics};
