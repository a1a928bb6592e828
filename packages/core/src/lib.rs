//! Core domain types for the task queue.
//!
//! This crate contains shared types used across all packages:
//! - Job, JobId and the JobStatus state machine
//! - RegistryKind for lifecycle registries
//! - Enqueue requests and statistics shapes
//! - Events for observing lifecycle changes

mod events;
mod job;
mod queue;
mod registry;

pub use events::JobEvent;
pub use job::{Job, JobError, JobId, JobStatus};
pub use queue::{JobRequest, QueueStatistics, Statistics};
pub use registry::RegistryKind;
