//! Message types for the worker actor.

use queue_core::JobId;
use ractor::RpcReplyPort;
use serde::{Deserialize, Serialize};

use crate::worker::{DrainReport, WorkerState};

/// Point-in-time view of a worker, returned by [`WorkerMessage::GetState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    pub name: String,
    pub key: String,
    pub queues: Vec<String>,
    pub state: WorkerState,
    pub current_job: Option<JobId>,
    pub successful_job_count: u64,
    pub failed_job_count: u64,
}

/// Messages for the WorkerActor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Run one drain; storage failures come back as text.
    Work {
        burst: bool,
        reply: RpcReplyPort<Result<DrainReport, String>>,
    },

    /// Report the worker's current state.
    GetState { reply: RpcReplyPort<WorkerSnapshot> },

    /// Stop the actor.
    Shutdown,
}
