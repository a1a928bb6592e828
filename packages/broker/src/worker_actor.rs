//! Actor wrapper that runs drains on a dedicated task.

use std::sync::Arc;

use ractor::{Actor, ActorProcessingErr, ActorRef};

use crate::messages::{WorkerMessage, WorkerSnapshot};
use crate::worker::Worker;

/// State for the worker actor.
pub struct WorkerActorState {
    pub worker: Arc<Worker>,
    /// Drains handled by this actor.
    pub drains: u64,
}

/// Actor that owns a [`Worker`] and drains it on request.
///
/// Messages are handled one at a time, so drains sent to the same actor
/// never overlap.
pub struct WorkerActor;

impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerActorState;
    type Arguments = Arc<Worker>;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        worker: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(worker = %worker.name(), "Starting worker actor");
        worker.register_birth();
        Ok(WorkerActorState { worker, drains: 0 })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Work { burst, reply } => {
                let result = state.worker.work(burst).await.map_err(|e| e.to_string());
                state.drains += 1;
                if let Err(error) = &result {
                    tracing::error!(worker = %state.worker.name(), %error, "Drain failed");
                }
                let _ = reply.send(result);
            }

            WorkerMessage::GetState { reply } => {
                let worker = &state.worker;
                let _ = reply.send(WorkerSnapshot {
                    name: worker.name().to_string(),
                    key: worker.key(),
                    queues: worker.queue_names(),
                    state: worker.state(),
                    current_job: worker.current_job(),
                    successful_job_count: worker.successful_job_count(),
                    failed_job_count: worker.failed_job_count(),
                });
            }

            WorkerMessage::Shutdown => {
                tracing::info!(
                    worker = %state.worker.name(),
                    drains = state.drains,
                    "Shutting down worker actor"
                );
                myself.stop(None);
            }
        }

        Ok(())
    }
}

/// Spawn a [`WorkerActor`] named after the worker's key.
pub async fn spawn_worker_actor(
    worker: Arc<Worker>,
) -> Result<(ActorRef<WorkerMessage>, tokio::task::JoinHandle<()>), ractor::SpawnErr> {
    let name = worker.key();
    Actor::spawn(Some(name), WorkerActor, worker).await
}
