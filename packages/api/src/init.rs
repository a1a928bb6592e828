//! Broker bootstrap.

use std::time::Duration;

use broker::{Broker, FnHandler, HandlerFuture, JobHandlerRegistry};
use queue_core::Job;
use serde_json::{Value, json};

use crate::config::BrokerConfig;
use crate::error::ApiResult;

/// Connect to the configured store and build the broker.
///
/// This should be called once at startup; the returned broker is the
/// process-wide directory of queues and workers.
pub async fn init_broker(config: &BrokerConfig, handlers: JobHandlerRegistry) -> ApiResult<Broker> {
    tracing::info!(
        endpoint = %config.db.endpoint,
        queues = ?config.queues.names(),
        "Initializing broker"
    );

    let db = db::init(&config.db).await?;
    let broker = Broker::new(db, handlers);

    for queue in config.queues.queues(&broker) {
        let pending = queue.count().await?;
        tracing::info!(queue = %queue.name(), jobs = pending, "Queue ready");
    }

    tracing::info!(targets = ?broker.handlers().targets(), "Broker initialized");
    Ok(broker)
}

/// Handlers for the demo targets `echo`, `sleep` and `fail`.
pub fn demo_handlers() -> ApiResult<JobHandlerRegistry> {
    let mut handlers = JobHandlerRegistry::new();

    // Returns its args and kwargs unchanged.
    handlers.register(FnHandler::new("echo", |job: Job| {
        let payload = json!({ "args": job.args, "kwargs": job.kwargs });
        Box::pin(async move {
            tracing::info!(%payload, "Echo job");
            Ok::<_, String>(payload)
        }) as HandlerFuture
    }))?;

    // Sleeps for `seconds` (kwarg, default 1).
    handlers.register(FnHandler::new("sleep", |job: Job| {
        let seconds = job
            .kwargs
            .get("seconds")
            .and_then(Value::as_u64)
            .unwrap_or(1);
        Box::pin(async move {
            tracing::info!(seconds, "Sleeping");
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            Ok::<_, String>(json!(format!("Slept for {seconds} seconds")))
        }) as HandlerFuture
    }))?;

    // Fails unless called with `fail=false`.
    handlers.register(FnHandler::new("fail", |job: Job| {
        let should_fail = job
            .kwargs
            .get("fail")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        Box::pin(async move {
            if should_fail {
                Err("Intentional failure".to_string())
            } else {
                Ok(json!("Success"))
            }
        }) as HandlerFuture
    }))?;

    Ok(handlers)
}
