//! Resolution of job targets to runnable tasks.
//!
//! A job stores only the stable name of its task, so it can be resolved
//! again after a restart. The registry owns that mapping and the invocation
//! boundary: a task that panics is reported as a failed result instead of
//! unwinding into the worker.

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::FutureExt;
use queue_core::Job;
use serde_json::Value;

/// What a task produces: the job result, or failure text.
pub type HandlerResult = Result<Value, String>;

pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// A task that jobs can name as their target.
///
/// Returning `Err` marks the job FAILED; it never aborts a drain.
pub trait JobHandler: Send + Sync + 'static {
    fn target(&self) -> &str;

    fn handle(&self, job: &Job) -> HandlerFuture;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("a handler is already registered for target '{0}'")]
    DuplicateTarget(String),
}

/// Target name to task mapping, fixed once the broker is built.
#[derive(Default)]
pub struct JobHandlerRegistry {
    tasks: BTreeMap<String, Arc<dyn JobHandler>>,
}

impl JobHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task under its target name.
    ///
    /// A target can only be bound once; a second binding is refused and the
    /// first one stays in place.
    pub fn register<H: JobHandler>(&mut self, handler: H) -> Result<(), HandlerError> {
        let target = handler.target().to_string();
        if self.tasks.contains_key(&target) {
            return Err(HandlerError::DuplicateTarget(target));
        }
        tracing::debug!(target = %target, "Task registered");
        self.tasks.insert(target, Arc::new(handler));
        Ok(())
    }

    pub fn contains(&self, target: &str) -> bool {
        self.tasks.contains_key(target)
    }

    /// Registered target names in sorted order.
    pub fn targets(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    /// Run the task bound to `job.target`.
    ///
    /// Returns `None` when no task is bound. A panic inside the task, whether
    /// raised while building its future or while polling it, comes back as
    /// `Err("panicked: ...")`.
    pub async fn invoke(&self, job: &Job) -> Option<HandlerResult> {
        let task = self.tasks.get(&job.target)?.clone();
        let run = AssertUnwindSafe(async move { task.handle(job).await });
        Some(
            run.catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(panic_message(&*panic))),
        )
    }
}

impl std::fmt::Debug for JobHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tasks.keys()).finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

/// A task built from a closure over an owned copy of the job.
pub struct FnHandler<F> {
    target: String,
    run: F,
}

impl<F> FnHandler<F>
where
    F: Fn(Job) -> HandlerFuture + Send + Sync + 'static,
{
    pub fn new(target: impl Into<String>, run: F) -> Self {
        Self {
            target: target.into(),
            run,
        }
    }
}

impl<F> JobHandler for FnHandler<F>
where
    F: Fn(Job) -> HandlerFuture + Send + Sync + 'static,
{
    fn target(&self) -> &str {
        &self.target
    }

    fn handle(&self, job: &Job) -> HandlerFuture {
        (self.run)(job.clone())
    }
}

/// Build an [`FnHandler`] from an async body that evaluates to a
/// [`HandlerResult`]. The job is bound by value inside the body.
#[macro_export]
macro_rules! job_handler {
    ($target:expr, |$job:ident| $body:expr) => {
        $crate::FnHandler::new($target, |$job: $crate::Job| {
            Box::pin(async move {
                let result: $crate::HandlerResult = $body;
                result
            }) as $crate::HandlerFuture
        })
    };
}
