mod common;

use queue_core::{Job, JobId, JobStatus};
use serde_json::{Value, json};

use broker::{HandlerError, JobHandlerRegistry, job_handler};
use common::TestResult;

fn job(target: &str) -> Job {
    let mut job = Job::new(JobId::new(), "default", target, JobStatus::Started);
    job.args = vec![json!(2), json!(3)];
    job
}

#[tokio::test]
async fn a_target_can_only_be_bound_once() -> TestResult {
    let mut handlers = JobHandlerRegistry::new();
    handlers.register(job_handler!("math.sum", |job| {
        Ok(json!(job.args.iter().filter_map(Value::as_i64).sum::<i64>()))
    }))?;

    let again = handlers.register(job_handler!("math.sum", |job| {
        Err(format!("replacement for {}", job.id))
    }));
    assert_eq!(again, Err(HandlerError::DuplicateTarget("math.sum".into())));

    // The first binding is still the one that runs.
    let result = handlers.invoke(&job("math.sum")).await.ok_or("not bound")?;
    assert_eq!(result, Ok(json!(5)));
    assert_eq!(handlers.targets(), vec!["math.sum"]);

    Ok(())
}

#[tokio::test]
async fn invoke_reports_unbound_targets_and_panics() -> TestResult {
    let mut handlers = JobHandlerRegistry::new();
    handlers.register(job_handler!("boom", |job| {
        if !job.args.is_empty() {
            panic!("boom at {}", job.id);
        }
        Ok(Value::Null)
    }))?;

    assert!(!handlers.contains("missing"));
    assert!(handlers.invoke(&job("missing")).await.is_none());

    let exploding = job("boom");
    let result = handlers.invoke(&exploding).await.ok_or("not bound")?;
    let error = result.err().ok_or("panic not reported")?;
    assert_eq!(error, format!("panicked: boom at {}", exploding.id));

    Ok(())
}
