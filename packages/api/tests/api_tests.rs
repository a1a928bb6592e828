mod common;

use chrono::{Duration, Utc};
use serde_json::json;

use api::{ApiError, JobId, JobRequest, JobStatus, get_statistics, jobs};
use common::{TestResult, setup_broker};

#[tokio::test]
async fn statistics_count_outcomes_per_queue() -> TestResult {
    let (broker, config) = setup_broker().await?;
    let settings = &config.queues;
    let default = broker.get_queue("default");

    for n in 0..3 {
        default
            .enqueue(JobRequest::new("echo").with_args(vec![json!(n)]))
            .await?;
    }
    for _ in 0..2 {
        default.enqueue(JobRequest::new("fail")).await?;
    }
    broker
        .get_queue("low")
        .enqueue_at(Utc::now() + Duration::hours(1), JobRequest::new("echo"))
        .await?;

    let report = broker.get_worker("default", None).work(true).await?;
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 2);

    let stats = get_statistics(&broker, settings).await?;
    assert_eq!(stats.workers, 1);
    assert_eq!(stats.jobs, 6);
    assert_eq!(stats.queues.len(), 3);

    let default_stats = stats.queue("default").ok_or("default missing")?;
    assert_eq!(default_stats.index, 0);
    assert_eq!(default_stats.jobs, 5);
    assert_eq!(default_stats.finished_jobs, 3);
    assert_eq!(default_stats.failed_jobs, 2);
    assert_eq!(default_stats.started_jobs, 0);
    assert!(default_stats.oldest_job_timestamp.is_some());

    let high = stats.queue("high").ok_or("high missing")?;
    assert_eq!((high.index, high.jobs), (1, 0));
    assert!(high.oldest_job_timestamp.is_none());

    let low = stats.queue("low").ok_or("low missing")?;
    assert_eq!(low.index, 2);
    assert_eq!(low.scheduled_jobs, 1);

    let value = serde_json::to_value(&stats)?;
    assert_eq!(value["workers"], json!(1));
    assert_eq!(value["queues"][0]["name"], json!("default"));
    assert_eq!(value["queues"][0]["finished_jobs"], json!(3));
    assert_eq!(value["jobs"], json!(6));

    Ok(())
}

#[tokio::test]
async fn statistics_do_not_touch_state() -> TestResult {
    let (broker, config) = setup_broker().await?;
    let job = broker
        .get_queue("high")
        .enqueue(JobRequest::new("echo"))
        .await?;

    let before = get_statistics(&broker, &config.queues).await?;
    let after = get_statistics(&broker, &config.queues).await?;
    assert_eq!(before, after);
    assert_eq!(broker.worker_count(), 0);

    let job = jobs::fetch_job(&broker, &config.queues, &job.id).await?;
    assert_eq!(job.status, JobStatus::Queued);

    Ok(())
}

#[tokio::test]
async fn lookups_search_every_configured_queue() -> TestResult {
    let (broker, config) = setup_broker().await?;
    let settings = &config.queues;

    let in_low = broker
        .get_queue("low")
        .enqueue(JobRequest::new("echo").with_job_id("low-1"))
        .await?;
    let in_default = broker
        .get_queue("default")
        .enqueue(JobRequest::new("echo"))
        .await?;

    let found = jobs::fetch_job(&broker, settings, &in_low.id).await?;
    assert_eq!(found.origin, "low");
    assert!(jobs::job_exists(&broker, settings, &in_default.id).await?);

    let missing = JobId::from("nope");
    assert!(!jobs::job_exists(&broker, settings, &missing).await?);
    assert!(matches!(
        jobs::fetch_job(&broker, settings, &missing).await,
        Err(ApiError::NotFound(_))
    ));
    assert!(matches!(
        jobs::delete_job(&broker, settings, &missing).await,
        Err(ApiError::NotFound(_))
    ));

    let all: Vec<JobId> = jobs::all_jobs(&broker, settings)
        .await?
        .into_iter()
        .map(|j| j.id)
        .collect();
    assert_eq!(all, vec![in_default.id.clone(), in_low.id.clone()]);

    let low = settings.queue_by_index(&broker, 2);
    let picked = jobs::get_jobs(&low, &[in_low.id.clone(), missing.clone()]).await?;
    assert_eq!(picked, vec![in_low]);

    Ok(())
}

#[tokio::test]
async fn jobs_by_status_read_the_matching_registry() -> TestResult {
    let (broker, config) = setup_broker().await?;
    let queue = config.queues.queue_by_index(&broker, 0);

    let ok = queue.enqueue(JobRequest::new("echo")).await?;
    let bad = queue.enqueue(JobRequest::new("fail")).await?;
    let due = Utc::now() + Duration::minutes(30);
    let later = queue.enqueue_at(due, JobRequest::new("echo")).await?;
    broker.get_worker("default", None).work(true).await?;

    let finished = jobs::get_jobs_from_status(&queue, "finished").await?;
    assert_eq!(finished.iter().map(|j| &j.id).collect::<Vec<_>>(), vec![&ok.id]);

    let failed = jobs::get_jobs_from_status(&queue, "failed").await?;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, bad.id);
    assert_eq!(failed[0].error.as_deref(), Some("Intentional failure"));

    let scheduled = jobs::get_jobs_from_status(&queue, "scheduled").await?;
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].id, later.id);
    assert_eq!(scheduled[0].scheduled_at, Some(due));

    assert!(jobs::get_jobs_from_status(&queue, "started").await?.is_empty());

    for status in ["queued", "stopped", "bogus"] {
        assert!(matches!(
            jobs::get_jobs_from_status(&queue, status).await,
            Err(ApiError::NotFound(_))
        ));
    }

    Ok(())
}

#[tokio::test]
async fn admin_operations_move_jobs() -> TestResult {
    let (broker, config) = setup_broker().await?;
    let settings = &config.queues;
    let queue = broker.get_queue("high");

    let parent = queue.enqueue(JobRequest::new("echo")).await?;
    let child = queue
        .enqueue(JobRequest::new("echo").depends_on(&parent.id))
        .await?;
    let promoted = jobs::enqueue_job(&broker, settings, &child.id).await?;
    assert_eq!(promoted.status, JobStatus::Queued);

    let later = queue
        .enqueue_at(Utc::now() + Duration::minutes(5), JobRequest::new("echo"))
        .await?;
    let requeued = jobs::requeue_job(&broker, settings, &later.id).await?;
    assert_eq!(requeued.status, JobStatus::Queued);

    let stopped = jobs::stop_job(&broker, settings, &parent.id).await?;
    assert_eq!(stopped, vec![parent.id.clone()]);
    let parent = jobs::fetch_job(&broker, settings, &parent.id).await?;
    assert!(parent.is_stopped());

    // Terminal jobs cannot be requeued.
    assert!(matches!(
        jobs::requeue_job(&broker, settings, &parent.id).await,
        Err(ApiError::Queue(_))
    ));

    jobs::delete_job(&broker, settings, &child.id).await?;
    assert!(!jobs::job_exists(&broker, settings, &child.id).await?);

    let report = broker.get_worker("high", None).work(true).await?;
    assert_eq!(report.succeeded, 1);

    Ok(())
}
