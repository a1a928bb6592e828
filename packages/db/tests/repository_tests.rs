#![allow(clippy::disallowed_methods)]

mod common;

use std::error::Error;

use queue_core::{Job, JobId, JobStatus, RegistryKind};
use serde_json::json;

use db::repositories::{JobRepository, QueueRepository, RegistryRepository};

fn job(id: &str, origin: &str) -> Job {
    let mut job = Job::new(JobId::from(id), origin, "reports.render", JobStatus::Queued);
    job.args = vec![json!(1), json!("two")];
    job.kwargs.insert("format".to_string(), json!("pdf"));
    job
}

#[tokio::test]
async fn job_documents_round_trip() -> Result<(), Box<dyn Error>> {
    let db = common::setup_db().await?;

    let stored = job("a", "default");
    JobRepository::put(&db, &stored).await?;

    let loaded = JobRepository::get(&db, &stored.id).await?;
    assert_eq!(loaded.as_ref(), Some(&stored));
    assert!(JobRepository::exists(&db, &stored.id).await?);

    let missing = JobRepository::get(&db, &JobId::from("missing")).await?;
    assert!(missing.is_none());

    let mut updated = stored.clone();
    updated.set_status(JobStatus::Started, true)?;
    JobRepository::put(&db, &updated).await?;
    let loaded = JobRepository::get(&db, &stored.id).await?;
    assert_eq!(loaded.map(|j| j.status), Some(JobStatus::Started));

    JobRepository::delete(&db, &stored.id).await?;
    assert!(!JobRepository::exists(&db, &stored.id).await?);
    Ok(())
}

#[tokio::test]
async fn job_documents_are_scoped_by_queue() -> Result<(), Box<dyn Error>> {
    let db = common::setup_db().await?;

    JobRepository::put(&db, &job("a", "default")).await?;
    JobRepository::put(&db, &job("b", "default")).await?;
    JobRepository::put(&db, &job("c", "high")).await?;

    let default_jobs = JobRepository::list_for_queue(&db, "default").await?;
    assert_eq!(default_jobs.len(), 2);
    assert!(default_jobs.contains_key(&JobId::from("a")));
    assert_eq!(JobRepository::count_for_queue(&db, "high").await?, 1);
    assert_eq!(JobRepository::count_for_queue(&db, "low").await?, 0);

    JobRepository::delete_for_queue(&db, "default").await?;
    assert_eq!(JobRepository::count_for_queue(&db, "default").await?, 0);
    assert_eq!(JobRepository::count_for_queue(&db, "high").await?, 1);
    Ok(())
}

#[tokio::test]
async fn conditional_update_requires_the_expected_status() -> Result<(), Box<dyn Error>> {
    let db = common::setup_db().await?;

    let queued = job("a", "default");
    JobRepository::put(&db, &queued).await?;

    let mut started = queued.clone();
    started.set_status(JobStatus::Started, true)?;
    assert!(JobRepository::update_if_status(&db, &started, JobStatus::Queued).await?);

    // The record is STARTED now, so a second claim from QUEUED loses.
    let mut canceled = queued.clone();
    canceled.set_status(JobStatus::Canceled, true)?;
    assert!(!JobRepository::update_if_status(&db, &canceled, JobStatus::Queued).await?);

    let loaded = JobRepository::get(&db, &queued.id).await?;
    assert_eq!(loaded.map(|j| j.status), Some(JobStatus::Started));

    let ghost = job("ghost", "default");
    assert!(!JobRepository::update_if_status(&db, &ghost, JobStatus::Queued).await?);
    assert!(!JobRepository::exists(&db, &ghost.id).await?);
    Ok(())
}

#[tokio::test]
async fn queue_ordering_is_fifo()-> Result<(), Box<dyn Error>> {
    let db = common::setup_db().await?;

    assert!(QueueRepository::job_ids(&db, "default").await?.is_empty());

    for id in ["a", "b", "c"] {
        QueueRepository::push(&db, "default", &JobId::from(id)).await?;
    }
    QueueRepository::push(&db, "low", &JobId::from("z")).await?;

    let ids = QueueRepository::job_ids(&db, "default").await?;
    assert_eq!(ids, vec![JobId::from("a"), JobId::from("b"), JobId::from("c")]);

    QueueRepository::remove(&db, "default", &JobId::from("b")).await?;
    let ids = QueueRepository::job_ids(&db, "default").await?;
    assert_eq!(ids, vec![JobId::from("a"), JobId::from("c")]);

    assert_eq!(QueueRepository::names(&db).await?, vec!["default", "low"]);

    QueueRepository::clear(&db, "default").await?;
    assert!(QueueRepository::job_ids(&db, "default").await?.is_empty());
    assert_eq!(QueueRepository::job_ids(&db, "low").await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn registry_sets_deduplicate_members() -> Result<(), Box<dyn Error>> {
    let db = common::setup_db().await?;
    let id = JobId::from("a");

    RegistryRepository::add(&db, RegistryKind::Failed, "default", &id).await?;
    RegistryRepository::add(&db, RegistryKind::Failed, "default", &id).await?;
    RegistryRepository::add(&db, RegistryKind::Failed, "default", &JobId::from("b")).await?;

    assert_eq!(RegistryRepository::count(&db, RegistryKind::Failed, "default").await?, 2);
    assert!(RegistryRepository::contains(&db, RegistryKind::Failed, "default", &id).await?);
    assert!(!RegistryRepository::contains(&db, RegistryKind::Failed, "high", &id).await?);
    assert!(!RegistryRepository::contains(&db, RegistryKind::Started, "default", &id).await?);

    RegistryRepository::remove(&db, RegistryKind::Failed, "default", &id).await?;
    let members = RegistryRepository::members(&db, RegistryKind::Failed, "default").await?;
    assert_eq!(members, vec![JobId::from("b")]);

    // Removing from a registry that was never written is harmless.
    RegistryRepository::remove(&db, RegistryKind::Canceled, "default", &id).await?;
    assert_eq!(RegistryRepository::count(&db, RegistryKind::Canceled, "default").await?, 0);

    RegistryRepository::clear_queue(&db, "default").await?;
    assert_eq!(RegistryRepository::count(&db, RegistryKind::Failed, "default").await?, 0);
    Ok(())
}

#[tokio::test]
async fn separate_connections_do_not_share_memory_state() -> Result<(), Box<dyn Error>> {
    let first = common::setup_db().await?;
    let second = common::setup_db().await?;

    QueueRepository::push(&first, "default", &JobId::from("a")).await?;
    assert!(QueueRepository::job_ids(&second, "default").await?.is_empty());
    Ok(())
}
