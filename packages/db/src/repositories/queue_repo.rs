//! Queue ordering repository.
//!
//! Each queue owns a single record holding its job ids in append order, so
//! every append or removal is one atomic record update.

use queue_core::JobId;

use crate::{Database, DbError};

/// Repository for durable FIFO orderings.
pub struct QueueRepository;

impl QueueRepository {
    /// Append a job id to the end of a queue's ordering.
    pub async fn push(db: &Database, queue: &str, job_id: &JobId) -> Result<(), DbError> {
        db.query(
            r#"
            UPSERT type::thing('queue_list', $queue)
            SET name = $queue,
                job_ids = array::append(job_ids ?? [], $job_id),
                updated_at = time::now()
            "#,
        )
        .bind(("queue", queue.to_string()))
        .bind(("job_id", job_id.to_string()))
        .await?
        .check()?;

        tracing::debug!(queue, job_id = %job_id, "Appended job to queue ordering");
        Ok(())
    }

    /// Job ids in FIFO order. Empty when the queue has never been used.
    pub async fn job_ids(db: &Database, queue: &str) -> Result<Vec<JobId>, DbError> {
        let mut response = db
            .query("SELECT VALUE job_ids FROM type::thing('queue_list', $queue)")
            .bind(("queue", queue.to_string()))
            .await?;

        let lists: Vec<Vec<String>> = response.take(0)?;
        Ok(lists
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(JobId::from)
            .collect())
    }

    /// Remove every occurrence of a job id from a queue's ordering.
    pub async fn remove(db: &Database, queue: &str, job_id: &JobId) -> Result<(), DbError> {
        db.query(
            r#"
            UPDATE type::thing('queue_list', $queue)
            SET job_ids = array::complement(job_ids ?? [], [$job_id]),
                updated_at = time::now()
            "#,
        )
        .bind(("queue", queue.to_string()))
        .bind(("job_id", job_id.to_string()))
        .await?
        .check()?;
        Ok(())
    }

    /// Drop a queue's ordering entirely.
    pub async fn clear(db: &Database, queue: &str) -> Result<(), DbError> {
        db.query("DELETE type::thing('queue_list', $queue)")
            .bind(("queue", queue.to_string()))
            .await?
            .check()?;
        Ok(())
    }

    /// Names of every queue with a stored ordering.
    pub async fn names(db: &Database) -> Result<Vec<String>, DbError> {
        let mut response = db.query("SELECT VALUE name FROM queue_list").await?;
        let mut names: Vec<String> = response.take(0)?;
        names.sort();
        Ok(names)
    }
}
