//! Job document repository.

use std::collections::HashMap;

use queue_core::{Job, JobId, JobStatus};
use serde::Deserialize;

use crate::{Database, DbError};

/// Repository for job persistence operations.
///
/// Jobs are stored as JSON text keyed by job id, with the owning queue and
/// status copied alongside for filtering.
pub struct JobRepository;

impl JobRepository {
    /// Insert or replace a job document.
    pub async fn put(db: &Database, job: &Job) -> Result<(), DbError> {
        let document = serde_json::to_string(job)?;

        db.query(
            r#"
            UPSERT type::thing('job', $id)
            SET origin = $origin, status = $status, document = $document, updated_at = time::now()
            "#,
        )
        .bind(("id", job.id.to_string()))
        .bind(("origin", job.origin.clone()))
        .bind(("status", job.status.as_str().to_string()))
        .bind(("document", document))
        .await?
        .check()?;

        tracing::debug!(job_id = %job.id, status = %job.status, "Stored job document");
        Ok(())
    }

    /// Replace a stored job only while its recorded status is still `expected`.
    ///
    /// Returns `false`, leaving the record untouched, when the job is missing
    /// or its status has moved on.
    pub async fn update_if_status(
        db: &Database,
        job: &Job,
        expected: JobStatus,
    ) -> Result<bool, DbError> {
        #[derive(Deserialize)]
        struct StatusRow {
            #[allow(dead_code)]
            status: String,
        }

        let document = serde_json::to_string(job)?;

        let mut response = db
            .query(
                r#"
                UPDATE type::thing('job', $id)
                SET status = $status, document = $document, updated_at = time::now()
                WHERE origin = $origin AND status = $expected
                RETURN status
                "#,
            )
            .bind(("id", job.id.to_string()))
            .bind(("origin", job.origin.clone()))
            .bind(("status", job.status.as_str().to_string()))
            .bind(("expected", expected.as_str().to_string()))
            .bind(("document", document))
            .await?;

        let rows: Vec<StatusRow> = response.take(0)?;
        let applied = !rows.is_empty();
        tracing::debug!(
            job_id = %job.id,
            expected = %expected,
            status = %job.status,
            applied,
            "Conditional job update"
        );
        Ok(applied)
    }

    /// Get a job by ID.
    pub async fn get(db: &Database, id: &JobId) -> Result<Option<Job>, DbError> {
        let mut response = db
            .query("SELECT VALUE document FROM type::thing('job', $id)")
            .bind(("id", id.to_string()))
            .await?;

        let documents: Vec<String> = response.take(0)?;
        documents
            .first()
            .map(|doc| serde_json::from_str(doc).map_err(DbError::from))
            .transpose()
    }

    /// Check whether a job document exists.
    pub async fn exists(db: &Database, id: &JobId) -> Result<bool, DbError> {
        let mut response = db
            .query("SELECT VALUE origin FROM type::thing('job', $id)")
            .bind(("id", id.to_string()))
            .await?;

        let origins: Vec<String> = response.take(0)?;
        Ok(!origins.is_empty())
    }

    /// All job documents owned by a queue, keyed by id.
    pub async fn list_for_queue(
        db: &Database,
        origin: &str,
    ) -> Result<HashMap<JobId, Job>, DbError> {
        let mut response = db
            .query("SELECT VALUE document FROM job WHERE origin = $origin")
            .bind(("origin", origin.to_string()))
            .await?;

        let documents: Vec<String> = response.take(0)?;
        documents
            .iter()
            .map(|doc| {
                let job: Job = serde_json::from_str(doc)?;
                Ok((job.id.clone(), job))
            })
            .collect()
    }

    /// Count job documents owned by a queue.
    pub async fn count_for_queue(db: &Database, origin: &str) -> Result<u64, DbError> {
        #[derive(Deserialize)]
        struct CountRow {
            count: i64,
        }

        let mut response = db
            .query("SELECT count() AS count FROM job WHERE origin = $origin GROUP ALL")
            .bind(("origin", origin.to_string()))
            .await?;

        let rows: Vec<CountRow> = response.take(0)?;
        Ok(rows.first().map_or(0, |row| row.count.max(0) as u64))
    }

    /// Delete a job document.
    pub async fn delete(db: &Database, id: &JobId) -> Result<(), DbError> {
        db.query("DELETE type::thing('job', $id)")
            .bind(("id", id.to_string()))
            .await?
            .check()?;
        Ok(())
    }

    /// Delete every job document owned by a queue.
    pub async fn delete_for_queue(db: &Database, origin: &str) -> Result<(), DbError> {
        db.query("DELETE job WHERE origin = $origin")
            .bind(("origin", origin.to_string()))
            .await?
            .check()?;
        Ok(())
    }
}
