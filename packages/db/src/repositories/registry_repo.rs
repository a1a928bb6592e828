//! Registry set repository.

use queue_core::{JobId, RegistryKind};

use crate::{Database, DbError};

/// Repository for per-(phase, queue) sets of job ids.
pub struct RegistryRepository;

fn record_key(kind: RegistryKind, queue: &str) -> String {
    format!("{}:{}", kind.as_str(), queue)
}

impl RegistryRepository {
    /// Add a job id to the set. Adding an existing member is a no-op.
    pub async fn add(
        db: &Database,
        kind: RegistryKind,
        queue: &str,
        job_id: &JobId,
    ) -> Result<(), DbError> {
        db.query(
            r#"
            UPSERT type::thing('registry', $key)
            SET kind = $kind,
                queue = $queue,
                job_ids = array::union(job_ids ?? [], [$job_id]),
                updated_at = time::now()
            "#,
        )
        .bind(("key", record_key(kind, queue)))
        .bind(("kind", kind.as_str().to_string()))
        .bind(("queue", queue.to_string()))
        .bind(("job_id", job_id.to_string()))
        .await?
        .check()?;

        tracing::debug!(registry = %kind, queue, job_id = %job_id, "Added job to registry");
        Ok(())
    }

    /// Remove a job id from the set. Removing a non-member is a no-op.
    pub async fn remove(
        db: &Database,
        kind: RegistryKind,
        queue: &str,
        job_id: &JobId,
    ) -> Result<(), DbError> {
        db.query(
            r#"
            UPDATE type::thing('registry', $key)
            SET job_ids = array::complement(job_ids ?? [], [$job_id]),
                updated_at = time::now()
            "#,
        )
        .bind(("key", record_key(kind, queue)))
        .bind(("job_id", job_id.to_string()))
        .await?
        .check()?;

        tracing::debug!(registry = %kind, queue, job_id = %job_id, "Removed job from registry");
        Ok(())
    }

    /// Every member of the set, in no particular order.
    pub async fn members(
        db: &Database,
        kind: RegistryKind,
        queue: &str,
    ) -> Result<Vec<JobId>, DbError> {
        let mut response = db
            .query("SELECT VALUE job_ids FROM type::thing('registry', $key)")
            .bind(("key", record_key(kind, queue)))
            .await?;

        let sets: Vec<Vec<String>> = response.take(0)?;
        Ok(sets
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(JobId::from)
            .collect())
    }

    /// Membership test.
    pub async fn contains(
        db: &Database,
        kind: RegistryKind,
        queue: &str,
        job_id: &JobId,
    ) -> Result<bool, DbError> {
        let mut response = db
            .query("SELECT VALUE job_ids CONTAINS $job_id FROM type::thing('registry', $key)")
            .bind(("key", record_key(kind, queue)))
            .bind(("job_id", job_id.to_string()))
            .await?;

        let found: Vec<bool> = response.take(0)?;
        Ok(found.first().copied().unwrap_or(false))
    }

    /// Number of members in the set.
    pub async fn count(db: &Database, kind: RegistryKind, queue: &str) -> Result<u64, DbError> {
        let mut response = db
            .query("SELECT VALUE array::len(job_ids) FROM type::thing('registry', $key)")
            .bind(("key", record_key(kind, queue)))
            .await?;

        let lengths: Vec<i64> = response.take(0)?;
        Ok(lengths.first().map_or(0, |len| (*len).max(0) as u64))
    }

    /// Drop every registry set belonging to a queue.
    pub async fn clear_queue(db: &Database, queue: &str) -> Result<(), DbError> {
        db.query("DELETE registry WHERE queue = $queue")
            .bind(("queue", queue.to_string()))
            .await?
            .check()?;
        Ok(())
    }
}
