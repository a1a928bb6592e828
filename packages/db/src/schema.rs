//! Database schema definitions using SurrealQL.

use crate::{Database, DbError};

/// Initialize the database schema.
///
/// This creates all necessary tables, fields, and indexes. Safe to run on
/// every startup.
pub async fn init_schema(db: &Database) -> Result<(), DbError> {
    tracing::info!("Initializing database schema...");

    db.query(QUEUE_LIST_SCHEMA).await?.check()?;
    db.query(REGISTRY_SCHEMA).await?.check()?;
    db.query(JOB_SCHEMA).await?.check()?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// One ordered list of job ids per queue name.
const QUEUE_LIST_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS queue_list SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS name ON queue_list TYPE string;
DEFINE FIELD IF NOT EXISTS job_ids ON queue_list TYPE array<string> DEFAULT [];
DEFINE FIELD IF NOT EXISTS updated_at ON queue_list TYPE datetime DEFAULT time::now();

DEFINE INDEX IF NOT EXISTS queue_list_name ON queue_list FIELDS name UNIQUE;
"#;

/// One set of job ids per (lifecycle phase, queue name).
const REGISTRY_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS registry SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS kind ON registry TYPE string;
DEFINE FIELD IF NOT EXISTS queue ON registry TYPE string;
DEFINE FIELD IF NOT EXISTS job_ids ON registry TYPE array<string> DEFAULT [];
DEFINE FIELD IF NOT EXISTS updated_at ON registry TYPE datetime DEFAULT time::now();

DEFINE INDEX IF NOT EXISTS registry_queue ON registry FIELDS queue;
"#;

/// Job documents keyed by job id. The full job is stored as JSON text.
const JOB_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS job SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS origin ON job TYPE string;
DEFINE FIELD IF NOT EXISTS status ON job TYPE string;
DEFINE FIELD IF NOT EXISTS document ON job TYPE string;
DEFINE FIELD IF NOT EXISTS updated_at ON job TYPE datetime DEFAULT time::now();

DEFINE INDEX IF NOT EXISTS job_origin ON job FIELDS origin;
DEFINE INDEX IF NOT EXISTS job_status ON job FIELDS origin, status;
"#;
