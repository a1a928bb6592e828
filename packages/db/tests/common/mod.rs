use db::{Database, DbConfig, DbError};

/// Fresh, schema-initialized in-memory datastore.
pub async fn setup_db() -> Result<Database, DbError> {
    db::init(&DbConfig::memory()).await
}
