//! SurrealDB-backed durable substrate for the task queue.
//!
//! This crate provides the three persistence primitives the broker is
//! built on:
//!
//! - ordered lists of job ids, one per queue ([`repositories::QueueRepository`])
//! - sets of job ids, one per lifecycle phase and queue ([`repositories::RegistryRepository`])
//! - job documents keyed by id ([`repositories::JobRepository`])
//!
//! # Features
//!
//! - `memory` (default): Use in-memory storage for testing
//! - `rocksdb`: Use RocksDB for persistent file-based storage

mod connection;
mod schema;
pub mod repositories;

pub use connection::{Database, DbConfig, DbError, connect};
pub use schema::init_schema;

/// Connect and initialize the schema.
///
/// This should be called once at application startup.
pub async fn init(config: &DbConfig) -> Result<Database, DbError> {
    let db = connect(config).await?;
    init_schema(&db).await?;
    Ok(db)
}
