//! Broker configuration read from the environment.

use db::DbConfig;

use crate::error::{ApiError, ApiResult};
use crate::settings::QueueSettings;

/// Store location plus the queues this process serves.
#[derive(Debug, Clone, Default)]
pub struct BrokerConfig {
    pub db: DbConfig,
    pub queues: QueueSettings,
}

impl BrokerConfig {
    pub fn new(db: DbConfig, queues: QueueSettings) -> Self {
        Self { db, queues }
    }

    /// Build a config from environment variables.
    ///
    /// - `QUEUE_DB_ENDPOINT` (default: `mem://`, e.g. `rocksdb://./data/queue`)
    /// - `QUEUE_DB_NAMESPACE` (default: `taskqueue`)
    /// - `QUEUE_DB_DATABASE` (default: `main`)
    /// - `QUEUE_DB_USER`, `QUEUE_DB_PASS` (optional; both or neither)
    /// - `QUEUE_NAMES` (comma separated, default: `default,high,low`)
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`BrokerConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).and_then(non_empty);

        let mut db = DbConfig::memory();
        if let Some(endpoint) = var("QUEUE_DB_ENDPOINT") {
            if !endpoint.contains("://") {
                return Err(ApiError::InvalidConfig(format!(
                    "QUEUE_DB_ENDPOINT={endpoint} is not a URL (expected mem://, file://<path> or rocksdb://<path>)"
                )));
            }
            db = db.with_endpoint(endpoint);
        }
        if let Some(namespace) = var("QUEUE_DB_NAMESPACE") {
            db = db.with_namespace(namespace);
        }
        if let Some(database) = var("QUEUE_DB_DATABASE") {
            db = db.with_database(database);
        }
        match (var("QUEUE_DB_USER"), var("QUEUE_DB_PASS")) {
            (Some(user), Some(pass)) => db = db.with_credentials(user, pass),
            (None, None) => {}
            _ => {
                return Err(ApiError::InvalidConfig(
                    "QUEUE_DB_USER and QUEUE_DB_PASS must be set together".into(),
                ));
            }
        }

        let queues = match var("QUEUE_NAMES") {
            Some(names) => QueueSettings::new(names.split(',').filter_map(|n| non_empty(n.to_string())))?,
            None => QueueSettings::default(),
        };

        Ok(Self { db, queues })
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
