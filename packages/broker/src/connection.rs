//! Handle to the durable store shared by queues, registries and workers.

use db::Database;
use queue_core::RegistryKind;

use crate::registry::Registry;

/// Opaque connection handle.
///
/// Cloning is cheap and every clone talks to the same datastore.
#[derive(Clone)]
pub struct Connection {
    db: Database,
}

impl Connection {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Registry for one lifecycle phase of a queue.
    pub fn registry(&self, kind: RegistryKind, queue: impl Into<String>) -> Registry {
        Registry::new(kind, queue, self.clone())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("db", &"<Surreal<Any>>").finish()
    }
}
