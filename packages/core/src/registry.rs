//! Lifecycle phases tracked by job registries.

use serde::{Deserialize, Serialize};

/// One of the six lifecycle phases that keep a per-queue set of job ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    Started,
    Finished,
    Failed,
    Deferred,
    Scheduled,
    Canceled,
}

impl RegistryKind {
    pub const ALL: [RegistryKind; 6] = [
        RegistryKind::Started,
        RegistryKind::Finished,
        RegistryKind::Failed,
        RegistryKind::Deferred,
        RegistryKind::Scheduled,
        RegistryKind::Canceled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RegistryKind::Started => "started",
            RegistryKind::Finished => "finished",
            RegistryKind::Failed => "failed",
            RegistryKind::Deferred => "deferred",
            RegistryKind::Scheduled => "scheduled",
            RegistryKind::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
