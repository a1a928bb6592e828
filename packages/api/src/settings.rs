//! Configured queue list.

use std::collections::HashMap;
use std::sync::Arc;

use broker::{Broker, Queue};

use crate::error::{ApiError, ApiResult};

/// Queue names used when none are configured, in index order.
pub const DEFAULT_QUEUES: [&str; 3] = ["default", "high", "low"];

/// The ordered list of queues this deployment serves.
///
/// Each queue's position is its index in statistics output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    names: Vec<String>,
    indexes: HashMap<String, usize>,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self::from_names(DEFAULT_QUEUES.iter().map(|name| name.to_string()).collect())
    }
}

impl QueueSettings {
    /// Build settings from queue names. Names must be non-empty and unique.
    pub fn new<I, S>(names: I) -> ApiResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(ApiError::InvalidConfig("no queues configured".into()));
        }
        if let Some(blank) = names.iter().position(|name| name.trim().is_empty()) {
            return Err(ApiError::InvalidConfig(format!(
                "queue name at position {blank} is empty"
            )));
        }

        let settings = Self::from_names(names);
        if settings.indexes.len() != settings.names.len() {
            return Err(ApiError::InvalidConfig(format!(
                "duplicate queue names in {:?}",
                settings.names
            )));
        }
        Ok(settings)
    }

    fn from_names(names: Vec<String>) -> Self {
        let indexes = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, indexes }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.indexes.get(name).copied()
    }

    /// Queue name at `index`, falling back to the first configured queue.
    pub fn name_by_index(&self, index: usize) -> &str {
        self.names
            .get(index)
            .or_else(|| self.names.first())
            .map_or(DEFAULT_QUEUES[0], String::as_str)
    }

    /// Queue handle at `index`, falling back to the first configured queue.
    pub fn queue_by_index(&self, broker: &Broker, index: usize) -> Arc<Queue> {
        broker.get_queue(self.name_by_index(index))
    }

    /// Handles for every configured queue, in index order.
    pub fn queues(&self, broker: &Broker) -> Vec<Arc<Queue>> {
        self.names.iter().map(|name| broker.get_queue(name)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_default_high_low() {
        let settings = QueueSettings::default();
        assert_eq!(settings.names(), ["default", "high", "low"]);
        assert_eq!(settings.index_of("high"), Some(1));
        assert_eq!(settings.index_of("missing"), None);
    }

    #[test]
    fn out_of_range_index_falls_back_to_first_queue() {
        let settings = QueueSettings::default();
        assert_eq!(settings.name_by_index(2), "low");
        assert_eq!(settings.name_by_index(7), "default");

        let custom = QueueSettings::new(["reports", "mail"]).unwrap();
        assert_eq!(custom.name_by_index(9), "reports");
    }

    #[test]
    fn rejects_empty_and_duplicate_names() {
        let none: [&str; 0] = [];
        assert!(matches!(
            QueueSettings::new(none),
            Err(ApiError::InvalidConfig(_))
        ));
        assert!(matches!(
            QueueSettings::new(["a", " "]),
            Err(ApiError::InvalidConfig(_))
        ));
        assert!(matches!(
            QueueSettings::new(["a", "b", "a"]),
            Err(ApiError::InvalidConfig(_))
        ));
    }
}
