//! # Migration Registry
//!
//! Thread-safe lookup of migration tasks by tag.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use super::task::MigrationTask;
use crate::error::{BatchError, Result};

/// Tag-keyed collection of migration tasks
#[derive(Default)]
pub struct MigrationRegistry {
    tasks: DashMap<String, Arc<dyn MigrationTask>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under its tag; a tag can only be registered once
    pub fn register(&self, task: Arc<dyn MigrationTask>) -> Result<()> {
        let tag = task.tag().to_string();
        match self.tasks.entry(tag.clone()) {
            Entry::Occupied(_) => Err(BatchError::DuplicateMigration { tag }),
            Entry::Vacant(slot) => {
                info!(tag = %tag, description = %task.description(), "📝 Migration registered");
                slot.insert(task);
                Ok(())
            }
        }
    }

    pub fn get(&self, tag: &str) -> Option<Arc<dyn MigrationTask>> {
        self.tasks.get(tag).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tasks.contains_key(tag)
    }

    /// Registered tags in sorted order
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.tasks.iter().map(|entry| entry.key().clone()).collect();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ProgressCounter;
    use crate::writer::BoundedBatchWriter;
    use async_trait::async_trait;

    struct Noop(&'static str);

    #[async_trait]
    impl MigrationTask for Noop {
        fn tag(&self) -> &str {
            self.0
        }

        async fn run(
            &self,
            _writer: &mut BoundedBatchWriter,
            _counter: &ProgressCounter,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = MigrationRegistry::new();
        registry.register(Arc::new(Noop("users-v2"))).unwrap();
        registry.register(Arc::new(Noop("assign-data"))).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("users-v2"));
        assert_eq!(registry.get("assign-data").unwrap().tag(), "assign-data");
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.tags(), vec!["assign-data", "users-v2"]);
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let registry = MigrationRegistry::new();
        registry.register(Arc::new(Noop("users-v2"))).unwrap();

        let result = registry.register(Arc::new(Noop("users-v2")));
        assert!(matches!(result, Err(BatchError::DuplicateMigration { tag }) if tag == "users-v2"));
        assert_eq!(registry.len(), 1);
    }
}
