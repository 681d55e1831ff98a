//! In-memory source and store, used by the CLI and tests.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{LegacyFilter, LegacyReportSource, MigrationError, MigrationResult, ReportStore};
use crate::model::{LegacyReportDoc, ReportDefinition};

/// Legacy reports held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    docs: Vec<LegacyReportDoc>,
}

impl MemorySource {
    pub fn new(docs: Vec<LegacyReportDoc>) -> Self {
        Self { docs }
    }

    /// Load a JSON array of legacy report rows.
    pub fn load(path: &Path) -> MigrationResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MigrationError::Source(format!("{}: {}", path.display(), e)))?;
        let docs = serde_json::from_str(&content)
            .map_err(|e| MigrationError::Source(format!("{}: {}", path.display(), e)))?;
        Ok(Self { docs })
    }
}

#[async_trait]
impl LegacyReportSource for MemorySource {
    async fn fetch_legacy(&self, filter: &LegacyFilter) -> MigrationResult<Vec<LegacyReportDoc>> {
        Ok(self
            .docs
            .iter()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect())
    }
}

/// Definitions held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    definitions: Mutex<Vec<ReportDefinition>>,
    batches: Mutex<usize>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already holding `definitions`.
    pub fn with_definitions(definitions: Vec<ReportDefinition>) -> Self {
        Self {
            definitions: Mutex::new(definitions),
            ..Self::default()
        }
    }

    /// Every batch write fails.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub async fn definitions(&self) -> Vec<ReportDefinition> {
        self.definitions.lock().await.clone()
    }

    /// Number of successful batch writes.
    pub async fn batches(&self) -> usize {
        *self.batches.lock().await
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn migrated_legacy_ids(&self, platform: &str) -> MigrationResult<HashSet<u64>> {
        Ok(self
            .definitions
            .lock()
            .await
            .iter()
            .filter(|d| d.platform == platform)
            .filter_map(|d| d.imported_from_legacy_id)
            .collect())
    }

    async fn put_batch(&self, definitions: Vec<ReportDefinition>) -> MigrationResult<()> {
        if self.fail_writes {
            return Err(MigrationError::Store("batch write rejected".into()));
        }
        self.definitions.lock().await.extend(definitions);
        *self.batches.lock().await += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReportType;

    #[tokio::test]
    async fn test_store_reports_legacy_ids_per_platform() {
        let mut migrated = ReportDefinition::new(ReportType::UsersCourses, "a", "A");
        migrated.platform = "acme".into();
        migrated.imported_from_legacy_id = Some(11);
        let mut other = migrated.clone();
        other.platform = "globex".into();
        other.imported_from_legacy_id = Some(12);
        let native = ReportDefinition::new(ReportType::UsersCourses, "b", "B");

        let store = MemoryStore::with_definitions(vec![migrated, other, native]);
        let ids = store.migrated_legacy_ids("acme").await.unwrap();
        assert_eq!(ids, HashSet::from([11]));
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = MemoryStore::failing();
        let err = store.put_batch(Vec::new()).await.unwrap_err();
        assert!(matches!(err, MigrationError::Store(_)));
        assert_eq!(store.batches().await, 0);
    }
}
