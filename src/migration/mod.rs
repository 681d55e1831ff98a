//! Legacy report migration.
//!
//! [`Migrator::migrate`] converts a batch of legacy reports into definitions
//! and persists the successes with a single write. Per-report problems
//! (unmapped type, disabled feature, undecodable document, oversized result)
//! end up in [`MigrationOutcome::not_migrated`]; only collaborator failures
//! abort the batch.
//!
//! Reports already migrated are excluded from the fetch, so running the same
//! batch twice migrates each legacy report at most once.

pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::context::TenantContext;
use crate::legacy;
use crate::model::{LegacyReportDoc, ReportDefinition};
use crate::reports;

/// Serialized size above which a definition is not stored.
pub const DEFAULT_MAX_ITEM_BYTES: usize = 400_000;

/// Failures that abort a whole migration batch.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("legacy report source failed: {0}")]
    Source(String),

    #[error("report store failed: {0}")]
    Store(String),
}

pub type MigrationResult<T> = Result<T, MigrationError>;

/// Which legacy reports a batch covers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyFilter {
    /// Only these legacy ids, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<u64>>,
    /// Only these legacy numeric types, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<u32>>,
    /// Never these legacy ids.
    pub exclude_ids: Vec<u64>,
}

impl LegacyFilter {
    /// Whether `doc` passes the filter.
    pub fn matches(&self, doc: &LegacyReportDoc) -> bool {
        self.ids.as_ref().map_or(true, |ids| ids.contains(&doc.id))
            && self
                .types
                .as_ref()
                .map_or(true, |types| types.contains(&doc.report_type_id))
            && !self.exclude_ids.contains(&doc.id)
    }
}

/// Where legacy reports are read from.
#[async_trait]
pub trait LegacyReportSource: Send + Sync {
    async fn fetch_legacy(&self, filter: &LegacyFilter) -> MigrationResult<Vec<LegacyReportDoc>>;
}

/// Where migrated definitions are written.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Legacy ids already migrated for `platform`.
    async fn migrated_legacy_ids(&self, platform: &str) -> MigrationResult<HashSet<u64>>;

    /// Persist a batch of definitions; all or nothing.
    async fn put_batch(&self, definitions: Vec<ReportDefinition>) -> MigrationResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigratedReport {
    /// Id of the new definition.
    pub id: String,
    pub legacy_id: u64,
    pub title: String,
}

/// Why a legacy report was left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    UnmappedType,
    FeatureDisabled,
    Translation,
    TooLarge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotMigratedReport {
    /// Legacy id.
    pub id: u64,
    pub title: String,
    pub legacy_type: u32,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOutcome {
    pub migrated: Vec<MigratedReport>,
    pub not_migrated: Vec<NotMigratedReport>,
}

/// Batch driver for legacy migration of one tenant.
pub struct Migrator<'a> {
    tenant: &'a dyn TenantContext,
    source: &'a dyn LegacyReportSource,
    store: &'a dyn ReportStore,
    max_item_bytes: usize,
}

impl<'a> Migrator<'a> {
    pub fn new(
        tenant: &'a dyn TenantContext,
        source: &'a dyn LegacyReportSource,
        store: &'a dyn ReportStore,
    ) -> Self {
        Self {
            tenant,
            source,
            store,
            max_item_bytes: DEFAULT_MAX_ITEM_BYTES,
        }
    }

    pub fn with_max_item_bytes(mut self, max_item_bytes: usize) -> Self {
        self.max_item_bytes = max_item_bytes;
        self
    }

    /// Migrate every legacy report `filter` selects that is not migrated yet.
    pub async fn migrate(&self, mut filter: LegacyFilter) -> MigrationResult<MigrationOutcome> {
        let platform = self.tenant.platform();
        let done = self.store.migrated_legacy_ids(platform).await?;
        let mut excluded: Vec<u64> = done.into_iter().collect();
        excluded.sort_unstable();
        for id in excluded {
            if !filter.exclude_ids.contains(&id) {
                filter.exclude_ids.push(id);
            }
        }

        let docs = self.source.fetch_legacy(&filter).await?;
        if docs.is_empty() {
            debug!(platform, "no legacy reports to migrate");
            return Ok(MigrationOutcome::default());
        }

        let mut outcome = MigrationOutcome::default();
        let mut batch = Vec::new();
        for doc in &docs {
            match self.translate(doc) {
                Ok(definition) => {
                    outcome.migrated.push(MigratedReport {
                        id: definition.id.clone(),
                        legacy_id: doc.id,
                        title: definition.title.clone(),
                    });
                    batch.push(definition);
                }
                Err(reason) => outcome.not_migrated.push(NotMigratedReport {
                    id: doc.id,
                    title: doc.name.clone(),
                    legacy_type: doc.report_type_id,
                    reason,
                }),
            }
        }

        if !batch.is_empty() {
            self.store.put_batch(batch).await?;
        }
        info!(
            platform,
            migrated = outcome.migrated.len(),
            not_migrated = outcome.not_migrated.len(),
            "legacy migration finished"
        );
        Ok(outcome)
    }

    fn translate(&self, doc: &LegacyReportDoc) -> Result<ReportDefinition, SkipReason> {
        let Some(report_type) = legacy::report_type_for(doc.report_type_id) else {
            debug!(legacy_id = doc.id, legacy_type = doc.report_type_id, "unmapped legacy type");
            return Err(SkipReason::UnmappedType);
        };
        let report = reports::report_for(report_type, self.tenant).map_err(|err| {
            debug!(legacy_id = doc.id, error = %err, "skipping legacy report");
            SkipReason::FeatureDisabled
        })?;
        let definition = report
            .translator()
            .from_legacy(doc, self.tenant.platform(), doc.visibility.as_ref())
            .map_err(|err| {
                warn!(legacy_id = doc.id, %report_type, error = %err, "legacy report not translatable");
                SkipReason::Translation
            })?;

        let size = serde_json::to_vec(&definition)
            .map(|bytes| bytes.len())
            .map_err(|err| {
                warn!(legacy_id = doc.id, error = %err, "definition not serializable");
                SkipReason::Translation
            })?;
        if size > self.max_item_bytes {
            warn!(
                legacy_id = doc.id,
                size,
                limit = self.max_item_bytes,
                "migrated definition exceeds the item size limit"
            );
            return Err(SkipReason::TooLarge);
        }
        Ok(definition)
    }
}

impl std::fmt::Debug for Migrator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator")
            .field("platform", &self.tenant.platform())
            .field("max_item_bytes", &self.max_item_bytes)
            .finish_non_exhaustive()
    }
}
