//! Batch migration of legacy reports into the definition store.

use lms_reports::context::fixture::StaticTenant;
use lms_reports::migration::memory::{MemorySource, MemoryStore};
use lms_reports::migration::{LegacyFilter, MigrationError, Migrator, SkipReason};
use lms_reports::model::{Feature, LegacyReportDoc};

fn doc(id: u64, report_type_id: u32, filter_data: &str) -> LegacyReportDoc {
    LegacyReportDoc {
        id,
        report_type_id,
        name: format!("Report {}", id),
        author_id: None,
        creation_date: None,
        last_edit_by: None,
        last_edit_date: None,
        is_standard: false,
        filter_data: filter_data.into(),
        visibility: None,
    }
}

const MINIMAL: &str = r#"{"filters": {}}"#;

fn oversized() -> String {
    let users: Vec<String> = (1..=1000).map(|id| id.to_string()).collect();
    format!(
        r#"{{"filters": {{}}, "users": {{"all": false, "users": [{}]}}}}"#,
        users.join(", ")
    )
}

// ============================================================================
// Partial failure
// ============================================================================

#[tokio::test]
async fn test_failures_do_not_block_the_batch() {
    let tenant = StaticTenant::new("acme");
    let source = MemorySource::new(vec![
        doc(1, 1, r#"{"fields": {"user": ["email"]}}"#),
        doc(2, 1, &oversized()),
        doc(3, 1, MINIMAL),
    ]);
    let store = MemoryStore::new();
    let outcome = Migrator::new(&tenant, &source, &store)
        .with_max_item_bytes(3000)
        .migrate(LegacyFilter::default())
        .await
        .unwrap();

    assert_eq!(outcome.migrated.len(), 1);
    assert_eq!(outcome.migrated[0].legacy_id, 3);
    let reasons: Vec<(u64, SkipReason)> = outcome
        .not_migrated
        .iter()
        .map(|r| (r.id, r.reason))
        .collect();
    assert_eq!(
        reasons,
        vec![(1, SkipReason::Translation), (2, SkipReason::TooLarge)]
    );

    let stored = store.definitions().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, outcome.migrated[0].id);
    assert_eq!(stored[0].platform, "acme");
    assert_eq!(store.batches().await, 1);
}

#[tokio::test]
async fn test_unmapped_and_disabled_types_are_reported() {
    let tenant = StaticTenant::new("acme").with_feature(Feature::Ecommerce);
    let source = MemorySource::new(vec![
        doc(1, 2, MINIMAL),
        doc(2, 5, MINIMAL),
        doc(3, 8, MINIMAL),
    ]);
    let store = MemoryStore::new();
    let outcome = Migrator::new(&tenant, &source, &store)
        .migrate(LegacyFilter::default())
        .await
        .unwrap();

    assert_eq!(outcome.migrated.len(), 1);
    assert_eq!(outcome.migrated[0].legacy_id, 3);
    assert_eq!(outcome.not_migrated[0].reason, SkipReason::UnmappedType);
    assert_eq!(outcome.not_migrated[1].reason, SkipReason::FeatureDisabled);
    assert_eq!(outcome.not_migrated[1].legacy_type, 5);
}

// ============================================================================
// Idempotence and selection
// ============================================================================

#[tokio::test]
async fn test_second_run_skips_migrated_reports() {
    let tenant = StaticTenant::new("acme");
    let source = MemorySource::new(vec![doc(1, 1, MINIMAL), doc(2, 3, MINIMAL)]);
    let store = MemoryStore::new();
    let migrator = Migrator::new(&tenant, &source, &store);

    let first = migrator.migrate(LegacyFilter::default()).await.unwrap();
    assert_eq!(first.migrated.len(), 2);

    let second = migrator.migrate(LegacyFilter::default()).await.unwrap();
    assert!(second.migrated.is_empty());
    assert!(second.not_migrated.is_empty());
    assert_eq!(store.definitions().await.len(), 2);
    assert_eq!(store.batches().await, 1);
}

#[tokio::test]
async fn test_filter_selects_ids_and_types() {
    let tenant = StaticTenant::new("acme");
    let source = MemorySource::new(vec![
        doc(1, 1, MINIMAL),
        doc(2, 1, MINIMAL),
        doc(3, 3, MINIMAL),
    ]);
    let store = MemoryStore::new();
    let migrator = Migrator::new(&tenant, &source, &store);

    let by_id = migrator
        .migrate(LegacyFilter {
            ids: Some(vec![2]),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_id.migrated.len(), 1);
    assert_eq!(by_id.migrated[0].legacy_id, 2);

    let by_type = migrator
        .migrate(LegacyFilter {
            types: Some(vec![3]),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_type.migrated.len(), 1);
    assert_eq!(by_type.migrated[0].legacy_id, 3);
}

#[tokio::test]
async fn test_other_platforms_do_not_count_as_migrated() {
    let other = StaticTenant::new("other");
    let source = MemorySource::new(vec![doc(1, 1, MINIMAL)]);
    let store = MemoryStore::new();
    Migrator::new(&other, &source, &store)
        .migrate(LegacyFilter::default())
        .await
        .unwrap();

    let tenant = StaticTenant::new("acme");
    let outcome = Migrator::new(&tenant, &source, &store)
        .migrate(LegacyFilter::default())
        .await
        .unwrap();
    assert_eq!(outcome.migrated.len(), 1);
    assert_eq!(store.definitions().await.len(), 2);
}

// ============================================================================
// Store failures
// ============================================================================

#[tokio::test]
async fn test_store_failure_fails_the_run() {
    let tenant = StaticTenant::new("acme");
    let source = MemorySource::new(vec![doc(1, 1, MINIMAL)]);
    let store = MemoryStore::failing();
    let err = Migrator::new(&tenant, &source, &store)
        .migrate(LegacyFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MigrationError::Store(_)));
}

#[tokio::test]
async fn test_nothing_to_migrate_writes_nothing() {
    let tenant = StaticTenant::new("acme");
    let source = MemorySource::new(vec![doc(1, 4, MINIMAL)]);
    let store = MemoryStore::failing();
    let outcome = Migrator::new(&tenant, &source, &store)
        .migrate(LegacyFilter::default())
        .await
        .unwrap();
    assert!(outcome.migrated.is_empty());
    assert_eq!(outcome.not_migrated.len(), 1);
}
