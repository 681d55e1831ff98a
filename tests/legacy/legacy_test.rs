//! Legacy document translation through the report registry.

use lms_reports::compiler::CompileOptions;
use lms_reports::context::fixture::StaticTenant;
use lms_reports::context::Collaborators;
use lms_reports::legacy::{report_type_for, LegacyError};
use lms_reports::model::{
    DateFilter, DateOperator, FieldId, LegacyBranch, LegacyReportDoc, LegacyVisibilityRules,
    LegacyVisibilityType, ReportDefinition, StatsField, VisibilityType,
};
use lms_reports::reports;
use lms_reports::sql::Dialect;

fn doc(id: u64, report_type_id: u32, filter_data: &str) -> LegacyReportDoc {
    LegacyReportDoc {
        id,
        report_type_id,
        name: format!("Legacy {}", id),
        author_id: Some(12),
        creation_date: Some("2020-05-06 07:08:09".into()),
        last_edit_by: Some(13),
        last_edit_date: None,
        is_standard: false,
        filter_data: filter_data.into(),
        visibility: None,
    }
}

fn translate(tenant: &StaticTenant, doc: &LegacyReportDoc) -> Result<ReportDefinition, LegacyError> {
    let report_type = report_type_for(doc.report_type_id)
        .ok_or(LegacyError::UnmappedType(doc.report_type_id))?;
    let report = reports::report_for(report_type, tenant).unwrap();
    report
        .translator()
        .from_legacy(doc, tenant.platform.as_str(), doc.visibility.as_ref())
}

fn ndago(combobox: &str, days: u32) -> String {
    format!(
        r#"{{"filters": {{"start_date": {{"type": "ndago", "data": {{"combobox": "{}", "days_count": {}}}}}}}}}"#,
        combobox, days
    )
}

// ============================================================================
// Relative dates
// ============================================================================

#[test]
fn test_inclusive_more_recent_than_shifts_a_day() {
    let tenant = StaticTenant::new("acme");
    let def = translate(&tenant, &doc(1, 1, &ndago("<=", 5))).unwrap();
    assert_eq!(def.enrollment_date, DateFilter::relative(DateOperator::IsAfter, 6));
}

#[test]
fn test_inclusive_older_than_zero_days_stays_zero() {
    let tenant = StaticTenant::new("acme");
    let def = translate(&tenant, &doc(2, 1, &ndago(">=", 0))).unwrap();
    assert_eq!(def.enrollment_date, DateFilter::relative(DateOperator::IsBefore, 0));
}

#[test]
fn test_unknown_comparison_is_unrestricted() {
    let tenant = StaticTenant::new("acme");
    let def = translate(&tenant, &doc(3, 1, &ndago("!=", 5))).unwrap();
    assert!(def.enrollment_date.any);
}

// ============================================================================
// Documents
// ============================================================================

#[test]
fn test_authorship_and_visibility_carry_over() {
    let tenant = StaticTenant::new("acme");
    let mut legacy = doc(4, 1, r#"{"filters": {}}"#);
    legacy.visibility = Some(LegacyVisibilityRules {
        visibility_type: LegacyVisibilityType::Selection,
        users: vec![5],
        groups: vec![],
        branches: vec![LegacyBranch {
            id: 8,
            descendants: true,
        }],
    });
    let def = translate(&tenant, &legacy).unwrap();

    assert_eq!(def.platform, "acme");
    assert_eq!(def.title, "Legacy 4");
    assert_eq!(def.author, Some(12));
    assert_eq!(def.last_edit_by, Some(13));
    assert_eq!(def.imported_from_legacy_id, Some(4));
    assert_eq!(
        def.creation_date.map(|d| d.to_rfc3339()),
        Some("2020-05-06T07:08:09+00:00".to_string())
    );
    assert_eq!(
        def.visibility.visibility_type,
        VisibilityType::AllGodAdminsAndSelectedPowerUsers
    );
    assert_eq!(def.visibility.users, vec![5]);
    assert_eq!(def.visibility.branches[0].id, 8);
}

#[test]
fn test_each_translation_gets_a_fresh_id() {
    let tenant = StaticTenant::new("acme");
    let legacy = doc(5, 3, r#"{"filters": {}}"#);
    let first = translate(&tenant, &legacy).unwrap();
    let second = translate(&tenant, &legacy).unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(first.fields, second.fields);
}

#[test]
fn test_invalid_timestamp_fails() {
    let tenant = StaticTenant::new("acme");
    let mut legacy = doc(6, 1, r#"{"filters": {}}"#);
    legacy.creation_date = Some("yesterday".into());
    let err = translate(&tenant, &legacy).unwrap_err();
    assert!(matches!(err, LegacyError::InvalidTimestamp(raw) if raw == "yesterday"));
}

#[test]
fn test_malformed_filter_data_fails() {
    let tenant = StaticTenant::new("acme");
    let err = translate(&tenant, &doc(7, 1, "{not json")).unwrap_err();
    assert!(matches!(err, LegacyError::InvalidFilterData(_)));
}

#[test]
fn test_unmapped_type() {
    let tenant = StaticTenant::new("acme");
    let err = translate(&tenant, &doc(8, 4, r#"{"filters": {}}"#)).unwrap_err();
    assert!(matches!(err, LegacyError::UnmappedType(4)));
}

// ============================================================================
// Translate then compile
// ============================================================================

#[tokio::test]
async fn test_translated_group_report_compiles() {
    let tenant = StaticTenant::new("acme");
    let data = r#"{
        "fields": {"group": ["name", "members_count"], "stat": ["completed_percentage", "bogus"]},
        "order": {"field": "stat.completed_percentage", "direction": "desc"},
        "filters": {"enrollment_status": ["completed", "in_progress"]},
        "groups": {"all": false, "groups": ["5", 6]}
    }"#;
    let def = translate(&tenant, &doc(9, 3, data)).unwrap();
    assert!(def
        .fields
        .contains(&FieldId::Stats(StatsField::CompletedPercentage)));
    assert_eq!(def.groups.groups, vec![5, 6]);

    let options = CompileOptions::default().with_dialect(Dialect::Redshift);
    let output = reports::compile(&def, &options, &Collaborators::from_single(&tenant))
        .await
        .unwrap();
    assert!(output.sql.contains("ORDER BY \"Completed Users (%)\" DESC"));
    assert!(output
        .sql
        .contains("FROM \"core_group\"\nWHERE \"idst\" IN (5, 6)) AS \"group\""));
}
