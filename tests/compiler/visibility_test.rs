//! Visibility resolution and collaborator lookups during compilation.

use lms_reports::compiler::{CompileError, CompileOptions};
use lms_reports::context::fixture::{StaticTenant, VisibleIds};
use lms_reports::context::{AdditionalFieldDef, AdditionalFieldType, Collaborators};
use lms_reports::model::{
    AdditionalEntity, AdditionalFieldRef, FieldId, ReportDefinition, ReportType,
};
use lms_reports::reports;
use lms_reports::sql::Dialect;

fn definition() -> ReportDefinition {
    ReportDefinition::new(ReportType::UsersCourses, "r1", "Enrollments")
}

async fn compile_sql(
    tenant: &StaticTenant,
    def: &ReportDefinition,
    options: &CompileOptions,
) -> String {
    reports::compile(def, options, &Collaborators::from_single(tenant))
        .await
        .unwrap()
        .sql
}

// ============================================================================
// Restricted selections
// ============================================================================

#[tokio::test]
async fn test_unrestricted_user_reads_plain_tables() {
    let tenant = StaticTenant::new("acme");
    let options = CompileOptions::default().with_dialect(Dialect::Redshift);
    let sql = compile_sql(&tenant, &definition(), &options).await;
    assert!(sql.contains("FROM \"core_user\" AS \"user\""));
    assert!(sql.contains("INNER JOIN \"learning_course\" AS \"course\""));
}

#[tokio::test]
async fn test_empty_visible_set_yields_false() {
    let tenant = StaticTenant::new("acme").with_visible(VisibleIds {
        courses: Some(vec![]),
        ..Default::default()
    });
    let options = CompileOptions::default().with_dialect(Dialect::Redshift);
    let sql = compile_sql(&tenant, &definition(), &options).await;
    assert!(sql.contains("FROM \"learning_course\"\nWHERE false) AS \"course\""));
    assert!(!sql.contains("\"idcourse\" IN"));
}

#[tokio::test]
async fn test_requested_ids_intersect_visible_ids() {
    let tenant = StaticTenant::new("acme").with_visible(VisibleIds {
        courses: Some(vec![1, 2, 3]),
        ..Default::default()
    });
    let mut def = definition();
    def.courses.all = false;
    def.courses.courses = vec![2, 3, 7];
    let options = CompileOptions::default().with_dialect(Dialect::Snowflake);
    let sql = compile_sql(&tenant, &def, &options).await;
    assert!(sql.contains("WHERE \"idcourse\" IN (2, 3)) AS \"course\""));
}

#[tokio::test]
async fn test_visibility_check_can_be_skipped() {
    let tenant = StaticTenant::new("acme").with_visible(VisibleIds {
        users: Some(vec![]),
        ..Default::default()
    });
    let options = CompileOptions::default()
        .with_dialect(Dialect::Redshift)
        .with_check_visibility(false);
    let sql = compile_sql(&tenant, &definition(), &options).await;
    assert!(sql.contains("FROM \"core_user\" AS \"user\""));
    assert!(!sql.contains("WHERE false"));
}

#[tokio::test]
async fn test_group_members_expand_user_selection() {
    let tenant = StaticTenant::new("acme").with_group_members(5, vec![100, 101]);
    let mut def = definition();
    def.users.all = false;
    def.users.users = vec![7];
    def.users.groups = vec![5];
    let options = CompileOptions::default().with_dialect(Dialect::Redshift);
    let sql = compile_sql(&tenant, &def, &options).await;
    assert!(sql.contains("\"idst\" IN (7, 100, 101)"));
}

// ============================================================================
// Lookup counts
// ============================================================================

#[tokio::test]
async fn test_each_selection_resolved_once() {
    let tenant = StaticTenant::new("acme");
    let options = CompileOptions::default();
    compile_sql(&tenant, &definition(), &options).await;
    assert_eq!(tenant.calls().visibility(), 2);
}

#[tokio::test]
async fn test_additional_catalogue_fetched_once_per_entity() {
    let field = |id: u64| AdditionalFieldDef {
        id,
        title: format!("Field {}", id),
        field_type: AdditionalFieldType::Text,
    };
    let tenant = StaticTenant::new("acme")
        .with_additional_field(AdditionalEntity::User, field(1), true)
        .with_additional_field(AdditionalEntity::User, field(2), true)
        .with_additional_field(AdditionalEntity::User, field(3), true);
    let mut def = definition();
    for id in 1..=3 {
        def.fields
            .push(FieldId::Additional(AdditionalFieldRef::new(AdditionalEntity::User, id)))
            .unwrap();
    }
    compile_sql(&tenant, &def, &CompileOptions::default()).await;
    assert_eq!(tenant.calls().fields(), 1);
    assert_eq!(tenant.calls().materialized(), 1);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_unavailable_resolver_fails_compilation() {
    let tenant = StaticTenant::new("acme").unavailable();
    let err = reports::compile(
        &definition(),
        &CompileOptions::default(),
        &Collaborators::from_single(&tenant),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CompileError::Context(_)));
}

#[tokio::test]
async fn test_disabled_report_type_is_rejected() {
    let tenant = StaticTenant::new("acme");
    let def = ReportDefinition::new(ReportType::UsersCertifications, "r2", "Certifications");
    let err = reports::compile(
        &def,
        &CompileOptions::default(),
        &Collaborators::from_single(&tenant),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CompileError::Disabled(_)));
}
