//! End-to-end compilation tests: definition → SQL for every report type.

use lms_reports::compiler::{CompileError, CompileOptions};
use lms_reports::context::fixture::StaticTenant;
use lms_reports::context::{AdditionalFieldDef, AdditionalFieldType, Collaborators};
use lms_reports::model::{
    AdditionalEntity, AdditionalFieldFilter, AdditionalFieldMatch, AdditionalFieldRef, CourseField,
    DateFilter, EnrollmentField, FieldId, FieldSetError,
    GroupField, LearningPlanField, ReportDefinition, ReportType, SortOrder, SortSelector,
    SortingOptions, StatsField, UserField,
};
use lms_reports::reports;
use lms_reports::sql::Dialect;
use sqlparser::dialect::{PostgreSqlDialect, SnowflakeDialect};
use sqlparser::parser::Parser;

fn assert_parses(sql: &str, dialect: Dialect) {
    let result = match dialect {
        Dialect::Redshift => Parser::parse_sql(&PostgreSqlDialect {}, sql),
        Dialect::Snowflake => Parser::parse_sql(&SnowflakeDialect {}, sql),
    };
    assert!(result.is_ok(), "invalid {} SQL: {:?}\n{}", dialect, result.err(), sql);
}

fn definition(report_type: ReportType, extra: &[FieldId]) -> ReportDefinition {
    let mut def = ReportDefinition::new(report_type, "r1", "Report");
    for field in extra {
        def.fields.push(*field).unwrap();
    }
    def
}

fn badge(id: u64) -> AdditionalFieldDef {
    AdditionalFieldDef {
        id,
        title: format!("Badge {}", id),
        field_type: AdditionalFieldType::Text,
    }
}

async fn compile(
    tenant: &StaticTenant,
    def: &ReportDefinition,
    options: &CompileOptions,
) -> Result<lms_reports::compiler::CompileOutput, CompileError> {
    reports::compile(def, options, &Collaborators::from_single(tenant)).await
}

// ============================================================================
// Join idempotence
// ============================================================================

#[tokio::test]
async fn test_shared_join_emitted_once() {
    let tenant = StaticTenant::new("acme")
        .with_additional_field(AdditionalEntity::User, badge(1), true)
        .with_additional_field(AdditionalEntity::User, badge(2), true);
    let def = definition(
        ReportType::UsersCourses,
        &[
            FieldId::Additional(AdditionalFieldRef::new(AdditionalEntity::User, 1)),
            FieldId::Additional(AdditionalFieldRef::new(AdditionalEntity::User, 2)),
            FieldId::Enrollment(EnrollmentField::SessionTime),
            FieldId::Enrollment(EnrollmentField::Status),
        ],
    );
    let options = CompileOptions::default().with_dialect(Dialect::Redshift);
    let sql = compile(&tenant, &def, &options).await.unwrap().sql;

    assert_eq!(sql.matches("JOIN \"core_user_field_value\"").count(), 1);
    assert_eq!(sql.matches("JOIN \"learning_courseuser\" AS").count(), 1);
    assert_eq!(sql.matches("\"session_time\" AS (").count(), 1);
    assert_parses(&sql, Dialect::Redshift);
}

#[tokio::test]
async fn test_learning_plan_progress_joined_once() {
    let tenant = StaticTenant::new("acme").with_all_features();
    let def = definition(
        ReportType::UsersLearningPlans,
        &[
            FieldId::LearningPlan(LearningPlanField::EnrollmentStatus),
            FieldId::LearningPlan(LearningPlanField::CompletionDate),
            FieldId::LearningPlan(LearningPlanField::CompletionPercentage),
        ],
    );
    let options = CompileOptions::default().with_dialect(Dialect::Snowflake);
    let sql = compile(&tenant, &def, &options).await.unwrap().sql;
    assert_eq!(sql.matches("LEFT JOIN \"lp_progress\"").count(), 1);
    assert_parses(&sql, Dialect::Snowflake);
}

// ============================================================================
// Field order and duplicates
// ============================================================================

#[tokio::test]
async fn test_select_order_follows_definition() {
    let tenant = StaticTenant::new("acme");
    let def = definition(
        ReportType::UsersCourses,
        &[
            FieldId::Enrollment(EnrollmentField::Score),
            FieldId::User(UserField::Email),
            FieldId::Course(CourseField::Code),
        ],
    );
    let output = compile(&tenant, &def, &CompileOptions::default()).await.unwrap();
    let aliases: Vec<&str> = output
        .query
        .select
        .iter()
        .filter_map(|s| s.alias.as_deref())
        .collect();
    assert_eq!(
        aliases,
        vec!["Username", "Course Name", "Final Score", "Email", "Course Code"]
    );
}

#[test]
fn test_duplicate_fields_rejected() {
    let mut def = definition(ReportType::UsersCourses, &[]);
    let err = def.fields.push(FieldId::User(UserField::Userid)).unwrap_err();
    assert_eq!(err, FieldSetError::Duplicate(FieldId::User(UserField::Userid)));

    let json = r#"{
        "id": "r1",
        "title": "Report",
        "reportType": "users-courses",
        "fields": ["user_userid", "course_name", "user_userid"]
    }"#;
    assert!(serde_json::from_str::<ReportDefinition>(json).is_err());
}

#[tokio::test]
async fn test_colliding_labels_get_unique_aliases() {
    let tenant = StaticTenant::new("acme").with_translation("user_email", "Username");
    let def = definition(ReportType::UsersCourses, &[FieldId::User(UserField::Email)]);
    let output = compile(&tenant, &def, &CompileOptions::default()).await.unwrap();
    let aliases: Vec<String> = output
        .query
        .select
        .iter()
        .filter_map(|s| s.alias.clone())
        .collect();
    assert_eq!(aliases.len(), 3);
    assert_ne!(aliases[0], aliases[2]);
}

// ============================================================================
// Percentages
// ============================================================================

#[tokio::test]
async fn test_percentages_guard_zero_denominator() {
    let tenant = StaticTenant::new("acme");
    let def = definition(
        ReportType::GroupsCourses,
        &[
            FieldId::Stats(StatsField::CompletedPercentage),
            FieldId::Stats(StatsField::InProgressPercentage),
        ],
    );
    let options = CompileOptions::default().with_dialect(Dialect::Redshift);
    let sql = compile(&tenant, &def, &options).await.unwrap().sql;
    assert_eq!(
        sql.matches("CASE WHEN COALESCE(COUNT(DISTINCT \"enrollment\".\"iduser\"), 0) = 0 THEN 0")
            .count(),
        2
    );
    assert_parses(&sql, Dialect::Redshift);
}

// ============================================================================
// Dialects
// ============================================================================

#[tokio::test]
async fn test_dialects_select_same_columns() {
    let tenant = StaticTenant::new("acme");
    let def = definition(
        ReportType::GroupsCourses,
        &[
            FieldId::Group(GroupField::MembersCount),
            FieldId::Course(CourseField::Code),
            FieldId::Stats(StatsField::UsersEnrolled),
        ],
    );
    let mut columns = Vec::new();
    for dialect in Dialect::ALL {
        let options = CompileOptions::default().with_dialect(dialect);
        let output = compile(&tenant, &def, &options).await.unwrap();
        assert_parses(&output.sql, dialect);
        let aliases: Vec<String> = output
            .query
            .select
            .iter()
            .filter_map(|s| s.alias.clone())
            .collect();
        columns.push(aliases);
    }
    assert_eq!(columns[0], columns[1]);
}

#[tokio::test]
async fn test_webinar_sessions_require_snowflake() {
    let tenant = StaticTenant::new("acme").with_all_features();
    let def = definition(ReportType::UsersWebinarSessions, &[]);

    let redshift = CompileOptions::default().with_dialect(Dialect::Redshift);
    let err = compile(&tenant, &def, &redshift).await.unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedDialect { .. }));
    assert!(err.to_string().contains("redshift"));

    let snowflake = CompileOptions::default().with_dialect(Dialect::Snowflake);
    let sql = compile(&tenant, &def, &snowflake).await.unwrap().sql;
    assert!(sql.contains("FROM \"core_user\" AS \"user\""));
}

// ============================================================================
// Literals and filters
// ============================================================================

#[tokio::test]
async fn test_filter_values_with_quotes_and_backslashes() {
    let tenant =
        StaticTenant::new("acme").with_additional_field(AdditionalEntity::User, badge(1), true);
    let mut def = definition(ReportType::UsersCourses, &[]);
    def.users.additional_fields = vec![AdditionalFieldFilter {
        field_id: AdditionalFieldRef::new(AdditionalEntity::User, 1),
        value: AdditionalFieldMatch::Equals(r"it's C:\".into()),
    }];

    let redshift = CompileOptions::default().with_dialect(Dialect::Redshift);
    let sql = compile(&tenant, &def, &redshift).await.unwrap().sql;
    assert!(sql.contains(r#""user_field_value"."field_1" = 'it''s C:\\'"#));
    assert_parses(&sql, Dialect::Redshift);

    let snowflake = CompileOptions::default().with_dialect(Dialect::Snowflake);
    let sql = compile(&tenant, &def, &snowflake).await.unwrap().sql;
    let literal = r"'it\'s C:\\'";
    assert!(sql.contains(&format!(r#""user_field_value"."field_1" = {}"#, literal)));
    assert_parses(&format!("SELECT {}", literal), Dialect::Snowflake);
}

#[tokio::test]
async fn test_incomplete_date_filter_fails_compilation() {
    let tenant = StaticTenant::new("acme");
    let blocks = [
        r#"{"any": false, "type": "relative", "days": 5}"#,
        r#"{"any": false, "type": "relative", "operator": "isAfter"}"#,
        r#"{"any": false, "type": "range"}"#,
    ];
    for block in blocks {
        let mut def = definition(ReportType::UsersCourses, &[]);
        def.enrollment_date = serde_json::from_str::<DateFilter>(block).unwrap();
        let options = CompileOptions::default().with_dialect(Dialect::Redshift);
        let err = compile(&tenant, &def, &options).await.unwrap_err();
        assert!(matches!(err, CompileError::InvalidDateFilter(_)), "{}", block);
    }

    let mut def = definition(ReportType::UsersCourses, &[]);
    def.enrollment_date =
        serde_json::from_str(r#"{"any": false, "type": "relative", "operator": "isAfter", "days": 5}"#)
            .unwrap();
    let options = CompileOptions::default().with_dialect(Dialect::Redshift);
    let sql = compile(&tenant, &def, &options).await.unwrap().sql;
    assert!(sql.contains("\"date_inscr\" > DATEADD(day, -5, GETDATE())"));
}

// ============================================================================
// Sorting and limits
// ============================================================================

#[tokio::test]
async fn test_preview_is_unsorted_and_limited() {
    let tenant = StaticTenant::new("acme").with_all_features();
    let mut def = definition(ReportType::UsersCertifications, &[]);
    def.sorting_options = Some(SortingOptions {
        selector: SortSelector::Custom,
        selected_field: Some(FieldId::User(UserField::Userid)),
        order_by: SortOrder::Desc,
    });

    let export = CompileOptions::default().with_limit(1000);
    let sql = compile(&tenant, &def, &export).await.unwrap().sql;
    assert!(sql.ends_with("ORDER BY \"Username\" DESC\nLIMIT 1000"));

    let preview = CompileOptions::default().with_limit(20).with_preview(true);
    let sql = compile(&tenant, &def, &preview).await.unwrap().sql;
    assert!(!sql.contains("ORDER BY"));
    assert!(sql.ends_with("LIMIT 20"));
}

#[tokio::test]
async fn test_every_report_type_compiles() {
    let tenant = StaticTenant::new("acme").with_all_features();
    for report_type in ReportType::ALL {
        let def = definition(report_type, &[]);
        let options = CompileOptions::default().with_dialect(Dialect::Snowflake);
        let output = compile(&tenant, &def, &options).await.unwrap();
        assert!(output.sql.starts_with("SELECT") || output.sql.starts_with("WITH"));
        assert_eq!(output.dialect, Dialect::Snowflake);
    }
}
