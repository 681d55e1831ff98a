//! Rows are (group, course) pairs; statistics aggregate the enrollments of
//! the group's members in the course.

use crate::compiler::fields::{self, COURSE, USER};
use crate::compiler::{format, visibility, CompileError, CompileResult, CompileSession};
use crate::model::{EnrollmentStatus, FieldId, GroupField, ReportType, StatsField};
use crate::sql::expr::{
    case_when, coalesce, col, count, count_distinct, lit_int, sum, table_col, Expr, ExprExt,
};
use crate::sql::query::{JoinType, Query, TableRef};

const GROUP: &str = "group";
const MEMBER: &str = "member";
const ENROLLMENT: &str = "enrollment";
const GROUP_MEMBERS: &str = "group_members";

fn enrollment(column: &str) -> Expr {
    table_col(ENROLLMENT, column)
}

pub(super) async fn build_base(session: &mut CompileSession<'_>) -> CompileResult<()> {
    let groups = session.groups().await?;
    let users = session.users().await?;
    let courses = session.courses().await?;
    let definition = session.definition;

    let group = visibility::filtered_source(
        &session.ctx,
        "core_group",
        GROUP,
        visibility::key_predicate("idst", &groups)?.into_iter().collect(),
    );
    session.ctx.add_from(group);
    session.ctx.add_natural_key(GROUP, "idst");

    let member = session.table("core_group_members").with_alias(MEMBER);
    session.ctx.add_fanout_join_once(
        MEMBER,
        JoinType::Inner,
        member,
        table_col(MEMBER, "idst").eq(table_col(GROUP, "idst")),
    );
    let user = fields::user_source(session, &users)?;
    session.ctx.add_join_once(
        USER,
        JoinType::Inner,
        user,
        table_col(USER, "idst").eq(table_col(MEMBER, "idstMember")),
    );
    let table = session.table("learning_courseuser").with_alias(ENROLLMENT);
    session.ctx.add_join_once(
        ENROLLMENT,
        JoinType::Inner,
        table,
        enrollment("iduser").eq(table_col(USER, "idst")),
    );
    let course = fields::course_source(session, &courses)?;
    session.ctx.add_join_once(
        COURSE,
        JoinType::Inner,
        course,
        table_col(COURSE, "idcourse").eq(enrollment("idcourse")),
    );
    session.ctx.add_natural_key(COURSE, "idcourse");

    session.ctx.add_where(visibility::exclude_anonymous(USER));
    for predicate in fields::enrollment_predicates(definition, ENROLLMENT)? {
        session.ctx.add_where(predicate);
    }
    Ok(())
}

/// Distinct members whose enrollment has `status`.
fn users_with_status(status: EnrollmentStatus) -> Expr {
    count_distinct(case_when(
        vec![(
            enrollment("status").eq(lit_int(status.code())),
            enrollment("iduser"),
        )],
        None,
    ))
}

fn users_enrolled() -> Expr {
    count_distinct(enrollment("iduser"))
}

fn members_count(session: &mut CompileSession<'_>) -> Expr {
    let body = Query::new()
        .select(vec![
            col("idst").into(),
            count(col("idstMember")).alias("members"),
        ])
        .from(session.table("core_group_members"))
        .group_by(vec![col("idst")]);
    session.ctx.add_cte(GROUP_MEMBERS, body);
    session.ctx.add_join_once(
        GROUP_MEMBERS,
        JoinType::Left,
        TableRef::new(GROUP_MEMBERS).with_alias(GROUP_MEMBERS),
        table_col(GROUP_MEMBERS, "idst").eq(table_col(GROUP, "idst")),
    );
    coalesce(vec![table_col(GROUP_MEMBERS, "members"), lit_int(0)])
}

fn stats_field(session: &mut CompileSession<'_>, field: StatsField) -> Expr {
    match field {
        StatsField::UsersEnrolled => users_enrolled(),
        StatsField::Completed => users_with_status(EnrollmentStatus::Completed),
        StatsField::InProgress => users_with_status(EnrollmentStatus::InProgress),
        StatsField::NotStarted => users_with_status(EnrollmentStatus::Subscribed),
        StatsField::CompletedPercentage => format::percentage(
            users_with_status(EnrollmentStatus::Completed),
            users_enrolled(),
        ),
        StatsField::InProgressPercentage => format::percentage(
            users_with_status(EnrollmentStatus::InProgress),
            users_enrolled(),
        ),
        StatsField::NotStartedPercentage => format::percentage(
            users_with_status(EnrollmentStatus::Subscribed),
            users_enrolled(),
        ),
        StatsField::TotalSessionTime => {
            let total = fields::session_time(
                session,
                table_col(USER, "idst"),
                table_col(COURSE, "idcourse"),
            );
            format::duration(sum(total))
        }
    }
}

pub(super) fn field_expr(session: &mut CompileSession<'_>, field: FieldId) -> CompileResult<Expr> {
    Ok(match field {
        FieldId::Group(GroupField::Name) => format::username(table_col(GROUP, "groupid")),
        FieldId::Group(GroupField::MembersCount) => members_count(session),
        FieldId::Course(f) => fields::course_field(session, f),
        FieldId::Stats(f) => stats_field(session, f),
        other => {
            return Err(CompileError::FieldNotSupported {
                field: other,
                report_type: ReportType::GroupsCourses,
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::compiler::{CompileError, CompileOptions};
    use crate::context::fixture::StaticTenant;
    use crate::context::Collaborators;
    use crate::model::{
        CourseField, FieldId, GroupField, ReportDefinition, ReportType, StatsField, UserField,
    };
    use crate::reports::compile;
    use crate::sql::test_utils::validate_sql;
    use crate::sql::Dialect;

    fn definition(extra: &[FieldId]) -> ReportDefinition {
        let mut def = ReportDefinition::new(ReportType::GroupsCourses, "g1", "Groups");
        for field in extra {
            def.fields.push(*field).unwrap();
        }
        def
    }

    async fn sql(definition: &ReportDefinition, dialect: Dialect) -> String {
        let tenant = StaticTenant::new("acme");
        let options = CompileOptions::default().with_dialect(dialect);
        compile(definition, &options, &Collaborators::from_single(&tenant))
            .await
            .unwrap()
            .sql
    }

    #[tokio::test]
    async fn test_always_grouped_by_group_and_course() {
        let sql = sql(&definition(&[]), Dialect::Redshift).await;
        assert!(sql.contains(
            "GROUP BY \"group\".\"idst\", \"course\".\"idcourse\", SUBSTRING(\"group\".\"groupid\", 2), \"course\".\"name\""
        ));
        assert!(sql.contains("INNER JOIN \"core_group_members\" AS \"member\" ON \"member\".\"idst\" = \"group\".\"idst\""));
        validate_sql(&sql, Dialect::Redshift).unwrap();
    }

    #[tokio::test]
    async fn test_percentage_guards_zero_enrollments() {
        let def = definition(&[FieldId::Stats(StatsField::CompletedPercentage)]);
        let sql = sql(&def, Dialect::Snowflake).await;
        assert!(sql.contains(
            "CASE WHEN COALESCE(COUNT(DISTINCT \"enrollment\".\"iduser\"), 0) = 0 THEN 0 ELSE ROUND("
        ));
        assert!(sql.contains(
            "COUNT(DISTINCT CASE WHEN \"enrollment\".\"status\" = 2 THEN \"enrollment\".\"iduser\" END)"
        ));
    }

    #[tokio::test]
    async fn test_stats_are_not_grouped() {
        let def = definition(&[
            FieldId::Stats(StatsField::UsersEnrolled),
            FieldId::Stats(StatsField::TotalSessionTime),
            FieldId::Group(GroupField::MembersCount),
        ]);
        let sql = sql(&def, Dialect::Redshift).await;
        let group_by = sql.lines().find(|l| l.starts_with("GROUP BY")).unwrap();
        assert!(!group_by.contains("COUNT"));
        assert!(!group_by.contains("SUM"));
        assert!(group_by.contains("COALESCE(\"group_members\".\"members\", 0)"));
        assert!(sql.starts_with("WITH \"group_members\" AS ("));
        assert_eq!(sql.matches("\"session_time\" AS (").count(), 1);
    }

    #[tokio::test]
    async fn test_user_fields_are_rejected() {
        let tenant = StaticTenant::new("acme");
        let mut def = definition(&[]);
        def.fields.push(FieldId::User(UserField::Email)).unwrap();
        let err = compile(&def, &CompileOptions::default(), &Collaborators::from_single(&tenant))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::FieldNotSupported {
                field: FieldId::User(UserField::Email),
                report_type: ReportType::GroupsCourses,
            }
        ));
        assert!(def.fields.contains(&FieldId::Course(CourseField::Name)));
    }
}
