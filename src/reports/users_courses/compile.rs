use crate::compiler::fields::{self, COURSE, LEARNER_LEVEL, USER};
use crate::compiler::{format, visibility, CompileError, CompileResult, CompileSession};
use crate::model::{EnrollmentField, EnrollmentStatus, FieldId, ReportType};
use crate::sql::expr::{case_when, lit_int, table_col, Expr, ExprExt};
use crate::sql::query::JoinType;

const ENROLLMENT: &str = "enrollment";

fn enrollment(column: &str) -> Expr {
    table_col(ENROLLMENT, column)
}

pub(super) async fn build_base(session: &mut CompileSession<'_>) -> CompileResult<()> {
    let users = session.users().await?;
    let courses = session.courses().await?;
    let definition = session.definition;

    let user = fields::user_source(session, &users)?;
    session.ctx.add_from(user);
    session.ctx.add_natural_key(USER, "idst");

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

fn enrollment_field(session: &mut CompileSession<'_>, field: EnrollmentField) -> Expr {
    let tz = session.timezone().to_string();
    match field {
        EnrollmentField::Level => format::labelled(
            enrollment("level"),
            &[
                (lit_int(LEARNER_LEVEL), "enrollment_level.student"),
                (lit_int(4), "enrollment_level.tutor"),
                (lit_int(6), "enrollment_level.instructor"),
            ],
            None,
            session.labels(),
        ),
        EnrollmentField::Status => format::labelled(
            enrollment("status"),
            &fields::enrollment_status_cases(),
            None,
            session.labels(),
        ),
        EnrollmentField::EnrollmentDate => format::datetime(enrollment("date_inscr"), &tz),
        EnrollmentField::FirstAccess => format::datetime(enrollment("date_first_access"), &tz),
        EnrollmentField::CompletionDate => format::datetime(enrollment("date_complete"), &tz),
        EnrollmentField::LastAccess => format::datetime(enrollment("date_last_access"), &tz),
        EnrollmentField::Score => enrollment("score_given"),
        EnrollmentField::ExpirationDate => format::date(enrollment("date_expire_validity")),
        EnrollmentField::SessionTime => {
            let total = fields::session_time(
                session,
                table_col(USER, "idst"),
                table_col(COURSE, "idcourse"),
            );
            format::duration(total)
        }
        EnrollmentField::Credits => case_when(
            vec![(
                enrollment("status").eq(lit_int(EnrollmentStatus::Completed.code())),
                table_col(COURSE, "credits"),
            )],
            Some(lit_int(0)),
        ),
    }
}

pub(super) fn field_expr(session: &mut CompileSession<'_>, field: FieldId) -> CompileResult<Expr> {
    Ok(match field {
        FieldId::User(f) => fields::user_field(session, f),
        FieldId::Course(f) => fields::course_field(session, f),
        FieldId::Enrollment(f) => enrollment_field(session, f),
        other => {
            return Err(CompileError::FieldNotSupported {
                field: other,
                report_type: ReportType::UsersCourses,
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::compiler::CompileOptions;
    use crate::context::fixture::{StaticTenant, VisibleIds};
    use crate::context::Collaborators;
    use crate::model::{
        CourseField, DateFilter, DateOperator, EnrollmentField, EnrollmentStatus, FieldId,
        ReportDefinition, ReportType, UserField,
    };
    use crate::reports::compile;
    use crate::sql::test_utils::validate_sql;
    use crate::sql::Dialect;
    use insta::assert_snapshot;

    fn definition() -> ReportDefinition {
        ReportDefinition::new(ReportType::UsersCourses, "r1", "Enrollments")
    }

    async fn sql(tenant: &StaticTenant, definition: &ReportDefinition, dialect: Dialect) -> String {
        let options = CompileOptions::default().with_dialect(dialect);
        compile(definition, &options, &Collaborators::from_single(tenant))
            .await
            .unwrap()
            .sql
    }

    #[tokio::test]
    async fn test_minimal_report() {
        let tenant = StaticTenant::new("acme");
        let sql = sql(&tenant, &definition(), Dialect::Redshift).await;
        assert_snapshot!(sql, @r#"
        SELECT
          SUBSTRING("user"."userid", 2) AS "Username",
          "course"."name" AS "Course Name"
        FROM "core_user" AS "user"
        INNER JOIN "learning_courseuser" AS "enrollment" ON "enrollment"."iduser" = "user"."idst"
        INNER JOIN "learning_course" AS "course" ON "course"."idcourse" = "enrollment"."idcourse"
        WHERE "user"."userid" <> '/Anonymous'
        ORDER BY "Username" ASC
        "#);
        validate_sql(&sql, Dialect::Redshift).unwrap();
    }

    #[tokio::test]
    async fn test_filters_compose_where() {
        let tenant = StaticTenant::new("acme");
        let mut def = definition();
        def.users.show_only_learners = true;
        def.enrollment.statuses = vec![EnrollmentStatus::Completed, EnrollmentStatus::InProgress];
        def.enrollment_date = DateFilter::relative(DateOperator::IsAfter, 30);
        let sql = sql(&tenant, &def, Dialect::Snowflake).await;
        assert!(sql.contains(
            "WHERE \"user\".\"userid\" <> '/Anonymous' AND \"enrollment\".\"level\" = 3 \
             AND \"enrollment\".\"status\" IN (2, 1) \
             AND \"enrollment\".\"date_inscr\" > DATEADD('day', -30, CURRENT_TIMESTAMP())"
        ));
    }

    #[tokio::test]
    async fn test_empty_visibility_returns_no_rows() {
        let tenant = StaticTenant::new("acme").with_visible(VisibleIds {
            courses: Some(vec![]),
            ..Default::default()
        });
        let sql = sql(&tenant, &definition(), Dialect::Redshift).await;
        assert!(sql.contains(
            "INNER JOIN (SELECT\n  *\nFROM \"learning_course\"\nWHERE false) AS \"course\""
        ));
    }

    #[tokio::test]
    async fn test_session_time_and_credits() {
        let tenant = StaticTenant::new("acme").with_all_features();
        let mut def = definition();
        def.fields.push(FieldId::Enrollment(EnrollmentField::SessionTime)).unwrap();
        def.fields.push(FieldId::Enrollment(EnrollmentField::Credits)).unwrap();
        def.fields.push(FieldId::Course(CourseField::Credits)).unwrap();
        let sql = sql(&tenant, &def, Dialect::Snowflake).await;
        assert!(sql.starts_with("WITH \"session_time\" AS ("));
        assert!(sql.contains(
            "CASE WHEN \"enrollment\".\"status\" = 2 THEN \"course\".\"credits\" ELSE 0 END AS \"Credits Earned\""
        ));
        assert_eq!(sql.matches("LEFT JOIN \"session_time\"").count(), 1);
    }

    #[tokio::test]
    async fn test_branch_fanout_groups_by_keys() {
        let tenant = StaticTenant::new("acme");
        let mut def = definition();
        def.fields.push(FieldId::User(UserField::BranchName)).unwrap();
        let sql = sql(&tenant, &def, Dialect::Redshift).await;
        assert!(sql.contains(
            "GROUP BY \"user\".\"idst\", \"course\".\"idcourse\", SUBSTRING(\"user\".\"userid\", 2), \"course\".\"name\""
        ));
        validate_sql(&sql, Dialect::Redshift).unwrap();
    }
}
