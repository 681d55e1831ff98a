//! One row per (user, webinar session) subscription. Sessions can have several
//! instructors; one of them is reported per row.

use crate::compiler::date_filter::dates_predicate;
use crate::compiler::fields::{self, COURSE, USER};
use crate::compiler::{format, visibility, CompileError, CompileResult, CompileSession};
use crate::model::{FieldId, ReportType, SessionField};
use crate::sql::expr::{case_when, first_value, lit_int, lit_label, table_col, Expr, ExprExt};
use crate::sql::query::JoinType;

const ATTENDANCE: &str = "attendance";
const SESSION: &str = "session";
const SESSION_INSTRUCTOR: &str = "session_instructor";
const INSTRUCTOR: &str = "instructor";

fn attendance(column: &str) -> Expr {
    table_col(ATTENDANCE, column)
}

fn webinar(column: &str) -> Expr {
    table_col(SESSION, column)
}

fn instructor_join(session: &mut CompileSession<'_>) {
    let link = session
        .table("webinar_session_instructor")
        .with_alias(SESSION_INSTRUCTOR);
    session.ctx.add_fanout_join_once(
        SESSION_INSTRUCTOR,
        JoinType::Left,
        link,
        table_col(SESSION_INSTRUCTOR, "id_session").eq(webinar("id_session")),
    );
    let user = session.table("core_user").with_alias(INSTRUCTOR);
    session.ctx.add_join_once(
        INSTRUCTOR,
        JoinType::Left,
        user,
        table_col(INSTRUCTOR, "idst").eq(table_col(SESSION_INSTRUCTOR, "id_user")),
    );
}

pub(super) async fn build_base(session: &mut CompileSession<'_>) -> CompileResult<()> {
    let users = session.users().await?;
    let courses = session.courses().await?;
    let sessions = session.sessions().await?;
    let definition = session.definition;

    let user = fields::user_source(session, &users)?;
    session.ctx.add_from(user);
    session.ctx.add_natural_key(USER, "idst");

    let table = session.table("webinar_session_user").with_alias(ATTENDANCE);
    session.ctx.add_join_once(
        ATTENDANCE,
        JoinType::Inner,
        table,
        attendance("id_user").eq(table_col(USER, "idst")),
    );
    let source = visibility::filtered_source(
        &session.ctx,
        "webinar_session",
        SESSION,
        visibility::key_predicate("id_session", &sessions)?
            .into_iter()
            .collect(),
    );
    session.ctx.add_join_once(
        SESSION,
        JoinType::Inner,
        source,
        webinar("id_session").eq(attendance("id_session")),
    );
    session.ctx.add_natural_key(SESSION, "id_session");

    let course = fields::course_source(session, &courses)?;
    session.ctx.add_join_once(
        COURSE,
        JoinType::Inner,
        course,
        table_col(COURSE, "idcourse").eq(webinar("course_id")),
    );

    session.ctx.add_where(visibility::exclude_anonymous(USER));
    if let Some(predicate) = dates_predicate(
        &[(webinar("date_begin"), &definition.session_date)],
        definition.conditions,
    )? {
        session.ctx.add_where(predicate);
    }
    Ok(())
}

fn session_field(session: &mut CompileSession<'_>, field: SessionField) -> Expr {
    let tz = session.timezone().to_string();
    match field {
        SessionField::Name => webinar("name"),
        SessionField::DateBegin => format::datetime(webinar("date_begin"), &tz),
        SessionField::DateEnd => format::datetime(webinar("date_end"), &tz),
        SessionField::Tool => webinar("tool"),
        SessionField::Instructor => {
            instructor_join(session);
            first_value(format::full_name(
                table_col(INSTRUCTOR, "firstname"),
                table_col(INSTRUCTOR, "lastname"),
            ))
        }
        SessionField::EnrollmentDate => format::datetime(attendance("date_subscribed"), &tz),
        SessionField::AttendanceStatus => case_when(
            vec![
                (
                    attendance("attended").eq(lit_int(1)),
                    lit_label(&session.label("attendance.present")),
                ),
                (
                    attendance("attended").eq(lit_int(0)),
                    lit_label(&session.label("attendance.absent")),
                ),
            ],
            Some(lit_label(&session.label("attendance.not_set"))),
        ),
    }
}

pub(super) fn field_expr(session: &mut CompileSession<'_>, field: FieldId) -> CompileResult<Expr> {
    Ok(match field {
        FieldId::User(f) => fields::user_field(session, f),
        FieldId::Course(f) => fields::course_field(session, f),
        FieldId::Session(f) => session_field(session, f),
        other => {
            return Err(CompileError::FieldNotSupported {
                field: other,
                report_type: ReportType::UsersWebinarSessions,
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompileOptions;
    use crate::context::fixture::{StaticTenant, VisibleIds};
    use crate::context::Collaborators;
    use crate::model::{Feature, ReportDefinition};
    use crate::reports::compile;
    use crate::sql::Dialect;

    fn tenant() -> StaticTenant {
        StaticTenant::new("acme").with_feature(Feature::Webinars)
    }

    fn definition(extra: &[FieldId]) -> ReportDefinition {
        let mut def = ReportDefinition::new(ReportType::UsersWebinarSessions, "w1", "Webinars");
        for field in extra {
            def.fields.push(*field).unwrap();
        }
        def
    }

    #[tokio::test]
    async fn test_redshift_is_unsupported() {
        let options = CompileOptions::default().with_dialect(Dialect::Redshift);
        let err = compile(&definition(&[]), &options, &Collaborators::from_single(&tenant()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnsupportedDialect {
                report_type: ReportType::UsersWebinarSessions,
                dialect: Dialect::Redshift,
            }
        ));
    }

    #[tokio::test]
    async fn test_instructor_collapses_fanout() {
        let tenant = tenant().with_visible(VisibleIds {
            sessions: Some(vec![3, 5]),
            ..Default::default()
        });
        let def = definition(&[
            FieldId::Session(SessionField::Instructor),
            FieldId::Session(SessionField::AttendanceStatus),
        ]);
        let options = CompileOptions::default().with_dialect(Dialect::Snowflake);
        let sql = compile(&def, &options, &Collaborators::from_single(&tenant))
            .await
            .unwrap()
            .sql;
        assert!(sql.contains("WHERE \"id_session\" IN (3, 5)) AS \"session\""));
        assert!(sql.contains("ANY_VALUE(TRIM("));
        assert!(sql.contains(
            "LEFT JOIN \"webinar_session_instructor\" AS \"session_instructor\""
        ));
        let group_by = sql.lines().find(|l| l.starts_with("GROUP BY")).unwrap();
        assert!(group_by.starts_with("GROUP BY \"user\".\"idst\", \"session\".\"id_session\""));
        assert!(!group_by.contains("ANY_VALUE"));
        assert!(sql.contains("ELSE 'Not set' END"));
    }
}
