//! Learning plan progress is derived from the enrollments in the plan's
//! courses, computed once per (user, plan) in the `lp_progress` CTE.

use crate::compiler::date_filter::dates_predicate;
use crate::compiler::fields::{self, USER};
use crate::compiler::{format, visibility, CompileError, CompileResult, CompileSession};
use crate::model::{EnrollmentStatus, FieldId, LearningPlanField, ReportType};
use crate::sql::expr::{
    case_when, count, lit_int, lit_label, max, sum, table_col, Expr, ExprExt,
};
use crate::sql::query::{JoinType, Query, TableRef};

const LP: &str = "lp";
const LP_ENROLLMENT: &str = "lp_enrollment";
const LP_PROGRESS: &str = "lp_progress";

fn lp(column: &str) -> Expr {
    table_col(LP, column)
}

fn lp_enrollment(column: &str) -> Expr {
    table_col(LP_ENROLLMENT, column)
}

fn progress(column: &str) -> Expr {
    table_col(LP_PROGRESS, column)
}

/// Courses and completed courses per plan enrollment.
fn progress_join(session: &mut CompileSession<'_>) {
    let body = Query::new()
        .select(vec![
            table_col("lp_user", "idUser").into(),
            table_col("lp_user", "id_path").into(),
            count(table_col("path_course", "id_item")).alias("courses"),
            sum(case_when(
                vec![(
                    table_col("course_enrollment", "status")
                        .eq(lit_int(EnrollmentStatus::Completed.code())),
                    lit_int(1),
                )],
                Some(lit_int(0)),
            ))
            .alias("completed"),
            max(table_col("course_enrollment", "date_complete")).alias("last_completion"),
        ])
        .from(session.table("learning_coursepath_user").with_alias("lp_user"))
        .inner_join(
            session
                .table("learning_coursepath_courses")
                .with_alias("path_course"),
            table_col("path_course", "id_path").eq(table_col("lp_user", "id_path")),
        )
        .left_join(
            session
                .table("learning_courseuser")
                .with_alias("course_enrollment"),
            table_col("course_enrollment", "iduser")
                .eq(table_col("lp_user", "idUser"))
                .and(
                    table_col("course_enrollment", "idcourse")
                        .eq(table_col("path_course", "id_item")),
                ),
        )
        .group_by(vec![
            table_col("lp_user", "idUser"),
            table_col("lp_user", "id_path"),
        ]);
    session.ctx.add_cte(LP_PROGRESS, body);
    session.ctx.add_join_once(
        LP_PROGRESS,
        JoinType::Left,
        TableRef::new(LP_PROGRESS).with_alias(LP_PROGRESS),
        progress("idUser")
            .eq(lp_enrollment("idUser"))
            .and(progress("id_path").eq(lp_enrollment("id_path"))),
    );
}

fn is_completed() -> Expr {
    progress("courses")
        .gt(lit_int(0))
        .and(progress("completed").gte(progress("courses")))
}

/// Timestamp the plan was completed at; NULL while it is not.
fn completion_timestamp() -> Expr {
    case_when(vec![(is_completed(), progress("last_completion"))], None)
}

pub(super) async fn build_base(session: &mut CompileSession<'_>) -> CompileResult<()> {
    let users = session.users().await?;
    let plans = session.learning_plans().await?;
    let definition = session.definition;

    let user = fields::user_source(session, &users)?;
    session.ctx.add_from(user);
    session.ctx.add_natural_key(USER, "idst");

    let table = session
        .table("learning_coursepath_user")
        .with_alias(LP_ENROLLMENT);
    session.ctx.add_join_once(
        LP_ENROLLMENT,
        JoinType::Inner,
        table,
        lp_enrollment("idUser").eq(table_col(USER, "idst")),
    );
    let source = visibility::filtered_source(
        &session.ctx,
        "learning_coursepath",
        LP,
        visibility::key_predicate("id_path", &plans)?.into_iter().collect(),
    );
    session.ctx.add_join_once(
        LP,
        JoinType::Inner,
        source,
        lp("id_path").eq(lp_enrollment("id_path")),
    );
    session.ctx.add_natural_key(LP, "id_path");

    session.ctx.add_where(visibility::exclude_anonymous(USER));
    if !definition.completion_date.any {
        progress_join(session);
    }
    if let Some(predicate) = dates_predicate(
        &[
            (lp_enrollment("date_assign"), &definition.enrollment_date),
            (completion_timestamp(), &definition.completion_date),
        ],
        definition.conditions,
    )? {
        session.ctx.add_where(predicate);
    }
    Ok(())
}

fn plan_field(session: &mut CompileSession<'_>, field: LearningPlanField) -> Expr {
    let tz = session.timezone().to_string();
    match field {
        LearningPlanField::Name => lp("path_name"),
        LearningPlanField::Code => lp("path_code"),
        LearningPlanField::Credits => lp("credits"),
        LearningPlanField::EnrollmentDate => format::datetime(lp_enrollment("date_assign"), &tz),
        LearningPlanField::CompletionDate => {
            progress_join(session);
            format::datetime(completion_timestamp(), &tz)
        }
        LearningPlanField::EnrollmentStatus => {
            progress_join(session);
            case_when(
                vec![
                    (is_completed(), lit_label(&session.label("lp_status.completed"))),
                    (
                        progress("completed").gt(lit_int(0)),
                        lit_label(&session.label("lp_status.in_progress")),
                    ),
                ],
                Some(lit_label(&session.label("lp_status.not_started"))),
            )
        }
        LearningPlanField::CompletionPercentage => {
            progress_join(session);
            format::percentage(progress("completed"), progress("courses"))
        }
    }
}

pub(super) fn field_expr(session: &mut CompileSession<'_>, field: FieldId) -> CompileResult<Expr> {
    Ok(match field {
        FieldId::User(f) => fields::user_field(session, f),
        FieldId::LearningPlan(f) => plan_field(session, f),
        other => {
            return Err(CompileError::FieldNotSupported {
                field: other,
                report_type: ReportType::UsersLearningPlans,
            })
        }
    })
}
