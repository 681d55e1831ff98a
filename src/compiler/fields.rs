//! Field expressions shared by several report types.
//!
//! Every report that exposes user or course columns reads them from the same
//! aliases (`"user"` over `core_user`, `"course"` over `learning_course`), so
//! the expressions and their join dependencies are defined once here.

use crate::model::{CourseField, EnrollmentStatus, IdSelection, ReportDefinition, UserField};
use crate::sql::expr::{col, days_from_now, first_value, lit_int, lit_str, sum, table_col, Expr, ExprExt};
use crate::sql::query::{JoinType, Query, TableRef};

use super::date_filter::dates_predicate;
use super::{format, visibility, CompileResult, CompileSession};

pub const USER: &str = "user";
pub const COURSE: &str = "course";
pub const SESSION_TIME: &str = "session_time";

/// Course enrollment level of learners.
pub const LEARNER_LEVEL: i64 = 3;

fn user(column: &str) -> Expr {
    table_col(USER, column)
}

fn course(column: &str) -> Expr {
    table_col(COURSE, column)
}

/// `core_user` restricted to `users`, and to active accounts when the
/// definition hides deactivated users.
pub fn user_source(session: &CompileSession<'_>, users: &IdSelection) -> CompileResult<TableRef> {
    let mut predicates: Vec<Expr> = visibility::key_predicate("idst", users)?.into_iter().collect();
    if session.definition.users.hide_deactivated {
        predicates.push(col("valid").eq(lit_int(1)));
    }
    Ok(visibility::filtered_source(&session.ctx, "core_user", USER, predicates))
}

/// `learning_course` restricted to `courses`, and to courses that have not
/// ended when the definition hides expired courses.
pub fn course_source(
    session: &CompileSession<'_>,
    courses: &IdSelection,
) -> CompileResult<TableRef> {
    let mut predicates: Vec<Expr> = visibility::key_predicate("idcourse", courses)?
        .into_iter()
        .collect();
    if session.definition.courses.hide_expired {
        predicates.push(
            col("date_end")
                .is_null()
                .or(col("date_end").gte(days_from_now(0)))
                .paren(),
        );
    }
    Ok(visibility::filtered_source(&session.ctx, "learning_course", COURSE, predicates))
}

/// Learner-only, status and date restrictions on a `learning_courseuser`
/// alias.
pub fn enrollment_predicates(
    definition: &ReportDefinition,
    alias: &str,
) -> CompileResult<Vec<Expr>> {
    let mut predicates = Vec::new();
    if definition.users.show_only_learners {
        predicates.push(table_col(alias, "level").eq(lit_int(LEARNER_LEVEL)));
    }
    if !definition.enrollment.statuses.is_empty() {
        let codes = definition
            .enrollment
            .statuses
            .iter()
            .map(|s| lit_int(s.code()))
            .collect();
        predicates.push(table_col(alias, "status").in_list(codes));
    }
    predicates.extend(dates_predicate(
        &[
            (table_col(alias, "date_inscr"), &definition.enrollment_date),
            (table_col(alias, "date_complete"), &definition.completion_date),
        ],
        definition.conditions,
    )?);
    Ok(predicates)
}

/// Enrollment status code with its label key, for CASE rendering.
pub fn enrollment_status_cases() -> Vec<(Expr, &'static str)> {
    EnrollmentStatus::ALL
        .iter()
        .map(|s| (lit_int(s.code()), s.label_key()))
        .collect()
}

/// Branch (org chart node) names of the user; one-to-many.
fn branch_name(session: &mut CompileSession<'_>) -> Expr {
    let member = session.table("core_group_members").with_alias("branch_member");
    session.ctx.add_fanout_join_once(
        "branch_member",
        JoinType::Left,
        member,
        table_col("branch_member", "idstMember").eq(user("idst")),
    );
    let tree = session.table("core_org_chart_tree").with_alias("branch");
    session.ctx.add_join_once(
        "branch",
        JoinType::Left,
        tree,
        table_col("branch", "idst_oc").eq(table_col("branch_member", "idst")),
    );
    let name = session.table("core_org_chart").with_alias("branch_name");
    let language = lit_str(session.language());
    session.ctx.add_join_once(
        "branch_name",
        JoinType::Left,
        name,
        table_col("branch_name", "id_dir")
            .eq(table_col("branch", "idorg"))
            .and(table_col("branch_name", "lang_code").eq(language)),
    );
    first_value(table_col("branch_name", "translation"))
}

/// Expression of a user field over the `"user"` alias.
pub fn user_field(session: &mut CompileSession<'_>, field: UserField) -> Expr {
    let tz = session.timezone().to_string();
    match field {
        UserField::Userid => format::username(user("userid")),
        UserField::Firstname => user("firstname"),
        UserField::Lastname => user("lastname"),
        UserField::Fullname => format::full_name(user("firstname"), user("lastname")),
        UserField::Email => user("email"),
        UserField::Level => format::labelled(
            user("level"),
            &[
                (lit_str("/framework/level/godadmin"), "user_level.godadmin"),
                (lit_str("/framework/level/admin"), "user_level.admin"),
            ],
            Some("user_level.user"),
            session.labels(),
        ),
        UserField::RegisterDate => format::datetime(user("register_date"), &tz),
        UserField::LastAccessDate => format::datetime(user("lastenter"), &tz),
        UserField::ExpirationDate => format::date(user("expiration")),
        UserField::Deactivated => format::yes_no(user("valid").eq(lit_int(0)), session.labels()),
        UserField::SuspendDate => format::datetime(user("suspend_date"), &tz),
        UserField::BranchName => branch_name(session),
    }
}

/// Expression of a course field over the `"course"` alias.
pub fn course_field(session: &mut CompileSession<'_>, field: CourseField) -> Expr {
    let tz = session.timezone().to_string();
    match field {
        CourseField::Id => course("idcourse"),
        CourseField::Code => course("code"),
        CourseField::Name => course("name"),
        CourseField::Type => format::labelled(
            course("course_type"),
            &[
                (lit_str("elearning"), "course_type.elearning"),
                (lit_str("classroom"), "course_type.classroom"),
                (lit_str("webinar"), "course_type.webinar"),
            ],
            None,
            session.labels(),
        ),
        CourseField::Status => format::labelled(
            course("status"),
            &[
                (lit_int(0), "course_status.under_maintenance"),
                (lit_int(2), "course_status.published"),
            ],
            None,
            session.labels(),
        ),
        CourseField::Credits => course("credits"),
        CourseField::CreationDate => format::datetime(course("create_date"), &tz),
        CourseField::DateBegin => format::date(course("date_begin")),
        CourseField::DateEnd => format::date(course("date_end")),
        CourseField::Category => {
            let category = session.table("learning_category").with_alias("category");
            let language = lit_str(session.language());
            session.ctx.add_join_once(
                "category",
                JoinType::Left,
                category,
                table_col("category", "idcategory")
                    .eq(course("idcategory"))
                    .and(table_col("category", "lang_code").eq(language)),
            );
            table_col("category", "translation")
        }
        CourseField::Language => course("lang_code"),
    }
}

/// Training-material time per user and course, joined on both keys.
///
/// Returns the total seconds column.
pub fn session_time(session: &mut CompileSession<'_>, user_key: Expr, course_key: Expr) -> Expr {
    let body = Query::new()
        .select(vec![
            col("iduser").into(),
            col("idcourse").into(),
            sum(col("total_time")).alias("total_time"),
        ])
        .from(session.table("learning_tracksession"))
        .group_by(vec![col("iduser"), col("idcourse")]);
    session.ctx.add_cte(SESSION_TIME, body);
    session.ctx.add_join_once(
        SESSION_TIME,
        JoinType::Left,
        TableRef::new(SESSION_TIME).with_alias(SESSION_TIME),
        table_col(SESSION_TIME, "iduser")
            .eq(user_key)
            .and(table_col(SESSION_TIME, "idcourse").eq(course_key)),
    );
    table_col(SESSION_TIME, "total_time")
}
