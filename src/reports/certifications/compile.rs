use crate::compiler::date_filter::dates_predicate;
use crate::compiler::fields::{self, USER};
use crate::compiler::{format, visibility, CompileError, CompileResult, CompileSession};
use crate::model::{CertificationField, CertificationsFilter, FieldId, ReportType};
use crate::sql::expr::{
    case_when, days_from_now, lit_bool, lit_int, lit_label, or_all, table_col, Expr, ExprExt,
};
use crate::sql::query::JoinType;

const ISSUED: &str = "issued";
const CERTIFICATION: &str = "certification";

fn issued(column: &str) -> Expr {
    table_col(ISSUED, column)
}

fn certification(column: &str) -> Expr {
    table_col(CERTIFICATION, column)
}

fn is_archived() -> Expr {
    issued("archived").eq(lit_int(1))
}

fn is_expired() -> Expr {
    issued("expiration_date")
        .is_not_null()
        .and(issued("expiration_date").lt(days_from_now(0)))
}

/// Restriction to the selected certification states, `None` when every state
/// is selected.
fn status_predicate(filter: &CertificationsFilter) -> Option<Expr> {
    if filter.active && filter.expired && filter.archived {
        return None;
    }
    let not_archived = issued("archived").eq(lit_int(0));
    let mut states = Vec::new();
    if filter.active {
        states.push(not_archived.clone().and(is_expired().paren().not()).paren());
    }
    if filter.expired {
        states.push(not_archived.and(is_expired()).paren());
    }
    if filter.archived {
        states.push(is_archived());
    }
    Some(or_all(states).unwrap_or_else(|| lit_bool(false)))
}

pub(super) async fn build_base(session: &mut CompileSession<'_>) -> CompileResult<()> {
    let users = session.users().await?;
    let certifications = session.certifications().await?;
    let definition = session.definition;

    let user = fields::user_source(session, &users)?;
    session.ctx.add_from(user);
    session.ctx.add_natural_key(USER, "idst");

    let table = session.table("certification_user").with_alias(ISSUED);
    session.ctx.add_join_once(
        ISSUED,
        JoinType::Inner,
        table,
        issued("id_user").eq(table_col(USER, "idst")),
    );
    let source = visibility::filtered_source(
        &session.ctx,
        "certification",
        CERTIFICATION,
        visibility::key_predicate("id_cert", &certifications)?
            .into_iter()
            .collect(),
    );
    session.ctx.add_join_once(
        CERTIFICATION,
        JoinType::Inner,
        source,
        certification("id_cert").eq(issued("id_cert")),
    );
    session.ctx.add_natural_key(ISSUED, "id");

    session.ctx.add_where(visibility::exclude_anonymous(USER));
    if let Some(predicate) = status_predicate(&definition.certifications) {
        session.ctx.add_where(predicate);
    }
    if let Some(predicate) = dates_predicate(
        &[
            (issued("on_datetime"), &definition.certification_date),
            (issued("expiration_date"), &definition.expiration_date),
        ],
        definition.conditions,
    )? {
        session.ctx.add_where(predicate);
    }
    Ok(())
}

fn certification_field(session: &mut CompileSession<'_>, field: CertificationField) -> Expr {
    let tz = session.timezone().to_string();
    match field {
        CertificationField::Title => certification("title"),
        CertificationField::Code => certification("code"),
        CertificationField::Description => certification("description"),
        CertificationField::Duration => certification("duration"),
        CertificationField::IssuedOn => format::datetime(issued("on_datetime"), &tz),
        CertificationField::ExpiresOn => format::datetime(issued("expiration_date"), &tz),
        CertificationField::Status => case_when(
            vec![
                (
                    is_archived(),
                    lit_label(&session.label("certification_status.archived")),
                ),
                (
                    is_expired(),
                    lit_label(&session.label("certification_status.expired")),
                ),
            ],
            Some(lit_label(&session.label("certification_status.active"))),
        ),
    }
}

pub(super) fn field_expr(session: &mut CompileSession<'_>, field: FieldId) -> CompileResult<Expr> {
    Ok(match field {
        FieldId::User(f) => fields::user_field(session, f),
        FieldId::Certification(f) => certification_field(session, f),
        other => {
            return Err(CompileError::FieldNotSupported {
                field: other,
                report_type: ReportType::UsersCertifications,
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompileOptions;
    use crate::context::fixture::StaticTenant;
    use crate::context::Collaborators;
    use crate::model::{DateFilter, DateOperator, Feature, ReportDefinition};
    use crate::reports::compile;
    use crate::sql::Dialect;

    #[test]
    fn test_status_predicate() {
        let all = CertificationsFilter {
            archived: true,
            ..Default::default()
        };
        assert_eq!(status_predicate(&all), None);

        let none = CertificationsFilter {
            active: false,
            expired: false,
            archived: false,
            ..Default::default()
        };
        assert_eq!(
            status_predicate(&none).map(|p| p.to_sql(Dialect::Snowflake)),
            Some("FALSE".to_string())
        );

        let archived_only = CertificationsFilter {
            active: false,
            expired: false,
            archived: true,
            ..Default::default()
        };
        assert_eq!(
            status_predicate(&archived_only).map(|p| p.to_sql(Dialect::Redshift)),
            Some("\"issued\".\"archived\" = 1".to_string())
        );
    }

    #[tokio::test]
    async fn test_default_filter_hides_archived() {
        let tenant = StaticTenant::new("acme").with_feature(Feature::Certifications);
        let mut def = ReportDefinition::new(ReportType::UsersCertifications, "c1", "Certs");
        def.fields
            .push(FieldId::Certification(CertificationField::Status))
            .unwrap();
        def.expiration_date = DateFilter::relative(DateOperator::IsBefore, 0);
        let options = CompileOptions::default().with_dialect(Dialect::Redshift);
        let sql = compile(&def, &options, &Collaborators::from_single(&tenant))
            .await
            .unwrap()
            .sql;
        assert!(sql.contains(
            "INNER JOIN \"certification\" AS \"certification\" ON \"certification\".\"id_cert\" = \"issued\".\"id_cert\""
        ));
        assert!(sql.contains("(\"issued\".\"archived\" = 0 AND NOT ("));
        assert!(sql.contains("AND \"issued\".\"expiration_date\" < DATEADD(day, 0, GETDATE())"));
        assert!(sql.contains("WHEN \"issued\".\"archived\" = 1 THEN 'Archived'"));
    }
}
