//! Tenant-defined additional fields.
//!
//! Values of user, course and learning-plan fields live in one wide table per
//! entity (`field_<id>` columns); enrollment and session values live in a JSON
//! column of the owning row. Fields the catalogue does not know, or whose
//! column is not materialised for the platform, render as an empty string.

use tracing::{debug, warn};

use crate::context::AdditionalFieldType;
use crate::model::{AdditionalEntity, AdditionalFieldFilter, AdditionalFieldMatch, AdditionalFieldRef, FieldId};
use crate::sql::expr::{
    case_of, cast, col, json_extract, lit_bool, lit_int, lit_label, lit_str, table_col, Expr,
    ExprExt,
};
use crate::sql::query::{JoinType, Query, TableRef};

use super::{date_filter, format, visibility, CompileError, CompileResult, CompileSession};

const DROPDOWN_CTE: &str = "dropdown_translations";

/// Escape character for `Contains` patterns. Not a string-literal escape on
/// either back-end, so the pattern survives quoting unchanged.
const LIKE_ESCAPE: char = '!';

enum Storage {
    /// One row per owner, one column per field.
    Table {
        table: &'static str,
        alias: &'static str,
        key: &'static str,
        owner: &'static str,
        owner_key: &'static str,
    },
    /// JSON object column on the owner row, keyed by field id.
    Json {
        owner: &'static str,
        column: &'static str,
    },
}

fn storage(entity: AdditionalEntity) -> Storage {
    match entity {
        AdditionalEntity::User => Storage::Table {
            table: "core_user_field_value",
            alias: "user_field_value",
            key: "id_user",
            owner: "user",
            owner_key: "idst",
        },
        AdditionalEntity::Course => Storage::Table {
            table: "learning_course_field_value",
            alias: "course_field_value",
            key: "id_course",
            owner: "course",
            owner_key: "idcourse",
        },
        AdditionalEntity::LearningPlan => Storage::Table {
            table: "learning_coursepath_field_value",
            alias: "lp_field_value",
            key: "id_path",
            owner: "lp",
            owner_key: "id_path",
        },
        AdditionalEntity::Enrollment => Storage::Json {
            owner: "enrollment",
            column: "enrollment_fields",
        },
        AdditionalEntity::Session => Storage::Json {
            owner: "session",
            column: "additional_fields",
        },
    }
}

/// Raw stored value of a field; joins the value table on first use.
fn stored_value(session: &mut CompileSession<'_>, reference: AdditionalFieldRef) -> Expr {
    match storage(reference.entity) {
        Storage::Table {
            table,
            alias,
            key,
            owner,
            owner_key,
        } => {
            let source = session.table(table).with_alias(alias);
            session.ctx.add_join_once(
                alias,
                JoinType::Left,
                source,
                table_col(alias, key).eq(table_col(owner, owner_key)),
            );
            table_col(alias, &format!("field_{}", reference.id))
        }
        Storage::Json { owner, column } => {
            json_extract(table_col(owner, column), &[&reference.id.to_string()])
        }
    }
}

fn as_integer(value: Expr) -> Expr {
    cast(value, "INTEGER")
}

fn dropdown_label(session: &mut CompileSession<'_>, key: &str, value: Expr) -> Expr {
    let body = Query::new()
        .select(vec![col("id_option"), col("translation")])
        .from(session.table("core_field_dropdown_translations"))
        .filter(col("lang_code").eq(lit_str(session.language())));
    session.ctx.add_cte(DROPDOWN_CTE, body);

    let alias = format!("{}_option", key);
    session.ctx.add_join_once(
        alias.clone(),
        JoinType::Left,
        TableRef::new(DROPDOWN_CTE).with_alias(&alias),
        table_col(&alias, "id_option").eq(as_integer(value)),
    );
    table_col(&alias, "translation")
}

fn country_name(session: &mut CompileSession<'_>, key: &str, value: Expr) -> Expr {
    let alias = format!("{}_country", key);
    let source = session.table("core_country").with_alias(&alias);
    session.ctx.add_join_once(
        alias.clone(),
        JoinType::Left,
        source,
        table_col(&alias, "id_country").eq(as_integer(value)),
    );
    table_col(&alias, "name_country")
}

/// Select expression and label of an additional field.
pub async fn field_expr(
    session: &mut CompileSession<'_>,
    reference: AdditionalFieldRef,
) -> CompileResult<(Expr, String)> {
    let key = reference.key();
    let Some(def) = session
        .additional_field(reference.entity, reference.id)
        .await?
    else {
        warn!(field = %key, "additional field is not in the tenant catalogue");
        return Ok((lit_str(""), key));
    };
    if !session
        .is_materialized(reference.entity, reference.id)
        .await?
    {
        debug!(field = %key, "additional field is not materialised");
        return Ok((lit_str(""), def.title));
    }

    let value = stored_value(session, reference);
    let expr = match def.field_type {
        AdditionalFieldType::Text | AdditionalFieldType::Textarea => value,
        AdditionalFieldType::Date => format::date(cast(value, "DATE")),
        AdditionalFieldType::Dropdown => dropdown_label(session, &key, value),
        AdditionalFieldType::YesNo => {
            let labels = session.labels();
            case_of(
                as_integer(value),
                vec![
                    (lit_int(1), lit_label(&labels.get("yes"))),
                    (lit_int(0), lit_label(&labels.get("no"))),
                ],
                Some(lit_str("")),
            )
        }
        AdditionalFieldType::Country => country_name(session, &key, value),
    };
    Ok((expr, def.title))
}

/// `%text%` with the LIKE wildcards in `text` matched literally.
fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

async fn filter_predicate(
    session: &mut CompileSession<'_>,
    filter: &AdditionalFieldFilter,
) -> CompileResult<Expr> {
    let reference = filter.field_id;
    let known = session
        .additional_field(reference.entity, reference.id)
        .await?
        .is_some();
    if !known || !session.is_materialized(reference.entity, reference.id).await? {
        debug!(field = %reference.key(), "filter on a missing additional field matches nothing");
        return Ok(lit_bool(false));
    }

    let value = stored_value(session, reference);
    Ok(match &filter.value {
        AdditionalFieldMatch::Contains(text) => {
            value.like_escaped(lit_str(&contains_pattern(text)), LIKE_ESCAPE)
        }
        AdditionalFieldMatch::Equals(text) => value.eq(lit_str(text)),
        AdditionalFieldMatch::Option(id) | AdditionalFieldMatch::Country(id) => {
            as_integer(value).eq(visibility::id_literal(*id)?)
        }
        AdditionalFieldMatch::YesNo(yes) => as_integer(value).eq(lit_int(i64::from(*yes))),
    })
}

/// AND the definition's additional-field filters into WHERE.
pub async fn apply_filters(session: &mut CompileSession<'_>) -> CompileResult<()> {
    let definition = session.definition;
    let filters = &definition.users.additional_fields;
    if filters.is_empty() {
        return Ok(());
    }

    let mut predicates = Vec::with_capacity(filters.len());
    for filter in filters {
        let field = FieldId::Additional(filter.field_id);
        if !definition.report_type.accepts(&field) {
            return Err(CompileError::FieldNotSupported {
                field,
                report_type: definition.report_type,
            });
        }
        predicates.push(filter_predicate(session, filter).await?);
    }
    if let Some(predicate) =
        date_filter::combine(predicates, definition.users.additional_fields_condition)
    {
        session.ctx.add_where(predicate);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompileOptions;
    use crate::context::fixture::StaticTenant;
    use crate::context::{AdditionalFieldDef, Collaborators};
    use crate::model::{Conditions, ReportDefinition, ReportType};
    use crate::sql::Dialect;

    fn tenant() -> StaticTenant {
        let def = |id, title: &str, field_type| AdditionalFieldDef {
            id,
            title: title.into(),
            field_type,
        };
        StaticTenant::new("acme")
            .with_additional_field(AdditionalEntity::User, def(1, "Badge", AdditionalFieldType::Text), true)
            .with_additional_field(AdditionalEntity::User, def(2, "Area", AdditionalFieldType::Dropdown), true)
            .with_additional_field(AdditionalEntity::User, def(3, "Country", AdditionalFieldType::Country), true)
            .with_additional_field(AdditionalEntity::User, def(4, "Manager", AdditionalFieldType::YesNo), true)
            .with_additional_field(AdditionalEntity::User, def(5, "Legacy", AdditionalFieldType::Text), false)
            .with_additional_field(AdditionalEntity::Enrollment, def(7, "Hired", AdditionalFieldType::Date), true)
    }

    fn user_field(id: u64) -> AdditionalFieldRef {
        AdditionalFieldRef::new(AdditionalEntity::User, id)
    }

    #[tokio::test]
    async fn test_value_table_joined_once_across_fields() {
        let tenant = tenant();
        let definition = ReportDefinition::new(ReportType::UsersCourses, "r1", "Report");
        let options = CompileOptions::default().with_dialect(Dialect::Redshift);
        let mut session = CompileSession::new(&definition, &options, Collaborators::from_single(&tenant));

        let (badge, label) = field_expr(&mut session, user_field(1)).await.unwrap();
        assert_eq!(label, "Badge");
        assert_eq!(badge.to_sql(Dialect::Redshift), "\"user_field_value\".\"field_1\"");
        let (area, _) = field_expr(&mut session, user_field(2)).await.unwrap();
        assert_eq!(area.to_sql(Dialect::Redshift), "\"user_extrafield_2_option\".\"translation\"");
        let (country, _) = field_expr(&mut session, user_field(3)).await.unwrap();
        assert_eq!(country.to_sql(Dialect::Redshift), "\"user_extrafield_3_country\".\"name_country\"");

        // value table, dropdown option, country
        assert_eq!(session.ctx.joins().len(), 3);
        assert_eq!(session.ctx.ctes().len(), 1);
        assert_eq!(tenant.calls().fields(), 1);
        assert_eq!(tenant.calls().materialized(), 1);
    }

    #[tokio::test]
    async fn test_missing_fields_render_empty() {
        let tenant = tenant();
        let definition = ReportDefinition::new(ReportType::UsersCourses, "r1", "Report");
        let options = CompileOptions::default();
        let mut session = CompileSession::new(&definition, &options, Collaborators::from_single(&tenant));

        let (expr, label) = field_expr(&mut session, user_field(5)).await.unwrap();
        assert_eq!(expr, lit_str(""));
        assert_eq!(label, "Legacy");
        let (expr, label) = field_expr(&mut session, user_field(99)).await.unwrap();
        assert_eq!(expr, lit_str(""));
        assert_eq!(label, "user_extrafield_99");
        assert!(session.ctx.joins().is_empty());
    }

    #[tokio::test]
    async fn test_yes_no_and_json_values() {
        let tenant = tenant();
        let definition = ReportDefinition::new(ReportType::UsersCourses, "r1", "Report");
        let options = CompileOptions::default();
        let mut session = CompileSession::new(&definition, &options, Collaborators::from_single(&tenant));

        let (yes_no, _) = field_expr(&mut session, user_field(4)).await.unwrap();
        assert_eq!(
            yes_no.to_sql(Dialect::Snowflake),
            "CASE CAST(\"user_field_value\".\"field_4\" AS INTEGER) WHEN 1 THEN 'Yes' WHEN 0 THEN 'No' ELSE '' END"
        );
        let (hired, _) = field_expr(
            &mut session,
            AdditionalFieldRef::new(AdditionalEntity::Enrollment, 7),
        )
        .await
        .unwrap();
        assert_eq!(
            hired.to_sql(Dialect::Snowflake),
            "TO_CHAR(CAST(GET_PATH(TRY_PARSE_JSON(\"enrollment\".\"enrollment_fields\"), '7')::VARCHAR AS DATE), 'YYYY-MM-DD')"
        );
    }

    #[tokio::test]
    async fn test_filters_combined_and_missing_matches_nothing() {
        let tenant = tenant();
        let mut definition = ReportDefinition::new(ReportType::UsersCourses, "r1", "Report");
        definition.users.additional_fields = vec![
            AdditionalFieldFilter {
                field_id: user_field(1),
                value: AdditionalFieldMatch::Contains("gold".into()),
            },
            AdditionalFieldFilter {
                field_id: user_field(5),
                value: AdditionalFieldMatch::Equals("x".into()),
            },
        ];
        definition.users.additional_fields_condition = Conditions::Or;
        let options = CompileOptions::default().with_dialect(Dialect::Redshift);
        let mut session = CompileSession::new(&definition, &options, Collaborators::from_single(&tenant));
        apply_filters(&mut session).await.unwrap();

        let sql = session.ctx.into_query(vec![], None).to_sql(Dialect::Redshift);
        assert!(sql.contains(
            "WHERE (\"user_field_value\".\"field_1\" LIKE '%gold%' ESCAPE '!' OR false)"
        ));
    }

    #[test]
    fn test_contains_pattern_matches_wildcards_literally() {
        assert_eq!(contains_pattern("50%"), "%50!%%");
        assert_eq!(contains_pattern("a_b"), "%a!_b%");
        assert_eq!(contains_pattern("hi!"), "%hi!!%");
        assert_eq!(contains_pattern(r"C:\"), r"%C:\%");
    }

    #[tokio::test]
    async fn test_contains_filter_escapes_wildcards() {
        let tenant = tenant();
        let mut definition = ReportDefinition::new(ReportType::UsersCourses, "r1", "Report");
        definition.users.additional_fields = vec![AdditionalFieldFilter {
            field_id: user_field(1),
            value: AdditionalFieldMatch::Contains("50%_off".into()),
        }];
        let options = CompileOptions::default().with_dialect(Dialect::Snowflake);
        let mut session = CompileSession::new(&definition, &options, Collaborators::from_single(&tenant));
        apply_filters(&mut session).await.unwrap();

        let sql = session.ctx.into_query(vec![], None).to_sql(Dialect::Snowflake);
        assert!(sql.contains("LIKE '%50!%!_off%' ESCAPE '!'"));
    }

    #[tokio::test]
    async fn test_option_id_beyond_bigint_is_rejected() {
        let tenant = tenant();
        let mut definition = ReportDefinition::new(ReportType::UsersCourses, "r1", "Report");
        definition.users.additional_fields = vec![AdditionalFieldFilter {
            field_id: user_field(2),
            value: AdditionalFieldMatch::Option(u64::MAX),
        }];
        let options = CompileOptions::default();
        let mut session = CompileSession::new(&definition, &options, Collaborators::from_single(&tenant));
        let err = apply_filters(&mut session).await.unwrap_err();
        assert!(matches!(err, CompileError::IdOutOfRange(id) if id == u64::MAX));
    }

    #[tokio::test]
    async fn test_filter_on_foreign_entity_is_rejected() {
        let tenant = tenant();
        let mut definition = ReportDefinition::new(ReportType::GroupsCourses, "r1", "Report");
        definition.users.additional_fields = vec![AdditionalFieldFilter {
            field_id: user_field(1),
            value: AdditionalFieldMatch::YesNo(true),
        }];
        let options = CompileOptions::default();
        let mut session = CompileSession::new(&definition, &options, Collaborators::from_single(&tenant));
        let err = apply_filters(&mut session).await.unwrap_err();
        assert!(matches!(err, CompileError::FieldNotSupported { .. }));
    }
}
