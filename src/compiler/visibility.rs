//! Visibility predicates and filtered entity sources.
//!
//! A resolved [`IdSelection`] is turned into a predicate exactly: `All` adds
//! nothing, an explicit list becomes `IN (...)`, and an empty list becomes
//! `FALSE` so the report returns no rows.

use crate::model::IdSelection;
use crate::sql::expr::{and_all, col, lit_int, lit_str, star, table_col, Expr, ExprExt};
use crate::sql::query::{Query, TableRef};

use super::assembly::QueryAssemblyContext;
use super::{CompileError, CompileResult};

/// Username of the synthetic account every tenant carries.
pub const ANONYMOUS_USERID: &str = "/Anonymous";

/// An entity id as an integer literal. Warehouse keys are signed 64-bit.
pub fn id_literal(id: u64) -> CompileResult<Expr> {
    i64::try_from(id)
        .map(lit_int)
        .map_err(|_| CompileError::IdOutOfRange(id))
}

/// `column IN (ids)`, `FALSE` for an empty list, `None` when unrestricted.
pub fn id_predicate(column: Expr, selection: &IdSelection) -> CompileResult<Option<Expr>> {
    match selection {
        IdSelection::All => Ok(None),
        IdSelection::Ids(ids) => {
            let list = ids
                .iter()
                .map(|id| id_literal(*id))
                .collect::<CompileResult<Vec<_>>>()?;
            Ok(Some(column.in_list(list)))
        }
    }
}

/// Predicate on an unqualified key column, for use inside a filtered source.
pub fn key_predicate(key: &str, selection: &IdSelection) -> CompileResult<Option<Expr>> {
    id_predicate(col(key), selection)
}

/// Excludes the anonymous account from `"user"`.
pub fn exclude_anonymous(user_alias: &str) -> Expr {
    table_col(user_alias, "userid").ne(lit_str(ANONYMOUS_USERID))
}

/// A warehouse table restricted by `predicates` on its own columns.
///
/// Without predicates this is the plain table; otherwise it is
/// `(SELECT * FROM table WHERE ...) AS alias`.
pub fn filtered_source(
    ctx: &QueryAssemblyContext,
    table: &str,
    alias: &str,
    predicates: Vec<Expr>,
) -> TableRef {
    let base = ctx.table(table);
    match and_all(predicates) {
        None => base.with_alias(alias),
        Some(predicate) => {
            TableRef::derived(Query::new().select(vec![star()]).from(base).filter(predicate))
                .with_alias(alias)
        }
    }
}
