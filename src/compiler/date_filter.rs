//! Date-filter predicates.
//!
//! A [`DateFilter`] block becomes at most one predicate on a timestamp
//! column. Relative filters compare against "now minus N days"; ranges compare
//! calendar days and include both bounds. A restricting block that cannot be
//! turned into a predicate is an error, never a dropped filter.

use crate::model::{Conditions, DateFilter, DateFilterType, DateOperator};
use crate::sql::expr::{and_all, cast, days_from_now, lit_date, or_all, Expr, ExprExt};

use super::{CompileError, CompileResult};

fn day(expr: Expr) -> Expr {
    cast(expr, "DATE")
}

/// Predicate for `filter` on `column`, or `None` when the block does not
/// restrict anything.
///
/// `inclusive` selects `>=`/`<=` over `>`/`<` for relative comparisons.
pub fn date_predicate(
    column: Expr,
    filter: &DateFilter,
    inclusive: bool,
) -> CompileResult<Option<Expr>> {
    if filter.any {
        return Ok(None);
    }
    match filter.filter_type {
        DateFilterType::Relative => {
            let operator = filter
                .operator
                .ok_or(CompileError::InvalidDateFilter("relative filter has no operator"))?;
            let days = filter
                .days
                .ok_or(CompileError::InvalidDateFilter("relative filter has no day count"))?;
            let threshold = days_from_now(-i64::from(days));
            Ok(Some(match (operator, inclusive) {
                (DateOperator::IsAfter, true) => column.gte(threshold),
                (DateOperator::IsAfter, false) => column.gt(threshold),
                (DateOperator::IsBefore, true) => column.lte(threshold),
                (DateOperator::IsBefore, false) => column.lt(threshold),
                (DateOperator::IsEqual, _) => day(column).eq(day(threshold)),
            }))
        }
        DateFilterType::Range => {
            let mut bounds = Vec::new();
            if let Some(from) = filter.from {
                bounds.push(day(column.clone()).gte(lit_date(&from.to_string())));
            }
            if let Some(to) = filter.to {
                bounds.push(day(column).lte(lit_date(&to.to_string())));
            }
            let count = bounds.len();
            let predicate = and_all(bounds)
                .ok_or(CompileError::InvalidDateFilter("range has neither bound"))?;
            Ok(Some(if count > 1 { predicate.paren() } else { predicate }))
        }
    }
}

/// Combine predicates with the definition's `conditions`.
pub fn combine(predicates: Vec<Expr>, conditions: Conditions) -> Option<Expr> {
    match conditions {
        Conditions::And => and_all(predicates),
        Conditions::Or => or_all(predicates),
    }
}

/// One predicate for every restricting date block of a report.
///
/// Relative comparisons are strict; legacy inclusive comparisons were shifted
/// by a day when they were translated.
pub fn dates_predicate(
    filters: &[(Expr, &DateFilter)],
    conditions: Conditions,
) -> CompileResult<Option<Expr>> {
    let mut predicates = Vec::with_capacity(filters.len());
    for (column, filter) in filters {
        predicates.extend(date_predicate(column.clone(), filter, false)?);
    }
    Ok(combine(predicates, conditions))
}
