//! Rendering helpers shared by every report type.

use crate::catalog::Labels;
use crate::sql::expr::{
    case_when, cast, coalesce, convert_timezone, func, lit_float, lit_int, lit_label, lit_null,
    lit_str, Expr, ExprExt,
};

const DATETIME_FORMAT: &str = "YYYY-MM-DD HH24:MI:SS";
const DATE_FORMAT: &str = "YYYY-MM-DD";

/// A UTC timestamp rendered in `timezone`.
pub fn datetime(expr: Expr, timezone: &str) -> Expr {
    func(
        "TO_CHAR",
        vec![convert_timezone(expr, timezone), lit_str(DATETIME_FORMAT)],
    )
}

/// A calendar date.
pub fn date(expr: Expr) -> Expr {
    func("TO_CHAR", vec![expr, lit_str(DATE_FORMAT)])
}

/// Seconds as `"<H>h <M>m"`; NULL when the total is 0 or missing.
pub fn duration(seconds: Expr) -> Expr {
    let hours = cast(func("FLOOR", vec![seconds.clone().div(lit_int(3600))]), "VARCHAR");
    let minutes = cast(
        func(
            "FLOOR",
            vec![seconds.clone().modulo(lit_int(3600)).paren().div(lit_int(60))],
        ),
        "VARCHAR",
    );
    case_when(
        vec![(coalesce(vec![seconds, lit_int(0)]).eq(lit_int(0)), lit_null())],
        Some(
            hours
                .concat(lit_str("h "))
                .concat(minutes)
                .concat(lit_str("m")),
        ),
    )
}

/// `100 * numerator / denominator` rounded to two decimals; 0 when the
/// denominator is 0.
pub fn percentage(numerator: Expr, denominator: Expr) -> Expr {
    case_when(
        vec![(
            coalesce(vec![denominator.clone(), lit_int(0)]).eq(lit_int(0)),
            lit_int(0),
        )],
        Some(func(
            "ROUND",
            vec![
                lit_float(100.0)
                    .mul(coalesce(vec![numerator, lit_int(0)]))
                    .div(denominator),
                lit_int(2),
            ],
        )),
    )
}

/// `CASE WHEN predicate THEN 'Yes' ELSE 'No' END`
pub fn yes_no(predicate: Expr, labels: &Labels<'_>) -> Expr {
    case_when(
        vec![(predicate, lit_label(&labels.get("yes")))],
        Some(lit_label(&labels.get("no"))),
    )
}

/// `CASE operand WHEN value THEN label ... ELSE fallback END` with translated labels.
pub fn labelled(
    operand: Expr,
    cases: &[(Expr, &str)],
    fallback: Option<&str>,
    labels: &Labels<'_>,
) -> Expr {
    crate::sql::expr::case_of(
        operand,
        cases
            .iter()
            .map(|(value, key)| (value.clone(), lit_label(&labels.get(key))))
            .collect(),
        Some(match fallback {
            Some(key) => lit_label(&labels.get(key)),
            None => lit_str(""),
        }),
    )
}

/// `TRIM(COALESCE(first, '') || ' ' || COALESCE(last, ''))`
pub fn full_name(first: Expr, last: Expr) -> Expr {
    func(
        "TRIM",
        vec![coalesce(vec![first, lit_str("")])
            .concat(lit_str(" "))
            .concat(coalesce(vec![last, lit_str("")]))],
    )
}

/// Legacy usernames carry a leading `/`.
pub fn username(userid: Expr) -> Expr {
    func("SUBSTRING", vec![userid, lit_int(2)])
}
