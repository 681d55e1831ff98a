//! SQL generation module.
//!
//! A type-safe SQL builder that renders the same query tree for every
//! supported warehouse dialect:
//!
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use expr::{
    and_all, case_of, case_when, cast, coalesce, col, convert_timezone, count, count_distinct,
    days_from_now, first_value, func, json_extract, lit_bool, lit_date, lit_float, lit_int,
    lit_label, lit_null, lit_str, max, or_all, star, sum, table_col, BinaryOperator,
    Expr, ExprExt, Literal, UnaryOperator,
};
pub use query::{
    Cte, Join, JoinType, OrderByExpr, Query, SelectExpr, SortDir,
    TableRef, TableSource,
};
pub use token::{Token, TokenStream};
