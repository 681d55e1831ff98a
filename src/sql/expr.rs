//! Expression AST - the core of SQL expression building.
//!
//! This module provides a strongly-typed AST for SQL expressions
//! with exhaustive pattern matching enforced by the compiler.
//! Dialect-specific constructs (JSON extraction, timezone conversion,
//! group picks, day arithmetic) are nodes of their own and are only
//! resolved when the tree is serialized for a [`Dialect`].

use super::dialect::{Dialect, SqlDialect};
use super::token::{Token, TokenStream};

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
///
/// Every variant must be handled in `to_tokens_for_dialect()` - the compiler enforces this.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: optional_table.column
    Column {
        table: Option<String>,
        column: String,
    },

    /// Literal values
    Literal(Literal),

    /// Binary operation: left op right
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// Unary operation: op expr
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },

    /// Function call: name(args...)
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
    },

    /// CASE WHEN... THEN... ELSE... END
    Case {
        operand: Option<Box<Expr>>,
        when_clauses: Vec<(Expr, Expr)>,
        else_clause: Option<Box<Expr>>,
    },

    /// IN: expr IN (values...)
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// LIKE: expr LIKE pattern [ESCAPE 'c']
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<char>,
    },

    /// CAST(expr AS type)
    Cast { expr: Box<Expr>, data_type: String },

    /// Wildcard: * or table.*
    Star { table: Option<String> },

    /// Parenthesized expression
    Paren(Box<Expr>),

    /// Text value at a JSON path of a JSON document column.
    JsonExtract { expr: Box<Expr>, path: Vec<String> },

    /// UTC timestamp converted to a named timezone.
    ConvertTimezone { expr: Box<Expr>, timezone: String },

    /// One non-null value of `expr` within the current group.
    FirstValue(Box<Expr>),

    /// The current timestamp.
    CurrentTimestamp,

    /// `expr` shifted by a number of calendar days.
    DateAddDays { expr: Box<Expr>, days: i64 },
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    /// Translated text shown in a CASE branch.
    Label(String),
    Bool(bool),
    Date(String),
    Null,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
    // Arithmetic
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    // String
    Concat,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
}

fn binary_op_to_token(op: BinaryOperator) -> Token {
    match op {
        BinaryOperator::Eq => Token::Eq,
        BinaryOperator::Ne => Token::Ne,
        BinaryOperator::Lt => Token::Lt,
        BinaryOperator::Gt => Token::Gt,
        BinaryOperator::Lte => Token::Lte,
        BinaryOperator::Gte => Token::Gte,
        BinaryOperator::And => Token::And,
        BinaryOperator::Or => Token::Or,
        BinaryOperator::Plus => Token::Plus,
        BinaryOperator::Minus => Token::Minus,
        BinaryOperator::Mul => Token::Mul,
        BinaryOperator::Div => Token::Div,
        BinaryOperator::Mod => Token::Mod,
        BinaryOperator::Concat => Token::Concat,
    }
}

impl Expr {
    /// Convert this expression to a token stream (default dialect).
    pub fn to_tokens(&self) -> TokenStream {
        self.to_tokens_for_dialect(Dialect::default())
    }

    /// Convert this expression to a token stream for a specific dialect.
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            Expr::Column { table, column } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Ident(column.clone()));
            }

            Expr::Literal(lit) => {
                ts.push(match lit {
                    Literal::Int(n) => Token::LitInt(*n),
                    Literal::Float(f) => Token::LitFloat(*f),
                    Literal::String(s) => Token::LitString(s.clone()),
                    Literal::Label(s) => Token::LitCaseLabel(s.clone()),
                    Literal::Bool(b) => Token::LitBool(*b),
                    Literal::Date(d) => Token::LitDate(d.clone()),
                    Literal::Null => Token::LitNull,
                });
            }

            Expr::BinaryOp { left, op, right } => {
                ts.append(&left.to_tokens_for_dialect(dialect));
                ts.space();
                ts.push(binary_op_to_token(*op));
                ts.space();
                ts.append(&right.to_tokens_for_dialect(dialect));
            }

            Expr::UnaryOp { op, expr } => {
                ts.push(match op {
                    UnaryOperator::Not => Token::Not,
                    UnaryOperator::Minus => Token::Minus,
                });
                ts.space();
                ts.append(&expr.to_tokens_for_dialect(dialect));
            }

            Expr::Function {
                name,
                args,
                distinct,
            } => {
                ts.push(Token::FunctionName(name.clone()));
                ts.lparen();
                if *distinct {
                    ts.push(Token::Distinct).space();
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.append(&arg.to_tokens_for_dialect(dialect));
                }
                ts.rparen();
            }

            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                ts.push(Token::Case);
                if let Some(op) = operand {
                    ts.space().append(&op.to_tokens_for_dialect(dialect));
                }
                for (when, then) in when_clauses {
                    ts.space().push(Token::When).space();
                    ts.append(&when.to_tokens_for_dialect(dialect));
                    ts.space().push(Token::Then).space();
                    ts.append(&then.to_tokens_for_dialect(dialect));
                }
                if let Some(else_expr) = else_clause {
                    ts.space().push(Token::Else).space();
                    ts.append(&else_expr.to_tokens_for_dialect(dialect));
                }
                ts.space().push(Token::End);
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                // Empty IN list: "x IN ()" is invalid SQL
                // "x IN ()" is FALSE, "x NOT IN ()" is TRUE
                if values.is_empty() {
                    ts.push(if *negated { Token::True } else { Token::False });
                } else {
                    ts.append(&expr.to_tokens_for_dialect(dialect));
                    if *negated {
                        ts.space().push(Token::Not);
                    }
                    ts.space().push(Token::In).space().lparen();
                    for (i, val) in values.iter().enumerate() {
                        if i > 0 {
                            ts.comma().space();
                        }
                        ts.append(&val.to_tokens_for_dialect(dialect));
                    }
                    ts.rparen();
                }
            }

            Expr::IsNull { expr, negated } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space();
                ts.push(if *negated {
                    Token::IsNotNull
                } else {
                    Token::IsNull
                });
            }

            Expr::Like {
                expr,
                pattern,
                escape,
            } => {
                ts.append(&expr.to_tokens_for_dialect(dialect))
                    .space()
                    .push(Token::Like)
                    .space()
                    .append(&pattern.to_tokens_for_dialect(dialect));
                if let Some(escape) = escape {
                    ts.space()
                        .push(Token::Escape)
                        .space()
                        .push(Token::LitString(escape.to_string()));
                }
            }

            Expr::Cast { expr, data_type } => {
                ts.push(Token::Cast).lparen();
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space()
                    .push(Token::As)
                    .space()
                    .push(Token::Raw(data_type.clone()))
                    .rparen();
            }

            Expr::Star { table } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Star);
            }

            Expr::Paren(inner) => {
                ts.lparen();
                ts.append(&inner.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::JsonExtract { expr, path } => {
                ts.append(&dialect.emit_json_extract(expr.to_tokens_for_dialect(dialect), path));
            }

            Expr::ConvertTimezone { expr, timezone } => {
                ts.append(
                    &dialect.emit_convert_timezone(expr.to_tokens_for_dialect(dialect), timezone),
                );
            }

            Expr::FirstValue(expr) => {
                ts.append(&dialect.emit_first_value(expr.to_tokens_for_dialect(dialect)));
            }

            Expr::CurrentTimestamp => {
                ts.append(&dialect.emit_current_timestamp());
            }

            Expr::DateAddDays { expr, days } => {
                ts.append(&dialect.emit_date_add_days(expr.to_tokens_for_dialect(dialect), *days));
            }
        }

        ts
    }

    /// Generate SQL string for a specific dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize(dialect)
    }

    /// Whether this expression aggregates over a group.
    ///
    /// Used to decide which select items must be repeated in GROUP BY.
    pub fn is_aggregate(&self) -> bool {
        match self {
            Expr::FirstValue(_) => true,
            Expr::Function { name, args, .. } => {
                matches!(
                    name.to_ascii_uppercase().as_str(),
                    "COUNT" | "SUM" | "AVG" | "MIN" | "MAX" | "LISTAGG"
                ) || args.iter().any(Expr::is_aggregate)
            }
            Expr::BinaryOp { left, right, .. } => left.is_aggregate() || right.is_aggregate(),
            Expr::UnaryOp { expr, .. }
            | Expr::IsNull { expr, .. }
            | Expr::Cast { expr, .. }
            | Expr::JsonExtract { expr, .. }
            | Expr::ConvertTimezone { expr, .. }
            | Expr::DateAddDays { expr, .. }
            | Expr::Paren(expr) => expr.is_aggregate(),
            Expr::Like { expr, pattern, .. } => expr.is_aggregate() || pattern.is_aggregate(),
            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                operand.as_ref().map_or(false, |o| o.is_aggregate())
                    || when_clauses
                        .iter()
                        .any(|(w, t)| w.is_aggregate() || t.is_aggregate())
                    || else_clause.as_ref().map_or(false, |e| e.is_aggregate())
            }
            Expr::In { expr, values, .. } => {
                expr.is_aggregate() || values.iter().any(Expr::is_aggregate)
            }
            Expr::Column { .. }
            | Expr::Literal(_)
            | Expr::Star { .. }
            | Expr::CurrentTimestamp => false,
        }
    }

    /// Whether this expression is a constant (needs no GROUP BY entry).
    pub fn is_constant(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }
}

// =============================================================================
// Builder Functions
// =============================================================================

/// Create a column reference.
pub fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        column: name.into(),
    }
}

/// Create a qualified column reference (table.column).
pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.into()),
        column: column.into(),
    }
}

/// Create an integer literal.
pub fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

/// Create a float literal.
pub fn lit_float(f: f64) -> Expr {
    Expr::Literal(Literal::Float(f))
}

/// Create a string literal.
pub fn lit_str(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.into()))
}

/// Create a CASE label literal (translated text).
pub fn lit_label(s: &str) -> Expr {
    Expr::Literal(Literal::Label(s.into()))
}

/// Create a boolean literal.
pub fn lit_bool(b: bool) -> Expr {
    Expr::Literal(Literal::Bool(b))
}

/// Create a date literal (`YYYY-MM-DD`).
pub fn lit_date(d: &str) -> Expr {
    Expr::Literal(Literal::Date(d.into()))
}

/// Create a NULL literal.
pub fn lit_null() -> Expr {
    Expr::Literal(Literal::Null)
}

/// Create `*`.
pub fn star() -> Expr {
    Expr::Star { table: None }
}

/// COUNT(expr)
pub fn count(expr: Expr) -> Expr {
    func("COUNT", vec![expr])
}

/// COUNT(DISTINCT expr)
pub fn count_distinct(expr: Expr) -> Expr {
    Expr::Function {
        name: "COUNT".into(),
        args: vec![expr],
        distinct: true,
    }
}

/// SUM(expr)
pub fn sum(expr: Expr) -> Expr {
    func("SUM", vec![expr])
}

/// MAX(expr)
pub fn max(expr: Expr) -> Expr {
    func("MAX", vec![expr])
}

/// COALESCE(args...)
pub fn coalesce(args: Vec<Expr>) -> Expr {
    func("COALESCE", args)
}

/// Generic function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
        distinct: false,
    }
}

/// CAST(expr AS data_type)
pub fn cast(expr: Expr, data_type: &str) -> Expr {
    Expr::Cast {
        expr: Box::new(expr),
        data_type: data_type.into(),
    }
}

/// Searched CASE: `CASE WHEN c THEN v ... ELSE e END`.
pub fn case_when(when_clauses: Vec<(Expr, Expr)>, else_clause: Option<Expr>) -> Expr {
    Expr::Case {
        operand: None,
        when_clauses,
        else_clause: else_clause.map(Box::new),
    }
}

/// Simple CASE: `CASE operand WHEN v THEN r ... ELSE e END`.
pub fn case_of(operand: Expr, when_clauses: Vec<(Expr, Expr)>, else_clause: Option<Expr>) -> Expr {
    Expr::Case {
        operand: Some(Box::new(operand)),
        when_clauses,
        else_clause: else_clause.map(Box::new),
    }
}

/// Text at a JSON path.
pub fn json_extract(expr: Expr, path: &[&str]) -> Expr {
    Expr::JsonExtract {
        expr: Box::new(expr),
        path: path.iter().map(|p| p.to_string()).collect(),
    }
}

/// UTC timestamp converted to `timezone`.
pub fn convert_timezone(expr: Expr, timezone: &str) -> Expr {
    Expr::ConvertTimezone {
        expr: Box::new(expr),
        timezone: timezone.into(),
    }
}

/// One non-null value within the group.
pub fn first_value(expr: Expr) -> Expr {
    Expr::FirstValue(Box::new(expr))
}

/// `now` shifted by `days`.
pub fn days_from_now(days: i64) -> Expr {
    Expr::DateAddDays {
        expr: Box::new(Expr::CurrentTimestamp),
        days,
    }
}

/// AND all predicates together; `None` when there are none.
pub fn and_all(predicates: Vec<Expr>) -> Option<Expr> {
    combine(predicates, BinaryOperator::And)
}

/// OR all predicates together (parenthesized); `None` when there are none.
pub fn or_all(predicates: Vec<Expr>) -> Option<Expr> {
    combine(predicates, BinaryOperator::Or)
}

fn combine(predicates: Vec<Expr>, op: BinaryOperator) -> Option<Expr> {
    let count = predicates.len();
    let combined = predicates.into_iter().reduce(|left, right| Expr::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })?;
    if count > 1 && op == BinaryOperator::Or {
        Some(combined.paren())
    } else {
        Some(combined)
    }
}

// =============================================================================
// Fluent Extension Trait
// =============================================================================

/// Extension trait for fluent expression building.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    /// Equal: self = other
    fn eq(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Eq, other.into())
    }

    /// Not equal: self <> other
    fn ne(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Ne, other.into())
    }

    /// Greater than: self > other
    fn gt(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Gt, other.into())
    }

    /// Greater than or equal: self >= other
    fn gte(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Gte, other.into())
    }

    /// Less than: self < other
    fn lt(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Lt, other.into())
    }

    /// Less than or equal: self <= other
    fn lte(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Lte, other.into())
    }

    /// Logical AND: self AND other
    fn and(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::And, other.into())
    }

    /// Logical OR: self OR other
    fn or(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Or, other.into())
    }

    /// Logical NOT: NOT self
    fn not(self) -> Expr {
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            expr: Box::new(self.into_expr()),
        }
    }

    /// Addition: self + other
    fn add(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Plus, other.into())
    }

    /// Subtraction: self - other
    fn sub(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Minus, other.into())
    }

    /// Multiplication: self * other
    fn mul(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Mul, other.into())
    }

    /// Division: self / other
    fn div(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Div, other.into())
    }

    /// Modulo: self % other
    fn modulo(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Mod, other.into())
    }

    /// String concatenation: self || other
    fn concat(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Concat, other.into())
    }

    /// LIKE with an explicit escape character: self LIKE pattern ESCAPE 'c'
    fn like_escaped(self, pattern: impl Into<Expr>, escape: char) -> Expr {
        Expr::Like {
            expr: Box::new(self.into_expr()),
            pattern: Box::new(pattern.into()),
            escape: Some(escape),
        }
    }

    /// IS NULL
    fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: false,
        }
    }

    /// IS NOT NULL
    fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: true,
        }
    }

    /// IN list: self IN (values...)
    fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: false,
        }
    }

    /// Wrap in parentheses.
    fn paren(self) -> Expr {
        Expr::Paren(Box::new(self.into_expr()))
    }

    /// Alias this expression (for SELECT).
    fn alias(self, name: &str) -> crate::sql::query::SelectExpr {
        crate::sql::query::SelectExpr::new(self.into_expr()).with_alias(name)
    }
}

fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
    Expr::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

// =============================================================================
// From implementations for ergonomic API
// =============================================================================

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        lit_int(n)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        lit_int(n as i64)
    }
}

impl From<u64> for Expr {
    fn from(n: u64) -> Self {
        lit_int(n as i64)
    }
}

impl From<f64> for Expr {
    fn from(f: f64) -> Self {
        lit_float(f)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        lit_str(s)
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Literal(Literal::String(s))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        lit_bool(b)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_column() {
        let expr = table_col("user", "userid");
        assert_eq!(expr.to_sql(Dialect::Redshift), "\"user\".\"userid\"");
    }

    #[test]
    fn test_binary_op() {
        let expr = col("level").eq(lit_int(3));
        assert_eq!(expr.to_sql(Dialect::Snowflake), "\"level\" = 3");
    }

    #[test]
    fn test_count_distinct() {
        let expr = count_distinct(table_col("enrollment", "iduser"));
        assert_eq!(
            expr.to_sql(Dialect::Redshift),
            "COUNT(DISTINCT \"enrollment\".\"iduser\")"
        );
        assert!(expr.is_aggregate());
    }

    #[test]
    fn test_in_list_empty_is_false() {
        let expr = col("idst").in_list(vec![]);
        assert_eq!(expr.to_sql(Dialect::Redshift), "false");
        assert_eq!(expr.to_sql(Dialect::Snowflake), "FALSE");
    }

    #[test]
    fn test_case_with_labels() {
        let expr = case_of(
            col("status"),
            vec![(lit_int(2), lit_label("Completed"))],
            Some(lit_label("Other")),
        );
        assert_eq!(
            expr.to_sql(Dialect::Redshift),
            "CASE \"status\" WHEN 2 THEN 'Completed' ELSE 'Other' END"
        );
    }

    #[test]
    fn test_nested_dialect_nodes_follow_dialect() {
        let expr = func("TO_CHAR", vec![convert_timezone(col("d"), "UTC"), lit_str("YYYY")]);
        assert!(expr.to_sql(Dialect::Snowflake).contains("::TIMESTAMP_NTZ"));
        assert!(!expr.to_sql(Dialect::Redshift).contains("::TIMESTAMP_NTZ"));
    }

    #[test]
    fn test_first_value_is_aggregate() {
        assert!(first_value(col("x")).is_aggregate());
        assert!(!coalesce(vec![col("x"), lit_int(0)]).is_aggregate());
        assert!(case_when(vec![(count(col("x")).eq(lit_int(0)), lit_int(0))], None).is_aggregate());
    }

    #[test]
    fn test_or_all_parenthesizes() {
        let expr = or_all(vec![col("a").eq(1), col("b").eq(2)]).unwrap();
        assert_eq!(expr.to_sql(Dialect::Redshift), "(\"a\" = 1 OR \"b\" = 2)");
        assert!(and_all(vec![]).is_none());
    }
}
