//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use super::super::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Redshift, Snowflake
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with doubled quotes and escaped backslashes.
/// Used by: Redshift, where `\` is an escape character inside literals.
pub fn quote_string_doubled_backslash(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
}

/// Quote string with backslash escapes for both `\` and `'`.
/// Used by: Snowflake
pub fn quote_string_backslash(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as lower-case literal.
/// Used by: Redshift
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format boolean as upper-case keyword.
/// Used by: Snowflake
pub fn format_bool_keyword(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

// =============================================================================
// Function Shapes
// =============================================================================

/// Emit `NAME(args...)` from pre-rendered argument streams.
pub fn emit_call(name: &str, args: Vec<TokenStream>) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::FunctionName(name.into())).lparen();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            ts.comma().space();
        }
        ts.append(arg);
    }
    ts.rparen();
    ts
}

/// A single raw token as a stream.
pub fn raw(sql: impl Into<String>) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::Raw(sql.into()));
    ts
}

/// A single string literal as a stream.
pub fn string_lit(s: &str) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::LitString(s.into()));
    ts
}

/// `CONVERT_TIMEZONE('UTC', 'tz', expr)`
/// Used by: Redshift, Snowflake (on a TIMESTAMP_NTZ operand)
pub fn emit_convert_timezone_from_utc(expr: TokenStream, timezone: &str) -> TokenStream {
    emit_call(
        "CONVERT_TIMEZONE",
        vec![string_lit("UTC"), string_lit(timezone), expr],
    )
}

// =============================================================================
// Row Limit
// =============================================================================

/// Emit `LIMIT n` (standard SQL). A cap beyond `i64::MAX` saturates; it
/// already exceeds any table.
/// Used by: Redshift, Snowflake
pub fn emit_limit_standard(limit: u64) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::Limit)
        .space()
        .push(Token::LitInt(i64::try_from(limit).unwrap_or(i64::MAX)));
    ts
}
