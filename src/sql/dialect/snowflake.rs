//! Snowflake SQL dialect.
//!
//! Snowflake quirks handled here:
//! - ANSI identifier quoting (`"`)
//! - Backslash escapes inside string literals (`\'`, `\\`)
//! - JSON stored as VARCHAR is parsed lazily with `TRY_PARSE_JSON`
//! - `CONVERT_TIMEZONE` with three arguments needs a `TIMESTAMP_NTZ` operand

use super::helpers;
use super::SqlDialect;
use crate::sql::token::{Token, TokenStream};

/// Snowflake SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Snowflake;

impl SqlDialect for Snowflake {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_backslash(s)
    }

    fn quote_case_literal(&self, s: &str) -> String {
        helpers::quote_string_backslash(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_keyword(b)
    }

    fn emit_json_extract(&self, expr: TokenStream, path: &[String]) -> TokenStream {
        let parsed = helpers::emit_call("TRY_PARSE_JSON", vec![expr]);
        let mut ts = helpers::emit_call("GET_PATH", vec![parsed, helpers::string_lit(&path.join("."))]);
        ts.push(Token::Raw("::VARCHAR".into()));
        ts
    }

    fn emit_convert_timezone(&self, expr: TokenStream, timezone: &str) -> TokenStream {
        let mut ntz = expr;
        ntz.push(Token::Raw("::TIMESTAMP_NTZ".into()));
        helpers::emit_convert_timezone_from_utc(ntz, timezone)
    }

    fn emit_first_value(&self, expr: TokenStream) -> TokenStream {
        helpers::emit_call("ANY_VALUE", vec![expr])
    }

    fn emit_current_timestamp(&self) -> TokenStream {
        helpers::emit_call("CURRENT_TIMESTAMP", vec![])
    }

    fn emit_date_add_days(&self, expr: TokenStream, days: i64) -> TokenStream {
        let mut amount = TokenStream::new();
        amount.push(Token::LitInt(days));
        helpers::emit_call("DATEADD", vec![helpers::string_lit("day"), amount, expr])
    }
}
