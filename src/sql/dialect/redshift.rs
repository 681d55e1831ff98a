//! Amazon Redshift SQL dialect.
//!
//! Redshift quirks handled here:
//! - PostgreSQL-based syntax, ANSI identifier quoting (`"`)
//! - Backslash is an escape character inside string literals
//! - JSON columns are plain VARCHAR read with `JSON_EXTRACT_PATH_TEXT`
//! - No reliable "any value" aggregate across cluster versions, `MAX` is used

use super::helpers;
use super::SqlDialect;
use crate::sql::token::{Token, TokenStream};

/// Amazon Redshift SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Redshift;

impl SqlDialect for Redshift {
    fn name(&self) -> &'static str {
        "redshift"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_doubled_backslash(s)
    }

    fn quote_case_literal(&self, s: &str) -> String {
        helpers::quote_string_doubled_backslash(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn emit_json_extract(&self, expr: TokenStream, path: &[String]) -> TokenStream {
        let mut args = vec![expr];
        args.extend(path.iter().map(|p| helpers::string_lit(p)));
        helpers::emit_call("JSON_EXTRACT_PATH_TEXT", args)
    }

    fn emit_convert_timezone(&self, expr: TokenStream, timezone: &str) -> TokenStream {
        helpers::emit_convert_timezone_from_utc(expr, timezone)
    }

    fn emit_first_value(&self, expr: TokenStream) -> TokenStream {
        helpers::emit_call("MAX", vec![expr])
    }

    fn emit_current_timestamp(&self) -> TokenStream {
        helpers::emit_call("GETDATE", vec![])
    }

    fn emit_date_add_days(&self, expr: TokenStream, days: i64) -> TokenStream {
        let mut amount = TokenStream::new();
        amount.push(Token::LitInt(days));
        helpers::emit_call("DATEADD", vec![helpers::raw("day"), amount, expr])
    }
}
