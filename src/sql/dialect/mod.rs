//! SQL Dialect definitions and formatting rules.
//!
//! This module is the only place where the two warehouse back-ends differ.
//! Each dialect implements `SqlDialect`, and report compilers reach
//! dialect-specific syntax exclusively through it:
//!
//! - Identifier quoting and string/label escaping
//! - Boolean literal form
//! - JSON path extraction
//! - Timezone conversion
//! - "Any non-null value in the group" aggregate
//! - Current timestamp and day arithmetic
//! - Row limit clause
//!
//! # Usage
//!
//! ```ignore
//! use lms_reports::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Redshift;
//! let quoted = dialect.quote_identifier("user");  // "user"
//! ```
//!
//! | Construct | Redshift | Snowflake |
//! |-----------|----------|-----------|
//! | String and CASE label escaping | `''`, `\\` | `\'`, `\\` |
//! | Booleans | `true` | `TRUE` |
//! | JSON path | `JSON_EXTRACT_PATH_TEXT` | `GET_PATH(TRY_PARSE_JSON(..))` |
//! | Timezone | `CONVERT_TIMEZONE` | `CONVERT_TIMEZONE` on `TIMESTAMP_NTZ` |
//! | Group pick | `MAX` | `ANY_VALUE` |
//! | Now | `GETDATE()` | `CURRENT_TIMESTAMP()` |

pub mod helpers;
mod redshift;
mod snowflake;

use serde::{Deserialize, Serialize};

pub use redshift::Redshift;
pub use snowflake::Snowflake;

use super::token::TokenStream;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// Expression-shaped methods receive their operands already tokenized so the
/// surrounding expression tree stays dialect-agnostic until serialization.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal used in predicates.
    ///
    /// Backslash escapes inside literals on both back-ends, so `\` is always
    /// doubled along with the quote.
    fn quote_string(&self, s: &str) -> String;

    /// Quote a translated label emitted inside a CASE branch.
    fn quote_case_literal(&self, s: &str) -> String;

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str;

    /// Format a NULL literal.
    fn format_null(&self) -> &'static str {
        "NULL"
    }

    /// Format a date literal (`YYYY-MM-DD`).
    fn format_date_literal(&self, date: &str) -> String {
        format!("DATE '{}'", date.replace('\'', "''"))
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// Extract a text value at `path` from a JSON document column.
    fn emit_json_extract(&self, expr: TokenStream, path: &[String]) -> TokenStream;

    /// Convert a UTC timestamp expression to the given timezone.
    fn emit_convert_timezone(&self, expr: TokenStream, timezone: &str) -> TokenStream;

    /// Pick one non-null value of `expr` within a group.
    fn emit_first_value(&self, expr: TokenStream) -> TokenStream;

    /// The current timestamp.
    fn emit_current_timestamp(&self) -> TokenStream;

    /// `expr` shifted by `days` calendar days.
    fn emit_date_add_days(&self, expr: TokenStream, days: i64) -> TokenStream;

    // =========================================================================
    // Row Limit
    // =========================================================================

    /// Emit the row limit clause.
    fn emit_limit(&self, limit: u64) -> TokenStream {
        helpers::emit_limit_standard(limit)
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Redshift,
    #[default]
    Snowflake,
}

impl Dialect {
    /// All supported dialects, for exhaustive tests and CLI listings.
    pub const ALL: [Dialect; 2] = [Dialect::Redshift, Dialect::Snowflake];

    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Redshift => &Redshift,
            Dialect::Snowflake => &Snowflake,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn quote_case_literal(&self, s: &str) -> String {
        self.dialect().quote_case_literal(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn format_date_literal(&self, date: &str) -> String {
        self.dialect().format_date_literal(date)
    }

    fn emit_json_extract(&self, expr: TokenStream, path: &[String]) -> TokenStream {
        self.dialect().emit_json_extract(expr, path)
    }

    fn emit_convert_timezone(&self, expr: TokenStream, timezone: &str) -> TokenStream {
        self.dialect().emit_convert_timezone(expr, timezone)
    }

    fn emit_first_value(&self, expr: TokenStream) -> TokenStream {
        self.dialect().emit_first_value(expr)
    }

    fn emit_current_timestamp(&self) -> TokenStream {
        self.dialect().emit_current_timestamp()
    }

    fn emit_date_add_days(&self, expr: TokenStream, days: i64) -> TokenStream {
        self.dialect().emit_date_add_days(expr, days)
    }

    fn emit_limit(&self, limit: u64) -> TokenStream {
        self.dialect().emit_limit(limit)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redshift" => Ok(Dialect::Redshift),
            "snowflake" => Ok(Dialect::Snowflake),
            other => Err(format!("unknown dialect: {}", other)),
        }
    }
}
