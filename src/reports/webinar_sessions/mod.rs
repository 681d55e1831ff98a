//! Users × webinar sessions: one row per session attendance.
//!
//! Session data only exists in the Snowflake warehouse; Redshift compilation
//! is refused.

mod compile;
mod legacy;

use async_trait::async_trait;

use crate::compiler::{CompileResult, CompileSession, ReportCompiler};
use crate::legacy::{LegacyResult, LegacyTranslator};
use crate::model::{FieldId, LegacyReportDoc, LegacyVisibilityRules, ReportDefinition, ReportType};
use crate::sql::expr::Expr;
use crate::sql::Dialect;

#[derive(Debug, Clone, Copy, Default)]
pub struct UsersWebinarSessions;

#[async_trait]
impl ReportCompiler for UsersWebinarSessions {
    fn report_type(&self) -> ReportType {
        ReportType::UsersWebinarSessions
    }

    fn supports_dialect(&self, dialect: Dialect) -> bool {
        matches!(dialect, Dialect::Snowflake)
    }

    async fn build_base(&self, session: &mut CompileSession<'_>) -> CompileResult<()> {
        compile::build_base(session).await
    }

    fn field_expr(&self, session: &mut CompileSession<'_>, field: FieldId) -> CompileResult<Expr> {
        compile::field_expr(session, field)
    }
}

impl LegacyTranslator for UsersWebinarSessions {
    fn from_legacy(
        &self,
        doc: &LegacyReportDoc,
        platform: &str,
        visibility: Option<&LegacyVisibilityRules>,
    ) -> LegacyResult<ReportDefinition> {
        legacy::from_legacy(doc, platform, visibility)
    }
}
