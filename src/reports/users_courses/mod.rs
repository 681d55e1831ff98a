//! Users × courses: one row per course enrollment.

mod compile;
mod legacy;

use async_trait::async_trait;

use crate::compiler::{CompileResult, CompileSession, ReportCompiler};
use crate::legacy::{LegacyResult, LegacyTranslator};
use crate::model::{FieldId, LegacyReportDoc, LegacyVisibilityRules, ReportDefinition, ReportType};
use crate::sql::expr::Expr;

#[derive(Debug, Clone, Copy, Default)]
pub struct UsersCourses;

#[async_trait]
impl ReportCompiler for UsersCourses {
    fn report_type(&self) -> ReportType {
        ReportType::UsersCourses
    }

    async fn build_base(&self, session: &mut CompileSession<'_>) -> CompileResult<()> {
        compile::build_base(session).await
    }

    fn field_expr(&self, session: &mut CompileSession<'_>, field: FieldId) -> CompileResult<Expr> {
        compile::field_expr(session, field)
    }
}

impl LegacyTranslator for UsersCourses {
    fn from_legacy(
        &self,
        doc: &LegacyReportDoc,
        platform: &str,
        visibility: Option<&LegacyVisibilityRules>,
    ) -> LegacyResult<ReportDefinition> {
        legacy::from_legacy(doc, platform, visibility)
    }
}
