//! Groups × courses: enrollment statistics rolled up per group and course.

mod compile;
mod legacy;

use async_trait::async_trait;

use crate::compiler::{CompileResult, CompileSession, ReportCompiler};
use crate::legacy::{LegacyResult, LegacyTranslator};
use crate::model::{FieldId, LegacyReportDoc, LegacyVisibilityRules, ReportDefinition, ReportType};
use crate::sql::expr::Expr;

#[derive(Debug, Clone, Copy, Default)]
pub struct GroupsCourses;

#[async_trait]
impl ReportCompiler for GroupsCourses {
    fn report_type(&self) -> ReportType {
        ReportType::GroupsCourses
    }

    async fn build_base(&self, session: &mut CompileSession<'_>) -> CompileResult<()> {
        compile::build_base(session).await
    }

    fn field_expr(&self, session: &mut CompileSession<'_>, field: FieldId) -> CompileResult<Expr> {
        compile::field_expr(session, field)
    }
}

impl LegacyTranslator for GroupsCourses {
    fn from_legacy(
        &self,
        doc: &LegacyReportDoc,
        platform: &str,
        visibility: Option<&LegacyVisibilityRules>,
    ) -> LegacyResult<ReportDefinition> {
        legacy::from_legacy(doc, platform, visibility)
    }
}
