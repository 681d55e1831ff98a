use crate::legacy::{self, date, LegacyResult};
use crate::model::{
    LegacyEntity, LegacyReportDoc, LegacyVisibilityRules, ReportDefinition, ReportType,
};

const SCAN: &[LegacyEntity] = &[LegacyEntity::User, LegacyEntity::Plan];

pub(super) fn from_legacy(
    doc: &LegacyReportDoc,
    platform: &str,
    visibility: Option<&LegacyVisibilityRules>,
) -> LegacyResult<ReportDefinition> {
    let mut definition =
        legacy::base_definition(ReportType::UsersLearningPlans, doc, platform, visibility)?;
    let decoded = legacy::decode(doc)?;

    legacy::apply_users(&mut definition, &decoded);
    let (all, plans) = legacy::selection(decoded.data.plans.as_ref());
    definition.learning_plans.all = all;
    definition.learning_plans.learning_plans = plans;
    definition.enrollment_date = date::translate(decoded.filters.start_date.as_ref());
    definition.completion_date = date::translate(decoded.filters.end_date.as_ref());
    legacy::apply_fields_and_order(&mut definition, &decoded, SCAN);
    Ok(definition)
}
