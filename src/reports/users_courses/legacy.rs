use crate::legacy::{self, date, LegacyResult};
use crate::model::{
    LegacyEntity, LegacyReportDoc, LegacyVisibilityRules, ReportDefinition, ReportType,
};

const SCAN: &[LegacyEntity] = &[LegacyEntity::User, LegacyEntity::Course, LegacyEntity::Enrollment];

pub(super) fn from_legacy(
    doc: &LegacyReportDoc,
    platform: &str,
    visibility: Option<&LegacyVisibilityRules>,
) -> LegacyResult<ReportDefinition> {
    let mut definition = legacy::base_definition(ReportType::UsersCourses, doc, platform, visibility)?;
    let decoded = legacy::decode(doc)?;

    legacy::apply_users(&mut definition, &decoded);
    legacy::apply_courses(&mut definition, &decoded);
    definition.enrollment.statuses = legacy::enrollment_statuses(&decoded.filters.enrollment_status);
    definition.enrollment_date = date::translate(decoded.filters.start_date.as_ref());
    definition.completion_date = date::translate(decoded.filters.end_date.as_ref());
    legacy::apply_fields_and_order(&mut definition, &decoded, SCAN);
    Ok(definition)
}
