use crate::legacy::{self, date, LegacyResult};
use crate::model::{
    LegacyEntity, LegacyReportDoc, LegacyVisibilityRules, ReportDefinition, ReportType,
};

const SCAN: &[LegacyEntity] = &[
    LegacyEntity::User,
    LegacyEntity::Course,
    LegacyEntity::Session,
];

pub(super) fn from_legacy(
    doc: &LegacyReportDoc,
    platform: &str,
    visibility: Option<&LegacyVisibilityRules>,
) -> LegacyResult<ReportDefinition> {
    let mut definition =
        legacy::base_definition(ReportType::UsersWebinarSessions, doc, platform, visibility)?;
    let decoded = legacy::decode(doc)?;

    legacy::apply_users(&mut definition, &decoded);
    legacy::apply_courses(&mut definition, &decoded);
    let (all, sessions) = legacy::selection(decoded.data.sessions.as_ref());
    definition.sessions.all = all;
    definition.sessions.sessions = sessions;
    definition.session_date = date::translate(decoded.filters.start_date.as_ref());
    legacy::apply_fields_and_order(&mut definition, &decoded, SCAN);
    Ok(definition)
}
