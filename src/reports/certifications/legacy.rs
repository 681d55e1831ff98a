use tracing::warn;

use crate::legacy::{self, date, LegacyResult};
use crate::model::{
    CertificationsFilter, LegacyEntity, LegacyReportDoc, LegacyVisibilityRules,
    ReportDefinition, ReportType,
};

const SCAN: &[LegacyEntity] = &[LegacyEntity::User, LegacyEntity::Certification];

/// Legacy `certification_status`; an empty list keeps the defaults.
fn apply_statuses(filter: &mut CertificationsFilter, names: &[String]) {
    if names.is_empty() {
        return;
    }
    filter.active = false;
    filter.expired = false;
    filter.archived = false;
    for name in names {
        match name.trim() {
            "active" => filter.active = true,
            "expired" => filter.expired = true,
            "archived" => filter.archived = true,
            other => warn!(status = other, "unknown legacy certification status"),
        }
    }
}

pub(super) fn from_legacy(
    doc: &LegacyReportDoc,
    platform: &str,
    visibility: Option<&LegacyVisibilityRules>,
) -> LegacyResult<ReportDefinition> {
    let mut definition =
        legacy::base_definition(ReportType::UsersCertifications, doc, platform, visibility)?;
    let decoded = legacy::decode(doc)?;

    legacy::apply_users(&mut definition, &decoded);
    let (all, ids) = legacy::selection(decoded.data.certifications.as_ref());
    definition.certifications.all = all;
    definition.certifications.certifications = ids;
    apply_statuses(
        &mut definition.certifications,
        &decoded.filters.certification_status,
    );
    definition.certification_date = date::translate(decoded.filters.start_date.as_ref());
    definition.expiration_date = date::translate(decoded.filters.end_date.as_ref());
    legacy::apply_fields_and_order(&mut definition, &decoded, SCAN);
    Ok(definition)
}
