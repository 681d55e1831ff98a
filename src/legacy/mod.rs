//! Legacy report translation.
//!
//! Each report type translates its own legacy documents (see
//! [`LegacyTranslator`]); the pieces every type shares live here: decoding
//! `filter_data`, the type table, authorship and visibility, entity
//! selections and the date/field helpers in [`date`] and [`fields`].

pub mod date;
pub mod fields;

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{
    BranchSelection, Conditions, EnrollmentStatus, LegacyBranch, LegacyEntity, LegacyFilterData,
    LegacyFilters, LegacyIdSelection, LegacyReportDoc, LegacyVisibilityRules,
    LegacyVisibilityType, ReportDefinition, ReportType, Visibility, VisibilityType,
};

/// Errors translating one legacy document.
#[derive(Debug, Error)]
pub enum LegacyError {
    #[error("legacy report type {0} has no counterpart")]
    UnmappedType(u32),

    #[error("legacy report type {found} cannot be translated as {expected}")]
    WrongType { expected: ReportType, found: u32 },

    #[error("filter data is not valid JSON: {0}")]
    InvalidFilterData(#[from] serde_json::Error),

    #[error("filter data has no filters section")]
    MissingFilters,

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

pub type LegacyResult<T> = Result<T, LegacyError>;

/// Converts legacy documents of one report type into definitions.
pub trait LegacyTranslator: Send + Sync {
    fn from_legacy(
        &self,
        doc: &LegacyReportDoc,
        platform: &str,
        visibility: Option<&LegacyVisibilityRules>,
    ) -> LegacyResult<ReportDefinition>;
}

/// Report type of a legacy numeric type id.
pub fn report_type_for(legacy_type: u32) -> Option<ReportType> {
    match legacy_type {
        1 => Some(ReportType::UsersCourses),
        3 => Some(ReportType::GroupsCourses),
        5 => Some(ReportType::UsersCertifications),
        6 => Some(ReportType::UsersLearningPlans),
        8 => Some(ReportType::EcommerceTransactions),
        12 => Some(ReportType::UsersWebinarSessions),
        _ => None,
    }
}

/// Decoded filter data plus its required `filters` section.
#[derive(Debug)]
pub struct Decoded {
    pub data: LegacyFilterData,
    pub filters: LegacyFilters,
}

/// Decode `filter_data`; a document without `filters` is rejected.
pub fn decode(doc: &LegacyReportDoc) -> LegacyResult<Decoded> {
    let mut data: LegacyFilterData = serde_json::from_str(&doc.filter_data)?;
    let filters = data.filters.take().ok_or(LegacyError::MissingFilters)?;
    Ok(Decoded { data, filters })
}

fn timestamp(raw: Option<&str>) -> LegacyResult<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .map(|naive| Some(naive.and_utc()))
            .map_err(|_| LegacyError::InvalidTimestamp(s.to_string())),
    }
}

fn branches(legacy: &[LegacyBranch]) -> Vec<BranchSelection> {
    legacy
        .iter()
        .map(|b| BranchSelection {
            id: b.id,
            descendants: b.descendants,
        })
        .collect()
}

/// Visibility of a migrated report.
pub fn visibility(rules: Option<&LegacyVisibilityRules>) -> Visibility {
    let Some(rules) = rules else {
        return Visibility::default();
    };
    let visibility_type = match rules.visibility_type {
        LegacyVisibilityType::Public => VisibilityType::AllGodAdmins,
        LegacyVisibilityType::Private => VisibilityType::AllGodAdminsAndPowerUsers,
        LegacyVisibilityType::Selection => VisibilityType::AllGodAdminsAndSelectedPowerUsers,
    };
    Visibility {
        visibility_type,
        users: rules.users.clone(),
        groups: rules.groups.clone(),
        branches: branches(&rules.branches),
    }
}

/// Skeleton of `report_type` carrying the fields every type shares:
/// title, authorship, timestamps, visibility and the legacy id.
pub fn base_definition(
    report_type: ReportType,
    doc: &LegacyReportDoc,
    platform: &str,
    rules: Option<&LegacyVisibilityRules>,
) -> LegacyResult<ReportDefinition> {
    if report_type_for(doc.report_type_id) != Some(report_type) {
        return Err(LegacyError::WrongType {
            expected: report_type,
            found: doc.report_type_id,
        });
    }
    let mut definition =
        ReportDefinition::new(report_type, Uuid::new_v4().to_string(), doc.name.clone());
    definition.platform = platform.to_string();
    definition.author = doc.author_id;
    definition.creation_date = timestamp(doc.creation_date.as_deref())?;
    definition.last_edit_by = doc.last_edit_by;
    definition.last_edit_date = timestamp(doc.last_edit_date.as_deref())?;
    definition.standard = doc.is_standard;
    definition.visibility = visibility(rules);
    definition.imported_from_legacy_id = Some(doc.id);
    Ok(definition)
}

/// Import the user selection and the user toggles.
pub fn apply_users(definition: &mut ReportDefinition, decoded: &Decoded) {
    if let Some(users) = &decoded.data.users {
        definition.users.all = users.all;
        definition.users.users = users.users.clone();
        definition.users.groups = users.groups.clone();
        definition.users.branches = branches(&users.branches);
    }
    definition.users.hide_deactivated = decoded.filters.hide_deactivated;
    definition.users.show_only_learners = decoded.filters.show_only_learners;
}

/// `(all, ids)` of an optional legacy selection; absent means everything.
pub fn selection(legacy: Option<&LegacyIdSelection>) -> (bool, Vec<u64>) {
    match legacy {
        Some(s) => (s.all, s.ids.clone()),
        None => (true, Vec::new()),
    }
}

/// Import the course selection and `hide_expired`.
pub fn apply_courses(definition: &mut ReportDefinition, decoded: &Decoded) {
    let (all, ids) = selection(decoded.data.courses.as_ref());
    definition.courses.all = all;
    definition.courses.courses = ids;
    definition.courses.hide_expired = decoded.filters.hide_expired;
}

/// Legacy `condition_status`.
pub fn conditions(filters: &LegacyFilters) -> Conditions {
    match filters.condition_status.as_deref() {
        Some(s) if s.eq_ignore_ascii_case("or") => Conditions::Or,
        _ => Conditions::And,
    }
}

/// Legacy enrollment status names; unknown names are dropped.
pub fn enrollment_statuses(names: &[String]) -> Vec<EnrollmentStatus> {
    names
        .iter()
        .filter_map(|name| match name.trim() {
            "waiting_list" | "waiting" => Some(EnrollmentStatus::WaitingList),
            "subscribed" | "enrolled" => Some(EnrollmentStatus::Subscribed),
            "in_progress" | "in-progress" => Some(EnrollmentStatus::InProgress),
            "completed" => Some(EnrollmentStatus::Completed),
            "suspended" => Some(EnrollmentStatus::Suspended),
            "overbooking" => Some(EnrollmentStatus::Overbooking),
            _ => None,
        })
        .collect()
}

/// Fields, sort and enrollment/completion dates shared by the course-centric
/// types; `scan` is the type's legacy entity order.
pub fn apply_fields_and_order(
    definition: &mut ReportDefinition,
    decoded: &Decoded,
    scan: &[LegacyEntity],
) {
    definition.fields = fields::translate_fields(definition.report_type, &decoded.data.fields, scan);
    if let Some(sorting) =
        fields::translate_order(decoded.data.order.as_ref(), scan, &definition.fields)
    {
        definition.sorting_options = Some(sorting);
    }
    definition.conditions = conditions(&decoded.filters);
}
