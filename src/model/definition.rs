//! Report definitions.
//!
//! A [`ReportDefinition`] is the declarative description of a report: which
//! report type, which columns in which order, which filters, how it is sorted
//! and who can see it. Definitions are compiled to SQL without being mutated.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::field::{
    AdditionalEntity, CertificationField, CourseField, EcommerceField, FieldGroup, FieldId, GroupField,
    LearningPlanField, SessionField, UserField,
};
use super::filter::{
    BranchSelection, CertificationsFilter, Conditions, CoursesFilter, DateFilter,
    EcommerceFilter, EnrollmentFilter, GroupsFilter, LearningPlansFilter, SessionsFilter,
    UsersFilter,
};

// =============================================================================
// Report types and tenant features
// =============================================================================

/// The closed set of report types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportType {
    UsersCourses,
    GroupsCourses,
    UsersCertifications,
    UsersLearningPlans,
    EcommerceTransactions,
    UsersWebinarSessions,
}

impl ReportType {
    pub const ALL: [ReportType; 6] = [
        ReportType::UsersCourses,
        ReportType::GroupsCourses,
        ReportType::UsersCertifications,
        ReportType::UsersLearningPlans,
        ReportType::EcommerceTransactions,
        ReportType::UsersWebinarSessions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::UsersCourses => "users-courses",
            ReportType::GroupsCourses => "groups-courses",
            ReportType::UsersCertifications => "users-certifications",
            ReportType::UsersLearningPlans => "users-learning-plans",
            ReportType::EcommerceTransactions => "ecommerce-transactions",
            ReportType::UsersWebinarSessions => "users-webinar-sessions",
        }
    }

    /// Fields every definition of this type starts with.
    pub fn mandatory_fields(&self) -> &'static [FieldId] {
        match self {
            ReportType::UsersCourses => &[
                FieldId::User(UserField::Userid),
                FieldId::Course(CourseField::Name),
            ],
            ReportType::GroupsCourses => &[
                FieldId::Group(GroupField::Name),
                FieldId::Course(CourseField::Name),
            ],
            ReportType::UsersCertifications => &[
                FieldId::User(UserField::Userid),
                FieldId::Certification(CertificationField::Title),
            ],
            ReportType::UsersLearningPlans => &[
                FieldId::User(UserField::Userid),
                FieldId::LearningPlan(LearningPlanField::Name),
            ],
            ReportType::EcommerceTransactions => {
                &[FieldId::Ecommerce(EcommerceField::TransactionId)]
            }
            ReportType::UsersWebinarSessions => &[
                FieldId::User(UserField::Userid),
                FieldId::Session(SessionField::Name),
            ],
        }
    }

    /// Sort field used when the definition asks for the default sort.
    pub fn default_sort_field(&self) -> FieldId {
        match self {
            ReportType::UsersCourses
            | ReportType::UsersCertifications
            | ReportType::UsersLearningPlans => FieldId::User(UserField::Userid),
            ReportType::GroupsCourses => FieldId::Group(GroupField::Name),
            ReportType::EcommerceTransactions => {
                FieldId::Ecommerce(EcommerceField::TransactionDate)
            }
            ReportType::UsersWebinarSessions => FieldId::Session(SessionField::DateBegin),
        }
    }

    /// Tenant feature the report type requires, if any.
    pub fn required_feature(&self) -> Option<Feature> {
        match self {
            ReportType::UsersCourses | ReportType::GroupsCourses => None,
            ReportType::UsersCertifications => Some(Feature::Certifications),
            ReportType::UsersLearningPlans => Some(Feature::LearningPlans),
            ReportType::EcommerceTransactions => Some(Feature::Ecommerce),
            ReportType::UsersWebinarSessions => Some(Feature::Webinars),
        }
    }

    /// Field groups selectable in this report type.
    pub fn field_groups(&self) -> &'static [FieldGroup] {
        use AdditionalEntity as A;
        match self {
            ReportType::UsersCourses => &[
                FieldGroup::User,
                FieldGroup::Course,
                FieldGroup::Enrollment,
                FieldGroup::Additional(A::User),
                FieldGroup::Additional(A::Course),
                FieldGroup::Additional(A::Enrollment),
            ],
            ReportType::GroupsCourses => &[
                FieldGroup::Group,
                FieldGroup::Course,
                FieldGroup::Stats,
                FieldGroup::Additional(A::Course),
            ],
            ReportType::UsersCertifications => &[
                FieldGroup::User,
                FieldGroup::Certification,
                FieldGroup::Additional(A::User),
            ],
            ReportType::UsersLearningPlans => &[
                FieldGroup::User,
                FieldGroup::LearningPlan,
                FieldGroup::Additional(A::User),
                FieldGroup::Additional(A::LearningPlan),
            ],
            ReportType::EcommerceTransactions => &[
                FieldGroup::User,
                FieldGroup::Ecommerce,
                FieldGroup::Additional(A::User),
            ],
            ReportType::UsersWebinarSessions => &[
                FieldGroup::User,
                FieldGroup::Course,
                FieldGroup::Session,
                FieldGroup::Additional(A::User),
                FieldGroup::Additional(A::Course),
                FieldGroup::Additional(A::Session),
            ],
        }
    }

    pub fn accepts(&self, field: &FieldId) -> bool {
        self.field_groups().contains(&field.group())
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown report type: {}", s))
    }
}

/// Tenant feature flags that gate report types and fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    Certifications,
    LearningPlans,
    Ecommerce,
    Webinars,
    CourseCredits,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feature::Certifications => "certifications",
            Feature::LearningPlans => "learning plans",
            Feature::Ecommerce => "e-commerce",
            Feature::Webinars => "webinars",
            Feature::CourseCredits => "course credits",
        };
        f.write_str(name)
    }
}

/// The tenant has a feature disabled that a report type needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("report type {report_type} requires the {feature} feature")]
pub struct DisabledFeature {
    pub report_type: ReportType,
    pub feature: Feature,
}

// =============================================================================
// Ordered field set
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldSetError {
    #[error("field '{0}' is selected more than once")]
    Duplicate(FieldId),
}

/// Selected fields in output column order. Duplicates are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldId>", into = "Vec<FieldId>")]
pub struct FieldSet(Vec<FieldId>);

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field; a field already present is an error.
    pub fn push(&mut self, field: FieldId) -> Result<(), FieldSetError> {
        if self.0.contains(&field) {
            return Err(FieldSetError::Duplicate(field));
        }
        self.0.push(field);
        Ok(())
    }

    /// Append a field unless it is already present.
    pub fn push_unique(&mut self, field: FieldId) -> bool {
        self.push(field).is_ok()
    }

    pub fn contains(&self, field: &FieldId) -> bool {
        self.0.contains(field)
    }

    pub fn position(&self, field: &FieldId) -> Option<usize> {
        self.0.iter().position(|f| f == field)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldId> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&FieldId> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<FieldId>> for FieldSet {
    type Error = FieldSetError;

    fn try_from(fields: Vec<FieldId>) -> Result<Self, Self::Error> {
        let mut set = FieldSet::new();
        for field in fields {
            set.push(field)?;
        }
        Ok(set)
    }
}

impl From<FieldSet> for Vec<FieldId> {
    fn from(set: FieldSet) -> Self {
        set.0
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a FieldId;
    type IntoIter = std::slice::Iter<'a, FieldId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// Sorting, visibility, planning
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortSelector {
    #[default]
    Default,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortingOptions {
    pub selector: SortSelector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_field: Option<FieldId>,
    #[serde(default)]
    pub order_by: SortOrder,
}

/// Who can see a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisibilityType {
    #[default]
    AllGodAdmins,
    AllGodAdminsAndPowerUsers,
    AllGodAdminsAndSelectedPowerUsers,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Visibility {
    #[serde(rename = "type")]
    pub visibility_type: VisibilityType,
    pub users: Vec<u64>,
    pub groups: Vec<u64>,
    pub branches: Vec<BranchSelection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Day,
    Week,
    Month,
}

/// Scheduled delivery of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Planning {
    pub active: bool,
    pub every: u32,
    pub time_unit: TimeUnit,
    pub start_hour: String,
    pub timezone: String,
    pub recipients: Vec<String>,
}

impl Default for Planning {
    fn default() -> Self {
        Self {
            active: false,
            every: 1,
            time_unit: TimeUnit::Day,
            start_hour: "00:00".into(),
            timezone: "UTC".into(),
            recipients: Vec::new(),
        }
    }
}

// =============================================================================
// Report definition
// =============================================================================

/// The declarative, persisted description of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDefinition {
    pub id: String,
    #[serde(default)]
    pub platform: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub report_type: ReportType,
    pub fields: FieldSet,

    #[serde(default)]
    pub users: UsersFilter,
    #[serde(default)]
    pub courses: CoursesFilter,
    #[serde(default)]
    pub groups: GroupsFilter,
    #[serde(default)]
    pub certifications: CertificationsFilter,
    #[serde(default)]
    pub learning_plans: LearningPlansFilter,
    #[serde(default)]
    pub ecommerce: EcommerceFilter,
    #[serde(default)]
    pub sessions: SessionsFilter,
    #[serde(default)]
    pub enrollment: EnrollmentFilter,

    #[serde(default)]
    pub enrollment_date: DateFilter,
    #[serde(default)]
    pub completion_date: DateFilter,
    #[serde(default)]
    pub certification_date: DateFilter,
    #[serde(default)]
    pub expiration_date: DateFilter,
    #[serde(default)]
    pub transaction_date: DateFilter,
    #[serde(default)]
    pub session_date: DateFilter,
    /// How the date predicates are combined.
    #[serde(default)]
    pub conditions: Conditions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorting_options: Option<SortingOptions>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub planning: Planning,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub standard: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edit_by: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edit_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_from_legacy_id: Option<u64>,
}

impl ReportDefinition {
    /// Default skeleton: mandatory fields, all filters open, default sort,
    /// visible to all top-level admins.
    pub fn new(report_type: ReportType, id: impl Into<String>, title: impl Into<String>) -> Self {
        let mut fields = FieldSet::new();
        for field in report_type.mandatory_fields() {
            fields.push_unique(*field);
        }
        Self {
            id: id.into(),
            platform: String::new(),
            title: title.into(),
            description: String::new(),
            report_type,
            fields,
            users: UsersFilter::default(),
            courses: CoursesFilter::default(),
            groups: GroupsFilter::default(),
            certifications: CertificationsFilter::default(),
            learning_plans: LearningPlansFilter::default(),
            ecommerce: EcommerceFilter::default(),
            sessions: SessionsFilter::default(),
            enrollment: EnrollmentFilter::default(),
            enrollment_date: DateFilter::any(),
            completion_date: DateFilter::any(),
            certification_date: DateFilter::any(),
            expiration_date: DateFilter::any(),
            transaction_date: DateFilter::any(),
            session_date: DateFilter::any(),
            conditions: Conditions::And,
            sorting_options: Some(SortingOptions::default()),
            visibility: Visibility::default(),
            planning: Planning::default(),
            timezone: None,
            standard: false,
            author: None,
            creation_date: None,
            last_edit_by: None,
            last_edit_date: None,
            imported_from_legacy_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_has_mandatory_fields() {
        for report_type in ReportType::ALL {
            let def = ReportDefinition::new(report_type, "id", "title");
            let fields: Vec<FieldId> = def.fields.iter().copied().collect();
            assert_eq!(fields, report_type.mandatory_fields());
            for field in report_type.mandatory_fields() {
                assert!(report_type.accepts(field), "{} rejects {}", report_type, field);
            }
            assert!(report_type.accepts(&report_type.default_sort_field()));
        }
    }

    #[test]
    fn test_field_set_rejects_duplicates() {
        let result = FieldSet::try_from(vec![
            FieldId::User(UserField::Userid),
            FieldId::User(UserField::Email),
            FieldId::User(UserField::Userid),
        ]);
        assert_eq!(
            result,
            Err(FieldSetError::Duplicate(FieldId::User(UserField::Userid)))
        );
    }

    #[test]
    fn test_definition_rejects_duplicate_fields_on_deserialize() {
        let json = r#"{
            "id": "r1", "title": "t", "reportType": "users-courses",
            "fields": ["user_userid", "course_name", "user_userid"]
        }"#;
        let err = serde_json::from_str::<ReportDefinition>(json).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_definition_json_defaults() {
        let json = r#"{
            "id": "r1", "title": "t", "reportType": "groups-courses",
            "fields": ["group_name", "course_name", "stats_completed_percentage"]
        }"#;
        let def: ReportDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.report_type, ReportType::GroupsCourses);
        assert!(def.users.all);
        assert!(def.enrollment_date.any);
        assert_eq!(def.sorting_options, None);
        assert_eq!(def.fields.len(), 3);
    }

    #[test]
    fn test_report_type_round_trip() {
        for report_type in ReportType::ALL {
            assert_eq!(report_type.as_str().parse::<ReportType>(), Ok(report_type));
            let json = serde_json::to_string(&report_type).unwrap();
            assert_eq!(json, format!("\"{}\"", report_type.as_str()));
        }
    }
}
