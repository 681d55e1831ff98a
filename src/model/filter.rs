//! Filter blocks of a report definition.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::field::AdditionalFieldRef;

/// Visibility-resolved id set for one entity.
///
/// `Ids(vec![])` means "nothing is visible", which is not the same as `All`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSelection {
    All,
    Ids(Vec<u64>),
}

impl IdSelection {
    /// An explicit selection, or everything when `all` is set.
    pub fn from_filter(all: bool, ids: &[u64]) -> Self {
        if all {
            IdSelection::All
        } else {
            IdSelection::Ids(ids.to_vec())
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, IdSelection::All)
    }

    /// Keep only ids present in both selections.
    pub fn intersect(self, other: IdSelection) -> IdSelection {
        match (self, other) {
            (IdSelection::All, other) => other,
            (this, IdSelection::All) => this,
            (IdSelection::Ids(a), IdSelection::Ids(b)) => {
                IdSelection::Ids(a.into_iter().filter(|id| b.contains(id)).collect())
            }
        }
    }
}

/// A branch (org chart node) selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSelection {
    pub id: u64,
    #[serde(default)]
    pub descendants: bool,
}

/// How several predicates are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conditions {
    #[default]
    And,
    Or,
}

/// Value matched by an additional-field filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum AdditionalFieldMatch {
    Contains(String),
    Equals(String),
    Option(u64),
    YesNo(bool),
    Country(u64),
}

/// Filter on a user additional field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalFieldFilter {
    #[serde(with = "additional_ref_key")]
    pub field_id: AdditionalFieldRef,
    pub value: AdditionalFieldMatch,
}

mod additional_ref_key {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::model::field::{AdditionalFieldRef, FieldId};

    pub fn serialize<S: Serializer>(r: &AdditionalFieldRef, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&r.key())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<AdditionalFieldRef, D::Error> {
        let key = String::deserialize(d)?;
        match key.parse::<FieldId>().map_err(de::Error::custom)? {
            FieldId::Additional(r) => Ok(r),
            other => Err(de::Error::custom(format!(
                "'{}' is not an additional field",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsersFilter {
    pub all: bool,
    pub users: Vec<u64>,
    pub groups: Vec<u64>,
    pub branches: Vec<BranchSelection>,
    pub hide_deactivated: bool,
    pub show_only_learners: bool,
    pub additional_fields: Vec<AdditionalFieldFilter>,
    pub additional_fields_condition: Conditions,
}

impl Default for UsersFilter {
    fn default() -> Self {
        Self {
            all: true,
            users: Vec::new(),
            groups: Vec::new(),
            branches: Vec::new(),
            hide_deactivated: false,
            show_only_learners: false,
            additional_fields: Vec::new(),
            additional_fields_condition: Conditions::And,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoursesFilter {
    pub all: bool,
    pub courses: Vec<u64>,
    pub hide_expired: bool,
}

impl Default for CoursesFilter {
    fn default() -> Self {
        Self {
            all: true,
            courses: Vec::new(),
            hide_expired: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupsFilter {
    pub all: bool,
    pub groups: Vec<u64>,
}

impl Default for GroupsFilter {
    fn default() -> Self {
        Self {
            all: true,
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificationsFilter {
    pub all: bool,
    pub certifications: Vec<u64>,
    pub active: bool,
    pub expired: bool,
    pub archived: bool,
}

impl Default for CertificationsFilter {
    fn default() -> Self {
        Self {
            all: true,
            certifications: Vec::new(),
            active: true,
            expired: true,
            archived: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LearningPlansFilter {
    pub all: bool,
    pub learning_plans: Vec<u64>,
}

impl Default for LearningPlansFilter {
    fn default() -> Self {
        Self {
            all: true,
            learning_plans: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    All,
    Paid,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EcommerceFilter {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionsFilter {
    pub all: bool,
    pub sessions: Vec<u64>,
}

impl Default for SessionsFilter {
    fn default() -> Self {
        Self {
            all: true,
            sessions: Vec::new(),
        }
    }
}

/// Course enrollment status as stored in the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnrollmentStatus {
    WaitingList,
    Subscribed,
    InProgress,
    Completed,
    Suspended,
    Overbooking,
}

impl EnrollmentStatus {
    pub const ALL: [EnrollmentStatus; 6] = [
        EnrollmentStatus::WaitingList,
        EnrollmentStatus::Subscribed,
        EnrollmentStatus::InProgress,
        EnrollmentStatus::Completed,
        EnrollmentStatus::Suspended,
        EnrollmentStatus::Overbooking,
    ];

    /// Value of `learning_courseuser.status`.
    pub fn code(&self) -> i64 {
        match self {
            EnrollmentStatus::WaitingList => -2,
            EnrollmentStatus::Subscribed => 0,
            EnrollmentStatus::InProgress => 1,
            EnrollmentStatus::Completed => 2,
            EnrollmentStatus::Suspended => 3,
            EnrollmentStatus::Overbooking => 4,
        }
    }

    pub fn label_key(&self) -> &'static str {
        match self {
            EnrollmentStatus::WaitingList => "enrollment_status.waiting_list",
            EnrollmentStatus::Subscribed => "enrollment_status.subscribed",
            EnrollmentStatus::InProgress => "enrollment_status.in_progress",
            EnrollmentStatus::Completed => "enrollment_status.completed",
            EnrollmentStatus::Suspended => "enrollment_status.suspended",
            EnrollmentStatus::Overbooking => "enrollment_status.overbooking",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrollmentFilter {
    /// Empty means every status.
    pub statuses: Vec<EnrollmentStatus>,
}

/// Kind of date restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFilterType {
    #[default]
    Relative,
    Range,
}

/// Comparison against "now minus N days".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateOperator {
    IsAfter,
    IsBefore,
    IsEqual,
}

/// A date-filter block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateFilter {
    pub any: bool,
    #[serde(rename = "type")]
    pub filter_type: DateFilterType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<DateOperator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

impl Default for DateFilter {
    fn default() -> Self {
        Self::any()
    }
}

impl DateFilter {
    /// No restriction.
    pub fn any() -> Self {
        Self {
            any: true,
            filter_type: DateFilterType::Relative,
            operator: None,
            days: None,
            from: None,
            to: None,
        }
    }

    pub fn relative(operator: DateOperator, days: u32) -> Self {
        Self {
            any: false,
            filter_type: DateFilterType::Relative,
            operator: Some(operator),
            days: Some(days),
            from: None,
            to: None,
        }
    }

    pub fn range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self {
            any: false,
            filter_type: DateFilterType::Range,
            operator: None,
            days: None,
            from,
            to,
        }
    }
}
