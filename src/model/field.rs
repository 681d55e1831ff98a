//! Field catalogue keys.
//!
//! Every selectable column is a [`FieldId`]: either a base field owned by one
//! entity group, or a tenant-defined additional field. Keys serialise as flat
//! strings (`user_userid`, `user_extrafield_12`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::definition::Feature;

/// Error parsing a field key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldIdError {
    #[error("unknown field '{0}'")]
    Unknown(String),
    #[error("invalid additional field key '{0}'")]
    InvalidAdditional(String),
}

macro_rules! field_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $key:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn key(&self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }

            pub fn from_key(key: &str) -> Option<Self> {
                match key {
                    $($key => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

field_enum! {
    /// Learner identity fields.
    UserField {
        Userid => "user_userid",
        Firstname => "user_firstname",
        Lastname => "user_lastname",
        Fullname => "user_fullname",
        Email => "user_email",
        Level => "user_level",
        RegisterDate => "user_register_date",
        LastAccessDate => "user_last_access_date",
        ExpirationDate => "user_expiration_date",
        Deactivated => "user_deactivated",
        SuspendDate => "user_suspend_date",
        BranchName => "user_branch_name",
    }
}

field_enum! {
    /// Course attributes.
    CourseField {
        Id => "course_id",
        Code => "course_code",
        Name => "course_name",
        Type => "course_type",
        Status => "course_status",
        Credits => "course_credits",
        CreationDate => "course_creation_date",
        DateBegin => "course_date_begin",
        DateEnd => "course_date_end",
        Category => "course_category",
        Language => "course_language",
    }
}

field_enum! {
    /// Attributes of one learner's enrollment in one course.
    EnrollmentField {
        Level => "enrollment_level",
        Status => "enrollment_status",
        EnrollmentDate => "enrollment_enrollment_date",
        FirstAccess => "enrollment_first_access",
        CompletionDate => "enrollment_completion_date",
        LastAccess => "enrollment_last_access",
        Score => "enrollment_score",
        ExpirationDate => "enrollment_expiration_date",
        SessionTime => "enrollment_session_time",
        Credits => "enrollment_credits",
    }
}

field_enum! {
    /// Aggregated enrollment statistics.
    StatsField {
        UsersEnrolled => "stats_users_enrolled",
        Completed => "stats_completed",
        InProgress => "stats_in_progress",
        NotStarted => "stats_not_started",
        CompletedPercentage => "stats_completed_percentage",
        InProgressPercentage => "stats_in_progress_percentage",
        NotStartedPercentage => "stats_not_started_percentage",
        TotalSessionTime => "stats_total_session_time",
    }
}

field_enum! {
    /// Group attributes.
    GroupField {
        Name => "group_name",
        MembersCount => "group_members_count",
    }
}

field_enum! {
    /// Certification and issued-certification attributes.
    CertificationField {
        Title => "certification_title",
        Code => "certification_code",
        Description => "certification_description",
        Duration => "certification_duration",
        IssuedOn => "certification_issued_on",
        ExpiresOn => "certification_expires_on",
        Status => "certification_status",
    }
}

field_enum! {
    /// Learning plan and learning-plan enrollment attributes.
    LearningPlanField {
        Name => "lp_name",
        Code => "lp_code",
        Credits => "lp_credits",
        EnrollmentDate => "lp_enrollment_date",
        CompletionDate => "lp_completion_date",
        EnrollmentStatus => "lp_enrollment_status",
        CompletionPercentage => "lp_completion_percentage",
    }
}

field_enum! {
    /// E-commerce transaction attributes.
    EcommerceField {
        TransactionId => "ecommerce_transaction_id",
        TransactionDate => "ecommerce_transaction_date",
        PaymentStatus => "ecommerce_payment_status",
        PaymentMethod => "ecommerce_payment_method",
        Currency => "ecommerce_currency",
        CouponCode => "ecommerce_coupon_code",
        TotalPrice => "ecommerce_total_price",
        ItemsCount => "ecommerce_items_count",
        BillingCompany => "ecommerce_billing_company",
        BillingVat => "ecommerce_billing_vat",
    }
}

field_enum! {
    /// Webinar session and attendance attributes.
    SessionField {
        Name => "session_name",
        DateBegin => "session_date_begin",
        DateEnd => "session_date_end",
        Tool => "session_tool",
        Instructor => "session_instructor",
        EnrollmentDate => "session_enrollment_date",
        AttendanceStatus => "session_attendance_status",
    }
}

/// Entities that carry tenant-defined additional fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalEntity {
    User,
    Course,
    LearningPlan,
    Enrollment,
    Session,
}

impl AdditionalEntity {
    pub const ALL: [AdditionalEntity; 5] = [
        AdditionalEntity::User,
        AdditionalEntity::Course,
        AdditionalEntity::LearningPlan,
        AdditionalEntity::Enrollment,
        AdditionalEntity::Session,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdditionalEntity::User => "user",
            AdditionalEntity::Course => "course",
            AdditionalEntity::LearningPlan => "learning_plan",
            AdditionalEntity::Enrollment => "enrollment",
            AdditionalEntity::Session => "session",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.as_str() == s)
    }
}

impl fmt::Display for AdditionalEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a tenant-defined additional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdditionalFieldRef {
    pub entity: AdditionalEntity,
    pub id: u64,
}

impl AdditionalFieldRef {
    pub fn new(entity: AdditionalEntity, id: u64) -> Self {
        Self { entity, id }
    }

    pub fn key(&self) -> String {
        format!("{}_extrafield_{}", self.entity, self.id)
    }
}

/// Field groups a report type may accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    User,
    Course,
    Enrollment,
    Stats,
    Group,
    Certification,
    LearningPlan,
    Ecommerce,
    Session,
    Additional(AdditionalEntity),
}

/// A selectable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldId {
    User(UserField),
    Course(CourseField),
    Enrollment(EnrollmentField),
    Stats(StatsField),
    Group(GroupField),
    Certification(CertificationField),
    LearningPlan(LearningPlanField),
    Ecommerce(EcommerceField),
    Session(SessionField),
    Additional(AdditionalFieldRef),
}

impl FieldId {
    /// Flat string key of this field.
    pub fn key(&self) -> String {
        match self {
            FieldId::User(f) => f.key().into(),
            FieldId::Course(f) => f.key().into(),
            FieldId::Enrollment(f) => f.key().into(),
            FieldId::Stats(f) => f.key().into(),
            FieldId::Group(f) => f.key().into(),
            FieldId::Certification(f) => f.key().into(),
            FieldId::LearningPlan(f) => f.key().into(),
            FieldId::Ecommerce(f) => f.key().into(),
            FieldId::Session(f) => f.key().into(),
            FieldId::Additional(a) => a.key(),
        }
    }

    pub fn group(&self) -> FieldGroup {
        match self {
            FieldId::User(_) => FieldGroup::User,
            FieldId::Course(_) => FieldGroup::Course,
            FieldId::Enrollment(_) => FieldGroup::Enrollment,
            FieldId::Stats(_) => FieldGroup::Stats,
            FieldId::Group(_) => FieldGroup::Group,
            FieldId::Certification(_) => FieldGroup::Certification,
            FieldId::LearningPlan(_) => FieldGroup::LearningPlan,
            FieldId::Ecommerce(_) => FieldGroup::Ecommerce,
            FieldId::Session(_) => FieldGroup::Session,
            FieldId::Additional(a) => FieldGroup::Additional(a.entity),
        }
    }

    /// Tenant feature the field depends on, if any.
    pub fn required_feature(&self) -> Option<Feature> {
        match self {
            FieldId::Course(CourseField::Credits)
            | FieldId::Enrollment(EnrollmentField::Credits)
            | FieldId::LearningPlan(LearningPlanField::Credits) => Some(Feature::CourseCredits),
            _ => None,
        }
    }

    /// All base fields of a group, in catalogue order.
    pub fn base_fields(group: FieldGroup) -> Vec<FieldId> {
        match group {
            FieldGroup::User => UserField::ALL.iter().map(|f| FieldId::User(*f)).collect(),
            FieldGroup::Course => CourseField::ALL.iter().map(|f| FieldId::Course(*f)).collect(),
            FieldGroup::Enrollment => EnrollmentField::ALL
                .iter()
                .map(|f| FieldId::Enrollment(*f))
                .collect(),
            FieldGroup::Stats => StatsField::ALL.iter().map(|f| FieldId::Stats(*f)).collect(),
            FieldGroup::Group => GroupField::ALL.iter().map(|f| FieldId::Group(*f)).collect(),
            FieldGroup::Certification => CertificationField::ALL
                .iter()
                .map(|f| FieldId::Certification(*f))
                .collect(),
            FieldGroup::LearningPlan => LearningPlanField::ALL
                .iter()
                .map(|f| FieldId::LearningPlan(*f))
                .collect(),
            FieldGroup::Ecommerce => EcommerceField::ALL
                .iter()
                .map(|f| FieldId::Ecommerce(*f))
                .collect(),
            FieldGroup::Session => SessionField::ALL.iter().map(|f| FieldId::Session(*f)).collect(),
            FieldGroup::Additional(_) => Vec::new(),
        }
    }

    fn parse_base(key: &str) -> Option<FieldId> {
        UserField::from_key(key)
            .map(FieldId::User)
            .or_else(|| CourseField::from_key(key).map(FieldId::Course))
            .or_else(|| EnrollmentField::from_key(key).map(FieldId::Enrollment))
            .or_else(|| StatsField::from_key(key).map(FieldId::Stats))
            .or_else(|| GroupField::from_key(key).map(FieldId::Group))
            .or_else(|| CertificationField::from_key(key).map(FieldId::Certification))
            .or_else(|| LearningPlanField::from_key(key).map(FieldId::LearningPlan))
            .or_else(|| EcommerceField::from_key(key).map(FieldId::Ecommerce))
            .or_else(|| SessionField::from_key(key).map(FieldId::Session))
    }
}

impl FromStr for FieldId {
    type Err = FieldIdError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        if let Some(field) = FieldId::parse_base(key) {
            return Ok(field);
        }
        let Some((entity, id)) = key.split_once("_extrafield_") else {
            return Err(FieldIdError::Unknown(key.into()));
        };
        let entity = AdditionalEntity::parse(entity)
            .ok_or_else(|| FieldIdError::InvalidAdditional(key.into()))?;
        let id = id
            .parse::<u64>()
            .map_err(|_| FieldIdError::InvalidAdditional(key.into()))?;
        Ok(FieldId::Additional(AdditionalFieldRef::new(entity, id)))
    }
}

impl TryFrom<String> for FieldId {
    type Error = FieldIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldId> for String {
    fn from(field: FieldId) -> Self {
        field.key()
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
