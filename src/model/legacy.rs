//! Legacy report documents.
//!
//! The legacy store keeps one row per report with a free-form `filter_data`
//! JSON string. These types decode that string leniently: legacy writers
//! stored ids both as numbers and as numeric strings, and omitted empty
//! sections entirely.

use serde::{Deserialize, Deserializer, Serialize};

/// A legacy report row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyReportDoc {
    pub id: u64,
    pub report_type_id: u32,
    pub name: String,
    #[serde(default)]
    pub author_id: Option<u64>,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub last_edit_by: Option<u64>,
    #[serde(default)]
    pub last_edit_date: Option<String>,
    #[serde(default)]
    pub is_standard: bool,
    pub filter_data: String,
    #[serde(default)]
    pub visibility: Option<LegacyVisibilityRules>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacyVisibilityType {
    #[default]
    Public,
    Private,
    Selection,
}

/// Visibility rules attached to a legacy report.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyVisibilityRules {
    #[serde(rename = "type")]
    pub visibility_type: LegacyVisibilityType,
    #[serde(deserialize_with = "lenient_ids")]
    pub users: Vec<u64>,
    #[serde(deserialize_with = "lenient_ids")]
    pub groups: Vec<u64>,
    pub branches: Vec<LegacyBranch>,
}

/// Decoded `filter_data`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct LegacyFilterData {
    pub fields: LegacyFields,
    pub order: Option<LegacyOrder>,
    /// Required; a document without it cannot be translated.
    pub filters: Option<LegacyFilters>,
    pub users: Option<LegacyUsersSelection>,
    pub courses: Option<LegacyIdSelection>,
    pub groups: Option<LegacyIdSelection>,
    pub certifications: Option<LegacyIdSelection>,
    pub plans: Option<LegacyIdSelection>,
    pub sessions: Option<LegacyIdSelection>,
}

/// Selected legacy field names per entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct LegacyFields {
    pub user: Vec<String>,
    pub course: Vec<String>,
    pub enrollment: Vec<String>,
    pub stat: Vec<String>,
    pub group: Vec<String>,
    pub certification: Vec<String>,
    pub plan: Vec<String>,
    pub ecommerce: Vec<String>,
    pub session: Vec<String>,
}

/// Entity sections of [`LegacyFields`], as named in legacy documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyEntity {
    User,
    Course,
    Enrollment,
    Stat,
    Group,
    Certification,
    Plan,
    Ecommerce,
    Session,
}

impl LegacyEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegacyEntity::User => "user",
            LegacyEntity::Course => "course",
            LegacyEntity::Enrollment => "enrollment",
            LegacyEntity::Stat => "stat",
            LegacyEntity::Group => "group",
            LegacyEntity::Certification => "certification",
            LegacyEntity::Plan => "plan",
            LegacyEntity::Ecommerce => "ecommerce",
            LegacyEntity::Session => "session",
        }
    }
}

impl LegacyFields {
    pub fn for_entity(&self, entity: LegacyEntity) -> &[String] {
        match entity {
            LegacyEntity::User => &self.user,
            LegacyEntity::Course => &self.course,
            LegacyEntity::Enrollment => &self.enrollment,
            LegacyEntity::Stat => &self.stat,
            LegacyEntity::Group => &self.group,
            LegacyEntity::Certification => &self.certification,
            LegacyEntity::Plan => &self.plan,
            LegacyEntity::Ecommerce => &self.ecommerce,
            LegacyEntity::Session => &self.session,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LegacyOrder {
    /// `entity.name` or a bare `name`.
    pub field: String,
    #[serde(default = "default_direction")]
    pub direction: String,
}

fn default_direction() -> String {
    "asc".into()
}

/// The `filters` section.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct LegacyFilters {
    pub start_date: Option<LegacyDateFilter>,
    pub end_date: Option<LegacyDateFilter>,
    pub condition_status: Option<String>,
    pub hide_deactivated: bool,
    pub show_only_learners: bool,
    pub hide_expired: bool,
    pub enrollment_status: Vec<String>,
    pub certification_status: Vec<String>,
    pub payment_status: Option<String>,
}

/// `{type, data}`; `data` varies with `type` and is decoded on use.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LegacyDateFilter {
    #[serde(rename = "type", default)]
    pub filter_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyBranch {
    #[serde(deserialize_with = "lenient_id")]
    pub id: u64,
    pub descendants: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct LegacyUsersSelection {
    pub all: bool,
    #[serde(deserialize_with = "lenient_ids")]
    pub users: Vec<u64>,
    #[serde(deserialize_with = "lenient_ids")]
    pub groups: Vec<u64>,
    pub branches: Vec<LegacyBranch>,
}

/// `{all, <entity plural>: [...]}` for courses, groups, certifications,
/// plans and sessions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct LegacyIdSelection {
    pub all: bool,
    #[serde(
        alias = "courses",
        alias = "groups",
        alias = "certifications",
        alias = "plans",
        alias = "sessions",
        deserialize_with = "lenient_ids"
    )]
    pub ids: Vec<u64>,
}

fn value_to_id(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    value_to_id(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid id: {}", value)))
}

/// Ids as numbers or numeric strings; anything else is dropped.
fn lenient_ids<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u64>, D::Error> {
    let value = Option::<Vec<serde_json::Value>>::deserialize(d)?;
    Ok(value
        .unwrap_or_default()
        .iter()
        .filter_map(value_to_id)
        .collect())
}
