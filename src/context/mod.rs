//! Collaborators consumed by the compiler and the migration orchestrator.
//!
//! The core never talks to the platform directly. Tenant settings, the
//! additional-field catalogue, visibility resolution and translations are
//! reached through the traits below; [`fixture::StaticTenant`] implements all
//! of them from a JSON document for the CLI and for tests.
//!
//! # Example
//!
//! ```ignore
//! use lms_reports::context::{AdditionalFieldCatalog, Collaborators};
//! use lms_reports::model::AdditionalEntity;
//!
//! async fn titles(collab: &Collaborators<'_>) -> ContextResult<Vec<String>> {
//!     let fields = collab.catalog.fields(AdditionalEntity::User).await?;
//!     Ok(fields.into_iter().map(|f| f.title).collect())
//! }
//! ```

pub mod fixture;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{
    AdditionalEntity, CertificationsFilter, CoursesFilter, Feature, GroupsFilter, IdSelection,
    LearningPlansFilter, SessionsFilter, UsersFilter,
};

/// Failure of an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("{service} unavailable: {message}")]
    Unavailable {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned an invalid response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },
}

impl ContextError {
    pub fn unavailable(service: &'static str, message: impl Into<String>) -> Self {
        ContextError::Unavailable {
            service,
            message: message.into(),
        }
    }
}

/// Result type for collaborator calls.
pub type ContextResult<T> = Result<T, ContextError>;

// =============================================================================
// Tenant / session
// =============================================================================

/// Level of the user the current session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserLevel {
    #[default]
    GodAdmin,
    PowerUser,
    User,
}

/// Tenant and session settings.
pub trait TenantContext: Send + Sync {
    /// Platform (tenant) identifier.
    fn platform(&self) -> &str;

    /// Language code used for labels.
    fn language(&self) -> &str;

    /// Timezone dates are rendered in, unless the definition overrides it.
    fn timezone(&self) -> &str;

    fn feature_enabled(&self, feature: Feature) -> bool;

    /// Level of the session user.
    fn user_level(&self) -> UserLevel;
}

// =============================================================================
// Visibility
// =============================================================================

/// Who a visibility resolution is performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveScope {
    /// Restrict to what the session user may see.
    pub check_visibility: bool,
    /// Resolution runs for a scheduled delivery rather than a live session.
    pub from_schedule: bool,
    /// Report author, used for scheduled runs.
    pub author: Option<u64>,
}

/// Turns entity filter blocks into the ids the report may read.
///
/// Every method returns [`IdSelection::All`] only when no restriction applies;
/// an empty [`IdSelection::Ids`] means nothing is visible.
#[async_trait]
pub trait VisibilityResolver: Send + Sync {
    async fn users(&self, filter: &UsersFilter, scope: ResolveScope)
        -> ContextResult<IdSelection>;

    async fn courses(
        &self,
        filter: &CoursesFilter,
        scope: ResolveScope,
    ) -> ContextResult<IdSelection>;

    async fn groups(&self, filter: &GroupsFilter, scope: ResolveScope)
        -> ContextResult<IdSelection>;

    async fn certifications(
        &self,
        filter: &CertificationsFilter,
        scope: ResolveScope,
    ) -> ContextResult<IdSelection>;

    async fn learning_plans(
        &self,
        filter: &LearningPlansFilter,
        scope: ResolveScope,
    ) -> ContextResult<IdSelection>;

    async fn sessions(
        &self,
        filter: &SessionsFilter,
        scope: ResolveScope,
    ) -> ContextResult<IdSelection>;
}

// =============================================================================
// Additional fields
// =============================================================================

/// Declared type of an additional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalFieldType {
    Text,
    Textarea,
    Date,
    Dropdown,
    YesNo,
    Country,
}

/// A tenant-defined additional field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalFieldDef {
    pub id: u64,
    /// Title in the session language.
    pub title: String,
    #[serde(rename = "type")]
    pub field_type: AdditionalFieldType,
}

/// The tenant's additional-field catalogue.
#[async_trait]
pub trait AdditionalFieldCatalog: Send + Sync {
    /// Fields declared for an entity.
    async fn fields(&self, entity: AdditionalEntity) -> ContextResult<Vec<AdditionalFieldDef>>;

    /// Ids of fields that physically exist in the warehouse for this platform.
    async fn materialized(&self, entity: AdditionalEntity) -> ContextResult<HashSet<u64>>;
}

// =============================================================================
// Translations
// =============================================================================

/// Translation lookup for labels and CASE literals.
pub trait Translator: Send + Sync {
    /// Translation of `key` in `language`, if one exists.
    fn translate(&self, key: &str, language: &str) -> Option<String>;
}

// =============================================================================
// Bundle
// =============================================================================

/// Everything a compilation consumes from the outside.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub tenant: &'a dyn TenantContext,
    pub visibility: &'a dyn VisibilityResolver,
    pub catalog: &'a dyn AdditionalFieldCatalog,
    pub translator: &'a dyn Translator,
}

impl<'a> Collaborators<'a> {
    /// Borrow all collaborators from one value implementing every trait.
    pub fn from_single<T>(all: &'a T) -> Self
    where
        T: TenantContext + VisibilityResolver + AdditionalFieldCatalog + Translator,
    {
        Self {
            tenant: all,
            visibility: all,
            catalog: all,
            translator: all,
        }
    }
}

impl std::fmt::Debug for Collaborators<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("platform", &self.tenant.platform())
            .finish_non_exhaustive()
    }
}
