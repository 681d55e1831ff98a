//! Static, JSON-backed collaborators.
//!
//! A `StaticTenant` answers every collaborator trait from data loaded up
//! front. The CLI reads one from a tenant file; tests build one in code.
//!
//! ```json
//! {
//!   "platform": "acme.example.com",
//!   "language": "en",
//!   "timezone": "Europe/Rome",
//!   "features": ["certifications", "courseCredits"],
//!   "additionalFields": {"user": [{"id": 12, "title": "Badge", "type": "text"}]},
//!   "materialized": {"user": [12]},
//!   "visible": {"courses": [1, 2, 3]},
//!   "groupMembers": {"5": [100, 101]},
//!   "translations": {"user_userid": "Username"}
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    AdditionalFieldCatalog, AdditionalFieldDef, ContextError, ContextResult, ResolveScope,
    TenantContext, Translator, UserLevel, VisibilityResolver,
};
use crate::model::{
    AdditionalEntity, CertificationsFilter, CoursesFilter, Feature, GroupsFilter, IdSelection,
    LearningPlansFilter, SessionsFilter, UsersFilter,
};

/// Ids the session user may see, per entity. `None` means unrestricted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisibleIds {
    pub users: Option<Vec<u64>>,
    pub courses: Option<Vec<u64>>,
    pub groups: Option<Vec<u64>>,
    pub certifications: Option<Vec<u64>>,
    pub learning_plans: Option<Vec<u64>>,
    pub sessions: Option<Vec<u64>>,
}

/// Number of calls each collaborator received.
#[derive(Debug, Default)]
pub struct CallCounts {
    fields: AtomicUsize,
    materialized: AtomicUsize,
    visibility: AtomicUsize,
}

impl CallCounts {
    pub fn fields(&self) -> usize {
        self.fields.load(Ordering::SeqCst)
    }

    pub fn materialized(&self) -> usize {
        self.materialized.load(Ordering::SeqCst)
    }

    pub fn visibility(&self) -> usize {
        self.visibility.load(Ordering::SeqCst)
    }
}

/// Error loading a tenant file.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// A tenant whose collaborators answer from static data.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticTenant {
    pub platform: String,
    pub language: String,
    pub timezone: String,
    pub features: HashSet<Feature>,
    pub user_level: UserLevel,
    pub additional_fields: HashMap<AdditionalEntity, Vec<AdditionalFieldDef>>,
    /// Physically present fields per entity; an absent entity means all
    /// declared fields are present.
    pub materialized: HashMap<AdditionalEntity, HashSet<u64>>,
    pub visible: VisibleIds,
    pub group_members: HashMap<u64, Vec<u64>>,
    pub branch_members: HashMap<u64, Vec<u64>>,
    pub translations: HashMap<String, String>,
    /// Every async collaborator call fails, as if the service were down.
    pub unavailable: bool,
    #[serde(skip)]
    calls: CallCounts,
}

impl StaticTenant {
    pub fn new(platform: &str) -> Self {
        Self {
            platform: platform.into(),
            language: "en".into(),
            timezone: "UTC".into(),
            ..Default::default()
        }
    }

    /// Load a tenant from a JSON file.
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        Self::load_with_locale(path, "en", "UTC")
    }

    /// Load a tenant, falling back to `language` and `timezone` when the file
    /// declares none.
    pub fn load_with_locale(
        path: &Path,
        language: &str,
        timezone: &str,
    ) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut tenant: StaticTenant =
            serde_json::from_str(&content).map_err(|source| FixtureError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        if tenant.language.is_empty() {
            tenant.language = language.into();
        }
        if tenant.timezone.is_empty() {
            tenant.timezone = timezone.into();
        }
        Ok(tenant)
    }

    pub fn with_timezone(mut self, timezone: &str) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.insert(feature);
        self
    }

    pub fn with_all_features(self) -> Self {
        [
            Feature::Certifications,
            Feature::LearningPlans,
            Feature::Ecommerce,
            Feature::Webinars,
            Feature::CourseCredits,
        ]
        .into_iter()
        .fold(self, |tenant, feature| tenant.with_feature(feature))
    }

    /// Declare an additional field, physically present or not.
    pub fn with_additional_field(
        mut self,
        entity: AdditionalEntity,
        def: AdditionalFieldDef,
        materialized: bool,
    ) -> Self {
        let present = self.materialized.entry(entity).or_default();
        if materialized {
            present.insert(def.id);
        }
        self.additional_fields.entry(entity).or_default().push(def);
        self
    }

    pub fn with_visible(mut self, visible: VisibleIds) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_translation(mut self, key: &str, text: &str) -> Self {
        self.translations.insert(key.into(), text.into());
        self
    }

    pub fn with_group_members(mut self, group: u64, users: Vec<u64>) -> Self {
        self.group_members.insert(group, users);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    fn check_available(&self, service: &'static str) -> ContextResult<()> {
        if self.unavailable {
            Err(ContextError::unavailable(service, "service is not reachable"))
        } else {
            Ok(())
        }
    }

    fn resolve(
        &self,
        requested: IdSelection,
        visible: &Option<Vec<u64>>,
        scope: ResolveScope,
    ) -> ContextResult<IdSelection> {
        self.calls.visibility.fetch_add(1, Ordering::SeqCst);
        self.check_available("visibility resolver")?;
        let restricted = match (scope.check_visibility, visible) {
            (true, Some(ids)) => requested.intersect(IdSelection::Ids(ids.clone())),
            _ => requested,
        };
        Ok(restricted)
    }
}

impl TenantContext for StaticTenant {
    fn platform(&self) -> &str {
        &self.platform
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn timezone(&self) -> &str {
        &self.timezone
    }

    fn feature_enabled(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    fn user_level(&self) -> UserLevel {
        self.user_level
    }
}

#[async_trait]
impl VisibilityResolver for StaticTenant {
    async fn users(
        &self,
        filter: &UsersFilter,
        scope: ResolveScope,
    ) -> ContextResult<IdSelection> {
        let requested = if filter.all {
            IdSelection::All
        } else {
            let mut ids: Vec<u64> = filter.users.clone();
            let members = filter
                .groups
                .iter()
                .filter_map(|g| self.group_members.get(g))
                .chain(
                    filter
                        .branches
                        .iter()
                        .filter_map(|b| self.branch_members.get(&b.id)),
                )
                .flatten();
            for id in members {
                if !ids.contains(id) {
                    ids.push(*id);
                }
            }
            IdSelection::Ids(ids)
        };
        self.resolve(requested, &self.visible.users, scope)
    }

    async fn courses(
        &self,
        filter: &CoursesFilter,
        scope: ResolveScope,
    ) -> ContextResult<IdSelection> {
        let requested = IdSelection::from_filter(filter.all, &filter.courses);
        self.resolve(requested, &self.visible.courses, scope)
    }

    async fn groups(
        &self,
        filter: &GroupsFilter,
        scope: ResolveScope,
    ) -> ContextResult<IdSelection> {
        let requested = IdSelection::from_filter(filter.all, &filter.groups);
        self.resolve(requested, &self.visible.groups, scope)
    }

    async fn certifications(
        &self,
        filter: &CertificationsFilter,
        scope: ResolveScope,
    ) -> ContextResult<IdSelection> {
        let requested = IdSelection::from_filter(filter.all, &filter.certifications);
        self.resolve(requested, &self.visible.certifications, scope)
    }

    async fn learning_plans(
        &self,
        filter: &LearningPlansFilter,
        scope: ResolveScope,
    ) -> ContextResult<IdSelection> {
        let requested = IdSelection::from_filter(filter.all, &filter.learning_plans);
        self.resolve(requested, &self.visible.learning_plans, scope)
    }

    async fn sessions(
        &self,
        filter: &SessionsFilter,
        scope: ResolveScope,
    ) -> ContextResult<IdSelection> {
        let requested = IdSelection::from_filter(filter.all, &filter.sessions);
        self.resolve(requested, &self.visible.sessions, scope)
    }
}

#[async_trait]
impl AdditionalFieldCatalog for StaticTenant {
    async fn fields(&self, entity: AdditionalEntity) -> ContextResult<Vec<AdditionalFieldDef>> {
        self.calls.fields.fetch_add(1, Ordering::SeqCst);
        self.check_available("additional field catalogue")?;
        Ok(self
            .additional_fields
            .get(&entity)
            .cloned()
            .unwrap_or_default())
    }

    async fn materialized(&self, entity: AdditionalEntity) -> ContextResult<HashSet<u64>> {
        self.calls.materialized.fetch_add(1, Ordering::SeqCst);
        self.check_available("additional field catalogue")?;
        Ok(match self.materialized.get(&entity) {
            Some(ids) => ids.clone(),
            None => self
                .additional_fields
                .get(&entity)
                .map(|defs| defs.iter().map(|d| d.id).collect())
                .unwrap_or_default(),
        })
    }
}

impl Translator for StaticTenant {
    fn translate(&self, key: &str, _language: &str) -> Option<String> {
        self.translations.get(key).cloned()
    }
}
