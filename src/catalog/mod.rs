//! Field labels and the per-report field catalogue.
//!
//! Labels come from the translation service when it has an entry and from
//! the built-in English table otherwise; additional fields are listed from
//! the tenant's catalogue.

pub mod labels;

use serde::Serialize;
use tracing::debug;

use crate::compiler::{CompileError, CompileResult};
use crate::context::{Collaborators, Translator};
use crate::model::{AdditionalEntity, FieldGroup, FieldId, ReportType};

pub use labels::default_label;

/// Label lookup bound to one language.
#[derive(Clone, Copy)]
pub struct Labels<'a> {
    translator: &'a dyn Translator,
    language: &'a str,
}

impl<'a> Labels<'a> {
    pub fn new(translator: &'a dyn Translator, language: &'a str) -> Self {
        Self {
            translator,
            language,
        }
    }

    /// Translated text for `key`, the English default, or the key itself.
    pub fn get(&self, key: &str) -> String {
        self.translator
            .translate(key, self.language)
            .or_else(|| default_label(key).map(String::from))
            .unwrap_or_else(|| key.to_string())
    }

    pub fn language(&self) -> &str {
        self.language
    }
}

impl std::fmt::Debug for Labels<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Labels")
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

/// One selectable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEntry {
    pub id: String,
    pub label: String,
    pub mandatory: bool,
}

/// Fields of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldCatalogGroup {
    pub name: String,
    pub fields: Vec<FieldEntry>,
}

/// Every field a tenant may select for a report type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldCatalog {
    pub report_type: ReportType,
    pub groups: Vec<FieldCatalogGroup>,
}

impl FieldCatalog {
    pub fn field_ids(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|g| g.fields.iter().map(|f| f.id.as_str()))
    }
}

fn group_key(group: FieldGroup) -> String {
    match group {
        FieldGroup::User => "group.user".into(),
        FieldGroup::Course => "group.course".into(),
        FieldGroup::Enrollment => "group.enrollment".into(),
        FieldGroup::Stats => "group.stats".into(),
        FieldGroup::Group => "group.group".into(),
        FieldGroup::Certification => "group.certification".into(),
        FieldGroup::LearningPlan => "group.learning_plan".into(),
        FieldGroup::Ecommerce => "group.ecommerce".into(),
        FieldGroup::Session => "group.session".into(),
        FieldGroup::Additional(entity) => format!("group.additional.{}", entity),
    }
}

async fn additional_entries(
    collab: &Collaborators<'_>,
    entity: AdditionalEntity,
) -> CompileResult<Vec<FieldEntry>> {
    let defs = collab.catalog.fields(entity).await?;
    Ok(defs
        .into_iter()
        .map(|def| FieldEntry {
            id: FieldId::Additional(crate::model::AdditionalFieldRef::new(entity, def.id)).key(),
            label: def.title,
            mandatory: false,
        })
        .collect())
}

/// Fields selectable in `report_type` for the tenant, grouped and labelled.
///
/// Fields behind a disabled tenant feature are left out; a disabled report
/// type is an error.
pub async fn available_fields(
    report_type: ReportType,
    collab: &Collaborators<'_>,
) -> CompileResult<FieldCatalog> {
    if let Some(feature) = report_type.required_feature() {
        if !collab.tenant.feature_enabled(feature) {
            return Err(CompileError::Disabled(crate::model::DisabledFeature {
                report_type,
                feature,
            }));
        }
    }

    let labels = Labels::new(collab.translator, collab.tenant.language());
    let mandatory = report_type.mandatory_fields();
    let mut groups = Vec::new();

    for group in report_type.field_groups() {
        let fields = match group {
            FieldGroup::Additional(entity) => additional_entries(collab, *entity).await?,
            _ => FieldId::base_fields(*group)
                .into_iter()
                .filter(|f| {
                    f.required_feature()
                        .map_or(true, |feature| collab.tenant.feature_enabled(feature))
                })
                .map(|f| FieldEntry {
                    id: f.key(),
                    label: labels.get(&f.key()),
                    mandatory: mandatory.contains(&f),
                })
                .collect(),
        };
        if fields.is_empty() {
            continue;
        }
        groups.push(FieldCatalogGroup {
            name: labels.get(&group_key(*group)),
            fields,
        });
    }

    debug!(
        report_type = %report_type,
        groups = groups.len(),
        "built field catalogue"
    );
    Ok(FieldCatalog {
        report_type,
        groups,
    })
}
