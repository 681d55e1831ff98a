//! Report types.
//!
//! One owning type per [`ReportType`] implements both directions: it compiles
//! definitions to SQL ([`ReportCompiler`]) and translates legacy documents
//! into definitions ([`LegacyTranslator`]).
//!
//! | Type | Primary entity | Legacy id |
//! |------|----------------|-----------|
//! | [`UsersCourses`] | enrollment (user × course) | 1 |
//! | [`GroupsCourses`] | group × course roll-up | 3 |
//! | [`UsersCertifications`] | issued certification | 5 |
//! | [`UsersLearningPlans`] | learning plan enrollment | 6 |
//! | [`EcommerceTransactions`] | transaction | 8 |
//! | [`UsersWebinarSessions`] | session attendance | 12 |

pub mod certifications;
pub mod ecommerce;
pub mod groups_courses;
pub mod learning_plans;
pub mod users_courses;
pub mod webinar_sessions;

pub use certifications::UsersCertifications;
pub use ecommerce::EcommerceTransactions;
pub use groups_courses::GroupsCourses;
pub use learning_plans::UsersLearningPlans;
pub use users_courses::UsersCourses;
pub use webinar_sessions::UsersWebinarSessions;

use tracing::debug;

use crate::compiler::{self, CompileOptions, CompileOutput, CompileResult, ReportCompiler};
use crate::context::{Collaborators, TenantContext};
use crate::legacy::LegacyTranslator;
use crate::model::{DisabledFeature, ReportDefinition, ReportType};

/// Both halves of a report type.
pub trait Report: Send + Sync {
    fn compiler(&self) -> &dyn ReportCompiler;

    fn translator(&self) -> &dyn LegacyTranslator;
}

impl<T> Report for T
where
    T: ReportCompiler + LegacyTranslator + 'static,
{
    fn compiler(&self) -> &dyn ReportCompiler {
        self
    }

    fn translator(&self) -> &dyn LegacyTranslator {
        self
    }
}

/// The owning type of `report_type`, for a tenant that has its feature.
pub fn report_for(
    report_type: ReportType,
    tenant: &dyn TenantContext,
) -> Result<Box<dyn Report>, DisabledFeature> {
    if let Some(feature) = report_type.required_feature() {
        if !tenant.feature_enabled(feature) {
            debug!(%report_type, %feature, platform = tenant.platform(), "report type disabled");
            return Err(DisabledFeature {
                report_type,
                feature,
            });
        }
    }
    Ok(match report_type {
        ReportType::UsersCourses => Box::new(UsersCourses),
        ReportType::GroupsCourses => Box::new(GroupsCourses),
        ReportType::UsersCertifications => Box::new(UsersCertifications),
        ReportType::UsersLearningPlans => Box::new(UsersLearningPlans),
        ReportType::EcommerceTransactions => Box::new(EcommerceTransactions),
        ReportType::UsersWebinarSessions => Box::new(UsersWebinarSessions),
    })
}

/// Compile a definition with its owning report type.
pub async fn compile(
    definition: &ReportDefinition,
    options: &CompileOptions,
    collab: &Collaborators<'_>,
) -> CompileResult<CompileOutput> {
    let report = report_for(definition.report_type, collab.tenant)?;
    compiler::run(report.compiler(), definition, options, collab).await
}
