//! Report definition model.
//!
//! - [`definition`] - report definitions, report types, tenant features
//! - [`field`] - the field catalogue keys
//! - [`filter`] - entity, date and additional-field filters
//! - [`legacy`] - legacy report documents

pub mod definition;
pub mod field;
pub mod filter;
pub mod legacy;

pub use definition::{
    DisabledFeature, Feature, FieldSet, FieldSetError, Planning, ReportDefinition, ReportType,
    SortOrder, SortSelector, SortingOptions, TimeUnit, Visibility, VisibilityType,
};
pub use field::{
    AdditionalEntity, AdditionalFieldRef, CertificationField, CourseField, EcommerceField,
    EnrollmentField, FieldGroup, FieldId, FieldIdError, GroupField, LearningPlanField,
    SessionField, StatsField, UserField,
};
pub use filter::{
    AdditionalFieldFilter, AdditionalFieldMatch, BranchSelection, CertificationsFilter,
    Conditions, CoursesFilter, DateFilter, DateFilterType, DateOperator, EcommerceFilter,
    EnrollmentFilter, EnrollmentStatus, GroupsFilter, IdSelection, LearningPlansFilter,
    PaymentStatus, SessionsFilter, UsersFilter,
};
pub use legacy::{
    LegacyBranch, LegacyDateFilter, LegacyEntity, LegacyFields, LegacyFilterData, LegacyFilters,
    LegacyIdSelection, LegacyOrder, LegacyReportDoc, LegacyUsersSelection, LegacyVisibilityRules,
    LegacyVisibilityType,
};
