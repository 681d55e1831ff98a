//! # lms-reports
//!
//! Compiles LMS report definitions to warehouse SQL (Redshift, Snowflake) and
//! migrates legacy reports into definitions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │   Legacy report rows (filter_data JSON, numeric type)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [legacy + migration]
//! ┌─────────────────────────────────────────────────────────┐
//! │          ReportDefinition (fields, filters, sort)        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [reports + compiler]
//! ┌─────────────────────────────────────────────────────────┐
//! │   QueryAssemblyContext (joins, CTEs, WHERE, GROUP BY)    │
//! │   + collaborators: visibility, catalogue, translations   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql]
//! ┌─────────────────────────────────────────────────────────┐
//! │             SQL text for the target dialect              │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod compiler;
pub mod config;
pub mod context;
pub mod legacy;
pub mod migration;
pub mod model;
pub mod reports;
pub mod sql;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::compiler::{CompileError, CompileOptions, CompileOutput};
    pub use crate::context::Collaborators;
    pub use crate::model::{FieldId, ReportDefinition, ReportType};
    pub use crate::reports::{compile, report_for};
    pub use crate::sql::Dialect;
}
