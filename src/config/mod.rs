//! Configuration module for lms-reports.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, CompilerSettings, LocaleSettings, MigrationSettings, Settings, SettingsError,
};
