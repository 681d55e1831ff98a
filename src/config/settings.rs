//! TOML-based configuration for lms-reports.
//!
//! Supports a config file (lms-reports.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [compiler]
//! dialect = "redshift"
//! schema = "${WAREHOUSE_SCHEMA}"
//! export_limit = 100000
//! preview_limit = 50
//!
//! [migration]
//! max_item_bytes = 400000
//!
//! [locale]
//! default_language = "en"
//! default_timezone = "UTC"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::compiler::CompileOptions;
use crate::migration::DEFAULT_MAX_ITEM_BYTES;
use crate::sql::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub compiler: CompilerSettings,
    pub migration: MigrationSettings,
    pub locale: LocaleSettings,
}

/// Compilation defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerSettings {
    pub dialect: Dialect,

    /// Warehouse schema (supports ${ENV_VAR} expansion).
    pub schema: Option<String>,

    /// Row limit of exports; 0 means unlimited.
    pub export_limit: u64,

    /// Row limit of previews.
    pub preview_limit: u64,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            schema: None,
            export_limit: 0,
            preview_limit: 50,
        }
    }
}

impl CompilerSettings {
    /// The schema with environment variables expanded.
    pub fn resolved_schema(&self) -> Result<Option<String>, SettingsError> {
        self.schema.as_deref().map(expand_env_vars).transpose()
    }

    /// Compile options for an export or a preview run.
    pub fn options(&self, preview: bool) -> Result<CompileOptions, SettingsError> {
        let limit = if preview {
            self.preview_limit
        } else {
            self.export_limit
        };
        let mut options = CompileOptions::default()
            .with_dialect(self.dialect)
            .with_limit(limit)
            .with_preview(preview);
        if let Some(schema) = self.resolved_schema()? {
            options = options.with_schema(schema);
        }
        Ok(options)
    }
}

/// Legacy migration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Serialized size above which a migrated definition is rejected.
    pub max_item_bytes: usize,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            max_item_bytes: DEFAULT_MAX_ITEM_BYTES,
        }
    }
}

/// Fallbacks for tenants that do not declare a locale.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocaleSettings {
    pub default_language: String,
    pub default_timezone: String,
}

impl Default for LocaleSettings {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            default_timezone: "UTC".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `LMS_REPORTS_CONFIG`
    /// 2. `./lms-reports.toml`
    /// 3. `~/.config/lms-reports/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("LMS_REPORTS_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("lms-reports.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("lms-reports").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.migration.max_item_bytes == 0 {
            return Err(SettingsError::InvalidConfig(
                "migration.max_item_bytes must be positive".into(),
            ));
        }
        if self.locale.default_timezone.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "locale.default_timezone must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // A lone `$` is kept as is.
                result.push('$');
                continue;
            }
        }
        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name))?;
        result.push_str(&value);
    }

    Ok(result)
}
