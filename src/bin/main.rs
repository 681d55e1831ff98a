//! lms-reports CLI - Compile report definitions to warehouse SQL
//!
//! Usage:
//!   lms-reports compile <definition.json> --tenant <tenant.json> [--dialect <dialect>]
//!   lms-reports fields <report-type> --tenant <tenant.json>
//!   lms-reports migrate <legacy.json> --tenant <tenant.json> [--store <definitions.json>]
//!
//! Examples:
//!   lms-reports compile report.json --tenant acme.json --dialect redshift --preview
//!   lms-reports fields users-courses --tenant acme.json
//!   lms-reports migrate legacy.json --tenant acme.json --store migrated.json

use clap::{Parser, Subcommand, ValueEnum};
use lms_reports::catalog::available_fields;
use lms_reports::config::Settings;
use lms_reports::context::fixture::StaticTenant;
use lms_reports::context::Collaborators;
use lms_reports::migration::memory::{MemorySource, MemoryStore};
use lms_reports::migration::{LegacyFilter, Migrator};
use lms_reports::model::{ReportDefinition, ReportType};
use lms_reports::reports;
use lms_reports::sql::Dialect;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lms-reports")]
#[command(about = "Compile LMS report definitions to Redshift or Snowflake SQL")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to LMS_REPORTS_CONFIG or ./lms-reports.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a report definition to SQL
    Compile {
        /// Path to the definition JSON
        file: PathBuf,

        /// Tenant file answering feature, visibility and catalogue lookups
        #[arg(short, long)]
        tenant: PathBuf,

        /// SQL dialect to generate (defaults to the configured one)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Row limit, overriding the configured export/preview limit
        #[arg(short, long)]
        limit: Option<u64>,

        /// Compile a preview run (unsorted, preview limit)
        #[arg(long)]
        preview: bool,

        /// Skip the session user's visibility restrictions
        #[arg(long)]
        no_visibility: bool,
    },

    /// List the fields a tenant may select for a report type
    Fields {
        /// Report type, e.g. users-courses
        report_type: String,

        #[arg(short, long)]
        tenant: PathBuf,
    },

    /// Migrate legacy reports
    Migrate {
        /// JSON array of legacy report rows
        file: PathBuf,

        #[arg(short, long)]
        tenant: PathBuf,

        /// Definitions file read for already migrated reports and rewritten
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Only these legacy report ids
        #[arg(long, value_delimiter = ',')]
        ids: Vec<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Redshift,
    Snowflake,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Redshift => Dialect::Redshift,
            DialectArg::Snowflake => Dialect::Snowflake,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Compile {
            file,
            tenant,
            dialect,
            limit,
            preview,
            no_visibility,
        } => {
            cmd_compile(
                &settings,
                &file,
                &tenant,
                dialect,
                limit,
                preview,
                no_visibility,
            )
            .await
        }
        Commands::Fields {
            report_type,
            tenant,
        } => cmd_fields(&settings, &report_type, &tenant).await,
        Commands::Migrate {
            file,
            tenant,
            store,
            ids,
        } => cmd_migrate(&settings, &file, &tenant, store.as_deref(), ids).await,
    }
}

fn load_tenant(settings: &Settings, path: &Path) -> Option<StaticTenant> {
    match StaticTenant::load_with_locale(
        path,
        &settings.locale.default_language,
        &settings.locale.default_timezone,
    ) {
        Ok(tenant) => Some(tenant),
        Err(e) => {
            eprintln!("Error loading tenant: {}", e);
            None
        }
    }
}

async fn cmd_compile(
    settings: &Settings,
    file: &Path,
    tenant: &Path,
    dialect: Option<DialectArg>,
    limit: Option<u64>,
    preview: bool,
    no_visibility: bool,
) -> ExitCode {
    let source = match fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let definition: ReportDefinition = match serde_json::from_str(&source) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Invalid definition '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let Some(tenant) = load_tenant(settings, tenant) else {
        return ExitCode::FAILURE;
    };

    let mut options = match settings.compiler.options(preview) {
        Ok(o) => o.with_check_visibility(!no_visibility),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(dialect) = dialect {
        options = options.with_dialect(dialect.into());
    }
    if let Some(limit) = limit {
        options = options.with_limit(limit);
    }

    match reports::compile(&definition, &options, &Collaborators::from_single(&tenant)).await {
        Ok(compiled) => {
            println!("{}", compiled.sql);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_fields(settings: &Settings, report_type: &str, tenant: &Path) -> ExitCode {
    let report_type: ReportType = match report_type.parse() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let Some(tenant) = load_tenant(settings, tenant) else {
        return ExitCode::FAILURE;
    };

    match available_fields(report_type, &Collaborators::from_single(&tenant)).await {
        Ok(catalog) => {
            for group in &catalog.groups {
                println!("{}:", group.name);
                for field in &group.fields {
                    let marker = if field.mandatory { " (mandatory)" } else { "" };
                    println!("  - {} \"{}\"{}", field.id, field.label, marker);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_migrate(
    settings: &Settings,
    file: &Path,
    tenant: &Path,
    store_path: Option<&Path>,
    ids: Vec<u64>,
) -> ExitCode {
    let Some(tenant) = load_tenant(settings, tenant) else {
        return ExitCode::FAILURE;
    };
    let source = match MemorySource::load(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let existing: Vec<ReportDefinition> = match store_path.filter(|p| p.exists()) {
        Some(path) => match fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
        {
            Ok(defs) => defs,
            Err(e) => {
                eprintln!("Error reading store '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => Vec::new(),
    };
    let store = MemoryStore::with_definitions(existing);

    let filter = LegacyFilter {
        ids: (!ids.is_empty()).then_some(ids),
        ..Default::default()
    };
    let migrator = Migrator::new(&tenant, &source, &store)
        .with_max_item_bytes(settings.migration.max_item_bytes);
    let outcome = match migrator.migrate(filter).await {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Migration failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = store_path {
        let definitions = store.definitions().await;
        let written = serde_json::to_string_pretty(&definitions)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            eprintln!("Error writing store '{}': {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    }

    match serde_json::to_string_pretty(&outcome) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
