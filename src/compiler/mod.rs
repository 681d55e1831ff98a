//! Report compilation.
//!
//! Every report type compiles through the same driver:
//!
//! ```text
//! validate → base tables + filters → fields in order → additional-field
//! filters → ORDER BY → LIMIT → SQL
//! ```
//!
//! The per-type part lives behind [`ReportCompiler`]; everything shared
//! (assembly, date filters, visibility predicates, additional fields, value
//! formatting) lives in this module's children.
//!
//! # Example
//!
//! ```ignore
//! use lms_reports::compiler::CompileOptions;
//! use lms_reports::context::{fixture::StaticTenant, Collaborators};
//! use lms_reports::sql::Dialect;
//!
//! let tenant = StaticTenant::new("acme");
//! let options = CompileOptions::default().with_dialect(Dialect::Redshift).with_limit(100);
//! let output = lms_reports::reports::compile(&definition, &options, &Collaborators::from_single(&tenant)).await?;
//! println!("{}", output.sql);
//! ```

pub mod additional;
pub mod assembly;
pub mod date_filter;
pub mod fields;
pub mod format;
pub mod visibility;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::catalog::Labels;
use crate::context::{AdditionalFieldDef, Collaborators, ContextError, ResolveScope};
use crate::model::{
    AdditionalEntity, DisabledFeature, Feature, FieldId, IdSelection, ReportDefinition,
    ReportType, SortOrder, SortSelector,
};
use crate::sql::expr::{col, Expr};
use crate::sql::query::{OrderByExpr, Query, TableRef};
use crate::sql::Dialect;

pub use assembly::{QueryAssemblyContext, SelectItem};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during compilation.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Disabled(#[from] DisabledFeature),

    #[error("field '{field}' is not available in {report_type} reports")]
    FieldNotSupported {
        field: FieldId,
        report_type: ReportType,
    },

    #[error("field '{field}' requires the {feature} feature")]
    FeatureDisabled { field: FieldId, feature: Feature },

    #[error("{report_type} reports cannot be compiled for {dialect}")]
    UnsupportedDialect {
        report_type: ReportType,
        dialect: Dialect,
    },

    #[error("report selects no fields")]
    NoFields,

    #[error("invalid date filter: {0}")]
    InvalidDateFilter(&'static str),

    #[error("id {0} does not fit a warehouse key")]
    IdOutOfRange(u64),

    #[error("definition is a {found} report, compiler handles {expected}")]
    ReportTypeMismatch {
        expected: ReportType,
        found: ReportType,
    },

    #[error(transparent)]
    Context(#[from] ContextError),
}

pub type CompileResult<T> = Result<T, CompileError>;

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// SQL dialect to generate.
    pub dialect: Dialect,
    /// Row limit; 0 means no limit.
    pub limit: u64,
    /// Preview runs are never sorted.
    pub preview: bool,
    /// Restrict entities to what the session user may see.
    pub check_visibility: bool,
    /// The run was triggered by a schedule rather than a live session.
    pub from_schedule: bool,
    /// Warehouse schema tables live in.
    pub schema: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            limit: 0,
            preview: false,
            check_visibility: true,
            from_schedule: false,
            schema: None,
        }
    }
}

impl CompileOptions {
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_check_visibility(mut self, check: bool) -> Self {
        self.check_visibility = check;
        self
    }

    pub fn with_from_schedule(mut self, from_schedule: bool) -> Self {
        self.from_schedule = from_schedule;
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result of compiling a report to SQL.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// The generated SQL string.
    pub sql: String,

    /// The SQL query AST.
    pub query: Query,

    /// The dialect used for generation.
    pub dialect: Dialect,
}

// ============================================================================
// Session
// ============================================================================

/// Collaborator answers already fetched during one compilation.
#[derive(Debug, Default)]
struct LookupCache {
    fields: HashMap<AdditionalEntity, Vec<AdditionalFieldDef>>,
    materialized: HashMap<AdditionalEntity, HashSet<u64>>,
    users: Option<IdSelection>,
    courses: Option<IdSelection>,
    groups: Option<IdSelection>,
    certifications: Option<IdSelection>,
    learning_plans: Option<IdSelection>,
    sessions: Option<IdSelection>,
}

/// State of one compilation: the definition, the query being assembled and
/// the collaborator answers fetched so far.
pub struct CompileSession<'a> {
    pub definition: &'a ReportDefinition,
    pub options: &'a CompileOptions,
    pub ctx: QueryAssemblyContext,
    labels: Labels<'a>,
    collab: Collaborators<'a>,
    cache: LookupCache,
    timezone: String,
}

macro_rules! resolve_selection {
    ($(#[$meta:meta])* $name:ident, $filter:ident) => {
        $(#[$meta])*
        pub async fn $name(&mut self) -> CompileResult<IdSelection> {
            if let Some(selection) = &self.cache.$name {
                return Ok(selection.clone());
            }
            let definition = self.definition;
            let selection = self
                .collab
                .visibility
                .$name(&definition.$filter, self.scope())
                .await?;
            debug!(entity = stringify!($name), all = selection.is_all(), "resolved visibility");
            self.cache.$name = Some(selection.clone());
            Ok(selection)
        }
    };
}

impl<'a> CompileSession<'a> {
    pub fn new(
        definition: &'a ReportDefinition,
        options: &'a CompileOptions,
        collab: Collaborators<'a>,
    ) -> Self {
        let timezone = definition
            .timezone
            .clone()
            .unwrap_or_else(|| collab.tenant.timezone().to_string());
        Self {
            definition,
            options,
            ctx: QueryAssemblyContext::new(options.dialect, options.schema.clone()),
            labels: Labels::new(collab.translator, collab.tenant.language()),
            collab,
            cache: LookupCache::default(),
            timezone,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.options.dialect
    }

    /// Timezone dates are rendered in.
    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn labels(&self) -> &Labels<'a> {
        &self.labels
    }

    pub fn language(&self) -> &str {
        self.labels.language()
    }

    pub fn label(&self, key: &str) -> String {
        self.labels.get(key)
    }

    /// A warehouse table in the configured schema.
    pub fn table(&self, name: &str) -> TableRef {
        self.ctx.table(name)
    }

    fn scope(&self) -> ResolveScope {
        ResolveScope {
            check_visibility: self.options.check_visibility,
            from_schedule: self.options.from_schedule,
            author: self.definition.author,
        }
    }

    resolve_selection!(
        /// Users the report may read.
        users,
        users
    );
    resolve_selection!(courses, courses);
    resolve_selection!(groups, groups);
    resolve_selection!(certifications, certifications);
    resolve_selection!(learning_plans, learning_plans);
    resolve_selection!(sessions, sessions);

    /// Catalogue entry of an additional field, if the tenant declares it.
    pub async fn additional_field(
        &mut self,
        entity: AdditionalEntity,
        id: u64,
    ) -> CompileResult<Option<AdditionalFieldDef>> {
        if !self.cache.fields.contains_key(&entity) {
            let defs = self.collab.catalog.fields(entity).await?;
            self.cache.fields.insert(entity, defs);
        }
        Ok(self
            .cache
            .fields
            .get(&entity)
            .and_then(|defs| defs.iter().find(|d| d.id == id))
            .cloned())
    }

    /// Whether the additional field's column physically exists.
    pub async fn is_materialized(&mut self, entity: AdditionalEntity, id: u64) -> CompileResult<bool> {
        if !self.cache.materialized.contains_key(&entity) {
            let ids = self.collab.catalog.materialized(entity).await?;
            self.cache.materialized.insert(entity, ids);
        }
        Ok(self
            .cache
            .materialized
            .get(&entity)
            .is_some_and(|ids| ids.contains(&id)))
    }
}

impl std::fmt::Debug for CompileSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileSession")
            .field("report", &self.definition.id)
            .field("options", &self.options)
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Report compilers
// ============================================================================

/// The per-report-type half of compilation.
#[async_trait]
pub trait ReportCompiler: Send + Sync {
    fn report_type(&self) -> ReportType;

    fn supports_dialect(&self, _dialect: Dialect) -> bool {
        true
    }

    /// Primary table, unconditional joins, natural keys and WHERE predicates.
    async fn build_base(&self, session: &mut CompileSession<'_>) -> CompileResult<()>;

    /// Expression of a base field; registers whatever joins it needs.
    fn field_expr(&self, session: &mut CompileSession<'_>, field: FieldId) -> CompileResult<Expr>;
}

fn validate(
    compiler: &dyn ReportCompiler,
    definition: &ReportDefinition,
    options: &CompileOptions,
    collab: &Collaborators<'_>,
) -> CompileResult<()> {
    let report_type = compiler.report_type();
    if definition.report_type != report_type {
        return Err(CompileError::ReportTypeMismatch {
            expected: report_type,
            found: definition.report_type,
        });
    }
    if !compiler.supports_dialect(options.dialect) {
        return Err(CompileError::UnsupportedDialect {
            report_type,
            dialect: options.dialect,
        });
    }
    if definition.fields.is_empty() {
        return Err(CompileError::NoFields);
    }
    for field in &definition.fields {
        if !report_type.accepts(field) {
            return Err(CompileError::FieldNotSupported {
                field: *field,
                report_type,
            });
        }
        if let Some(feature) = field.required_feature() {
            if !collab.tenant.feature_enabled(feature) {
                return Err(CompileError::FeatureDisabled {
                    field: *field,
                    feature,
                });
            }
        }
    }
    Ok(())
}

fn order_by(definition: &ReportDefinition, aliases: &[(FieldId, String)]) -> Vec<OrderByExpr> {
    let Some(sorting) = &definition.sorting_options else {
        return Vec::new();
    };
    let default = definition.report_type.default_sort_field();
    let wanted = match sorting.selector {
        SortSelector::Default => default,
        SortSelector::Custom => sorting.selected_field.unwrap_or(default),
    };
    let alias_of = |field: FieldId| {
        aliases
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, alias)| alias.as_str())
    };
    let alias = alias_of(wanted)
        .or_else(|| {
            warn!(
                report = %definition.id,
                field = %wanted,
                "sort field is not selected, using the default sort"
            );
            alias_of(default)
        })
        .or_else(|| aliases.first().map(|(_, alias)| alias.as_str()));

    match alias {
        Some(alias) => {
            let expr = col(alias);
            vec![match sorting.order_by {
                SortOrder::Asc => OrderByExpr::asc(expr),
                SortOrder::Desc => OrderByExpr::desc(expr),
            }]
        }
        None => Vec::new(),
    }
}

/// Compile `definition` with `compiler`.
pub async fn run(
    compiler: &dyn ReportCompiler,
    definition: &ReportDefinition,
    options: &CompileOptions,
    collab: &Collaborators<'_>,
) -> CompileResult<CompileOutput> {
    validate(compiler, definition, options, collab)?;
    debug!(
        report = %definition.id,
        report_type = %definition.report_type,
        dialect = %options.dialect,
        fields = definition.fields.len(),
        "compiling report"
    );

    let mut session = CompileSession::new(definition, options, *collab);
    compiler.build_base(&mut session).await?;

    let mut aliases = Vec::with_capacity(definition.fields.len());
    for field in &definition.fields {
        let (expr, label) = match field {
            FieldId::Additional(reference) => additional::field_expr(&mut session, *reference).await?,
            _ => (
                compiler.field_expr(&mut session, *field)?,
                session.label(&field.key()),
            ),
        };
        let alias = session.ctx.add_select(expr, &label);
        aliases.push((*field, alias));
    }

    additional::apply_filters(&mut session).await?;

    let order = if options.preview {
        Vec::new()
    } else {
        order_by(definition, &aliases)
    };
    let limit = (options.limit > 0).then_some(options.limit);
    let query = session.ctx.into_query(order, limit);
    let sql = query.to_sql(options.dialect);

    debug!(report = %definition.id, bytes = sql.len(), "compiled report");
    Ok(CompileOutput {
        sql,
        query,
        dialect: options.dialect,
    })
}
