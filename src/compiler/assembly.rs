//! Per-compilation query accumulator.
//!
//! Field handlers register what they need (joins, CTEs, predicates) and
//! append exactly one select item each. Joins and CTEs are keyed so that a
//! dependency requested by several fields is emitted once.

use std::collections::HashSet;

use crate::sql::expr::{table_col, Expr};
use crate::sql::query::{Cte, Join, JoinType, OrderByExpr, Query, SelectExpr, TableRef};
use crate::sql::Dialect;

/// A select-list entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: String,
    pub aggregate: bool,
}

/// Mutable builder threaded through one compilation. Never shared.
#[derive(Debug, Clone)]
pub struct QueryAssemblyContext {
    dialect: Dialect,
    schema: Option<String>,
    ctes: Vec<Cte>,
    cte_names: HashSet<String>,
    from: Option<TableRef>,
    joins: Vec<Join>,
    joined: HashSet<String>,
    selects: Vec<SelectItem>,
    aliases: HashSet<String>,
    natural_keys: Vec<Expr>,
    group_by: Vec<Expr>,
    predicates: Vec<Expr>,
    grouped: bool,
}

impl QueryAssemblyContext {
    pub fn new(dialect: Dialect, schema: Option<String>) -> Self {
        Self {
            dialect,
            schema,
            ctes: Vec::new(),
            cte_names: HashSet::new(),
            from: None,
            joins: Vec::new(),
            joined: HashSet::new(),
            selects: Vec::new(),
            aliases: HashSet::new(),
            natural_keys: Vec::new(),
            group_by: Vec::new(),
            predicates: Vec::new(),
            grouped: false,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// A warehouse table in the configured schema.
    pub fn table(&self, name: &str) -> TableRef {
        TableRef::new(name).in_schema(self.schema.as_deref())
    }

    /// Set the primary table (or filtered sub-select).
    pub fn add_from(&mut self, table: TableRef) {
        self.from = Some(table);
    }

    /// Register a join under `key` unless one is already registered.
    ///
    /// Returns whether the join was added.
    pub fn add_join_once(
        &mut self,
        key: impl Into<String>,
        join_type: JoinType,
        table: TableRef,
        on: Expr,
    ) -> bool {
        let key = key.into();
        if self.joined.contains(&key) {
            return false;
        }
        self.joined.insert(key);
        self.joins.push(Join {
            join_type,
            table,
            on,
        });
        true
    }

    /// Like [`add_join_once`](Self::add_join_once) for a join that fans out
    /// rows; the query is grouped from then on.
    pub fn add_fanout_join_once(
        &mut self,
        key: impl Into<String>,
        join_type: JoinType,
        table: TableRef,
        on: Expr,
    ) -> bool {
        self.grouped = true;
        self.add_join_once(key, join_type, table, on)
    }

    pub fn is_joined(&self, key: &str) -> bool {
        self.joined.contains(key)
    }

    /// Register a CTE unless one with the same name exists.
    pub fn add_cte(&mut self, name: &str, body: Query) -> bool {
        if self.cte_names.contains(name) {
            return false;
        }
        self.cte_names.insert(name.to_string());
        self.ctes.push(Cte::new(name, body));
        true
    }

    /// Append a select item. Returns the alias actually used, which differs
    /// from `alias` only when another column already took that name.
    pub fn add_select(&mut self, expr: Expr, alias: &str) -> String {
        let mut unique = alias.to_string();
        let mut n = 2;
        while self.aliases.contains(&unique) {
            unique = format!("{} ({})", alias, n);
            n += 1;
        }
        self.aliases.insert(unique.clone());
        let aggregate = expr.is_aggregate();
        if aggregate {
            self.grouped = true;
        }
        self.selects.push(SelectItem {
            expr,
            alias: unique.clone(),
            aggregate,
        });
        unique
    }

    /// Key columns of the primary entities; lead the GROUP BY list.
    pub fn add_natural_key(&mut self, table: &str, column: &str) {
        let key = table_col(table, column);
        if !self.natural_keys.contains(&key) {
            self.natural_keys.push(key);
        }
    }

    /// Extra GROUP BY entry (deduplicated).
    pub fn add_group_by(&mut self, expr: Expr) {
        if !self.group_by.contains(&expr) {
            self.group_by.push(expr);
        }
    }

    /// AND a predicate into WHERE.
    pub fn add_where(&mut self, predicate: Expr) {
        self.predicates.push(predicate);
    }

    pub fn require_grouping(&mut self) {
        self.grouped = true;
    }

    pub fn is_grouped(&self) -> bool {
        self.grouped
    }

    pub fn selects(&self) -> &[SelectItem] {
        &self.selects
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn ctes(&self) -> &[Cte] {
        &self.ctes
    }

    fn group_by_list(&self) -> Vec<Expr> {
        let mut list: Vec<Expr> = Vec::new();
        let candidates = self
            .natural_keys
            .iter()
            .chain(self.group_by.iter())
            .chain(
                self.selects
                    .iter()
                    .filter(|s| !s.aggregate && !s.expr.is_constant())
                    .map(|s| &s.expr),
            );
        for expr in candidates {
            if !list.contains(expr) {
                list.push(expr.clone());
            }
        }
        list
    }

    /// Finish the query.
    pub fn into_query(self, order_by: Vec<OrderByExpr>, limit: Option<u64>) -> Query {
        let group_by = if self.grouped {
            self.group_by_list()
        } else {
            Vec::new()
        };

        let mut query = Query::new().select(
            self.selects
                .into_iter()
                .map(|s| SelectExpr::new(s.expr).with_alias(&s.alias))
                .collect::<Vec<_>>(),
        );
        for cte in self.ctes {
            query = query.with_cte(cte);
        }
        if let Some(from) = self.from {
            query = query.from(from);
        }
        for join in self.joins {
            query = query.join(join.join_type, join.table, join.on);
        }
        for predicate in self.predicates {
            query = query.filter(predicate);
        }
        query = query.group_by(group_by).order_by(order_by);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        query
    }
}
