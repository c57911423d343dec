//! The caller-supplied base query.
//!
//! [`BaseQuery`] wraps a sea-query [`SelectStatement`] together with what the
//! engine needs to know about it: the table qualifier for bare column names and
//! which relations are eager-loaded (joined). The engine only ever adds to it:
//! conditions are AND-ed through `cond_where`, orders are appended, and paging
//! is set once. Ordering and paging are kept outside the statement so raw
//! ORDER BY templates and dialect-specific paging can be rendered verbatim.
//!
//! A statement that carries its own LIMIT or OFFSET is moved into a derived
//! table before the first addition, so the engine filters, orders and pages the
//! rows the caller selected instead of splicing clauses after their LIMIT.

use std::{collections::BTreeMap, fmt::Write};

use sea_orm::{
    DatabaseBackend, EntityTrait, QueryTrait, Select, Statement, Value,
    sea_query::{
        Alias, Asterisk, Condition, IntoCondition, Query, SelectStatement, SimpleExpr,
        SqliteQueryBuilder,
    },
};

use super::dialect::Dialect;

/// Alias of the derived table for limited statements without a table qualifier.
pub const LIMITED_BASE_ALIAS: &str = "base_query";

/// A raw ORDER BY fragment with its bound values, `?` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderClause {
    pub sql: String,
    pub values: Vec<Value>,
}

/// Table and relation knowledge about a base query, shared with column resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableScope {
    table: Option<String>,
    relation_aware: bool,
    relations: BTreeMap<String, String>,
}

impl TableScope {
    /// Qualifier for bare column names, absent for derived or raw statements.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    #[must_use]
    pub const fn is_relation_aware(&self) -> bool {
        self.relation_aware
    }

    /// Table (or alias) joined for an eager-loaded relation path.
    #[must_use]
    pub fn eager_table(&self, relation: &str) -> Option<&str> {
        self.relations.get(relation).map(String::as_str)
    }
}

/// Plain identifier, optionally schema-qualified: `users`, `public.users`.
#[must_use]
pub fn is_simple_identifier(name: &str) -> bool {
    let segments: Vec<&str> = name.split('.').collect();
    segments.len() <= 2
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && !segment.starts_with(|c: char| c.is_ascii_digit())
                && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Base query the engine augments. Owned by one [`DataTable`](crate::DataTable) run.
#[derive(Debug, Clone)]
pub struct BaseQuery {
    statement: SelectStatement,
    scope: TableScope,
    orders: Vec<OrderClause>,
    page: Option<(u64, u64)>,
    isolated: bool,
}

impl BaseQuery {
    /// Wrap an arbitrary statement. Bare column names stay unqualified.
    ///
    /// Statements must use `cond_where` (as sea-orm's `filter` does) rather than
    /// `and_where`, since the engine adds its conditions through `cond_where`.
    #[must_use]
    pub fn new(statement: SelectStatement) -> Self {
        Self {
            statement,
            scope: TableScope::default(),
            orders: Vec::new(),
            page: None,
            isolated: false,
        }
    }

    /// `SELECT table.* FROM table`, relation-aware.
    #[must_use]
    pub fn from_table(table: &str) -> Self {
        let mut statement = Query::select();
        match table.split_once('.') {
            Some((schema, name)) => {
                statement
                    .column((Alias::new(name), Asterisk))
                    .from((Alias::new(schema), Alias::new(name)));
            }
            None => {
                statement
                    .column((Alias::new(table), Asterisk))
                    .from(Alias::new(table));
            }
        }
        let mut query = Self::new(statement).with_table(table);
        query.scope.relation_aware = true;
        query
    }

    /// Wrap a sea-orm `Select`, keeping whatever filters and joins it carries.
    #[must_use]
    pub fn from_select<E: EntityTrait>(select: Select<E>) -> Self {
        let entity = E::default();
        let table = match entity.schema_name() {
            Some(schema) => format!("{schema}.{}", entity.table_name()),
            None => entity.table_name().to_string(),
        };
        let mut query = Self::new(select.into_query()).with_table(&table);
        query.scope.relation_aware = true;
        query
    }

    /// Set the qualifier for bare column names. Ignored unless it is a plain identifier.
    #[must_use]
    pub fn with_table(mut self, table: &str) -> Self {
        if is_simple_identifier(table) {
            self.scope.table = Some(table.to_string());
        } else {
            tracing::debug!(table = %table, "Base table is not a plain identifier, columns stay unqualified");
            self.scope.table = None;
        }
        self
    }

    /// LEFT JOIN a relation and register it for dot-notation columns (`author.name`).
    pub fn eager_load<C>(&mut self, relation: &str, table: &str, on: C) -> &mut Self
    where
        C: IntoCondition,
    {
        self.isolate_row_limit();
        self.statement.left_join(Alias::new(table), on);
        self.register_relation(relation, table)
    }

    /// Register a relation the statement already joins.
    pub fn register_relation(&mut self, relation: &str, table: &str) -> &mut Self {
        self.scope.relation_aware = true;
        self.scope
            .relations
            .insert(relation.to_string(), table.to_string());
        self
    }

    /// AND a condition group into the WHERE clause.
    pub fn add_condition(&mut self, condition: Condition) -> &mut Self {
        self.isolate_row_limit();
        self.statement.cond_where(condition);
        self
    }

    /// AND a single predicate into the WHERE clause.
    pub fn and_where(&mut self, expr: SimpleExpr) -> &mut Self {
        self.add_condition(Condition::all().add(expr))
    }

    /// Append a raw ORDER BY fragment. `?` placeholders bind `values` in order.
    pub fn order_by_raw(&mut self, sql: impl Into<String>, values: Vec<Value>) -> &mut Self {
        self.isolate_row_limit();
        self.orders.push(OrderClause {
            sql: sql.into(),
            values,
        });
        self
    }

    /// Skip `offset` rows and take at most `limit`.
    pub fn page(&mut self, offset: u64, limit: u64) -> &mut Self {
        self.isolate_row_limit();
        self.page = Some((offset, limit));
        self
    }

    #[must_use]
    pub const fn statement(&self) -> &SelectStatement {
        &self.statement
    }

    pub fn statement_mut(&mut self) -> &mut SelectStatement {
        self.isolate_row_limit();
        &mut self.statement
    }

    #[must_use]
    pub const fn scope(&self) -> &TableScope {
        &self.scope
    }

    #[must_use]
    pub fn orders(&self) -> &[OrderClause] {
        &self.orders
    }

    /// `(offset, limit)` when paging was applied.
    #[must_use]
    pub const fn paging(&self) -> Option<(u64, u64)> {
        self.page
    }

    /// Move a caller LIMIT/OFFSET into `SELECT * FROM (<statement>) AS <table>`.
    ///
    /// Runs once, before the first addition. The derived table takes the base
    /// table's name so qualified columns keep resolving.
    pub fn isolate_row_limit(&mut self) {
        if std::mem::replace(&mut self.isolated, true) || !has_row_limit(&self.statement) {
            return;
        }
        let alias = self
            .scope
            .table()
            .and_then(|table| table.rsplit('.').next())
            .unwrap_or(LIMITED_BASE_ALIAS)
            .to_string();
        tracing::debug!(alias = %alias, "Base query carries its own LIMIT, wrapping it as a derived table");

        let inner = std::mem::replace(&mut self.statement, Query::select());
        self.statement
            .column(Asterisk)
            .from_subquery(inner, Alias::new(alias.as_str()));
        if self.scope.table.is_some() {
            self.scope.table = Some(alias);
        }
    }

    /// Render the data query: statement, then ORDER BY fragments, then paging.
    #[must_use]
    pub fn build(&self, backend: DatabaseBackend, dialect: Dialect) -> Statement {
        let base = backend.build(&self.statement);
        let mut sql = base.sql;
        let mut values = base.values.map(|values| values.0).unwrap_or_default();

        if !self.orders.is_empty() {
            sql.push_str(if has_top_level_order_by(&sql) {
                ", "
            } else {
                " ORDER BY "
            });
            let mut fragments = Vec::with_capacity(self.orders.len());
            for clause in &self.orders {
                fragments.push(bind_placeholders(&clause.sql, backend, values.len()));
                values.extend(clause.values.iter().cloned());
            }
            sql.push_str(&fragments.join(", "));
        }

        if let Some((offset, limit)) = self.page {
            sql.push(' ');
            sql.push_str(&dialect.limit_clause(offset, limit));
        }

        Statement::from_sql_and_values(backend, sql, values)
    }
}

/// Whether the statement limits or offsets its own rows.
fn has_row_limit(statement: &SelectStatement) -> bool {
    let mut bare = statement.clone();
    bare.reset_limit().reset_offset();
    bare.to_string(SqliteQueryBuilder) != statement.to_string(SqliteQueryBuilder)
}

/// Visit every byte outside quoted literals and identifiers together with its paren depth.
fn scan_unquoted(sql: &str, mut visit: impl FnMut(usize, u8, usize)) {
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    for (index, byte) in sql.bytes().enumerate() {
        match (quote, byte) {
            (Some(open), _) if byte == open => quote = None,
            (Some(_), _) => {}
            (None, b'\'' | b'"' | b'`') => quote = Some(byte),
            (None, b'(') => depth += 1,
            (None, b')') => depth = depth.saturating_sub(1),
            (None, _) => visit(index, byte, depth),
        }
    }
}

/// Number of `?` placeholders outside string literals.
#[must_use]
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    scan_unquoted(sql, |_, byte, _| {
        if byte == b'?' {
            count += 1;
        }
    });
    count
}

/// Rewrite `?` placeholders for backends that number them (`$1`, `$2`, ...).
#[must_use]
pub fn bind_placeholders(sql: &str, backend: DatabaseBackend, already_bound: usize) -> String {
    if backend != DatabaseBackend::Postgres {
        return sql.to_string();
    }
    let mut positions = Vec::new();
    scan_unquoted(sql, |index, byte, _| {
        if byte == b'?' {
            positions.push(index);
        }
    });

    let mut output = String::with_capacity(sql.len() + positions.len() * 2);
    let mut last = 0;
    for (n, position) in positions.into_iter().enumerate() {
        output.push_str(&sql[last..position]);
        let _ = write!(output, "${}", already_bound + n + 1);
        last = position + 1;
    }
    output.push_str(&sql[last..]);
    output
}

/// Whether the outermost query already ends with an ORDER BY clause.
fn has_top_level_order_by(sql: &str) -> bool {
    let upper = sql.to_ascii_uppercase();
    let mut found = false;
    scan_unquoted(&upper, |index, _, depth| {
        if depth == 0 && upper.as_bytes()[index..].starts_with(b"ORDER BY") {
            found = true;
        }
    });
    found
}
