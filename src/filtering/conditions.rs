use sea_orm::{
    Value,
    sea_query::{Condition, Expr, LikeExpr, SimpleExpr},
};

use crate::{
    config::DataTableConfig,
    database::dialect::{Dialect, sql_operand},
    table::columns::{ColumnResolver, FilterCallback},
};

/// How a compiled group joins its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    /// Per-column search: every column must match.
    And,
    /// Global search: any column may match.
    Or,
}

impl Joiner {
    /// Empty group whose members are combined with this joiner.
    #[must_use]
    pub fn group(self) -> Condition {
        match self {
            Self::And => Condition::all(),
            Self::Or => Condition::any(),
        }
    }
}

/// Sub-builder handed to custom column filters.
///
/// Predicates added here are AND-ed together and land in the run's query as one
/// nested group, so a filter can never widen the rest of the WHERE clause.
///
/// ```rust,ignore
/// table.filter_column("name", |scope, keyword| {
///     let column = scope.col("name");
///     scope.and_where(Expr::expr(column).like(format!("{keyword}%")));
/// })
/// ```
#[derive(Debug, Clone)]
pub struct FilterScope {
    resolver: ColumnResolver,
    condition: Condition,
}

impl FilterScope {
    #[must_use]
    pub fn new(resolver: ColumnResolver) -> Self {
        Self {
            resolver,
            condition: Condition::all(),
        }
    }

    /// Table qualifier of the base query, if any.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.resolver.scope().table()
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.resolver.dialect()
    }

    /// A column resolved the same way default search resolves it.
    #[must_use]
    pub fn col(&self, name: &str) -> SimpleExpr {
        sql_operand(self.resolver.column_sql(name))
    }

    pub fn and_where(&mut self, expr: SimpleExpr) -> &mut Self {
        self.add_condition(Condition::all().add(expr))
    }

    pub fn add_condition(&mut self, condition: Condition) -> &mut Self {
        self.condition = std::mem::replace(&mut self.condition, Condition::all()).add(condition);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.condition.is_empty()
    }

    #[must_use]
    pub fn into_condition(self) -> Condition {
        self.condition
    }
}

/// `col LIKE ?`, or `LOWER(col) LIKE ?` when case-insensitive.
///
/// The column is cast to text where the dialect needs it. Wildcard mode
/// escapes user `%` and `_`, so the pattern carries `ESCAPE '\'`.
#[must_use]
pub fn compile_default(
    column: &str,
    keyword: &str,
    dialect: Dialect,
    config: &DataTableConfig,
) -> SimpleExpr {
    let column = dialect.cast_to_text(column);
    let column = if config.is_case_insensitive() {
        format!("LOWER({column})")
    } else {
        column
    };
    let column = Expr::expr(sql_operand(column));
    if config.is_wildcard() {
        column.like(LikeExpr::new(keyword).escape('\\'))
    } else {
        column.like(keyword)
    }
}

/// Regular expression match in the dialect's syntax. The keyword is bound, never inlined.
#[must_use]
pub fn compile_regex(
    column: &str,
    keyword: &str,
    dialect: Dialect,
    case_insensitive: bool,
) -> SimpleExpr {
    dialect.regex_predicate(column, case_insensitive).build(keyword)
}

/// Run a custom filter on a fresh [`FilterScope`] and return its predicates as one group.
///
/// `None` when the callback added nothing.
#[must_use]
pub fn compile_custom(
    resolver: &ColumnResolver,
    callback: &FilterCallback,
    keyword: &str,
) -> Option<Condition> {
    let mut scope = FilterScope::new(resolver.clone());
    callback(&mut scope, keyword);
    if scope.is_empty() {
        None
    } else {
        Some(scope.into_condition())
    }
}

/// Equality helper for custom filters.
#[must_use]
pub fn column_equals(scope: &FilterScope, column: &str, value: impl Into<Value>) -> SimpleExpr {
    Expr::expr(scope.col(column)).eq(value.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::query::TableScope;
    use sea_orm::sea_query::{Alias, Asterisk, Query, SqliteQueryBuilder};
    use std::sync::Arc;

    fn render(condition: Condition) -> (String, Vec<Value>) {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(Alias::new("users"))
            .cond_where(condition)
            .build(SqliteQueryBuilder);
        (sql, values.0)
    }

    fn resolver() -> ColumnResolver {
        ColumnResolver::new(TableScope::default(), Dialect::Sqlite)
    }

    #[test]
    fn test_default_case_insensitive_like() {
        let expr = compile_default(r#""name""#, "%john%", Dialect::Sqlite, &DataTableConfig::default());
        let (sql, values) = render(Condition::all().add(expr));
        assert!(sql.ends_with(r#"WHERE LOWER("name") LIKE ?"#), "got: {sql}");
        assert_eq!(values, vec![Value::from("%john%")]);
    }

    #[test]
    fn test_default_case_sensitive_postgres_casts() {
        let config = DataTableConfig {
            case_insensitive: false,
            ..Default::default()
        };
        let expr = compile_default(r#""age""#, "%4%", Dialect::Postgres, &config);
        let (sql, _) = render(Condition::all().add(expr));
        assert!(sql.ends_with(r#"WHERE CAST("age" AS TEXT) LIKE ?"#), "got: {sql}");
    }

    #[test]
    fn test_wildcard_mode_adds_escape() {
        let config = DataTableConfig {
            use_wildcards: true,
            ..Default::default()
        };
        let expr = compile_default(r#""name""#, "%j%o%", Dialect::Sqlite, &config);
        let (sql, _) = render(Condition::all().add(expr));
        assert!(sql.contains(r#"WHERE LOWER("name") LIKE ? ESCAPE"#), "got: {sql}");
    }

    #[test]
    fn test_regex_binds_pattern() {
        let expr = compile_regex("bio", "^A.*", Dialect::Postgres, false);
        let (sql, values) = render(Condition::all().add(expr));
        assert!(sql.ends_with("WHERE bio ~ ?"), "got: {sql}");
        assert_eq!(values, vec![Value::from("^A.*")]);
    }

    #[test]
    fn test_custom_filter_is_one_group() {
        let callback: FilterCallback = Arc::new(|scope: &mut FilterScope, keyword: &str| {
            let expr = column_equals(scope, "status", keyword.to_string());
            scope.and_where(expr);
            let deleted = Expr::expr(scope.col("deleted")).eq(false);
            scope.and_where(deleted);
        });
        let group = compile_custom(&resolver(), &callback, "active").unwrap();

        let or_group = Joiner::Or
            .group()
            .add(Expr::col(Alias::new("name")).eq("x"))
            .add(group);
        let (sql, values) = render(or_group);
        assert!(
            sql.ends_with(r#"WHERE "name" = ? OR ("status" = ? AND "deleted" = ?)"#),
            "got: {sql}"
        );
        assert_eq!(values[1], Value::from("active"));
    }

    #[test]
    fn test_empty_custom_filter_adds_nothing() {
        let callback: FilterCallback = Arc::new(|_: &mut FilterScope, _: &str| {});
        assert!(compile_custom(&resolver(), &callback, "x").is_none());
    }

    #[test]
    fn test_scope_exposes_table_and_dialect() {
        let scope = FilterScope::new(ColumnResolver::new(
            crate::database::query::BaseQuery::from_table("users").scope().clone(),
            Dialect::MySql,
        ));
        assert_eq!(scope.table(), Some("users"));
        assert_eq!(scope.dialect(), Dialect::MySql);
    }
}
