use sea_orm::sea_query::Condition;

use super::{
    conditions::{Joiner, compile_custom, compile_default, compile_regex},
    keyword::{column_keyword, prepare},
};
use crate::{
    config::DataTableConfig,
    database::query::BaseQuery,
    models::DataTableRequest,
    table::columns::{ColumnRegistry, ColumnResolver, SearchBehavior},
};

/// Everything a search pass reads. Nothing here is mutated during a run.
#[derive(Debug, Clone, Copy)]
pub struct SearchContext<'a> {
    pub request: &'a DataTableRequest,
    pub registry: &'a ColumnRegistry,
    pub resolver: &'a ColumnResolver,
    pub config: &'a DataTableConfig,
}

impl SearchContext<'_> {
    /// Behaviour for a column, `None` when it is blacklisted without a custom filter.
    fn behavior(&self, name: &str) -> Option<SearchBehavior> {
        let behavior = self.registry.search_behavior(name);
        if matches!(behavior, SearchBehavior::Default) && self.registry.is_blacklisted(name) {
            tracing::debug!(column = %name, "Skipping blacklisted column in search");
            return None;
        }
        Some(behavior)
    }
}

/// The group, unless nothing was added to it.
fn non_empty(group: Condition) -> Option<Condition> {
    (!group.is_empty()).then_some(group)
}

/// Per-column search: one predicate per searchable column with a keyword, AND-ed.
///
/// Returns whether a predicate was added to the query.
pub fn apply_column_search(query: &mut BaseQuery, ctx: SearchContext<'_>) -> bool {
    let request = ctx.request;
    let dialect = ctx.resolver.dialect();
    let mut group = Joiner::And.group();

    for index in 0..request.columns.len() {
        if !request.is_column_searchable(index) {
            continue;
        }
        let Some(name) = request.column_name(index) else {
            continue;
        };
        let Some(behavior) = ctx.behavior(name) else {
            continue;
        };

        match behavior {
            SearchBehavior::Custom(callback) => {
                let keyword = column_keyword(request, index, true, ctx.config);
                if let Some(condition) = compile_custom(ctx.resolver, &callback, &keyword) {
                    group = group.add(condition);
                }
            }
            SearchBehavior::Default => {
                let keyword = column_keyword(request, index, false, ctx.config);
                let column = ctx.resolver.column_sql(name);
                let predicate = if request.is_regex(index) {
                    compile_regex(&column, &keyword, dialect, ctx.config.is_case_insensitive())
                } else {
                    compile_default(&column, &keyword, dialect, ctx.config)
                };
                group = group.add(predicate);
            }
        }
    }

    let Some(group) = non_empty(group) else {
        return false;
    };
    query.add_condition(group);
    true
}

/// Global search: an OR group over every searchable column, AND-ed into the query.
///
/// In multi-term mode a non-regex keyword is split on whitespace and every term
/// gets its own group, so all terms must match somewhere.
pub fn apply_global_search(query: &mut BaseQuery, ctx: SearchContext<'_>) -> bool {
    let request = ctx.request;
    if !request.is_searchable() {
        return false;
    }

    let keyword = request.keyword();
    let terms: Vec<&str> = if ctx.config.is_multi_term() && !request.is_global_regex() {
        keyword.split_whitespace().collect()
    } else {
        vec![keyword]
    };

    let mut applied = false;
    for term in terms {
        if let Some(group) = global_term_group(ctx, term) {
            query.add_condition(group);
            applied = true;
        }
    }
    applied
}

fn global_term_group(ctx: SearchContext<'_>, term: &str) -> Option<Condition> {
    let request = ctx.request;
    let dialect = ctx.resolver.dialect();
    let pattern = prepare(term, ctx.config);
    let mut group = Joiner::Or.group();

    for index in request.searchable_column_index() {
        let Some(name) = request.column_name(index) else {
            continue;
        };
        let Some(behavior) = ctx.behavior(name) else {
            continue;
        };

        match behavior {
            SearchBehavior::Custom(callback) => {
                if let Some(condition) = compile_custom(ctx.resolver, &callback, term) {
                    group = group.add(condition);
                }
            }
            SearchBehavior::Default => {
                let column = ctx.resolver.column_sql(name);
                let predicate = if request.is_global_regex() {
                    compile_regex(&column, term, dialect, ctx.config.is_case_insensitive())
                } else {
                    compile_default(&column, &pattern, dialect, ctx.config)
                };
                group = group.add(predicate);
            }
        }
    }

    non_empty(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        database::{dialect::Dialect, query::TableScope},
        filtering::conditions::{FilterScope, column_equals},
        models::{ColumnRequest, SearchValue},
        table::columns::FilterCallback,
    };
    use sea_orm::{
        DatabaseBackend, Value,
        sea_query::{Alias, Asterisk, Query},
    };
    use std::sync::Arc;

    fn users_query() -> BaseQuery {
        BaseQuery::new(Query::select().column(Asterisk).from(Alias::new("users")).to_owned())
    }

    fn request(global: &str) -> DataTableRequest {
        DataTableRequest {
            columns: vec![
                ColumnRequest::new("name"),
                ColumnRequest::new("email"),
                ColumnRequest::new("age").searchable(false),
            ],
            search: SearchValue {
                value: global.to_string(),
                regex: false,
            },
            ..Default::default()
        }
    }

    fn render(query: &BaseQuery) -> (String, Vec<Value>) {
        let statement = query.build(DatabaseBackend::Sqlite, Dialect::Sqlite);
        (statement.sql, statement.values.map(|v| v.0).unwrap_or_default())
    }

    fn run(
        query: &mut BaseQuery,
        request: &DataTableRequest,
        registry: &ColumnRegistry,
        config: &DataTableConfig,
    ) -> (bool, bool) {
        let resolver = ColumnResolver::new(query.scope().clone(), Dialect::Sqlite);
        let ctx = SearchContext {
            request,
            registry,
            resolver: &resolver,
            config,
        };
        let column = apply_column_search(query, ctx);
        let global = apply_global_search(query, ctx);
        (column, global)
    }

    #[test]
    fn test_global_search_or_across_searchable_columns() {
        let mut query = users_query();
        let applied = run(&mut query, &request("John"), &ColumnRegistry::default(), &DataTableConfig::default());
        assert_eq!(applied, (false, true));

        let (sql, values) = render(&query);
        assert!(
            sql.ends_with(r#"WHERE LOWER("name") LIKE ? OR LOWER("email") LIKE ?"#),
            "got: {sql}"
        );
        assert_eq!(values, vec![Value::from("%john%"), Value::from("%john%")]);
    }

    #[test]
    fn test_multi_term_adds_one_group_per_term() {
        let mut query = users_query();
        run(&mut query, &request("john doe"), &ColumnRegistry::default(), &DataTableConfig::default());

        let (sql, values) = render(&query);
        assert!(
            sql.contains(r#"(LOWER("name") LIKE ? OR LOWER("email") LIKE ?) AND (LOWER("name") LIKE ? OR LOWER("email") LIKE ?)"#),
            "got: {sql}"
        );
        assert_eq!(values[2], Value::from("%doe%"));
    }

    #[test]
    fn test_single_term_mode_keeps_keyword_whole() {
        let config = DataTableConfig {
            multi_term: false,
            ..Default::default()
        };
        let mut query = users_query();
        run(&mut query, &request("john doe"), &ColumnRegistry::default(), &config);
        let (_, values) = render(&query);
        assert_eq!(values, vec![Value::from("%john doe%"), Value::from("%john doe%")]);
    }

    #[test]
    fn test_column_and_global_compose_with_and() {
        let mut request = request("john");
        request.columns[1] = ColumnRequest::new("email").with_search("example.com", false);

        let mut query = users_query();
        let applied = run(&mut query, &request, &ColumnRegistry::default(), &DataTableConfig::default());
        assert_eq!(applied, (true, true));

        let (sql, values) = render(&query);
        assert!(
            sql.ends_with(r#"WHERE LOWER("email") LIKE ? AND (LOWER("name") LIKE ? OR LOWER("email") LIKE ?)"#),
            "got: {sql}"
        );
        assert_eq!(values[0], Value::from("%example.com%"));
    }

    #[test]
    fn test_blacklisted_columns_never_searched() {
        let mut registry = ColumnRegistry::default();
        registry.add_to_blacklist(["email"]);

        let mut request = request("john");
        request.columns[1] = ColumnRequest::new("email").with_search("secret", false);

        let mut query = users_query();
        let applied = run(&mut query, &request, &registry, &DataTableConfig::default());
        assert_eq!(applied, (false, true));

        let (sql, _) = render(&query);
        assert!(!sql.contains("email"), "got: {sql}");
    }

    #[test]
    fn test_custom_filter_overrides_blacklist_with_raw_keyword() {
        let mut registry = ColumnRegistry::default();
        registry.add_to_blacklist(["email"]);
        let callback: FilterCallback = Arc::new(|scope: &mut FilterScope, keyword: &str| {
            let expr = column_equals(scope, "email", keyword.to_string());
            scope.and_where(expr);
        });
        registry.register_filter("email", callback);

        let mut query = users_query();
        run(&mut query, &request("John"), &registry, &DataTableConfig::default());

        let (sql, values) = render(&query);
        assert!(sql.ends_with(r#"WHERE LOWER("name") LIKE ? OR "email" = ?"#), "got: {sql}");
        assert_eq!(values[1], Value::from("John"), "Custom filters see the keyword unnormalized");
    }

    #[test]
    fn test_regex_column_search_keeps_pattern() {
        let mut request = request("");
        request.columns.push(ColumnRequest::new("bio").with_search("^A.*", true));

        let mut query = users_query();
        let resolver = ColumnResolver::new(TableScope::default(), Dialect::Postgres);
        let ctx = SearchContext {
            request: &request,
            registry: &ColumnRegistry::default(),
            resolver: &resolver,
            config: &DataTableConfig {
                case_insensitive: false,
                ..Default::default()
            },
        };
        assert!(apply_column_search(&mut query, ctx));

        let statement = query.build(DatabaseBackend::Postgres, Dialect::Postgres);
        assert!(statement.sql.ends_with(r#"WHERE "bio" ~ $1"#), "got: {}", statement.sql);
        assert_eq!(statement.values.unwrap().0, vec![Value::from("^A.*")]);
    }

    #[test]
    fn test_blank_column_keyword_adds_nothing() {
        let mut request = request("");
        request.columns[0] = ColumnRequest::new("name").with_search("   ", false);

        let mut query = users_query();
        let applied = run(&mut query, &request, &ColumnRegistry::default(), &DataTableConfig::default());
        assert_eq!(applied, (false, false));
        assert!(!render(&query).0.contains("WHERE"));
    }

    #[test]
    fn test_empty_keyword_adds_nothing() {
        let mut query = users_query();
        let applied = run(&mut query, &request("   "), &ColumnRegistry::default(), &DataTableConfig::default());
        assert_eq!(applied, (false, false));
        assert!(!render(&query).0.contains("WHERE"));
    }
}
