//! The DataTables engine.
//!
//! A [`DataTable`] owns one base query, one request and the column
//! declarations made by the application. [`DataTable::make`] consumes it and
//! runs the pipeline once: count, search, filtered count, order, page, fetch,
//! transform.
//!
//! ```rust,ignore
//! async fn users(
//!     State(db): State<DatabaseConnection>,
//!     Json(request): Json<DataTableRequest>,
//! ) -> DataTableResponse {
//!     DataTable::new(BaseQuery::from_select(users::Entity::find()), request)
//!         .blacklist(["password"])
//!         .add_index_column()
//!         .make(&db)
//!         .await
//! }
//! ```

use std::sync::Arc;

use sea_orm::{ConnectionTrait, FromQueryResult, Statement, Value};
use serde_json::{Map, Value as JsonValue};

use super::columns::{ColumnRegistry, ColumnResolver, CustomOrder};
use crate::{
    config::DataTableConfig,
    database::{
        count::{count_statement, fetch_count},
        dialect::Dialect,
        query::BaseQuery,
    },
    errors::DataTableError,
    filtering::{
        FilterScope, SearchContext, apply_column_search, apply_global_search, apply_ordering,
        apply_pagination,
    },
    models::{DataTableRequest, DataTableResponse},
    transform::{ColumnContent, RowId, RowTransformer},
};

/// Callback given full control over the base query.
pub type QueryCallback = Arc<dyn Fn(&mut BaseQuery) + Send + Sync>;

/// State of a single run. Never outlives [`DataTable::make`].
#[derive(Debug, Default)]
struct RunState {
    debug: bool,
    filter_applied: bool,
    /// Offset actually applied, used for `DT_RowIndex`.
    offset: u64,
    queries: Vec<String>,
}

impl RunState {
    fn log(&mut self, statement: &Statement) {
        tracing::debug!(sql = %statement, "DataTables query");
        if self.debug {
            self.queries.push(statement.to_string());
        }
    }
}

#[derive(Debug)]
struct Page {
    total: u64,
    filtered: u64,
    data: Vec<JsonValue>,
}

/// Server-side processing for one DataTables request.
pub struct DataTable {
    query: BaseQuery,
    request: DataTableRequest,
    config: DataTableConfig,
    dialect: Option<Dialect>,
    columns: ColumnRegistry,
    transformer: RowTransformer,
    filter_callback: Option<QueryCallback>,
    auto_filter: bool,
    order_callback: Option<QueryCallback>,
    skip_paging: bool,
    total_records: Option<u64>,
    filtered_records: Option<u64>,
    extra: Map<String, JsonValue>,
}

impl std::fmt::Debug for DataTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataTable")
            .field("query", &self.query)
            .field("request", &self.request)
            .field("config", &self.config)
            .field("dialect", &self.dialect)
            .field("columns", &self.columns)
            .field("transformer", &self.transformer)
            .field("filter_callback", &self.filter_callback.is_some())
            .field("auto_filter", &self.auto_filter)
            .field("order_callback", &self.order_callback.is_some())
            .field("skip_paging", &self.skip_paging)
            .field("total_records", &self.total_records)
            .field("filtered_records", &self.filtered_records)
            .finish_non_exhaustive()
    }
}

impl DataTable {
    #[must_use]
    pub fn new(query: BaseQuery, request: DataTableRequest) -> Self {
        Self {
            query,
            request,
            config: DataTableConfig::default(),
            dialect: None,
            columns: ColumnRegistry::default(),
            transformer: RowTransformer::default(),
            filter_callback: None,
            auto_filter: true,
            order_callback: None,
            skip_paging: false,
            total_records: None,
            filtered_records: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: DataTableConfig) -> Self {
        self.config = config;
        self
    }

    /// Compile fragments for this dialect instead of the connection's backend.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Replace default filtering with a callback on the base query.
    ///
    /// Global search still runs when `global_search` is true; per-column search always runs.
    #[must_use]
    pub fn filter<F>(mut self, callback: F, global_search: bool) -> Self
    where
        F: Fn(&mut BaseQuery) + Send + Sync + 'static,
    {
        self.filter_callback = Some(Arc::new(callback));
        self.auto_filter = global_search;
        self
    }

    /// Search a column with custom predicates. The callback receives the raw keyword.
    #[must_use]
    pub fn filter_column<F>(mut self, column: &str, callback: F) -> Self
    where
        F: Fn(&mut FilterScope, &str) + Send + Sync + 'static,
    {
        self.columns.register_filter(column, Arc::new(callback));
        self
    }

    /// Order a column with a raw template. `$1` receives the direction.
    #[must_use]
    pub fn order_column(mut self, column: &str, sql: &str, bindings: Vec<Value>) -> Self {
        self.columns
            .register_order(column, CustomOrder::new(sql, bindings));
        self
    }

    /// [`Self::order_column`] for several columns; `:column` receives each column name.
    #[must_use]
    pub fn order_columns(mut self, columns: &[&str], sql: &str, bindings: &[Value]) -> Self {
        for column in columns {
            self.columns.register_order(
                column,
                CustomOrder::new(sql.replace(":column", column), bindings.to_vec()),
            );
        }
        self
    }

    /// Replace default ordering with a callback on the base query.
    #[must_use]
    pub fn order<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut BaseQuery) + Send + Sync + 'static,
    {
        self.order_callback = Some(Arc::new(callback));
        self
    }

    /// Exclude columns from default search and ordering.
    #[must_use]
    pub fn blacklist<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.add_to_blacklist(columns);
        self
    }

    /// Allow default search and ordering on these columns only.
    #[must_use]
    pub fn whitelist<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.set_whitelist(columns);
        self
    }

    /// Add a column to every row, at `order` among the row's keys or last.
    #[must_use]
    pub fn add_column(mut self, name: &str, content: impl Into<ColumnContent>, order: Option<usize>) -> Self {
        self.transformer.add_column(name, content.into(), order);
        self
    }

    #[must_use]
    pub fn edit_column(mut self, name: &str, content: impl Into<ColumnContent>) -> Self {
        self.transformer.edit_column(name, content.into());
        self
    }

    #[must_use]
    pub fn remove_column(mut self, names: &[&str]) -> Self {
        for name in names {
            self.transformer.remove_column(name);
        }
        self
    }

    /// Number rows with `DT_RowIndex`, starting at the page offset plus one.
    #[must_use]
    pub fn add_index_column(mut self) -> Self {
        self.transformer.add_index_column();
        self
    }

    #[must_use]
    pub fn set_row_id(mut self, row_id: impl Into<RowId>) -> Self {
        self.transformer.set_row_id(row_id.into());
        self
    }

    /// Extra top-level key in the response.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub const fn skip_paging(mut self) -> Self {
        self.skip_paging = true;
        self
    }

    /// Use this total instead of counting the base query.
    #[must_use]
    pub const fn set_total_records(mut self, total: u64) -> Self {
        self.total_records = Some(total);
        self
    }

    /// Use this filtered count instead of counting after search.
    #[must_use]
    pub const fn set_filtered_records(mut self, filtered: u64) -> Self {
        self.filtered_records = Some(filtered);
        self
    }

    #[must_use]
    pub const fn get_query(&self) -> &BaseQuery {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut BaseQuery {
        &mut self.query
    }

    #[must_use]
    pub const fn request(&self) -> &DataTableRequest {
        &self.request
    }

    /// Run the request. Failures are reported in the response's `error` field.
    pub async fn make<C>(mut self, db: &C) -> DataTableResponse
    where
        C: ConnectionTrait,
    {
        let mut state = self.run_state();
        match self.run(db, &mut state).await {
            Ok(page) => self.respond(page, state),
            Err(err) => self.error_response(&err, state),
        }
    }

    /// Run the request and return failures to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`DataTableError::QueryCompilation`] for invalid order directives
    /// or templates and [`DataTableError::Execution`] when the database fails.
    pub async fn try_make<C>(mut self, db: &C) -> Result<DataTableResponse, DataTableError>
    where
        C: ConnectionTrait,
    {
        let mut state = self.run_state();
        let page = self.run(db, &mut state).await?;
        Ok(self.respond(page, state))
    }

    fn run_state(&self) -> RunState {
        RunState {
            debug: self.config.is_debugging(),
            ..RunState::default()
        }
    }

    async fn run<C>(&mut self, db: &C, state: &mut RunState) -> Result<Page, DataTableError>
    where
        C: ConnectionTrait,
    {
        let backend = db.get_database_backend();
        let dialect = self.dialect.unwrap_or_else(|| Dialect::from(backend));
        tracing::debug!(draw = self.request.draw, ?dialect, "Processing DataTables request");

        let total = match self.total_records {
            Some(total) => total,
            None => self.count(db, state).await?,
        };

        let mut filtered = total;
        if total > 0 {
            self.filter_records(dialect, state);
            filtered = match self.filtered_records {
                Some(filtered) => filtered,
                None if state.filter_applied => self.count(db, state).await?,
                None => total,
            };
            self.order_records(dialect)?;
            self.paginate(state);
        }

        let statement = self.query.build(backend, dialect);
        state.log(&statement);
        let rows = JsonValue::find_by_statement(statement).all(db).await?;
        tracing::debug!(total, filtered, rows = rows.len(), "DataTables request processed");

        Ok(Page {
            total,
            filtered,
            data: self.transformer.apply(rows, state.offset),
        })
    }

    async fn count<C>(&self, db: &C, state: &mut RunState) -> Result<u64, DataTableError>
    where
        C: ConnectionTrait,
    {
        let statement = count_statement(&self.query, db.get_database_backend());
        state.log(&statement);
        fetch_count(db, statement).await
    }

    fn filter_records(&mut self, dialect: Dialect, state: &mut RunState) {
        // Resolve columns against the derived table when the base query is limited
        self.query.isolate_row_limit();
        if let Some(callback) = &self.filter_callback {
            callback(&mut self.query);
            state.filter_applied = true;
        }

        let resolver = ColumnResolver::new(self.query.scope().clone(), dialect);
        let ctx = SearchContext {
            request: &self.request,
            registry: &self.columns,
            resolver: &resolver,
            config: &self.config,
        };
        if apply_column_search(&mut self.query, ctx) {
            state.filter_applied = true;
        }
        if self.auto_filter && apply_global_search(&mut self.query, ctx) {
            state.filter_applied = true;
        }
    }

    fn order_records(&mut self, dialect: Dialect) -> Result<(), DataTableError> {
        if let Some(callback) = &self.order_callback {
            callback(&mut self.query);
            return Ok(());
        }
        let resolver = ColumnResolver::new(self.query.scope().clone(), dialect);
        apply_ordering(
            &mut self.query,
            &self.request,
            &self.columns,
            &resolver,
            &self.config,
        )
    }

    fn paginate(&mut self, state: &mut RunState) {
        if self.skip_paging {
            return;
        }
        if let Some((offset, _)) = apply_pagination(&mut self.query, &self.request) {
            state.offset = offset;
        }
    }

    fn respond(&mut self, page: Page, state: RunState) -> DataTableResponse {
        DataTableResponse {
            draw: self.request.draw,
            records_total: page.total,
            records_filtered: page.filtered,
            data: page.data,
            error: None,
            queries: state.debug.then_some(state.queries),
            input: self.input(state.debug),
            extra: std::mem::take(&mut self.extra),
        }
    }

    fn error_response(&self, err: &DataTableError, state: RunState) -> DataTableResponse {
        err.log_internal();
        let message = if state.debug {
            format!("Exception Message:\n\n{}", err.debug_message())
        } else {
            self.config.error_message().to_string()
        };
        DataTableResponse {
            draw: self.request.draw,
            error: Some(message),
            queries: state.debug.then_some(state.queries),
            input: self.input(state.debug),
            ..Default::default()
        }
    }

    fn input(&self, debug: bool) -> Option<JsonValue> {
        if !debug {
            return None;
        }
        serde_json::to_value(&self.request)
            .inspect_err(|err| tracing::warn!(error = %err, "Could not echo DataTables request"))
            .ok()
    }
}
