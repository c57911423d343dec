//! Column registry and resolution.
//!
//! The registry records what the application declared about columns before a
//! run: custom search filters, custom ORDER BY templates, the blacklist and
//! the whitelist. It is read-only while a run is in progress.
//!
//! The resolver turns a request column name into SQL, qualified against the
//! base query so joined tables never make a bare name ambiguous.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use sea_orm::Value;

use crate::{
    database::{
        dialect::Dialect,
        query::{TableScope, count_placeholders},
    },
    errors::DataTableError,
    filtering::conditions::FilterScope,
};

/// Builds the predicates of a custom column filter from the raw keyword.
pub type FilterCallback = Arc<dyn Fn(&mut FilterScope, &str) + Send + Sync>;

/// A raw ORDER BY template. `$1` receives the direction, `?` binds `bindings`.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomOrder {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl CustomOrder {
    #[must_use]
    pub fn new(sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            bindings,
        }
    }

    /// Substitute the direction and check placeholders against bindings.
    ///
    /// # Errors
    ///
    /// Returns [`DataTableError::QueryCompilation`] when the template's `?`
    /// count differs from the number of bindings.
    pub fn compile(&self, column: &str, direction: &str) -> Result<(String, Vec<Value>), DataTableError> {
        let placeholders = count_placeholders(&self.sql);
        if placeholders != self.bindings.len() {
            return Err(DataTableError::compilation(format!(
                "Order template for `{column}` has {placeholders} placeholders but {} bindings",
                self.bindings.len()
            )));
        }
        Ok((self.sql.replace("$1", direction), self.bindings.clone()))
    }
}

/// How a column is searched during a run.
#[derive(Clone)]
pub enum SearchBehavior {
    Default,
    Custom(FilterCallback),
}

impl fmt::Debug for SearchBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// How a column is ordered during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderBehavior {
    Default,
    Custom(CustomOrder),
}

/// Per-column declarations, keyed by column name.
#[derive(Clone, Default)]
pub struct ColumnRegistry {
    filters: HashMap<String, FilterCallback>,
    orders: HashMap<String, CustomOrder>,
    blacklist: HashSet<String>,
    /// `None` means every column (`*`).
    whitelist: Option<HashSet<String>>,
}

impl fmt::Debug for ColumnRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnRegistry")
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .field("orders", &self.orders)
            .field("blacklist", &self.blacklist)
            .field("whitelist", &self.whitelist)
            .finish()
    }
}

impl ColumnRegistry {
    pub fn register_filter(&mut self, column: &str, callback: FilterCallback) {
        self.filters.insert(column.to_string(), callback);
    }

    pub fn register_order(&mut self, column: &str, order: CustomOrder) {
        self.orders.insert(column.to_string(), order);
    }

    pub fn add_to_blacklist<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist.extend(columns.into_iter().map(Into::into));
    }

    /// Restrict default search and ordering to these columns. `*` allows all.
    pub fn set_whitelist<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: HashSet<String> = columns.into_iter().map(Into::into).collect();
        self.whitelist = if columns.contains("*") {
            None
        } else {
            Some(columns)
        };
    }

    fn is_whitelisted(&self, column: &str) -> bool {
        self.whitelist
            .as_ref()
            .is_some_and(|whitelist| whitelist.contains(column))
    }

    /// Excluded from default search and ordering.
    ///
    /// Expression columns (`COUNT(...)`) are SQL sent by the client, so they are
    /// blacklisted unless whitelisted by name.
    #[must_use]
    pub fn is_blacklisted(&self, column: &str) -> bool {
        if self.blacklist.contains(column) {
            return true;
        }
        if is_function_call(column) {
            return !self.is_whitelisted(column);
        }
        self.whitelist.is_some() && !self.is_whitelisted(column)
    }

    #[must_use]
    pub fn has_custom_filter(&self, column: &str) -> bool {
        self.filters.contains_key(column)
    }

    #[must_use]
    pub fn has_custom_order(&self, column: &str) -> bool {
        self.orders.contains_key(column)
    }

    #[must_use]
    pub fn search_behavior(&self, column: &str) -> SearchBehavior {
        self.filters
            .get(column)
            .map_or(SearchBehavior::Default, |callback| {
                SearchBehavior::Custom(Arc::clone(callback))
            })
    }

    #[must_use]
    pub fn order_behavior(&self, column: &str) -> OrderBehavior {
        self.orders
            .get(column)
            .map_or(OrderBehavior::Default, |order| OrderBehavior::Custom(order.clone()))
    }
}

/// `name(...)`: an identifier immediately followed by a parenthesized argument list.
#[must_use]
pub fn is_function_call(name: &str) -> bool {
    let name = name.trim();
    let Some(open) = name.find('(') else {
        return false;
    };
    let function = name[..open].trim_end();
    !function.is_empty()
        && function
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && name.ends_with(')')
        && parentheses_balanced(&name[open..])
}

fn parentheses_balanced(input: &str) -> bool {
    let mut depth = 0i32;
    for c in input.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// SQL for a resolved column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnExpr {
    /// Quoted identifier, optionally qualified by a table or relation alias.
    Ident {
        table: Option<String>,
        column: String,
    },
    /// Expression used verbatim.
    Raw(String),
}

impl ColumnExpr {
    #[must_use]
    pub fn to_sql(&self, dialect: Dialect) -> String {
        match self {
            Self::Ident {
                table: Some(table),
                column,
            } => format!(
                "{}.{}",
                dialect.quote_path(table),
                dialect.quote_identifier(column)
            ),
            Self::Ident { table: None, column } => dialect.quote_path(column),
            Self::Raw(sql) => sql.clone(),
        }
    }
}

/// Resolves request column names against one base query.
#[derive(Debug, Clone)]
pub struct ColumnResolver {
    scope: TableScope,
    dialect: Dialect,
}

impl ColumnResolver {
    #[must_use]
    pub const fn new(scope: TableScope, dialect: Dialect) -> Self {
        Self { scope, dialect }
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub const fn scope(&self) -> &TableScope {
        &self.scope
    }

    #[must_use]
    pub fn resolve(&self, name: &str) -> ColumnExpr {
        if is_function_call(name) {
            return ColumnExpr::Raw(name.trim().to_string());
        }

        if let Some((relation, leaf)) = name.rsplit_once('.') {
            if self.scope.is_relation_aware() {
                if let Some(table) = self.scope.eager_table(relation) {
                    return ColumnExpr::Ident {
                        table: Some(table.to_string()),
                        column: leaf.to_string(),
                    };
                }
            }
            // Not an eager-loaded relation: a literal `table.column` reference
            return ColumnExpr::Ident {
                table: None,
                column: name.to_string(),
            };
        }

        ColumnExpr::Ident {
            table: self.scope.table().map(str::to_string),
            column: name.to_string(),
        }
    }

    /// Resolve and render in one step.
    #[must_use]
    pub fn column_sql(&self, name: &str) -> String {
        self.resolve(name).to_sql(self.dialect)
    }
}
