//! Engine configuration.
//!
//! The configuration store itself lives outside this crate; applications load a
//! [`DataTableConfig`] however they like (it deserializes from any serde format)
//! and hand it to [`DataTable::with_config`](crate::DataTable::with_config).
//!
//! ```rust,ignore
//! let config: DataTableConfig = serde_json::from_str(r#"{"nulls_last": true}"#)?;
//! ```

use serde::{Deserialize, Serialize};

/// Default `sprintf`-style template for NULLS LAST ordering: column, then direction.
pub const DEFAULT_NULLS_LAST_SQL: &str = "%s %s NULLS LAST";

/// Flags controlling keyword normalization, ordering and error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DataTableConfig {
    /// Wrap keywords in `%...%` so they match anywhere in the column.
    pub smart: bool,
    /// Split the global keyword on whitespace and require every term to match.
    pub multi_term: bool,
    /// Compare lower-cased columns against lower-cased keywords.
    pub case_insensitive: bool,
    /// Escape user wildcards and put `%` between every character of the keyword.
    pub use_wildcards: bool,
    /// Match keywords as prefixes (`keyword%`), overriding smart search.
    pub starts_with_search: bool,
    /// Order NULL values last using [`Self::nulls_last_sql`].
    pub nulls_last: bool,
    /// Template for NULLS LAST ordering, two `%s` slots: column and direction.
    pub nulls_last_sql: String,
    /// Echo the request and the executed queries in responses, expose error details.
    pub debug: bool,
    /// Message sent to clients when a run fails and debugging is off.
    pub error_message: Option<String>,
}

impl Default for DataTableConfig {
    fn default() -> Self {
        Self {
            smart: true,
            multi_term: true,
            case_insensitive: true,
            use_wildcards: false,
            starts_with_search: false,
            nulls_last: false,
            nulls_last_sql: DEFAULT_NULLS_LAST_SQL.to_string(),
            debug: false,
            error_message: None,
        }
    }
}

impl DataTableConfig {
    #[must_use]
    pub const fn is_debugging(&self) -> bool {
        self.debug
    }

    #[must_use]
    pub const fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    #[must_use]
    pub const fn is_wildcard(&self) -> bool {
        self.use_wildcards
    }

    #[must_use]
    pub const fn is_smart_search(&self) -> bool {
        self.smart
    }

    #[must_use]
    pub const fn is_multi_term(&self) -> bool {
        self.multi_term
    }

    #[must_use]
    pub const fn is_starts_with_search(&self) -> bool {
        self.starts_with_search
    }

    /// Client-facing message for failed runs.
    #[must_use]
    pub fn error_message(&self) -> &str {
        self.error_message.as_deref().unwrap_or("Server Error")
    }
}
