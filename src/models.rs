use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use utoipa::ToSchema;

/// Normalized DataTables server-side request.
///
/// The HTTP binding layer is expected to produce this shape, either directly
/// from a JSON body or from the form-encoded `columns[0][data]=...` parameters.
///
/// # Example
/// ```json
/// {
///   "draw": 1,
///   "columns": [
///     {"data": "name", "searchable": true, "orderable": true, "search": {"value": "", "regex": false}}
///   ],
///   "order": [{"column": 0, "dir": "asc"}],
///   "start": 0,
///   "length": 10,
///   "search": {"value": "john", "regex": false}
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct DataTableRequest {
    /// Draw counter echoed back in the response.
    #[serde(default)]
    pub draw: u64,
    /// Column descriptors, in table order.
    #[serde(default)]
    pub columns: Vec<ColumnRequest>,
    /// Sort directives, in priority order.
    #[serde(default)]
    pub order: Vec<OrderRequest>,
    /// First row to return.
    #[serde(default)]
    pub start: Option<i64>,
    /// Page length. `-1` requests every row.
    #[serde(default)]
    pub length: Option<i64>,
    /// Global search.
    #[serde(default)]
    pub search: SearchValue,
}

/// One column of the client table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct ColumnRequest {
    /// Data source of the column (usually the field name).
    #[serde(default)]
    pub data: String,
    /// Optional explicit column name, takes precedence over `data`.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub searchable: bool,
    #[serde(default = "default_true")]
    pub orderable: bool,
    #[serde(default)]
    pub search: SearchValue,
}

/// A search keyword and whether it is a regular expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct SearchValue {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub regex: bool,
}

/// A requested sort on a column index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct OrderRequest {
    pub column: usize,
    #[serde(default = "default_dir")]
    pub dir: String,
}

const fn default_true() -> bool {
    true
}

fn default_dir() -> String {
    "asc".to_string()
}

/// Sort direction, sanitized from the raw request value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Anything other than `desc` (case-insensitive) sorts ascending.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// An orderable sort directive resolved from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDirective {
    /// Index into [`DataTableRequest::columns`].
    pub column: usize,
    pub direction: SortDirection,
}

impl ColumnRequest {
    /// Convenience constructor for a searchable, orderable column.
    #[must_use]
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            name: None,
            searchable: true,
            orderable: true,
            search: SearchValue::default(),
        }
    }

    #[must_use]
    pub fn with_search(mut self, value: impl Into<String>, regex: bool) -> Self {
        self.search = SearchValue {
            value: value.into(),
            regex,
        };
        self
    }

    #[must_use]
    pub const fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    #[must_use]
    pub const fn orderable(mut self, orderable: bool) -> Self {
        self.orderable = orderable;
        self
    }
}

impl DataTableRequest {
    /// Sort directives whose column exists and is orderable, in request order.
    ///
    /// Directives pointing past the column list are kept so the order
    /// orchestrator can report them as invalid column references.
    #[must_use]
    pub fn orderable_columns(&self) -> Vec<OrderDirective> {
        self.order
            .iter()
            .filter(|order| self.columns.get(order.column).is_none_or(|column| column.orderable))
            .map(|order| OrderDirective {
                column: order.column,
                direction: SortDirection::parse(&order.dir),
            })
            .collect()
    }

    #[must_use]
    pub fn is_orderable(&self) -> bool {
        !self.order.is_empty()
    }

    /// Whether a non-empty global keyword was sent.
    #[must_use]
    pub fn is_searchable(&self) -> bool {
        !self.keyword().is_empty()
    }

    /// Global keyword, trimmed.
    #[must_use]
    pub fn keyword(&self) -> &str {
        self.search.value.trim()
    }

    #[must_use]
    pub const fn is_global_regex(&self) -> bool {
        self.search.regex
    }

    /// A column takes part in per-column search when it is searchable and has a keyword.
    #[must_use]
    pub fn is_column_searchable(&self, index: usize) -> bool {
        self.columns
            .get(index)
            .is_some_and(|column| column.searchable && !column.search.value.trim().is_empty())
    }

    /// Per-column keyword, trimmed like the global one.
    #[must_use]
    pub fn column_keyword(&self, index: usize) -> &str {
        self.columns
            .get(index)
            .map_or("", |column| column.search.value.trim())
    }

    #[must_use]
    pub fn is_regex(&self, index: usize) -> bool {
        self.columns
            .get(index)
            .is_some_and(|column| column.search.regex)
    }

    /// Indexes of every column flagged searchable, used by global search.
    #[must_use]
    pub fn searchable_column_index(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.searchable)
            .map(|(index, _)| index)
            .collect()
    }

    /// Column name for an index: explicit `name`, else `data`.
    ///
    /// Empty and purely numeric names (array data sources) resolve to `None`.
    #[must_use]
    pub fn column_name(&self, index: usize) -> Option<&str> {
        let column = self.columns.get(index)?;
        let name = column
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(column.data.as_str());
        if name.is_empty() || name.chars().all(|c| c.is_ascii_digit()) {
            None
        } else {
            Some(name)
        }
    }

    /// Offset requested by the client, absent when not sent.
    #[must_use]
    pub const fn start(&self) -> Option<i64> {
        self.start
    }

    /// Page length requested by the client, absent when not sent.
    #[must_use]
    pub const fn length(&self) -> Option<i64> {
        self.length
    }

    /// `length == -1` asks for every row.
    #[must_use]
    pub fn is_paginationable(&self) -> bool {
        self.length != Some(-1)
    }
}

/// DataTables server-side response envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTableResponse {
    pub draw: u64,
    pub records_total: u64,
    pub records_filtered: u64,
    pub data: Vec<JsonValue>,
    /// Set when the run failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Executed SQL, only in debug mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<String>>,
    /// Request echo, only in debug mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<JsonValue>,
    /// Additional payload registered with [`DataTable::with`](crate::DataTable::with).
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl DataTableResponse {
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// DataTables reads errors from the body, so the status is always 200.
impl axum::response::IntoResponse for DataTableResponse {
    fn into_response(self) -> axum::response::Response {
        axum::Json(self).into_response()
    }
}
