//! # Search, Ordering & Paging
//!
//! Translates a DataTables request into additions to the base query. Every
//! value that reaches SQL is bound; only identifiers resolved by
//! [`ColumnResolver`](crate::table::columns::ColumnResolver) and application
//! supplied templates are written verbatim.
//!
//! ## Main Components
//!
//! - **[`keyword`]**: keyword normalization (case folding, wildcard escaping, smart wrap)
//! - **[`conditions`]**: predicate compilation (`LIKE`, regex, custom filter groups)
//! - **[`search`]**: per-column and global search orchestration
//! - **[`sort`]**: ORDER BY emission
//! - **[`pagination`]**: offset and limit resolution
//!
//! ## Composition
//!
//! ```sql
//! WHERE <base conditions>
//!   AND <per-column predicates AND-ed>
//!   AND (<global predicates OR-ed>)
//! ```

pub mod conditions;
pub mod keyword;
pub mod pagination;
pub mod search;
pub mod sort;

// Re-export commonly used items
pub use conditions::{FilterScope, Joiner, column_equals, compile_custom, compile_default, compile_regex};
pub use keyword::{column_keyword, prepare};
pub use pagination::{DEFAULT_LIMIT, apply_pagination};
pub use search::{SearchContext, apply_column_search, apply_global_search};
pub use sort::apply_ordering;
