//! # tablequery
//!
//! Server-side processing for [DataTables](https://datatables.net) on top of
//! Sea-ORM. Hand it a base query and the client's request; it counts, searches,
//! orders, pages and fetches, and returns the response envelope the client
//! expects.
//!
//! ```rust,ignore
//! use tablequery::{BaseQuery, DataTable, DataTableRequest, DataTableResponse};
//!
//! async fn list(db: &DatabaseConnection, request: DataTableRequest) -> DataTableResponse {
//!     DataTable::new(BaseQuery::from_select(users::Entity::find()), request)
//!         .blacklist(["password"])
//!         .order_column("rank", "rank $1", vec![])
//!         .make(db)
//!         .await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`database`]: dialect templates, the base query wrapper and record counting
//! - [`filtering`]: keyword normalization, predicates, search, ordering, paging
//! - [`table`]: column declarations and the [`DataTable`] engine
//! - [`transform`]: per-row post-processing
//! - [`models`], [`config`], [`errors`]: request/response shapes, settings, failures

pub mod config;
pub mod database;
pub mod errors;
pub mod filtering;
pub mod models;
pub mod table;
pub mod transform;

pub use config::DataTableConfig;
pub use database::{BaseQuery, Dialect};
pub use errors::DataTableError;
pub use filtering::FilterScope;
pub use models::{ColumnRequest, DataTableRequest, DataTableResponse, OrderRequest, SearchValue, SortDirection};
pub use table::{ColumnExpr, CustomOrder, DataTable};
pub use transform::{ColumnContent, RowId};
