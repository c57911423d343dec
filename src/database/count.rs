//! Record counting.
//!
//! The base query is wrapped as a derived table and counted from the outside,
//! the same shape sea-orm's paginator uses. Simple queries have their select
//! list replaced by a constant first, so wide rows are never materialized.

use sea_orm::{
    ConnectionTrait, DatabaseBackend, Statement,
    sea_query::{Alias, Expr, Query},
};

use super::query::BaseQuery;
use crate::errors::DataTableError;

/// Column alias the outer COUNT is read from.
pub const COUNT_ALIAS: &str = "aggregate";

const DERIVED_TABLE_ALIAS: &str = "count_row_table";

/// Keywords whose presence means the select list cannot be replaced.
const COMPLEX_MARKERS: [&str; 5] = ["union", "having", "distinct", "order by", "group by"];

/// Substring test on the rendered SQL.
///
/// Matches inside identifiers and literals too, which only costs the select-list
/// shortcut, never correctness.
#[must_use]
pub fn is_complex_query(sql: &str) -> bool {
    let lower = sql.to_lowercase();
    COMPLEX_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// `SELECT COUNT(*) AS aggregate FROM (<base>) AS count_row_table`
#[must_use]
pub fn count_statement(query: &BaseQuery, backend: DatabaseBackend) -> Statement {
    let mut inner = query.statement().clone();
    if !is_complex_query(&backend.build(&inner).sql) {
        inner
            .clear_selects()
            .expr_as(Expr::cust("'1'"), Alias::new("row_count"));
    }

    let outer = Query::select()
        .expr_as(Expr::cust("COUNT(*)"), Alias::new(COUNT_ALIAS))
        .from_subquery(inner, Alias::new(DERIVED_TABLE_ALIAS))
        .to_owned();
    backend.build(&outer)
}

/// Run a count statement built by [`count_statement`].
///
/// # Errors
///
/// Returns [`DataTableError::Execution`] when the driver fails or the aggregate
/// column cannot be read.
pub async fn fetch_count<C>(db: &C, statement: Statement) -> Result<u64, DataTableError>
where
    C: ConnectionTrait,
{
    tracing::debug!(sql = %statement, "Counting records");
    let Some(row) = db.query_one(statement).await? else {
        return Ok(0);
    };
    let total: i64 = row.try_get("", COUNT_ALIAS)?;
    Ok(u64::try_from(total).unwrap_or(0))
}

/// Count the rows the base query currently matches.
///
/// # Errors
///
/// See [`fetch_count`].
pub async fn count<C>(db: &C, query: &BaseQuery) -> Result<u64, DataTableError>
where
    C: ConnectionTrait,
{
    fetch_count(db, count_statement(query, db.get_database_backend())).await
}
