use crate::{
    config::DataTableConfig,
    database::query::BaseQuery,
    errors::DataTableError,
    models::DataTableRequest,
    table::columns::{ColumnRegistry, ColumnResolver, OrderBehavior},
};

/// Append one ORDER BY fragment per orderable directive, in request order.
///
/// Blacklisted columns are skipped unless they carry a custom order. Custom
/// templates receive the direction through `$1` and keep their bindings.
///
/// # Errors
///
/// [`DataTableError::QueryCompilation`] when a directive points past the column
/// list or a custom template's placeholders do not match its bindings.
pub fn apply_ordering(
    query: &mut BaseQuery,
    request: &DataTableRequest,
    registry: &ColumnRegistry,
    resolver: &ColumnResolver,
    config: &DataTableConfig,
) -> Result<(), DataTableError> {
    if !request.is_orderable() {
        return Ok(());
    }

    for directive in request.orderable_columns() {
        if directive.column >= request.columns.len() {
            return Err(DataTableError::compilation(format!(
                "Order directive references unknown column index {}",
                directive.column
            )));
        }
        let Some(name) = request.column_name(directive.column) else {
            continue;
        };
        let direction = directive.direction.as_sql();

        match registry.order_behavior(name) {
            OrderBehavior::Custom(order) => {
                let (sql, bindings) = order.compile(name, direction)?;
                query.order_by_raw(sql, bindings);
            }
            OrderBehavior::Default if registry.is_blacklisted(name) => {
                tracing::debug!(column = %name, "Skipping blacklisted column in ordering");
            }
            OrderBehavior::Default => {
                let column = resolver.column_sql(name);
                let sql = if config.nulls_last {
                    resolver
                        .dialect()
                        .nulls_last(&column, direction, &config.nulls_last_sql)
                } else {
                    format!("{column} {direction}")
                };
                query.order_by_raw(sql, Vec::new());
            }
        }
    }
    Ok(())
}
