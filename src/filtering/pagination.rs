use crate::{database::query::BaseQuery, models::DataTableRequest};

/// Page length used when the client sends none, or a non-positive one.
pub const DEFAULT_LIMIT: u64 = 10;

/// Resolve `(offset, limit)` from the raw request values.
///
/// # Arguments
///
/// * `start` - First row, absent or negative means 0.
/// * `length` - Page length, absent or `<= 0` means [`DEFAULT_LIMIT`].
#[must_use]
pub fn resolve(start: Option<i64>, length: Option<i64>) -> (u64, u64) {
    let offset = start.and_then(|start| u64::try_from(start).ok()).unwrap_or(0);
    let limit = length
        .filter(|length| *length > 0)
        .and_then(|length| u64::try_from(length).ok())
        .unwrap_or(DEFAULT_LIMIT);
    (offset, limit)
}

/// Apply paging unless the request asks for every row (`length == -1`).
///
/// Returns the applied `(offset, limit)`.
pub fn apply_pagination(query: &mut BaseQuery, request: &DataTableRequest) -> Option<(u64, u64)> {
    if !request.is_paginationable() {
        return None;
    }
    let (offset, limit) = resolve(request.start(), request.length());
    query.page(offset, limit);
    Some((offset, limit))
}
