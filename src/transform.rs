//! Per-row post-processing of fetched rows.
//!
//! Rows arrive as JSON objects keyed by column name. Steps run in a fixed
//! order: added columns, edited columns, `DT_RowId`, removed columns,
//! `DT_RowIndex`.

use std::{fmt, sync::Arc};

use serde_json::{Map, Value as JsonValue};

/// Computes a value from the fetched row.
pub type RowCallback = Arc<dyn Fn(&JsonValue) -> JsonValue + Send + Sync>;

pub const ROW_ID_KEY: &str = "DT_RowId";
pub const ROW_INDEX_KEY: &str = "DT_RowIndex";

/// A fixed value or one computed per row.
#[derive(Clone)]
pub enum ColumnContent {
    Value(JsonValue),
    Computed(RowCallback),
}

impl ColumnContent {
    pub fn computed<F>(callback: F) -> Self
    where
        F: Fn(&JsonValue) -> JsonValue + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(callback))
    }

    fn render(&self, row: &JsonValue) -> JsonValue {
        match self {
            Self::Value(value) => value.clone(),
            Self::Computed(callback) => callback(row),
        }
    }
}

impl fmt::Debug for ColumnContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<JsonValue> for ColumnContent {
    fn from(value: JsonValue) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for ColumnContent {
    fn from(value: &str) -> Self {
        Self::Value(JsonValue::String(value.to_string()))
    }
}

impl From<String> for ColumnContent {
    fn from(value: String) -> Self {
        Self::Value(JsonValue::String(value))
    }
}

#[derive(Debug, Clone)]
struct AddedColumn {
    name: String,
    content: ColumnContent,
    position: Option<usize>,
}

/// Source of `DT_RowId`.
#[derive(Clone)]
pub enum RowId {
    /// Copy a column of the row.
    Column(String),
    Computed(RowCallback),
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(column) => f.debug_tuple("Column").field(column).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for RowId {
    fn from(column: &str) -> Self {
        Self::Column(column.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RowTransformer {
    added: Vec<AddedColumn>,
    edited: Vec<(String, ColumnContent)>,
    removed: Vec<String>,
    row_id: Option<RowId>,
    index_column: bool,
}

impl RowTransformer {
    /// Add a column, at `position` among the row's keys or last.
    pub fn add_column(&mut self, name: &str, content: ColumnContent, position: Option<usize>) {
        self.added.push(AddedColumn {
            name: name.to_string(),
            content,
            position,
        });
    }

    pub fn edit_column(&mut self, name: &str, content: ColumnContent) {
        self.edited.push((name.to_string(), content));
    }

    pub fn remove_column(&mut self, name: &str) {
        self.removed.push(name.to_string());
    }

    pub fn set_row_id(&mut self, row_id: RowId) {
        self.row_id = Some(row_id);
    }

    pub fn add_index_column(&mut self) {
        self.index_column = true;
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.added.is_empty()
            && self.edited.is_empty()
            && self.removed.is_empty()
            && self.row_id.is_none()
            && !self.index_column
    }

    /// Transform fetched rows. `start` is the page offset, so the first row's index is `start + 1`.
    #[must_use]
    pub fn apply(&self, rows: Vec<JsonValue>, start: u64) -> Vec<JsonValue> {
        if self.is_identity() {
            return rows;
        }
        rows.into_iter()
            .zip(start.saturating_add(1)..)
            .map(|(row, index)| self.transform_row(row, index))
            .collect()
    }

    fn transform_row(&self, row: JsonValue, index: u64) -> JsonValue {
        let JsonValue::Object(mut fields) = row else {
            return row;
        };

        for column in &self.added {
            let value = column.content.render(&JsonValue::Object(fields.clone()));
            fields = insert_at(fields, &column.name, value, column.position);
        }

        for (name, content) in &self.edited {
            let value = content.render(&JsonValue::Object(fields.clone()));
            fields.insert(name.clone(), value);
        }

        if let Some(row_id) = &self.row_id {
            let value = match row_id {
                RowId::Column(column) => fields.get(column).cloned(),
                RowId::Computed(callback) => Some(callback(&JsonValue::Object(fields.clone()))),
            };
            if let Some(value) = value {
                fields.insert(ROW_ID_KEY.to_string(), value);
            }
        }

        for name in &self.removed {
            fields.shift_remove(name);
        }

        if self.index_column {
            fields.insert(ROW_INDEX_KEY.to_string(), JsonValue::from(index));
        }

        JsonValue::Object(fields)
    }
}

/// Insert keeping key order; `position` past the end appends.
fn insert_at(
    fields: Map<String, JsonValue>,
    name: &str,
    value: JsonValue,
    position: Option<usize>,
) -> Map<String, JsonValue> {
    let Some(position) = position.filter(|position| *position < fields.len()) else {
        let mut fields = fields;
        fields.insert(name.to_string(), value);
        return fields;
    };

    let mut output = Map::with_capacity(fields.len() + 1);
    let mut pending = Some(value);
    for (current, (key, existing)) in fields.into_iter().enumerate() {
        if current == position {
            if let Some(value) = pending.take() {
                output.insert(name.to_string(), value);
            }
        }
        if key != name {
            output.insert(key, existing);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<JsonValue> {
        vec![
            json!({"id": 1, "first": "Ada", "last": "Lovelace", "password": "x"}),
            json!({"id": 2, "first": "Alan", "last": "Turing", "password": "y"}),
        ]
    }

    #[test]
    fn test_identity_passes_rows_through() {
        assert_eq!(RowTransformer::default().apply(rows(), 0), rows());
    }

    #[test]
    fn test_add_computed_column_at_position() {
        let mut transformer = RowTransformer::default();
        transformer.add_column(
            "full_name",
            ColumnContent::computed(|row| json!(format!("{} {}", row["first"].as_str().unwrap_or(""), row["last"].as_str().unwrap_or("")))),
            Some(1),
        );
        let rows = transformer.apply(rows(), 0);
        assert_eq!(rows[0]["full_name"], "Ada Lovelace");
        let keys: Vec<&String> = rows[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["id", "full_name", "first", "last", "password"]);
    }

    #[test]
    fn test_edit_then_remove() {
        let mut transformer = RowTransformer::default();
        transformer.edit_column("first", ColumnContent::computed(|row| json!(row["first"].as_str().unwrap_or("").to_uppercase())));
        transformer.remove_column("password");
        let rows = transformer.apply(rows(), 0);
        assert_eq!(rows[1]["first"], "ALAN");
        assert!(rows[1].get("password").is_none());
    }

    #[test]
    fn test_row_id_read_before_removal() {
        let mut transformer = RowTransformer::default();
        transformer.set_row_id(RowId::from("id"));
        transformer.remove_column("id");
        let rows = transformer.apply(rows(), 0);
        assert_eq!(rows[0][ROW_ID_KEY], 1);
        assert!(rows[0].get("id").is_none());
    }

    #[test]
    fn test_index_column_starts_after_offset() {
        let mut transformer = RowTransformer::default();
        transformer.add_index_column();
        let rows = transformer.apply(rows(), 20);
        assert_eq!(rows[0][ROW_INDEX_KEY], 21);
        assert_eq!(rows[1][ROW_INDEX_KEY], 22);
    }

    #[test]
    fn test_static_content() {
        let mut transformer = RowTransformer::default();
        transformer.add_column("action", ColumnContent::from("<a>edit</a>"), None);
        let rows = transformer.apply(rows(), 0);
        assert_eq!(rows[0]["action"], "<a>edit</a>");
        assert_eq!(rows[0].as_object().unwrap().keys().last().unwrap(), "action");
    }
}
