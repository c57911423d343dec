// Engine: column declarations, resolution and the request pipeline

pub mod columns;
pub mod engine;

// Re-export commonly used items
pub use columns::{ColumnExpr, ColumnRegistry, ColumnResolver, CustomOrder, FilterCallback, OrderBehavior, SearchBehavior};
pub use engine::{DataTable, QueryCallback};
