// Database access: dialect templates, the augmented base query and counting

pub mod count;
pub mod dialect;
pub mod query;

// Re-export commonly used items
pub use count::{count, count_statement, is_complex_query};
pub use dialect::{Dialect, RegexForm, RegexPredicate};
pub use query::{BaseQuery, OrderClause, TableScope};
