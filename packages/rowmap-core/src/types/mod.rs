//! Column types and column values.

mod column_type;
mod value;

pub use column_type::ColumnType;
pub use value::Value;
