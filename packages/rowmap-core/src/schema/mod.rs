//! Schema registry and serializable schema structs.

mod registry;
mod schema_file;

pub use registry::SchemaRegistry;
pub use schema_file::{ColumnSchema, PrimaryKeySchema, ReferenceSchema, TableSchema};
