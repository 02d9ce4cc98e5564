//! Entity layer over a row store.
//!
//! Provides table descriptors with auto-increment keys, a per-scope identity
//! map, lazy and batched reference loading, statement execution, undo-based
//! scopes and snapshot persistence.

pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod persistence;
pub mod query;
pub mod schema;
pub mod store;
pub mod table;
pub mod transaction;
pub mod types;

pub use config::OrmConfig;
pub use database::Database;
pub use entity::{Entity, EntityClass, EntityId, EntityQuery, IdentityMap, Model, ModelQuery};
pub use error::DbError;
pub use query::{EntityIter, InsertStatement, Op, UpdateStatement};
pub use schema::SchemaRegistry;
pub use store::{MemoryStore, Row, RowCursor, RowStore, StoreStats};
pub use table::{Column, PrimaryKeyStrategy, Reference, ReferenceStyle, TableBuilder, TableDef};
pub use transaction::Scope;
pub use types::{ColumnType, Value};
