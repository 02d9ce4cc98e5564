//! Row-oriented storage collaborator and its in-memory implementation.

mod cursor;
mod memory;
mod row;
mod row_buffer;
mod stats;

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::DbError;
use crate::query::BoundOp;
use crate::table::TableDef;
use crate::types::Value;

pub use cursor::RowCursor;
pub use memory::{MemoryStore, TableSnapshot};
pub use row::Row;
pub use stats::StoreStats;

/// Row store used by the CRUD executor.
///
/// Implementations report their own failures (constraint violations, missing
/// tables or rows) as `DbError`; callers propagate them unchanged.
pub trait RowStore: Send + Sync + Debug {
    /// Creates the table unless a table with that name exists.
    ///
    /// # Returns
    /// `Result<bool, DbError>` with `true` if the table was created.
    fn create_table_if_absent(&self, table: &Arc<TableDef>) -> Result<bool, DbError>;

    /// Returns whether the table exists.
    fn table_exists(&self, table: &str) -> Result<bool, DbError>;

    /// Drops the table and its rows.
    ///
    /// # Returns
    /// `Result<bool, DbError>` with `true` if a table was dropped.
    fn drop_table(&self, table: &str) -> Result<bool, DbError>;

    /// Allocates the next primary key without inserting a row.
    fn reserve_id(&self, table: &str) -> Result<i64, DbError>;

    /// Inserts a row with a generated primary key and returns the key.
    fn insert(&self, table: &str, values: Vec<Value>) -> Result<i64, DbError>;

    /// Inserts a row under a key previously returned by `reserve_id`.
    fn insert_with_id(&self, table: &str, row: Row) -> Result<(), DbError>;

    /// Writes a row back verbatim, replacing any row with the same key.
    ///
    /// Used to undo changes; constraints are not checked.
    fn restore_row(&self, table: &str, row: Row) -> Result<(), DbError>;

    /// Point lookup by primary key.
    fn select_by_id(&self, table: &str, id: i64) -> Result<Option<Row>, DbError>;

    /// Batch lookup by primary keys in one round trip. Missing keys are
    /// skipped; rows come back ordered by key.
    fn select_by_ids(&self, table: &str, ids: &[i64]) -> Result<Vec<Row>, DbError>;

    /// Opens a lazy cursor over the table, optionally filtered.
    fn scan(&self, table: &str, filter: Option<BoundOp>) -> Result<RowCursor, DbError>;

    /// Applies `(column index, value)` changes to a row.
    ///
    /// # Returns
    /// `Result<Row, DbError>` containing the row as it was before the update.
    fn update(&self, table: &str, id: i64, changes: &[(usize, Value)]) -> Result<Row, DbError>;

    /// Deletes a row by primary key.
    ///
    /// # Returns
    /// `Result<Row, DbError>` containing the removed row.
    fn delete(&self, table: &str, id: i64) -> Result<Row, DbError>;

    /// Exports every table with its rows and sequence, sorted by name.
    fn export_tables(&self) -> Result<Vec<TableSnapshot>, DbError>;

    /// Loads a table image. The table must not exist yet.
    fn import_table(&self, table: Arc<TableDef>, next_id: i64, rows: Vec<Row>) -> Result<(), DbError>;

    /// Round-trip counters.
    fn stats(&self) -> StoreStats;
}
