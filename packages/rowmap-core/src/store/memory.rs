//! In-memory row store.
//!
//! Each table has:
//! - Its descriptor
//! - A copy-on-write row buffer for lock-free reads
//! - A primary key sequence generator
//! - A writer mutex serializing changes to the buffer
//!
//! With foreign keys enforced, a store-wide constraint mutex is held from
//! the reference check through the mutation, always before any table's
//! writer mutex.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::{Deserialize, Serialize};

use crate::config::OrmConfig;
use crate::error::DbError;
use crate::query::{check_not_null, BoundOp};
use crate::schema::TableSchema;
use crate::table::TableDef;
use crate::types::Value;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::cursor::RowCursor;
use super::row::Row;
use super::row_buffer::{find_in, RowBuffer};
use super::stats::{StatKind, StatsCounters, StoreStats};
use super::RowStore;

#[derive(Debug)]
struct StoredTable {
    def: Arc<TableDef>,
    rows: RowBuffer,
    /// Next primary key to hand out
    next_id: AtomicI64,
    write_lock: Mutex<()>,
}

impl StoredTable {
    fn new(def: Arc<TableDef>, rows: RowBuffer, next_id: i64) -> Self {
        Self {
            def,
            rows,
            next_id: AtomicI64::new(next_id),
            write_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, DbError> {
        self.write_lock.lock().map_err(|_| DbError::LockPoisoned)
    }

    /// Keeps the sequence ahead of every key written so far.
    fn bump_sequence(&self, id: i64) {
        self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
    }
}

/// Serializable image of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub schema: TableSchema,
    pub next_id: i64,
    pub rows: Vec<Row>,
}

/// In-memory implementation of [`RowStore`].
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, StoredTable>>,
    enforce_foreign_keys: bool,
    /// Serializes checked writes so a check stays valid until its write lands
    constraint_lock: Mutex<()>,
    initial_table_capacity: usize,
    stats: StatsCounters,
}

type TableMap = HashMap<String, StoredTable>;

impl MemoryStore {
    /// Creates an empty store with default settings.
    pub fn new() -> Self {
        Self::with_config(&OrmConfig::default())
    }

    /// Creates an empty store using the capacity and foreign key settings
    /// from `config`.
    pub fn with_config(config: &OrmConfig) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            enforce_foreign_keys: config.enforce_foreign_keys,
            constraint_lock: Mutex::new(()),
            initial_table_capacity: config.initial_table_capacity,
            stats: StatsCounters::default(),
        }
    }

    /// Returns the number of rows in a table.
    pub fn row_count(&self, table: &str) -> Result<usize, DbError> {
        self.with_table(table, |stored, _| Ok(stored.rows.len()))
    }

    fn with_table<R, F>(&self, name: &str, f: F) -> Result<R, DbError>
    where
        F: FnOnce(&StoredTable, &TableMap) -> Result<R, DbError>,
    {
        let tables = self.tables.read().map_err(|_| DbError::LockPoisoned)?;
        let stored = tables.get(name).ok_or_else(|| DbError::TableNotFound {
            table: name.to_string(),
        })?;
        f(stored, &tables)
    }

    /// Takes the constraint mutex when foreign keys are enforced.
    fn constraint_guard(&self) -> Result<Option<MutexGuard<'_, ()>>, DbError> {
        if !self.enforce_foreign_keys {
            return Ok(None);
        }
        self.constraint_lock
            .lock()
            .map(Some)
            .map_err(|_| DbError::LockPoisoned)
    }

    /// Checks every non-null reference value against its target table.
    fn check_references<'a, I>(&self, tables: &TableMap, def: &TableDef, values: I) -> Result<(), DbError>
    where
        I: IntoIterator<Item = (usize, &'a Value)>,
    {
        if !self.enforce_foreign_keys {
            return Ok(());
        }

        for (index, value) in values {
            let column = &def.columns()[index];
            let Some(reference) = &column.reference else {
                continue;
            };
            let Some(id) = value.as_long() else {
                continue;
            };

            let violation = |message: String| DbError::ForeignKeyViolation {
                table: def.name().to_string(),
                column: column.name.clone(),
                message,
            };
            let target = tables
                .get(&reference.to_table)
                .ok_or_else(|| violation(format!("table '{}' does not exist", reference.to_table)))?;
            if find_in(&target.rows.load(), id).is_none() {
                return Err(violation(format!(
                    "no row {} in '{}'",
                    id, reference.to_table
                )));
            }
        }
        Ok(())
    }

    /// Rejects deleting a row that other rows still reference.
    fn check_not_referenced(&self, tables: &TableMap, table: &str, id: i64) -> Result<(), DbError> {
        if !self.enforce_foreign_keys {
            return Ok(());
        }

        for stored in tables.values() {
            for (index, column, reference) in stored.def.references() {
                if reference.to_table != table {
                    continue;
                }
                let rows = stored.rows.load();
                let referencing = rows.iter().find(|row| {
                    let self_reference = stored.def.name() == table && row.id == id;
                    !self_reference && row.values.get(index).and_then(Value::as_long) == Some(id)
                });
                if let Some(row) = referencing {
                    return Err(DbError::ForeignKeyViolation {
                        table: stored.def.name().to_string(),
                        column: column.name.clone(),
                        message: format!(
                            "row {} still references {}#{}",
                            row.id, table, id
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Coerces a full row of values and checks arity and nullability.
fn validate_values(def: &TableDef, values: Vec<Value>) -> Result<Vec<Value>, DbError> {
    if values.len() != def.columns().len() {
        return Err(DbError::TypeMismatch {
            expected: format!("{} values for table '{}'", def.columns().len(), def.name()),
            got: format!("{} values", values.len()),
        });
    }
    let values = def
        .columns()
        .iter()
        .zip(values)
        .map(|(column, value)| column.column_type.coerce(value))
        .collect::<Result<Vec<_>, _>>()?;
    check_not_null(def, &values)?;
    Ok(values)
}

impl RowStore for MemoryStore {
    fn export_tables(&self) -> Result<Vec<TableSnapshot>, DbError> {
        let tables = self.tables.read().map_err(|_| DbError::LockPoisoned)?;
        let mut snapshots: Vec<TableSnapshot> = Vec::with_capacity(tables.len());
        for stored in tables.values() {
            let _guard = stored.lock()?;
            snapshots.push(TableSnapshot {
                schema: stored.def.to_schema(),
                next_id: stored.next_id.load(Ordering::Acquire),
                rows: stored.rows.load().as_ref().clone(),
            });
        }
        snapshots.sort_by(|a, b| a.schema.name.cmp(&b.schema.name));
        Ok(snapshots)
    }

    fn import_table(&self, def: Arc<TableDef>, next_id: i64, rows: Vec<Row>) -> Result<(), DbError> {
        for row in &rows {
            if row.values.len() != def.columns().len() {
                return Err(DbError::DataCorruption(format!(
                    "row {} in table '{}' has {} values, expected {}",
                    row.id,
                    def.name(),
                    row.values.len(),
                    def.columns().len()
                )));
            }
        }

        let mut tables = self.tables.write().map_err(|_| DbError::LockPoisoned)?;
        if tables.contains_key(def.name()) {
            return Err(DbError::schema(def.name(), "table already exists"));
        }

        let max_id = rows.iter().map(|r| r.id).max().unwrap_or(0);
        let next_id = next_id.max(max_id.saturating_add(1)).max(1);
        tracing::debug!(
            "Importing table {} with {} rows (next id {})",
            def.name(),
            rows.len(),
            next_id
        );
        let name = def.name().to_string();
        tables.insert(name, StoredTable::new(def, RowBuffer::from_rows(rows), next_id));
        Ok(())
    }

    fn create_table_if_absent(&self, table: &Arc<TableDef>) -> Result<bool, DbError> {
        let mut tables = self.tables.write().map_err(|_| DbError::LockPoisoned)?;
        if let Some(existing) = tables.get(table.name()) {
            if existing.def.as_ref() != table.as_ref() {
                return Err(DbError::schema(
                    table.name(),
                    "table exists with a different definition",
                ));
            }
            return Ok(false);
        }

        tracing::debug!("Creating table {}", table.name());
        tables.insert(
            table.name().to_string(),
            StoredTable::new(
                Arc::clone(table),
                RowBuffer::new(self.initial_table_capacity),
                1,
            ),
        );
        Ok(true)
    }

    fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        let tables = self.tables.read().map_err(|_| DbError::LockPoisoned)?;
        Ok(tables.contains_key(table))
    }

    fn drop_table(&self, table: &str) -> Result<bool, DbError> {
        let mut tables = self.tables.write().map_err(|_| DbError::LockPoisoned)?;
        let dropped = tables.remove(table).is_some();
        if dropped {
            tracing::debug!("Dropped table {}", table);
        }
        Ok(dropped)
    }

    fn reserve_id(&self, table: &str) -> Result<i64, DbError> {
        self.with_table(table, |stored, _| {
            Ok(stored.next_id.fetch_add(1, Ordering::SeqCst))
        })
    }

    fn insert(&self, table: &str, values: Vec<Value>) -> Result<i64, DbError> {
        self.with_table(table, |stored, tables| {
            let values = validate_values(&stored.def, values)?;
            let _constraint = self.constraint_guard()?;
            self.check_references(tables, &stored.def, values.iter().enumerate())?;

            let _guard = stored.lock()?;
            let id = stored.next_id.fetch_add(1, Ordering::SeqCst);
            if !stored.rows.insert(Row::new(id, values)) {
                return Err(DbError::DuplicateKey {
                    table: table.to_string(),
                    id,
                });
            }
            self.stats.record(StatKind::Insert);
            tracing::debug!("Inserted row {} into {}", id, table);
            Ok(id)
        })
    }

    fn insert_with_id(&self, table: &str, row: Row) -> Result<(), DbError> {
        self.with_table(table, |stored, tables| {
            let id = row.id;
            let values = validate_values(&stored.def, row.values)?;
            let _constraint = self.constraint_guard()?;
            self.check_references(tables, &stored.def, values.iter().enumerate())?;

            let _guard = stored.lock()?;
            if !stored.rows.insert(Row::new(id, values)) {
                return Err(DbError::DuplicateKey {
                    table: table.to_string(),
                    id,
                });
            }
            stored.bump_sequence(id);
            self.stats.record(StatKind::Insert);
            tracing::debug!("Inserted row {} into {}", id, table);
            Ok(())
        })
    }

    fn restore_row(&self, table: &str, row: Row) -> Result<(), DbError> {
        self.with_table(table, |stored, _| {
            let _guard = stored.lock()?;
            let id = row.id;
            stored.rows.upsert(row);
            stored.bump_sequence(id);
            tracing::debug!("Restored row {} in {}", id, table);
            Ok(())
        })
    }

    fn select_by_id(&self, table: &str, id: i64) -> Result<Option<Row>, DbError> {
        self.with_table(table, |stored, _| {
            self.stats.record(StatKind::PointSelect);
            Ok(stored.rows.find(id))
        })
    }

    fn select_by_ids(&self, table: &str, ids: &[i64]) -> Result<Vec<Row>, DbError> {
        self.with_table(table, |stored, _| {
            self.stats.record(StatKind::BatchSelect);
            let mut ids = ids.to_vec();
            ids.sort_unstable();
            ids.dedup();

            let snapshot = stored.rows.load();

            #[cfg(feature = "parallel")]
            let rows: Vec<Row> = ids
                .par_iter()
                .filter_map(|id| find_in(&snapshot, *id).cloned())
                .collect();

            #[cfg(not(feature = "parallel"))]
            let rows: Vec<Row> = ids
                .iter()
                .filter_map(|id| find_in(&snapshot, *id).cloned())
                .collect();

            Ok(rows)
        })
    }

    fn scan(&self, table: &str, filter: Option<BoundOp>) -> Result<RowCursor, DbError> {
        self.with_table(table, |stored, _| {
            self.stats.record(StatKind::Scan);
            Ok(RowCursor::new(table, stored.rows.load(), filter))
        })
    }

    fn update(&self, table: &str, id: i64, changes: &[(usize, Value)]) -> Result<Row, DbError> {
        self.with_table(table, |stored, tables| {
            let def = &stored.def;
            let changes = changes
                .iter()
                .map(|(index, value)| {
                    let column = def.columns().get(*index).ok_or_else(|| {
                        DbError::ColumnNotFound {
                            table: table.to_string(),
                            column: format!("#{}", index),
                        }
                    })?;
                    let value = column.column_type.coerce(value.clone())?;
                    if value.is_null() && !column.nullable {
                        return Err(DbError::NullValue {
                            table: table.to_string(),
                            column: column.name.clone(),
                        });
                    }
                    Ok((*index, value))
                })
                .collect::<Result<Vec<_>, DbError>>()?;
            let _constraint = self.constraint_guard()?;
            self.check_references(tables, def, changes.iter().map(|(i, v)| (*i, v)))?;

            let _guard = stored.lock()?;
            let previous = stored
                .rows
                .modify(id, |row| {
                    for (index, value) in &changes {
                        row.values[*index] = value.clone();
                    }
                })
                .ok_or_else(|| DbError::RecordNotFound {
                    table: table.to_string(),
                    id,
                })?;
            self.stats.record(StatKind::Update);
            tracing::debug!("Updated row {} in {}", id, table);
            Ok(previous)
        })
    }

    fn delete(&self, table: &str, id: i64) -> Result<Row, DbError> {
        self.with_table(table, |stored, tables| {
            let _constraint = self.constraint_guard()?;
            self.check_not_referenced(tables, table, id)?;

            let _guard = stored.lock()?;
            let removed = stored.rows.remove(id).ok_or_else(|| DbError::RecordNotFound {
                table: table.to_string(),
                id,
            })?;
            self.stats.record(StatKind::Delete);
            tracing::debug!("Deleted row {} from {}", id, table);
            Ok(removed)
        })
    }

    fn stats(&self) -> StoreStats {
        self.stats.snapshot()
    }
}
