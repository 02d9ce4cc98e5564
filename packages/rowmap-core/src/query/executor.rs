//! Statement execution against a scope's store.

use std::sync::Arc;

use tracing::debug;

use crate::entity::{Entity, EntityId};
use crate::error::DbError;
use crate::store::RowCursor;
use crate::table::TableDef;
use crate::transaction::{Change, Scope};

use super::op::Op;
use super::statement::{InsertStatement, UpdateStatement};

impl Scope {
    /// Inserts one row built by `build`.
    pub fn insert<F>(&self, table: &Arc<TableDef>, build: F) -> Result<(), DbError>
    where
        F: FnOnce(&mut InsertStatement),
    {
        self.insert_and_get_id(table, build).map(|_| ())
    }

    /// Inserts one row built by `build` and returns its generated key.
    ///
    /// # Returns
    /// `Result<EntityId, DbError>` containing the new row's identity.
    pub fn insert_and_get_id<F>(&self, table: &Arc<TableDef>, build: F) -> Result<EntityId, DbError>
    where
        F: FnOnce(&mut InsertStatement),
    {
        self.ensure_active()?;
        let mut statement = InsertStatement::new();
        build(&mut statement);
        let values = statement.into_values(table)?;

        let id = self.store.insert(table.name(), values)?;
        self.record(Change::Insert {
            table: table.name().to_string(),
            id,
        })?;
        Ok(EntityId::new(table.name(), id))
    }

    /// Updates every row matching `filter`.
    ///
    /// Mapped entities for the updated rows see the new values.
    ///
    /// # Returns
    /// `Result<usize, DbError>` containing the number of updated rows.
    pub fn update<F>(&self, table: &Arc<TableDef>, filter: Op, build: F) -> Result<usize, DbError>
    where
        F: FnOnce(&mut UpdateStatement),
    {
        self.ensure_active()?;
        let mut statement = UpdateStatement::new();
        build(&mut statement);
        let changes = statement.into_changes(table)?;
        if changes.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i64> = self.select_where(table, filter)?.map(|row| row.id).collect();
        for id in &ids {
            let previous = self.store.update(table.name(), *id, &changes)?;
            self.record(Change::Update {
                table: table.name().to_string(),
                previous,
            })?;
            if let Some(entity) = self.cached(table.name(), *id) {
                entity.apply_changes(&changes);
            }
        }
        debug!("Updated {} rows in {}", ids.len(), table.name());
        Ok(ids.len())
    }

    /// Deletes every row matching `filter` and evicts their entities.
    ///
    /// # Returns
    /// `Result<usize, DbError>` containing the number of deleted rows.
    pub fn delete_where(&self, table: &Arc<TableDef>, filter: Op) -> Result<usize, DbError> {
        self.ensure_active()?;
        let ids: Vec<i64> = self.select_where(table, filter)?.map(|row| row.id).collect();
        for id in &ids {
            let original = self.store.delete(table.name(), *id)?;
            self.record(Change::Delete {
                table: table.name().to_string(),
                original,
            })?;
            if let Some(entity) = self.evict(table.name(), *id) {
                entity.mark_removed();
            }
        }
        debug!("Deleted {} rows from {}", ids.len(), table.name());
        Ok(ids.len())
    }

    /// Opens a lazy cursor over every row of the table.
    pub fn select_all(&self, table: &Arc<TableDef>) -> Result<RowCursor, DbError> {
        self.select(table, None)
    }

    /// Opens a lazy cursor over the rows matching `filter`.
    pub fn select_where(&self, table: &Arc<TableDef>, filter: Op) -> Result<RowCursor, DbError> {
        self.select(table, Some(filter))
    }

    /// Counts rows, optionally filtered.
    pub fn count(&self, table: &Arc<TableDef>, filter: Option<Op>) -> Result<usize, DbError> {
        Ok(self.select(table, filter)?.count())
    }

    /// Converts a cursor's rows into mapped entities as they are pulled.
    pub fn entities(&self, table: &Arc<TableDef>, cursor: RowCursor) -> EntityIter<'_> {
        EntityIter {
            scope: self,
            table: Arc::clone(table),
            cursor,
        }
    }

    fn select(&self, table: &Arc<TableDef>, filter: Option<Op>) -> Result<RowCursor, DbError> {
        self.ensure_active()?;
        let filter = filter.map(|op| op.bind(table)).transpose()?;
        if self.config.flush_before_query {
            self.flush()?;
        }
        self.store.scan(table.name(), filter)
    }
}

/// Entities over a row cursor, mapped on demand.
#[derive(Debug)]
pub struct EntityIter<'s> {
    scope: &'s Scope,
    table: Arc<TableDef>,
    cursor: RowCursor,
}

impl Iterator for EntityIter<'_> {
    type Item = Entity;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.cursor.next()?;
        Some(self.scope.materialize(&self.table, row))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}
