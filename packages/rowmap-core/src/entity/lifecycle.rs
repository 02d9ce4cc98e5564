//! Loading, creating and deleting entities through a scope.

use std::sync::Arc;

use tracing::debug;

use crate::error::DbError;
use crate::query::check_not_null;
use crate::store::Row;
use crate::table::TableDef;
use crate::transaction::{Change, Scope};

use super::entity::Entity;

impl Scope {
    /// Returns the entity for a row, loading it on an identity map miss.
    ///
    /// # Returns
    /// `Result<Option<Entity>, DbError>` with `None` if no row has that key.
    pub fn find_by_id(&self, table: &Arc<TableDef>, id: i64) -> Result<Option<Entity>, DbError> {
        self.ensure_active()?;
        if let Some(entity) = self.cached(table.name(), id) {
            return Ok(Some(entity));
        }
        let row = self.store.select_by_id(table.name(), id)?;
        Ok(row.map(|row| self.materialize(table, row)))
    }

    /// Returns the entity for a row, loading it on an identity map miss.
    ///
    /// Repeated calls with the same key return the same instance.
    ///
    /// # Returns
    /// `Result<Entity, DbError>`, or `DbError::EntityNotFound` if no row has
    /// that key.
    pub fn get_or_create(&self, table: &Arc<TableDef>, id: i64) -> Result<Entity, DbError> {
        self.find_by_id(table, id)?
            .ok_or_else(|| DbError::EntityNotFound {
                table: table.name().to_string(),
                id,
            })
    }

    /// Creates a row and its entity.
    ///
    /// A key is reserved first so `init` sees the final id. `init` assigns
    /// columns; every non-null column must be set when it returns.
    ///
    /// # Arguments
    /// * `table` - Target table
    /// * `init` - Initializer run against the pending entity
    ///
    /// # Returns
    /// `Result<Entity, DbError>` containing the registered entity.
    pub fn new_entity<F>(&self, table: &Arc<TableDef>, init: F) -> Result<Entity, DbError>
    where
        F: FnOnce(&Entity) -> Result<(), DbError>,
    {
        self.ensure_active()?;
        let id = self.store.reserve_id(table.name())?;
        let entity = Entity::pending(Arc::clone(table), id);
        init(&entity)?;

        let values = entity.values();
        check_not_null(table, &values)?;
        self.store.insert_with_id(table.name(), Row::new(id, values))?;
        self.record(Change::Insert {
            table: table.name().to_string(),
            id,
        })?;

        entity.mark_live();
        self.register(entity.clone());
        debug!("Created entity {}", entity.id());
        Ok(entity)
    }

    /// Deletes the entity's row and evicts it from the identity map.
    ///
    /// Later access through any handle fails with `DbError::EntityNotFound`.
    pub fn delete_entity(&self, entity: &Entity) -> Result<(), DbError> {
        self.ensure_active()?;
        entity.check_live()?;
        // Pending reassignments must reach the store before its restrict check
        if self.config.flush_before_query {
            self.flush()?;
        }
        let id = entity.id();

        let original = self.store.delete(id.table(), id.value())?;
        self.record(Change::Delete {
            table: id.table().to_string(),
            original,
        })?;
        if let Some(mapped) = self.evict(id.table(), id.value()) {
            mapped.mark_removed();
        }
        entity.mark_removed();
        debug!("Deleted entity {}", id);
        Ok(())
    }
}
