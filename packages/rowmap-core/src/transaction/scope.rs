use std::cell::RefCell;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::OrmConfig;
use crate::entity::{Entity, IdentityMap};
use crate::error::DbError;
use crate::schema::SchemaRegistry;
use crate::store::{Row, RowStore};
use crate::table::TableDef;

use super::change::Change;
use super::transaction::Transaction;

/// Unit of work: one identity map plus one undo journal.
///
/// Entities handed out by a scope are tied to it and the scope is neither
/// `Send` nor `Sync`. Dropping a scope that was not committed rolls it back.
#[derive(Debug)]
pub struct Scope {
    pub(crate) store: Arc<dyn RowStore>,
    pub(crate) schema: Arc<SchemaRegistry>,
    pub(crate) config: Arc<OrmConfig>,
    identity_map: RefCell<IdentityMap>,
    transaction: RefCell<Transaction>,
}

impl Scope {
    pub(crate) fn open(
        store: Arc<dyn RowStore>,
        schema: Arc<SchemaRegistry>,
        config: Arc<OrmConfig>,
    ) -> Self {
        debug!("Opening scope");
        Self {
            store,
            schema,
            config,
            identity_map: RefCell::new(IdentityMap::new()),
            transaction: RefCell::new(Transaction::new()),
        }
    }

    /// Returns the row store.
    pub fn store(&self) -> &Arc<dyn RowStore> {
        &self.store
    }

    /// Returns the schema registry.
    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    /// Looks up a registered table.
    pub fn table(&self, name: &str) -> Result<Arc<TableDef>, DbError> {
        self.schema.table(name)
    }

    /// Returns whether the scope can still read and write.
    pub fn is_active(&self) -> bool {
        self.transaction.borrow().is_active()
    }

    /// Returns the mapped entity for a row, if this scope loaded it.
    pub fn cached(&self, table: &str, id: i64) -> Option<Entity> {
        self.identity_map.borrow().get(table, id)
    }

    /// Number of entities in the identity map.
    pub fn cached_count(&self) -> usize {
        self.identity_map.borrow().len()
    }

    /// Number of journaled writes not yet committed.
    pub fn pending_changes(&self) -> usize {
        self.transaction.borrow().changes().len()
    }

    /// Writes every dirty entity to the store.
    ///
    /// # Returns
    /// `Result<usize, DbError>` containing the number of rows written.
    pub fn flush(&self) -> Result<usize, DbError> {
        self.ensure_active()?;
        let dirty = self.identity_map.borrow().dirty();

        let mut written = 0;
        for entity in &dirty {
            let changes = entity.take_changes();
            if changes.is_empty() {
                continue;
            }
            let id = entity.id();
            match self.store.update(id.table(), id.value(), &changes) {
                Ok(previous) => {
                    self.record(Change::Update {
                        table: id.table().to_string(),
                        previous,
                    })?;
                    written += 1;
                }
                Err(e) => {
                    entity.restore_dirty(&changes);
                    return Err(e);
                }
            }
        }

        if written > 0 {
            debug!("Flushed {} dirty entities", written);
        }
        Ok(written)
    }

    /// Flushes pending assignments and makes every write permanent.
    ///
    /// On error the scope is dropped and therefore rolled back.
    pub fn commit(self) -> Result<(), DbError> {
        self.flush()?;
        self.transaction.borrow_mut().commit()?;
        let count = self.identity_map.borrow().len();
        self.identity_map.borrow_mut().clear();
        debug!("Committed scope ({} entities)", count);
        Ok(())
    }

    /// Undoes every write made in this scope.
    pub fn rollback(self) -> Result<(), DbError> {
        self.rollback_in_place()
    }

    /// Re-attaches an entity from a finished scope.
    ///
    /// Returns the instance this scope maps for the row, loading the row's
    /// current values into `entity` if the scope had none.
    pub fn attach(&self, entity: &Entity) -> Result<Entity, DbError> {
        self.ensure_active()?;
        entity.check_live()?;
        let id = entity.id();
        if let Some(mapped) = self.cached(id.table(), id.value()) {
            return Ok(mapped);
        }

        let row = self
            .store
            .select_by_id(id.table(), id.value())?
            .ok_or_else(|| DbError::EntityNotFound {
                table: id.table().to_string(),
                id: id.value(),
            })?;
        entity.reload(row);
        entity.mark_live();
        self.identity_map.borrow_mut().register(entity.clone());
        Ok(entity.clone())
    }

    pub(crate) fn ensure_active(&self) -> Result<(), DbError> {
        self.transaction.borrow().check_active()
    }

    pub(crate) fn record(&self, change: Change) -> Result<(), DbError> {
        self.transaction.borrow_mut().record(change)
    }

    /// Maps a fetched row through the identity map.
    pub(crate) fn materialize(&self, table: &Arc<TableDef>, row: Row) -> Entity {
        self.identity_map.borrow_mut().get_or_create(table, row)
    }

    pub(crate) fn register(&self, entity: Entity) -> bool {
        self.identity_map.borrow_mut().register(entity)
    }

    pub(crate) fn evict(&self, table: &str, id: i64) -> Option<Entity> {
        self.identity_map.borrow_mut().evict(table, id)
    }

    fn rollback_in_place(&self) -> Result<(), DbError> {
        let result = self.transaction.borrow_mut().rollback(self.store.as_ref());
        self.identity_map.borrow_mut().clear();
        result
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if self.is_active() {
            let pending = self.pending_changes();
            if pending > 0 {
                warn!("Scope dropped without commit, rolling back {} changes", pending);
            }
            if let Err(e) = self.rollback_in_place() {
                error!("Rollback failed: {}", e);
            }
        }
    }
}
