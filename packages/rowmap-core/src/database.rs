//! Database handle: row store, schema registry and configuration.

use std::sync::Arc;

use crate::config::OrmConfig;
use crate::error::DbError;
use crate::persistence::SnapshotManager;
use crate::schema::SchemaRegistry;
use crate::store::{MemoryStore, RowStore};
use crate::table::TableDef;
use crate::transaction::Scope;

/// Shared handle over a row store and its registered tables.
///
/// Cheap to clone and safe to share across threads. Work happens inside
/// scopes, which are confined to the thread that opened them.
#[derive(Debug, Clone)]
pub struct Database {
    store: Arc<dyn RowStore>,
    schema: Arc<SchemaRegistry>,
    config: Arc<OrmConfig>,
}

impl Database {
    /// Creates an empty in-memory database.
    pub fn new(config: OrmConfig) -> Self {
        let store = Arc::new(MemoryStore::with_config(&config));
        Self::with_store(store, Arc::new(SchemaRegistry::new()), config)
    }

    /// Wraps an existing store and registry.
    pub fn with_store(
        store: Arc<dyn RowStore>,
        schema: Arc<SchemaRegistry>,
        config: OrmConfig,
    ) -> Self {
        Self {
            store,
            schema,
            config: Arc::new(config),
        }
    }

    /// Opens an in-memory database, restoring the snapshot in
    /// `config.data_dir` if there is one.
    pub fn open(config: OrmConfig) -> Result<Self, DbError> {
        config.validate()?;
        let db = Self::new(config);
        let restored = SnapshotManager::new(&db.config).load_into(db.store.as_ref(), &db.schema)?;
        if restored {
            tracing::info!("Restored {} tables from snapshot", db.schema.table_names().len());
        }
        Ok(db)
    }

    /// Writes a snapshot of every table to `config.data_dir`.
    pub fn save_snapshot(&self) -> Result<(), DbError> {
        SnapshotManager::new(&self.config).save(self.store.as_ref())
    }

    pub fn store(&self) -> &Arc<dyn RowStore> {
        &self.store
    }

    pub fn schema(&self) -> &Arc<SchemaRegistry> {
        &self.schema
    }

    pub fn config(&self) -> &OrmConfig {
        &self.config
    }

    /// Registers the tables and creates the missing ones in the store.
    ///
    /// Tables may reference each other within the batch.
    pub fn create_tables(&self, tables: &[&Arc<TableDef>]) -> Result<(), DbError> {
        self.schema.register_all(tables)?;
        for table in tables {
            self.store.create_table_if_absent(table)?;
        }
        Ok(())
    }

    /// Drops the tables, last one first, and unregisters them.
    pub fn drop_tables(&self, tables: &[&Arc<TableDef>]) -> Result<(), DbError> {
        for table in tables.iter().rev() {
            self.store.drop_table(table.name())?;
            self.schema.unregister(table.name())?;
        }
        Ok(())
    }

    pub fn table_exists(&self, table: &TableDef) -> Result<bool, DbError> {
        self.store.table_exists(table.name())
    }

    /// Opens a scope. Commit it explicitly; dropping it rolls back.
    pub fn open_scope(&self) -> Scope {
        Scope::open(
            Arc::clone(&self.store),
            Arc::clone(&self.schema),
            Arc::clone(&self.config),
        )
    }

    /// Creates `tables`, runs `body` in a fresh scope and commits.
    ///
    /// If `body` fails every write it made is undone and its error is
    /// returned.
    ///
    /// # Arguments
    /// * `tables` - Tables the body needs; created if absent
    /// * `body` - Unit of work
    ///
    /// # Returns
    /// `Result<T, DbError>` with the body's result.
    pub fn with_scope<T, F>(&self, tables: &[&Arc<TableDef>], body: F) -> Result<T, DbError>
    where
        F: FnOnce(&Scope) -> Result<T, DbError>,
    {
        self.create_tables(tables)?;
        let scope = self.open_scope();
        match body(&scope) {
            Ok(value) => {
                scope.commit()?;
                Ok(value)
            }
            Err(e) => {
                tracing::debug!("Scope body failed, rolling back: {}", e);
                if let Err(rollback_error) = scope.rollback() {
                    tracing::error!("Rollback failed: {}", rollback_error);
                }
                Err(e)
            }
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(OrmConfig::default())
    }
}
