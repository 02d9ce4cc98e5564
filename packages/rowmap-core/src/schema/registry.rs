use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::DbError;
use crate::table::TableDef;

use super::schema_file::TableSchema;

/// Registry of declared tables.
///
/// Passed explicitly into every scope; there is no process-wide schema state.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    tables: RwLock<HashMap<String, Arc<TableDef>>>,
}

impl SchemaRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a single table. See [`SchemaRegistry::register_all`].
    pub fn register(&self, table: &Arc<TableDef>) -> Result<(), DbError> {
        self.register_all(&[table])
    }

    /// Registers a batch of tables.
    ///
    /// Re-registering an identical descriptor is a no-op. Every reference
    /// target must already be registered or be part of the batch.
    ///
    /// # Returns
    /// `Result<(), DbError>` indicating success, or `DbError::Schema` when a
    /// name is taken by a different descriptor or a target is unknown. On
    /// error nothing from the batch is registered.
    pub fn register_all(&self, batch: &[&Arc<TableDef>]) -> Result<(), DbError> {
        let mut tables = self.tables.write().map_err(|_| DbError::LockPoisoned)?;

        let mut pending: HashMap<&str, &Arc<TableDef>> = HashMap::with_capacity(batch.len());
        for table in batch {
            let existing = tables
                .get(table.name())
                .or_else(|| pending.get(table.name()).copied());
            if let Some(existing) = existing {
                if existing.as_ref() != table.as_ref() {
                    return Err(DbError::schema(
                        table.name(),
                        "a different table with this name is already registered",
                    ));
                }
                continue;
            }
            pending.insert(table.name(), table);
        }

        for table in pending.values() {
            for (_, column, reference) in table.references() {
                let known = tables.contains_key(&reference.to_table)
                    || pending.contains_key(reference.to_table.as_str());
                if !known {
                    return Err(DbError::schema(
                        table.name(),
                        format!(
                            "column '{}' references unregistered table '{}'",
                            column.name, reference.to_table
                        ),
                    ));
                }
            }
        }

        for (name, table) in pending {
            tracing::debug!("Registering table {}", name);
            tables.insert(name.to_string(), Arc::clone(table));
        }
        Ok(())
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Result<Arc<TableDef>, DbError> {
        let tables = self.tables.read().map_err(|_| DbError::LockPoisoned)?;
        tables
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::TableNotFound {
                table: name.to_string(),
            })
    }

    /// Returns whether a table is registered.
    pub fn contains(&self, name: &str) -> bool {
        match self.tables.read() {
            Ok(tables) => tables.contains_key(name),
            Err(_) => false,
        }
    }

    /// Removes a table from the registry.
    pub fn unregister(&self, name: &str) -> Result<Option<Arc<TableDef>>, DbError> {
        let mut tables = self.tables.write().map_err(|_| DbError::LockPoisoned)?;
        Ok(tables.remove(name))
    }

    /// Returns all registered table names, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let tables = match self.tables.read() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Serializable form of every registered table, sorted by name.
    pub fn to_schemas(&self) -> Result<Vec<TableSchema>, DbError> {
        let tables = self.tables.read().map_err(|_| DbError::LockPoisoned)?;
        let mut schemas: Vec<TableSchema> = tables.values().map(|t| t.to_schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(schemas)
    }

    /// Builds a registry from serialized tables.
    pub fn from_schemas(schemas: &[TableSchema]) -> Result<Self, DbError> {
        let tables = schemas
            .iter()
            .map(TableDef::from_schema)
            .collect::<Result<Vec<_>, _>>()?;
        let registry = Self::new();
        let refs: Vec<&Arc<TableDef>> = tables.iter().collect();
        registry.register_all(&refs)?;
        Ok(registry)
    }
}
