use std::sync::Arc;

use crate::error::DbError;
use crate::query::Op;
use crate::table::TableDef;
use crate::transaction::Scope;

use super::entity::Entity;

/// Entry point for working with the entities of one table.
#[derive(Debug, Clone)]
pub struct EntityClass {
    table: Arc<TableDef>,
}

impl EntityClass {
    pub fn new(table: Arc<TableDef>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Arc<TableDef> {
        &self.table
    }

    /// Creates a row and its entity, see [`Scope::new_entity`].
    pub fn new_entity<F>(&self, scope: &Scope, init: F) -> Result<Entity, DbError>
    where
        F: FnOnce(&Entity) -> Result<(), DbError>,
    {
        scope.new_entity(&self.table, init)
    }

    pub fn find_by_id(&self, scope: &Scope, id: i64) -> Result<Option<Entity>, DbError> {
        scope.find_by_id(&self.table, id)
    }

    /// Like [`EntityClass::find_by_id`] but a missing row is an error.
    pub fn get(&self, scope: &Scope, id: i64) -> Result<Entity, DbError> {
        scope.get_or_create(&self.table, id)
    }

    /// Query over every row.
    pub fn all<'s>(&self, scope: &'s Scope) -> EntityQuery<'s> {
        EntityQuery::new(scope, Arc::clone(&self.table), None)
    }

    /// Query over the rows matching `filter`.
    pub fn find<'s>(&self, scope: &'s Scope, filter: Op) -> EntityQuery<'s> {
        EntityQuery::new(scope, Arc::clone(&self.table), Some(filter))
    }
}

/// Entity query with optional eager loading of reference columns.
#[derive(Debug)]
pub struct EntityQuery<'s> {
    scope: &'s Scope,
    table: Arc<TableDef>,
    filter: Option<Op>,
    eager: Vec<String>,
}

impl<'s> EntityQuery<'s> {
    fn new(scope: &'s Scope, table: Arc<TableDef>, filter: Option<Op>) -> Self {
        Self {
            scope,
            table,
            filter,
            eager: Vec::new(),
        }
    }

    /// Eager-loads a reference column once the rows are loaded.
    pub fn with(mut self, column: impl Into<String>) -> Self {
        self.eager.push(column.into());
        self
    }

    /// Loads every matching entity, then runs the eager loads.
    pub fn load(&self) -> Result<Vec<Entity>, DbError> {
        for column in &self.eager {
            self.table.reference(column)?;
        }
        let cursor = match &self.filter {
            Some(filter) => self.scope.select_where(&self.table, filter.clone())?,
            None => self.scope.select_all(&self.table)?,
        };
        let entities: Vec<Entity> = self.scope.entities(&self.table, cursor).collect();
        for column in &self.eager {
            self.scope.with_eager_load(&entities, column)?;
        }
        Ok(entities)
    }

    /// Loads the one matching entity.
    ///
    /// # Returns
    /// `Result<Entity, DbError>`, or `DbError::NotSingle` unless exactly one
    /// row matches.
    pub fn single(&self) -> Result<Entity, DbError> {
        let mut entities = self.load()?;
        if entities.len() != 1 {
            return Err(DbError::NotSingle {
                table: self.table.name().to_string(),
                found: entities.len(),
            });
        }
        Ok(entities.remove(0))
    }

    /// Loads the first matching entity in key order.
    pub fn first(&self) -> Result<Option<Entity>, DbError> {
        Ok(self.load()?.into_iter().next())
    }

    pub fn count(&self) -> Result<usize, DbError> {
        self.scope.count(&self.table, self.filter.clone())
    }
}
