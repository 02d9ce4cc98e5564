//! Reference resolution, lazy and batched.

use std::collections::HashSet;

use tracing::debug;

use crate::error::DbError;
use crate::transaction::Scope;

use super::entity::Entity;

impl Scope {
    /// Resolves a non-null reference column to its target entity.
    ///
    /// The first access loads the target with one point select unless it is
    /// already mapped; the result is cached on `entity`.
    ///
    /// # Returns
    /// `Result<Entity, DbError>`, `DbError::NullValue` if the column is null,
    /// or `DbError::DanglingReference` if the target row is missing.
    pub fn reference(&self, entity: &Entity, column: &str) -> Result<Entity, DbError> {
        self.optional_reference(entity, column)?
            .ok_or_else(|| DbError::NullValue {
                table: entity.table().name().to_string(),
                column: column.to_string(),
            })
    }

    /// Resolves a nullable reference column.
    pub fn optional_reference(&self, entity: &Entity, column: &str) -> Result<Option<Entity>, DbError> {
        self.ensure_active()?;
        let table = entity.table();
        let (index, reference) = table.reference(column)?;

        let key = entity.value_at(index)?;
        if let Some(cached) = entity.cached_reference(index) {
            return Ok(cached);
        }
        let Some(target_id) = key.as_long() else {
            entity.cache_reference(index, None);
            return Ok(None);
        };

        let target_table = self.table(&reference.to_table)?;
        let target = match self.find_by_id(&target_table, target_id)? {
            Some(target) => target,
            None => {
                return Err(DbError::DanglingReference {
                    table: table.name().to_string(),
                    column: column.to_string(),
                    target: reference.to_table.clone(),
                    id: target_id,
                })
            }
        };
        entity.cache_reference(index, Some(&target));
        Ok(Some(target))
    }

    /// Resolves one reference column for many entities at once.
    ///
    /// Keys already in the identity map are skipped; the rest are fetched in
    /// batched selects of at most `eager_batch_size` keys. Afterwards every
    /// entity's reference is cached, so lazy access issues no further
    /// queries.
    ///
    /// # Arguments
    /// * `entities` - Entities of one table
    /// * `column` - Reference column to resolve
    ///
    /// # Returns
    /// `Result<(), DbError>`, or `DbError::DanglingReference` for the first
    /// key with no target row.
    pub fn with_eager_load(&self, entities: &[Entity], column: &str) -> Result<(), DbError> {
        self.ensure_active()?;
        let Some(first) = entities.first() else {
            return Ok(());
        };
        let table = first.table();
        let (index, reference) = table.reference(column)?;
        let target_table = self.table(&reference.to_table)?;

        let mut keys = Vec::with_capacity(entities.len());
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for entity in entities {
            let entity_table = entity.table();
            if entity_table.name() != table.name() {
                return Err(DbError::TypeMismatch {
                    expected: format!("entity of '{}'", table.name()),
                    got: format!("entity of '{}'", entity_table.name()),
                });
            }
            let key = entity.value_at(index)?.as_long();
            if let Some(id) = key {
                if seen.insert(id) && self.cached(target_table.name(), id).is_none() {
                    missing.push(id);
                }
            }
            keys.push(key);
        }

        missing.sort_unstable();
        for chunk in missing.chunks(self.config.eager_batch_size.max(1)) {
            for row in self.store.select_by_ids(target_table.name(), chunk)? {
                self.materialize(&target_table, row);
            }
        }
        debug!(
            "Eager loaded {}.{} for {} entities ({} fetched)",
            table.name(),
            column,
            entities.len(),
            missing.len()
        );

        for (entity, key) in entities.iter().zip(keys) {
            let Some(id) = key else {
                entity.cache_reference(index, None);
                continue;
            };
            let target = self
                .cached(target_table.name(), id)
                .ok_or_else(|| DbError::DanglingReference {
                    table: table.name().to_string(),
                    column: column.to_string(),
                    target: reference.to_table.clone(),
                    id,
                })?;
            entity.cache_reference(index, Some(&target));
        }
        Ok(())
    }
}
