use std::collections::BTreeMap;
use std::sync::Arc;

use crate::store::Row;
use crate::table::TableDef;

use super::entity::Entity;
use super::id::EntityId;

/// Per-scope map from `(table, id)` to the one live entity for that row.
#[derive(Debug, Default)]
pub struct IdentityMap {
    entities: BTreeMap<EntityId, Entity>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: &str, id: i64) -> Option<Entity> {
        self.entities.get(&EntityId::new(table, id)).cloned()
    }

    pub fn contains(&self, table: &str, id: i64) -> bool {
        self.entities.contains_key(&EntityId::new(table, id))
    }

    /// Returns the mapped entity for the row, or wraps the row in a new one.
    ///
    /// An existing entity keeps its in-memory values; the row is ignored.
    pub fn get_or_create(&mut self, table: &Arc<TableDef>, row: Row) -> Entity {
        self.entities
            .entry(EntityId::new(table.name(), row.id))
            .or_insert_with(|| Entity::materialize(Arc::clone(table), row))
            .clone()
    }

    /// Adds an entity. Returns `false` and keeps the mapped one if the key
    /// is already taken.
    pub fn register(&mut self, entity: Entity) -> bool {
        let key = entity.id();
        if self.entities.contains_key(&key) {
            return false;
        }
        self.entities.insert(key, entity);
        true
    }

    pub fn evict(&mut self, table: &str, id: i64) -> Option<Entity> {
        self.entities.remove(&EntityId::new(table, id))
    }

    /// Entities with assignments not yet flushed, in key order.
    pub fn dirty(&self) -> Vec<Entity> {
        self.entities
            .values()
            .filter(|e| e.is_dirty())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Detaches and forgets every entity.
    pub fn clear(&mut self) {
        for entity in self.entities.values() {
            entity.mark_detached();
        }
        self.entities.clear();
    }
}
