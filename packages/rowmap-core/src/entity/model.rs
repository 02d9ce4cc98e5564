//! Typed wrappers over entities.

use std::marker::PhantomData;

use crate::error::DbError;
use crate::query::Op;
use crate::transaction::Scope;

use super::class::{EntityClass, EntityQuery};
use super::entity::Entity;
use super::id::EntityId;

/// A typed view over the entities of one registered table.
///
/// ```ignore
/// struct City(Entity);
///
/// impl Model for City {
///     const TABLE: &'static str = "cities";
///     fn wrap(entity: Entity) -> Self { City(entity) }
///     fn entity(&self) -> &Entity { &self.0 }
/// }
/// ```
pub trait Model: Sized {
    /// Name of the backing table
    const TABLE: &'static str;

    fn wrap(entity: Entity) -> Self;

    fn entity(&self) -> &Entity;

    fn id(&self) -> EntityId {
        self.entity().id()
    }

    /// Whether both values wrap the same entity instance.
    fn same_as(&self, other: &Self) -> bool {
        self.entity().ptr_eq(other.entity())
    }
}

impl Scope {
    /// Returns the entity class for a model's table.
    pub fn class<M: Model>(&self) -> Result<EntityClass, DbError> {
        Ok(EntityClass::new(self.table(M::TABLE)?))
    }

    /// Creates a row of `M`'s table, see [`Scope::new_entity`].
    pub fn create<M, F>(&self, init: F) -> Result<M, DbError>
    where
        M: Model,
        F: FnOnce(&M) -> Result<(), DbError>,
    {
        let table = self.table(M::TABLE)?;
        let entity = self.new_entity(&table, |entity| init(&M::wrap(entity.clone())))?;
        Ok(M::wrap(entity))
    }

    pub fn find<M: Model>(&self, id: i64) -> Result<Option<M>, DbError> {
        let table = self.table(M::TABLE)?;
        Ok(self.find_by_id(&table, id)?.map(M::wrap))
    }

    /// Resolves a reference column into a typed target.
    pub fn reference_as<M: Model>(&self, entity: &Entity, column: &str) -> Result<M, DbError> {
        self.reference(entity, column).map(M::wrap)
    }

    /// Resolves a nullable reference column into a typed target.
    pub fn optional_reference_as<M: Model>(
        &self,
        entity: &Entity,
        column: &str,
    ) -> Result<Option<M>, DbError> {
        Ok(self.optional_reference(entity, column)?.map(M::wrap))
    }

    pub fn all<M: Model>(&self) -> Result<ModelQuery<'_, M>, DbError> {
        Ok(ModelQuery::new(self.class::<M>()?.all(self)))
    }

    pub fn find_where<M: Model>(&self, filter: Op) -> Result<ModelQuery<'_, M>, DbError> {
        Ok(ModelQuery::new(self.class::<M>()?.find(self, filter)))
    }
}

/// [`EntityQuery`] yielding typed models.
#[derive(Debug)]
pub struct ModelQuery<'s, M> {
    query: EntityQuery<'s>,
    _model: PhantomData<M>,
}

impl<'s, M: Model> ModelQuery<'s, M> {
    fn new(query: EntityQuery<'s>) -> Self {
        Self {
            query,
            _model: PhantomData,
        }
    }

    pub fn with(self, column: impl Into<String>) -> Self {
        Self::new(self.query.with(column))
    }

    pub fn load(&self) -> Result<Vec<M>, DbError> {
        Ok(self.query.load()?.into_iter().map(M::wrap).collect())
    }

    pub fn single(&self) -> Result<M, DbError> {
        self.query.single().map(M::wrap)
    }

    pub fn first(&self) -> Result<Option<M>, DbError> {
        Ok(self.query.first()?.map(M::wrap))
    }

    pub fn count(&self) -> Result<usize, DbError> {
        self.query.count()
    }
}
