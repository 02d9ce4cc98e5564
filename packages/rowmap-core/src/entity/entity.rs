//! Entity handles.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::error::DbError;
use crate::query::bind_assignment;
use crate::store::Row;
use crate::table::TableDef;
use crate::types::Value;

use super::id::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    /// Inside a `new` initializer, row not inserted yet
    Pending,
    /// Registered in a live scope
    Live,
    /// Row deleted
    Removed,
    /// Scope finished; values are readable but no longer tracked
    Detached,
}

#[derive(Debug)]
struct EntityState {
    table: Arc<TableDef>,
    id: i64,
    values: Vec<Value>,
    dirty: BTreeSet<usize>,
    /// Resolved reference targets by column index
    resolved: HashMap<usize, Option<Weak<RefCell<EntityState>>>>,
    lifecycle: Lifecycle,
}

/// Handle to the in-memory object for one row.
///
/// Cloning the handle does not copy the entity; within a scope every handle
/// for the same row points at the same object (see [`Entity::ptr_eq`]).
#[derive(Clone)]
pub struct Entity {
    inner: Rc<RefCell<EntityState>>,
}

impl Entity {
    pub(crate) fn materialize(table: Arc<TableDef>, row: Row) -> Self {
        Self::with_lifecycle(table, row.id, row.values, Lifecycle::Live)
    }

    pub(crate) fn pending(table: Arc<TableDef>, id: i64) -> Self {
        let values = vec![Value::Null; table.columns().len()];
        Self::with_lifecycle(table, id, values, Lifecycle::Pending)
    }

    fn with_lifecycle(table: Arc<TableDef>, id: i64, values: Vec<Value>, lifecycle: Lifecycle) -> Self {
        Self {
            inner: Rc::new(RefCell::new(EntityState {
                table,
                id,
                values,
                dirty: BTreeSet::new(),
                resolved: HashMap::new(),
                lifecycle,
            })),
        }
    }

    /// Returns the entity's identity.
    pub fn id(&self) -> EntityId {
        let state = self.inner.borrow();
        EntityId::new(state.table.name(), state.id)
    }

    /// Returns the entity's table descriptor.
    pub fn table(&self) -> Arc<TableDef> {
        Arc::clone(&self.inner.borrow().table)
    }

    /// Returns whether both handles point at the same object.
    pub fn ptr_eq(&self, other: &Entity) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns whether the entity's row has been deleted.
    pub fn is_removed(&self) -> bool {
        self.inner.borrow().lifecycle == Lifecycle::Removed
    }

    /// Returns whether the entity belongs to a finished scope.
    pub fn is_detached(&self) -> bool {
        self.inner.borrow().lifecycle == Lifecycle::Detached
    }

    /// Returns whether the entity has assignments not yet flushed.
    pub fn is_dirty(&self) -> bool {
        !self.inner.borrow().dirty.is_empty()
    }

    /// Reads a column by name, including the primary key.
    pub fn get(&self, column: &str) -> Result<Value, DbError> {
        let state = self.inner.borrow();
        state.check_readable()?;
        if column == state.table.primary_key().column_name() {
            return Ok(Value::Long(state.id));
        }
        let index = state.table.column_index(column)?;
        Ok(state.values[index].clone())
    }

    pub fn get_long(&self, column: &str) -> Result<i64, DbError> {
        self.get_typed(column, "long", Value::as_long)
    }

    pub fn get_integer(&self, column: &str) -> Result<i32, DbError> {
        self.get_typed(column, "integer", Value::as_integer)
    }

    pub fn get_bool(&self, column: &str) -> Result<bool, DbError> {
        self.get_typed(column, "bool", Value::as_bool)
    }

    pub fn get_double(&self, column: &str) -> Result<f64, DbError> {
        self.get_typed(column, "double", Value::as_double)
    }

    pub fn get_string(&self, column: &str) -> Result<String, DbError> {
        self.get_typed(column, "text", |v| v.as_str().map(str::to_string))
    }

    /// Reads a nullable long column.
    pub fn get_optional_long(&self, column: &str) -> Result<Option<i64>, DbError> {
        match self.get(column)? {
            Value::Null => Ok(None),
            value => value.as_long().map(Some).ok_or_else(|| DbError::TypeMismatch {
                expected: "long".to_string(),
                got: value.type_name().to_string(),
            }),
        }
    }

    /// Reads a nullable text column.
    pub fn get_optional_string(&self, column: &str) -> Result<Option<String>, DbError> {
        match self.get(column)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s)),
            value => Err(DbError::TypeMismatch {
                expected: "text".to_string(),
                got: value.type_name().to_string(),
            }),
        }
    }

    fn get_typed<T, F>(&self, column: &str, expected: &str, extract: F) -> Result<T, DbError>
    where
        F: FnOnce(&Value) -> Option<T>,
    {
        let value = self.get(column)?;
        if value.is_null() {
            return Err(DbError::NullValue {
                table: self.inner.borrow().table.name().to_string(),
                column: column.to_string(),
            });
        }
        extract(&value).ok_or_else(|| DbError::TypeMismatch {
            expected: expected.to_string(),
            got: value.type_name().to_string(),
        })
    }

    /// Assigns a column and marks the entity dirty.
    ///
    /// Assigning a reference column drops its resolved target.
    pub fn set(&self, column: &str, value: impl Into<Value>) -> Result<(), DbError> {
        let mut state = self.inner.borrow_mut();
        state.check_writable()?;
        let (index, value) = bind_assignment(&state.table, column, value.into())?;
        if value.is_null() && !state.table.columns()[index].nullable {
            return Err(DbError::NullValue {
                table: state.table.name().to_string(),
                column: column.to_string(),
            });
        }
        state.assign(index, value);
        state.resolved.remove(&index);
        Ok(())
    }

    /// Points a reference column at `target`.
    pub fn set_reference(&self, column: &str, target: &Entity) -> Result<(), DbError> {
        let target_id = target.id();
        let mut state = self.inner.borrow_mut();
        state.check_writable()?;
        let (index, reference) = state.table.reference(column)?;
        if reference.to_table != target_id.table() {
            return Err(DbError::TypeMismatch {
                expected: format!("entity of '{}'", reference.to_table),
                got: format!("entity of '{}'", target_id.table()),
            });
        }
        state.assign(index, Value::Long(target_id.value()));
        state
            .resolved
            .insert(index, Some(Rc::downgrade(&target.inner)));
        Ok(())
    }

    /// Sets a nullable reference column to `NULL`.
    pub fn clear_reference(&self, column: &str) -> Result<(), DbError> {
        let mut state = self.inner.borrow_mut();
        state.check_writable()?;
        let (index, _) = state.table.reference(column)?;
        if !state.table.columns()[index].nullable {
            return Err(DbError::NullValue {
                table: state.table.name().to_string(),
                column: column.to_string(),
            });
        }
        state.assign(index, Value::Null);
        state.resolved.insert(index, None);
        Ok(())
    }

    pub(crate) fn check_live(&self) -> Result<(), DbError> {
        self.inner.borrow().check_readable()
    }

    pub(crate) fn value_at(&self, index: usize) -> Result<Value, DbError> {
        let state = self.inner.borrow();
        state.check_readable()?;
        Ok(state.values[index].clone())
    }

    pub(crate) fn values(&self) -> Vec<Value> {
        self.inner.borrow().values.clone()
    }

    /// Cached reference target. The outer `None` means nothing usable is
    /// cached (never resolved, assigned since, or the target was removed).
    pub(crate) fn cached_reference(&self, index: usize) -> Option<Option<Entity>> {
        let state = self.inner.borrow();
        match state.resolved.get(&index)? {
            None => Some(None),
            Some(weak) => {
                let target = Entity {
                    inner: weak.upgrade()?,
                };
                if target.is_removed() {
                    None
                } else {
                    Some(Some(target))
                }
            }
        }
    }

    pub(crate) fn cache_reference(&self, index: usize, target: Option<&Entity>) {
        self.inner
            .borrow_mut()
            .resolved
            .insert(index, target.map(|t| Rc::downgrade(&t.inner)));
    }

    /// Drains pending assignments as `(column index, value)` pairs.
    pub(crate) fn take_changes(&self) -> Vec<(usize, Value)> {
        let mut state = self.inner.borrow_mut();
        let dirty = std::mem::take(&mut state.dirty);
        dirty
            .into_iter()
            .map(|index| (index, state.values[index].clone()))
            .collect()
    }

    /// Marks columns dirty again after a failed flush.
    pub(crate) fn restore_dirty(&self, changes: &[(usize, Value)]) {
        let mut state = self.inner.borrow_mut();
        state.dirty.extend(changes.iter().map(|(index, _)| *index));
    }

    /// Applies values written to the store by a statement.
    pub(crate) fn apply_changes(&self, changes: &[(usize, Value)]) {
        let mut state = self.inner.borrow_mut();
        for (index, value) in changes {
            state.values[*index] = value.clone();
            state.dirty.remove(index);
            state.resolved.remove(index);
        }
    }

    /// Replaces all values from a stored row and forgets pending state.
    pub(crate) fn reload(&self, row: Row) {
        let mut state = self.inner.borrow_mut();
        state.values = row.values;
        state.dirty.clear();
        state.resolved.clear();
    }

    pub(crate) fn mark_live(&self) {
        let mut state = self.inner.borrow_mut();
        state.lifecycle = Lifecycle::Live;
        state.dirty.clear();
    }

    pub(crate) fn mark_removed(&self) {
        let mut state = self.inner.borrow_mut();
        state.lifecycle = Lifecycle::Removed;
        state.dirty.clear();
        state.resolved.clear();
    }

    pub(crate) fn mark_detached(&self) {
        let mut state = self.inner.borrow_mut();
        if state.lifecycle != Lifecycle::Removed {
            state.lifecycle = Lifecycle::Detached;
        }
        state.resolved.clear();
    }
}

impl EntityState {
    fn check_readable(&self) -> Result<(), DbError> {
        match self.lifecycle {
            Lifecycle::Removed => Err(DbError::EntityNotFound {
                table: self.table.name().to_string(),
                id: self.id,
            }),
            _ => Ok(()),
        }
    }

    fn check_writable(&self) -> Result<(), DbError> {
        self.check_readable()?;
        if self.lifecycle == Lifecycle::Detached {
            return Err(DbError::TransactionConflict(format!(
                "entity {}#{} is detached from its scope",
                self.table.name(),
                self.id
            )));
        }
        Ok(())
    }

    fn assign(&mut self, index: usize, value: Value) {
        if self.values[index] == value {
            return;
        }
        self.values[index] = value;
        if self.lifecycle == Lifecycle::Live {
            self.dirty.insert(index);
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(state) => f
                .debug_struct("Entity")
                .field("table", &state.table.name())
                .field("id", &state.id)
                .field("values", &state.values)
                .field("lifecycle", &state.lifecycle)
                .finish(),
            Err(_) => f.write_str("Entity(<borrowed>)"),
        }
    }
}
