//! Row predicates.

use crate::error::DbError;
use crate::store::Row;
use crate::table::TableDef;
use crate::types::Value;

/// Predicate over named columns, including the primary key.
///
/// Comparisons against `NULL` (on either side) are false; use
/// [`Op::is_null`] to match missing values.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Eq(String, Value),
    Neq(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
    IsNotNull(String),
    And(Box<Op>, Box<Op>),
    Or(Box<Op>, Box<Op>),
    Not(Box<Op>),
}

impl Op {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Op::Eq(column.into(), value.into())
    }

    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Op::Neq(column.into(), value.into())
    }

    pub fn in_list<V, I>(column: impl Into<String>, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Op::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Op::IsNull(column.into())
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Op::IsNotNull(column.into())
    }

    pub fn and(self, other: Op) -> Self {
        Op::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Op) -> Self {
        Op::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Op::Not(Box::new(self))
    }

    /// Resolves column names against `table` and coerces literal values to
    /// the column types.
    ///
    /// # Returns
    /// `Result<BoundOp, DbError>` containing the bound predicate, or
    /// `DbError::ColumnNotFound` / `DbError::TypeMismatch`.
    pub fn bind(&self, table: &TableDef) -> Result<BoundOp, DbError> {
        Ok(match self {
            Op::Eq(column, value) => {
                let (slot, value) = bind_value(table, column, value)?;
                BoundOp::Eq(slot, value)
            }
            Op::Neq(column, value) => {
                let (slot, value) = bind_value(table, column, value)?;
                BoundOp::Neq(slot, value)
            }
            Op::In(column, values) => {
                let slot = Slot::resolve(table, column)?;
                let values = values
                    .iter()
                    .map(|v| slot.coerce(table, v.clone()))
                    .collect::<Result<Vec<_>, _>>()?;
                BoundOp::In(slot, values)
            }
            Op::IsNull(column) => BoundOp::IsNull(Slot::resolve(table, column)?),
            Op::IsNotNull(column) => BoundOp::IsNotNull(Slot::resolve(table, column)?),
            Op::And(a, b) => BoundOp::And(Box::new(a.bind(table)?), Box::new(b.bind(table)?)),
            Op::Or(a, b) => BoundOp::Or(Box::new(a.bind(table)?), Box::new(b.bind(table)?)),
            Op::Not(inner) => BoundOp::Not(Box::new(inner.bind(table)?)),
        })
    }
}

fn bind_value(table: &TableDef, column: &str, value: &Value) -> Result<(Slot, Value), DbError> {
    let slot = Slot::resolve(table, column)?;
    let value = slot.coerce(table, value.clone())?;
    Ok((slot, value))
}

/// Resolved column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Primary key
    Id,
    /// Non-key column by index
    Column(usize),
}

impl Slot {
    fn resolve(table: &TableDef, column: &str) -> Result<Self, DbError> {
        if column == table.primary_key().column_name() {
            return Ok(Slot::Id);
        }
        table.column_index(column).map(Slot::Column)
    }

    fn coerce(&self, table: &TableDef, value: Value) -> Result<Value, DbError> {
        match self {
            Slot::Id => table.primary_key().key_type().coerce(value),
            Slot::Column(index) => table.columns()[*index].column_type.coerce(value),
        }
    }

    fn read(&self, row: &Row) -> Value {
        match self {
            Slot::Id => Value::Long(row.id),
            Slot::Column(index) => row.values.get(*index).cloned().unwrap_or_default(),
        }
    }
}

/// Predicate bound to a table's column layout.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundOp {
    Eq(Slot, Value),
    Neq(Slot, Value),
    In(Slot, Vec<Value>),
    IsNull(Slot),
    IsNotNull(Slot),
    And(Box<BoundOp>, Box<BoundOp>),
    Or(Box<BoundOp>, Box<BoundOp>),
    Not(Box<BoundOp>),
}

impl BoundOp {
    /// Evaluates the predicate against a row.
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            BoundOp::Eq(slot, expected) => {
                let actual = slot.read(row);
                !actual.is_null() && !expected.is_null() && actual == *expected
            }
            BoundOp::Neq(slot, expected) => {
                let actual = slot.read(row);
                !actual.is_null() && !expected.is_null() && actual != *expected
            }
            BoundOp::In(slot, values) => {
                let actual = slot.read(row);
                !actual.is_null() && values.iter().any(|v| *v == actual)
            }
            BoundOp::IsNull(slot) => slot.read(row).is_null(),
            BoundOp::IsNotNull(slot) => !slot.read(row).is_null(),
            BoundOp::And(a, b) => a.matches(row) && b.matches(row),
            BoundOp::Or(a, b) => a.matches(row) || b.matches(row),
            BoundOp::Not(inner) => !inner.matches(row),
        }
    }
}
