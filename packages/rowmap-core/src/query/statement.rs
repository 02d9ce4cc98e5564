//! Column assignments for insert and update statements.

use crate::error::DbError;
use crate::table::TableDef;
use crate::types::Value;

/// Column assignments for an insert.
#[derive(Debug, Default, Clone)]
pub struct InsertStatement {
    assignments: Vec<(String, Value)>,
}

impl InsertStatement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a column. A later assignment to the same column wins.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    /// Builds a full row of values in column order.
    ///
    /// Unassigned columns are `NULL`.
    ///
    /// # Returns
    /// `Result<Vec<Value>, DbError>` containing the values, or an error when a
    /// column is unknown, mistyped, the primary key, or a non-null column is
    /// left `NULL`.
    pub(crate) fn into_values(self, table: &TableDef) -> Result<Vec<Value>, DbError> {
        let mut values = vec![Value::Null; table.columns().len()];
        for (column, value) in self.assignments {
            let (index, value) = bind_assignment(table, &column, value)?;
            values[index] = value;
        }
        check_not_null(table, &values)?;
        Ok(values)
    }
}

/// Column assignments for an update.
#[derive(Debug, Default, Clone)]
pub struct UpdateStatement {
    assignments: Vec<(String, Value)>,
}

impl UpdateStatement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a column. A later assignment to the same column wins.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Resolves assignments to `(column index, value)` pairs.
    pub(crate) fn into_changes(self, table: &TableDef) -> Result<Vec<(usize, Value)>, DbError> {
        let mut changes: Vec<(usize, Value)> = Vec::with_capacity(self.assignments.len());
        for (column, value) in self.assignments {
            let (index, value) = bind_assignment(table, &column, value)?;
            if value.is_null() && !table.columns()[index].nullable {
                return Err(DbError::NullValue {
                    table: table.name().to_string(),
                    column,
                });
            }
            match changes.iter_mut().find(|(i, _)| *i == index) {
                Some(existing) => existing.1 = value,
                None => changes.push((index, value)),
            }
        }
        Ok(changes)
    }
}

/// Resolves a column name and coerces the value to its type.
pub(crate) fn bind_assignment(
    table: &TableDef,
    column: &str,
    value: Value,
) -> Result<(usize, Value), DbError> {
    if column == table.primary_key().column_name() {
        return Err(DbError::schema(
            table.name(),
            format!("primary key '{}' is generated and cannot be assigned", column),
        ));
    }
    let index = table.column_index(column)?;
    let value = table.columns()[index].column_type.coerce(value)?;
    Ok((index, value))
}

/// Checks that every non-null column holds a value.
pub(crate) fn check_not_null(table: &TableDef, values: &[Value]) -> Result<(), DbError> {
    for (column, value) in table.columns().iter().zip(values) {
        if value.is_null() && !column.nullable {
            return Err(DbError::NullValue {
                table: table.name().to_string(),
                column: column.name.clone(),
            });
        }
    }
    Ok(())
}
