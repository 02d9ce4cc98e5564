use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::table::TableDef;
use crate::types::Value;

/// A stored row: primary key plus non-key values in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: i64,
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(id: i64, values: Vec<Value>) -> Self {
        Self { id, values }
    }

    /// Reads a column by name, including the primary key.
    pub fn get(&self, table: &TableDef, column: &str) -> Result<Value, DbError> {
        if column == table.primary_key().column_name() {
            return Ok(Value::Long(self.id));
        }
        let index = table.column_index(column)?;
        Ok(self.values.get(index).cloned().unwrap_or_default())
    }
}
