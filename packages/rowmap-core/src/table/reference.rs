//! Foreign key from a column to another table's primary key.

use serde::{Deserialize, Serialize};

use crate::types::ColumnType;

use super::table::TableDef;

/// How a reference column was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceStyle {
    /// Column declared as a reference to the target's identifier
    EntityId,
    /// Plain scalar column later bound to the target's identifier
    RawValue,
}

/// Foreign key from a column to another table's primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Name of the target table
    pub to_table: String,
    /// Primary key column name in the target table
    pub to_column: String,
    /// Primary key type of the target table
    pub key_type: ColumnType,
    /// Declaration style
    pub style: ReferenceStyle,
}

impl Reference {
    /// Creates a reference to `target`'s primary key.
    pub fn to(target: &TableDef, style: ReferenceStyle) -> Self {
        let primary_key = target.primary_key();
        Self {
            to_table: target.name().to_string(),
            to_column: primary_key.column_name().to_string(),
            key_type: primary_key.key_type(),
            style,
        }
    }
}
