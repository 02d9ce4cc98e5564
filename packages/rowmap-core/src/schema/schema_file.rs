//! Serializable schema structs.

use serde::{Deserialize, Serialize};

use crate::table::ReferenceStyle;
use crate::types::ColumnType;

/// Primary key column name and type for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeySchema {
    /// Column name
    pub name: String,
    /// Key type
    pub r#type: ColumnType,
    /// Whether values come from the table's sequence
    pub auto_increment: bool,
}

/// Table schema for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Primary key definition
    pub primary_key: PrimaryKeySchema,
    /// Column definitions in declaration order
    pub columns: Vec<ColumnSchema>,
}

/// Column schema for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name
    pub name: String,
    /// Column type
    pub r#type: ColumnType,
    /// Whether `NULL` is accepted
    #[serde(default)]
    pub nullable: bool,
    /// Foreign key, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceSchema>,
}

/// Reference schema for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSchema {
    /// Target table name
    pub to_table: String,
    /// Target column name
    pub to_column: String,
    /// Target key type
    pub key_type: ColumnType,
    /// Declaration style
    pub style: ReferenceStyle,
}
