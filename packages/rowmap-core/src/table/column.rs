//! Column definition within a table.

use crate::types::ColumnType;

use super::reference::Reference;

/// Column definition within a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Storage type
    pub column_type: ColumnType,
    /// Whether `NULL` is accepted
    pub nullable: bool,
    /// Foreign key to another table's primary key
    pub reference: Option<Reference>,
}

impl Column {
    /// Creates a non-null column without a reference.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            reference: None,
        }
    }

    /// Marks the column as accepting `NULL`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Attaches a foreign key to the column.
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }
}
