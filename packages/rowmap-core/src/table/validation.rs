//! Declaration-time validation for table descriptors.

use std::collections::HashSet;

use super::column::Column;
use super::table::PrimaryKeyStrategy;
use crate::error::DbError;
use crate::types::ColumnType;

/// Validates a table name.
pub(crate) fn validate_table_name(name: &str) -> Result<(), DbError> {
    if name.trim().is_empty() {
        return Err(DbError::schema(name, "table name must not be empty"));
    }
    Ok(())
}

/// Validates column names, lengths and reference key types.
///
/// # Arguments
/// * `table` - Table name, for error reporting
/// * `primary_key` - Primary key strategy of the table
/// * `columns` - Column definitions to validate
///
/// # Returns
/// `Result<(), DbError>` indicating success or `DbError::Schema`.
pub(crate) fn validate_columns(
    table: &str,
    primary_key: PrimaryKeyStrategy,
    columns: &[Column],
) -> Result<(), DbError> {
    let mut seen_names = HashSet::new();
    for column in columns {
        if column.name.trim().is_empty() {
            return Err(DbError::schema(table, "column name must not be empty"));
        }

        if column.name == primary_key.column_name() {
            return Err(DbError::schema(
                table,
                format!("column '{}' clashes with the primary key", column.name),
            ));
        }

        if !seen_names.insert(column.name.as_str()) {
            return Err(DbError::schema(
                table,
                format!("duplicate column '{}'", column.name),
            ));
        }

        if column.column_type == ColumnType::Varchar(0) {
            return Err(DbError::schema(
                table,
                format!("column '{}' declares varchar(0)", column.name),
            ));
        }

        validate_reference(table, column)?;
    }
    Ok(())
}

/// Validates that a reference column's type matches the target key type.
fn validate_reference(table: &str, column: &Column) -> Result<(), DbError> {
    let Some(reference) = &column.reference else {
        return Ok(());
    };

    if reference.to_table.trim().is_empty() {
        return Err(DbError::schema(
            table,
            format!("column '{}' references an unnamed table", column.name),
        ));
    }

    // Single-column long identifiers only
    if reference.key_type != ColumnType::Long {
        return Err(DbError::schema(
            table,
            format!(
                "column '{}' references {}.{} of unsupported key type {}",
                column.name, reference.to_table, reference.to_column, reference.key_type
            ),
        ));
    }

    if column.column_type != reference.key_type {
        return Err(DbError::schema(
            table,
            format!(
                "column '{}' of type {} cannot reference {}.{} of type {}",
                column.name,
                column.column_type,
                reference.to_table,
                reference.to_column,
                reference.key_type
            ),
        ));
    }

    Ok(())
}
