//! Table descriptors.
//!
//! A descriptor holds:
//! - Table name
//! - Primary key strategy (auto-increment long `id`)
//! - Column definitions in declaration order
//! - Foreign keys declared on those columns

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DbError;
use crate::schema::{ColumnSchema, PrimaryKeySchema, ReferenceSchema, TableSchema};
use crate::types::ColumnType;

use super::column::Column;
use super::reference::{Reference, ReferenceStyle};
use super::validation;

/// Name of the primary key column.
pub const ID_COLUMN: &str = "id";

/// How primary key values are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKeyStrategy {
    /// Long `id` column filled from a per-table sequence starting at 1
    AutoIncrementLong,
}

impl PrimaryKeyStrategy {
    /// Returns the primary key column name.
    pub fn column_name(&self) -> &'static str {
        match self {
            PrimaryKeyStrategy::AutoIncrementLong => ID_COLUMN,
        }
    }

    /// Returns the primary key type.
    pub fn key_type(&self) -> ColumnType {
        match self {
            PrimaryKeyStrategy::AutoIncrementLong => ColumnType::Long,
        }
    }
}

/// Table descriptor shared by the schema registry, the store and entities.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    name: String,
    primary_key: PrimaryKeyStrategy,
    columns: Vec<Column>,
}

impl TableDef {
    /// Declares a table.
    ///
    /// # Arguments
    /// * `name` - Table name
    /// * `columns` - Non-key columns in declaration order
    /// * `primary_key` - Primary key strategy
    ///
    /// # Returns
    /// `Result<Arc<TableDef>, DbError>` containing the descriptor, or
    /// `DbError::Schema` if a name, length or reference is invalid.
    pub fn define(
        name: impl Into<String>,
        columns: Vec<Column>,
        primary_key: PrimaryKeyStrategy,
    ) -> Result<Arc<Self>, DbError> {
        let name = name.into();
        validation::validate_table_name(&name)?;
        validation::validate_columns(&name, primary_key, &columns)?;

        Ok(Arc::new(Self {
            name,
            primary_key,
            columns,
        }))
    }

    /// Starts a builder for a table with an auto-increment long `id`.
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder::new(name)
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the primary key strategy.
    pub fn primary_key(&self) -> PrimaryKeyStrategy {
        self.primary_key
    }

    /// Returns the non-key columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the column with the given name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the position of a non-key column.
    ///
    /// # Returns
    /// `Result<usize, DbError>` containing the index, or
    /// `DbError::ColumnNotFound`.
    pub fn column_index(&self, name: &str) -> Result<usize, DbError> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| DbError::ColumnNotFound {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Returns the reference declared on a column.
    ///
    /// # Returns
    /// `Result<(usize, &Reference), DbError>` with the column index, or
    /// `DbError::Schema` if the column is not a reference.
    pub fn reference(&self, column: &str) -> Result<(usize, &Reference), DbError> {
        let index = self.column_index(column)?;
        match &self.columns[index].reference {
            Some(reference) => Ok((index, reference)),
            None => Err(DbError::schema(
                &self.name,
                format!("column '{}' is not a reference", column),
            )),
        }
    }

    /// Iterates over reference columns as `(index, column, reference)`.
    pub fn references(&self) -> impl Iterator<Item = (usize, &Column, &Reference)> {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.reference.as_ref().map(|r| (i, c, r)))
    }

    /// Converts the descriptor into its serializable form.
    pub fn to_schema(&self) -> TableSchema {
        TableSchema {
            name: self.name.clone(),
            primary_key: PrimaryKeySchema {
                name: self.primary_key.column_name().to_string(),
                r#type: self.primary_key.key_type(),
                auto_increment: true,
            },
            columns: self
                .columns
                .iter()
                .map(|c| ColumnSchema {
                    name: c.name.clone(),
                    r#type: c.column_type,
                    nullable: c.nullable,
                    reference: c.reference.as_ref().map(|r| ReferenceSchema {
                        to_table: r.to_table.clone(),
                        to_column: r.to_column.clone(),
                        key_type: r.key_type,
                        style: r.style,
                    }),
                })
                .collect(),
        }
    }

    /// Rebuilds a descriptor from its serializable form.
    pub fn from_schema(schema: &TableSchema) -> Result<Arc<Self>, DbError> {
        if schema.primary_key.name != ID_COLUMN
            || schema.primary_key.r#type != ColumnType::Long
            || !schema.primary_key.auto_increment
        {
            return Err(DbError::schema(
                &schema.name,
                format!(
                    "unsupported primary key '{}' of type {}",
                    schema.primary_key.name, schema.primary_key.r#type
                ),
            ));
        }

        let columns = schema
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                column_type: c.r#type,
                nullable: c.nullable,
                reference: c.reference.as_ref().map(|r| Reference {
                    to_table: r.to_table.clone(),
                    to_column: r.to_column.clone(),
                    key_type: r.key_type,
                    style: r.style,
                }),
            })
            .collect();

        Self::define(
            schema.name.clone(),
            columns,
            PrimaryKeyStrategy::AutoIncrementLong,
        )
    }
}

/// Builder for table descriptors.
///
/// Declaration errors are collected and reported by [`TableBuilder::build`].
#[derive(Debug)]
pub struct TableBuilder {
    name: String,
    primary_key: PrimaryKeyStrategy,
    columns: Vec<Column>,
    errors: Vec<String>,
}

impl TableBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: PrimaryKeyStrategy::AutoIncrementLong,
            columns: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Adds a column of the given type.
    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(Column::new(name, column_type));
        self
    }

    pub fn long(self, name: impl Into<String>) -> Self {
        self.column(name, ColumnType::Long)
    }

    pub fn integer(self, name: impl Into<String>) -> Self {
        self.column(name, ColumnType::Integer)
    }

    pub fn bool(self, name: impl Into<String>) -> Self {
        self.column(name, ColumnType::Bool)
    }

    pub fn double(self, name: impl Into<String>) -> Self {
        self.column(name, ColumnType::Double)
    }

    pub fn varchar(self, name: impl Into<String>, max_length: u32) -> Self {
        self.column(name, ColumnType::Varchar(max_length))
    }

    pub fn text(self, name: impl Into<String>) -> Self {
        self.column(name, ColumnType::Text)
    }

    /// Adds a column typed after `target`'s identifier and referencing it.
    pub fn reference(mut self, name: impl Into<String>, target: &TableDef) -> Self {
        let column = Column::new(name, target.primary_key().key_type())
            .with_reference(Reference::to(target, ReferenceStyle::EntityId));
        self.columns.push(column);
        self
    }

    /// Adds a nullable column referencing `target`.
    pub fn optional_reference(self, name: impl Into<String>, target: &TableDef) -> Self {
        self.reference(name, target).nullable()
    }

    /// Binds the last declared column to `target`'s identifier.
    pub fn references(mut self, target: &TableDef) -> Self {
        match self.columns.last_mut() {
            Some(column) => {
                column.reference = Some(Reference::to(target, ReferenceStyle::RawValue));
            }
            None => self.errors.push(format!(
                "references('{}') called before any column was declared",
                target.name()
            )),
        }
        self
    }

    /// Marks the last declared column as nullable.
    pub fn nullable(mut self) -> Self {
        match self.columns.last_mut() {
            Some(column) => column.nullable = true,
            None => self
                .errors
                .push("nullable() called before any column was declared".to_string()),
        }
        self
    }

    /// Validates and returns the descriptor.
    pub fn build(self) -> Result<Arc<TableDef>, DbError> {
        if let Some(message) = self.errors.into_iter().next() {
            return Err(DbError::schema(&self.name, message));
        }
        TableDef::define(self.name, self.columns, self.primary_key)
    }
}
