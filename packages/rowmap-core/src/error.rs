//! Error types for the entity layer and the row store.

use thiserror::Error;

/// Entity layer and storage errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    /// Malformed or type-mismatched table or reference declaration
    #[error("Schema error in table '{table}': {message}")]
    Schema { table: String, message: String },

    /// Access on an evicted or never-materialized entity
    #[error("Entity {id} not found in table '{table}'")]
    EntityNotFound { table: String, id: i64 },

    /// Foreign key value with no matching row in the referenced table
    #[error("Dangling reference: {table}.{column} = {id} has no matching row in '{target}'")]
    DanglingReference {
        table: String,
        column: String,
        target: String,
        id: i64,
    },

    /// Non-null access on a null column value
    #[error("Column '{column}' in table '{table}' is null")]
    NullValue { table: String, column: String },

    /// Query expected exactly one row
    #[error("Expected exactly one row in table '{table}', found {found}")]
    NotSingle { table: String, found: usize },

    /// Table not found
    #[error("Table '{table}' not found")]
    TableNotFound { table: String },

    /// Column not found in table
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// Type mismatch error
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    /// Store-level foreign key constraint violation
    #[error("Foreign key violation on {table}.{column}: {message}")]
    ForeignKeyViolation {
        table: String,
        column: String,
        message: String,
    },

    /// Record not found in the store
    #[error("Record {id} not found in table '{table}'")]
    RecordNotFound { table: String, id: i64 },

    /// Record id already present in the store
    #[error("Record {id} already exists in table '{table}'")]
    DuplicateKey { table: String, id: i64 },

    /// Scope already committed or rolled back
    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    /// Lock poisoned (RwLock poisoned)
    #[error("Lock poisoned")]
    LockPoisoned,

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Data corruption detected
    #[error("Data corruption detected: {0}")]
    DataCorruption(String),

    /// Disk full error during persistence
    #[error("Disk full: {0}")]
    DiskFull(String),

    /// I/O error during persistence
    #[error("I/O error: {0}")]
    IoError(String),

    /// Transient I/O error that may succeed on retry
    #[error("Transient I/O error: {0}")]
    TransientIoError(String),
}

impl DbError {
    pub(crate) fn schema(table: &str, message: impl Into<String>) -> Self {
        DbError::Schema {
            table: table.to_string(),
            message: message.into(),
        }
    }
}
