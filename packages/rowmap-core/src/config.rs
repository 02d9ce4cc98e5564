//! Entity layer configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DbError;

/// Entity layer and store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrmConfig {
    /// Initial row capacity reserved per table
    pub initial_table_capacity: usize,
    /// Reject inserts, updates and deletes that break reference columns
    pub enforce_foreign_keys: bool,
    /// Maximum number of keys per batched select during eager loading
    pub eager_batch_size: usize,
    /// Flush dirty entities before scans and predicate-driven statements
    pub flush_before_query: bool,
    /// Data directory for snapshots
    pub data_dir: PathBuf,
    /// Maximum retry attempts for transient I/O errors
    pub persistence_max_retries: u32,
    /// Delay between retry attempts in milliseconds
    pub persistence_retry_delay_ms: u64,
}

impl Default for OrmConfig {
    fn default() -> Self {
        Self {
            initial_table_capacity: 1024,
            enforce_foreign_keys: true,
            eager_batch_size: 1000,
            flush_before_query: true,
            data_dir: PathBuf::from("./data"),
            persistence_max_retries: 3,
            persistence_retry_delay_ms: 100,
        }
    }
}

impl OrmConfig {
    /// Loads configuration from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, DbError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| DbError::IoError(format!("{}: {}", path.display(), e)))?;
        let config: OrmConfig = serde_json::from_str(&contents)
            .map_err(|e| DbError::SerializationError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.eager_batch_size == 0 {
            return Err(DbError::ConfigError(
                "eager_batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
