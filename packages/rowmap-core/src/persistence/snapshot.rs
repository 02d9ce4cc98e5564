//! Whole-store snapshots in a single checksummed JSON file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::config::OrmConfig;
use crate::error::DbError;
use crate::schema::SchemaRegistry;
use crate::store::{RowStore, TableSnapshot};
use crate::table::TableDef;

use super::io_utils::{classify_io_error, retry_io_operation};

pub const SNAPSHOT_FILE: &str = "snapshot.json";
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    /// CRC32 of the serialized `tables`
    checksum: u32,
    tables: Vec<TableSnapshot>,
}

/// Saves and loads store snapshots under the configured data directory.
#[derive(Debug)]
pub struct SnapshotManager {
    /// Data directory path
    data_dir: PathBuf,
    /// Maximum retry attempts for transient I/O errors
    max_retries: u32,
    /// Delay between retry attempts in milliseconds
    retry_delay_ms: u64,
}

impl SnapshotManager {
    pub fn new(config: &OrmConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            max_retries: config.persistence_max_retries,
            retry_delay_ms: config.persistence_retry_delay_ms,
        }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Writes every table of `store` to disk.
    ///
    /// The file is written to a temporary path and renamed into place.
    pub fn save(&self, store: &dyn RowStore) -> Result<(), DbError> {
        let tables = store.export_tables()?;
        let file = SnapshotFile {
            version: SNAPSHOT_VERSION,
            checksum: checksum(&tables)?,
            tables,
        };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| DbError::SerializationError(e.to_string()))?;

        retry_io_operation(
            || self.write_atomically(&json),
            self.max_retries,
            self.retry_delay_ms,
            "save_snapshot",
        )?;
        tracing::debug!(
            "Saved snapshot of {} tables to {}",
            file.tables.len(),
            self.path().display()
        );
        Ok(())
    }

    fn write_atomically(&self, contents: &[u8]) -> Result<(), DbError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| classify_io_error(e, "Failed to create data directory"))?;

        let temp_path = self.data_dir.join(format!("{}.tmp", SNAPSHOT_FILE));
        let mut file = File::create(&temp_path)
            .map_err(|e| classify_io_error(e, "Failed to create temp file"))?;
        file.write_all(contents)
            .map_err(|e| classify_io_error(e, "Failed to write snapshot"))?;
        file.sync_all()
            .map_err(|e| classify_io_error(e, "Failed to sync snapshot"))?;

        fs::rename(&temp_path, self.path())
            .map_err(|e| classify_io_error(e, "Failed to rename snapshot file"))
    }

    /// Loads the snapshot into an empty store and registry.
    ///
    /// # Returns
    /// `Result<bool, DbError>` with `false` if there is no snapshot file, or
    /// `DbError::DataCorruption` if the file fails its checks.
    pub fn load_into(&self, store: &dyn RowStore, schema: &SchemaRegistry) -> Result<bool, DbError> {
        let path = self.path();
        if !path.exists() {
            tracing::debug!("No snapshot at {}", path.display());
            return Ok(false);
        }

        let contents = retry_io_operation(
            || read_file(&path),
            self.max_retries,
            self.retry_delay_ms,
            "load_snapshot",
        )?;
        let file: SnapshotFile = serde_json::from_slice(&contents)
            .map_err(|e| DbError::DataCorruption(format!("Invalid snapshot: {}", e)))?;

        if file.version != SNAPSHOT_VERSION {
            return Err(DbError::DataCorruption(format!(
                "Unsupported snapshot version {}",
                file.version
            )));
        }
        let actual = checksum(&file.tables)?;
        if actual != file.checksum {
            return Err(DbError::DataCorruption(format!(
                "Snapshot checksum mismatch: expected {:08x}, got {:08x}",
                file.checksum, actual
            )));
        }

        let defs = file
            .tables
            .iter()
            .map(|t| TableDef::from_schema(&t.schema))
            .collect::<Result<Vec<Arc<TableDef>>, DbError>>()?;
        schema.register_all(&defs.iter().collect::<Vec<_>>())?;

        for (def, table) in defs.into_iter().zip(file.tables) {
            store.import_table(def, table.next_id, table.rows)?;
        }
        tracing::debug!("Loaded snapshot from {}", path.display());
        Ok(true)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, DbError> {
    fs::read(path).map_err(|e| classify_io_error(e, "Failed to read snapshot"))
}

fn checksum(tables: &[TableSnapshot]) -> Result<u32, DbError> {
    let bytes =
        serde_json::to_vec(tables).map_err(|e| DbError::SerializationError(e.to_string()))?;
    let mut hasher = Hasher::new();
    hasher.update(&bytes);
    Ok(hasher.finalize())
}
