//! Snapshot persistence for the row store.

pub mod io_utils;
mod snapshot;

pub use snapshot::{SnapshotManager, SNAPSHOT_FILE, SNAPSHOT_VERSION};
