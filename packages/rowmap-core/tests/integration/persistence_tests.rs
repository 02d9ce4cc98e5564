//! Snapshot save and restore through the database handle.

use std::fs;

use ntest::timeout;
use tempfile::tempdir;

use rowmap_core::persistence::SnapshotManager;
use rowmap_core::{Database, DbError, Model, OrmConfig};

use super::helpers::{create_city, create_person, Fixtures, Person};

fn config(dir: &std::path::Path) -> OrmConfig {
    OrmConfig {
        data_dir: dir.to_path_buf(),
        persistence_retry_delay_ms: 0,
        ..OrmConfig::default()
    }
}

#[timeout(5000)]
#[test]
fn test_snapshot_restores_entities_and_references() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let fixtures = Fixtures::new();

    let db = Database::open(config(dir.path()))?;
    db.with_scope(&fixtures.all(), |scope| {
        let oslo = create_city(scope, "Oslo")?;
        create_person(scope, "Ingrid", &oslo)?;
        Ok(())
    })?;
    db.save_snapshot()?;
    assert!(SnapshotManager::new(db.config()).exists());

    let restored = Database::open(config(dir.path()))?;
    assert!(restored.table_exists(&fixtures.people)?);
    let scope = restored.open_scope();
    let ingrid = scope.all::<Person>()?.with("city_id").single()?;
    assert_eq!(ingrid.name()?, "Ingrid");
    assert_eq!(ingrid.city(&scope)?.name()?, "Oslo");

    let next = create_city(&scope, "Bergen")?;
    assert_eq!(next.id().value(), 2);
    Ok(())
}

#[timeout(5000)]
#[test]
fn test_open_rejects_corrupted_snapshot() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let fixtures = Fixtures::new();

    let db = Database::open(config(dir.path()))?;
    db.with_scope(&fixtures.all(), |scope| create_city(scope, "Turku").map(|_| ()))?;
    db.save_snapshot()?;

    let path = SnapshotManager::new(db.config()).path();
    let contents = fs::read_to_string(&path)?;
    fs::write(&path, contents.replace("Turku", "Tampere"))?;

    let result = Database::open(config(dir.path()));
    assert!(matches!(result, Err(DbError::DataCorruption(_))));
    Ok(())
}

#[timeout(5000)]
#[test]
fn test_config_from_file_drives_database() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        format!(
            r#"{{ "eager_batch_size": 7, "data_dir": {:?} }}"#,
            dir.path().join("data")
        ),
    )?;

    let config = OrmConfig::from_json_file(&path)?;
    assert_eq!(config.eager_batch_size, 7);
    assert!(config.enforce_foreign_keys);

    let db = Database::open(config)?;
    assert_eq!(db.config().eager_batch_size, 7);
    assert!(db.schema().table_names().is_empty());
    Ok(())
}
