//! Scope boundaries: commit, rollback and drop.

use std::sync::{Arc, Barrier};

use ntest::timeout;

use rowmap_core::{Database, DbError, Model, Op, OrmConfig, RowStore, Value};

use super::helpers::{create_city, create_person, database, Fixtures};

#[timeout(5000)]
#[test]
fn test_with_scope_rolls_back_on_error() {
    let db = database();
    let fixtures = Fixtures::new();
    db.with_scope(&fixtures.all(), |scope| {
        create_city(scope, "Committed")?;
        Ok(())
    })
    .unwrap();

    let result: Result<(), DbError> = db.with_scope(&fixtures.all(), |scope| {
        let city = create_city(scope, "Temporary")?;
        create_person(scope, "Visitor", &city)?;
        let committed = scope.get_or_create(&fixtures.cities, 1)?;
        committed.set("name", "Changed")?;
        scope.flush()?;
        scope.delete_where(&fixtures.people, Op::is_not_null("city_id"))?;
        Err(DbError::TransactionConflict("abort".to_string()))
    });
    assert!(matches!(result, Err(DbError::TransactionConflict(_))));

    let store = db.store();
    assert_eq!(row_count(store, "cities"), 1);
    assert_eq!(row_count(store, "people"), 0);
    let row = store.select_by_id("cities", 1).unwrap().unwrap();
    assert_eq!(row.get(&fixtures.cities, "name").unwrap(), Value::from("Committed"));

    // Keys handed out before the rollback are not reused
    let next = db
        .with_scope(&fixtures.all(), |scope| create_city(scope, "After"))
        .unwrap();
    assert_eq!(next.id().value(), 3);
}

#[timeout(5000)]
#[test]
fn test_dropped_scope_rolls_back() {
    let db = database();
    let fixtures = Fixtures::new();
    db.create_tables(&fixtures.all()).unwrap();

    {
        let scope = db.open_scope();
        create_city(&scope, "Lost").unwrap();
        assert_eq!(scope.pending_changes(), 1);
    }

    let scope = db.open_scope();
    assert_eq!(scope.count(&fixtures.cities, None).unwrap(), 0);
}

#[timeout(5000)]
#[test]
fn test_commit_flushes_pending_assignments() {
    let db = database();
    let fixtures = Fixtures::new();
    db.create_tables(&fixtures.all()).unwrap();

    let scope = db.open_scope();
    let city = create_city(&scope, "Draft").unwrap();
    city.set_name("Published").unwrap();
    scope.commit().unwrap();

    let scope = db.open_scope();
    let loaded = scope.get_or_create(&fixtures.cities, city.id().value()).unwrap();
    assert_eq!(loaded.get_string("name").unwrap(), "Published");
}

#[timeout(5000)]
#[test]
fn test_flush_before_query_can_be_disabled() {
    let config = OrmConfig {
        flush_before_query: false,
        ..OrmConfig::default()
    };
    let db = Database::new(config);
    let fixtures = Fixtures::new();
    db.create_tables(&fixtures.all()).unwrap();

    let scope = db.open_scope();
    let city = create_city(&scope, "Before").unwrap();
    city.set_name("After").unwrap();

    assert_eq!(scope.count(&fixtures.cities, Some(Op::eq("name", "After"))).unwrap(), 0);
    assert_eq!(scope.flush().unwrap(), 1);
    assert_eq!(scope.count(&fixtures.cities, Some(Op::eq("name", "After"))).unwrap(), 1);
}

#[timeout(5000)]
#[test]
fn test_scopes_have_separate_identity_maps() {
    let db = database();
    let fixtures = Fixtures::new();
    db.with_scope(&fixtures.all(), |scope| create_city(scope, "Shared").map(|_| ()))
        .unwrap();

    let first = db.open_scope();
    let second = db.open_scope();
    let a = first.get_or_create(&fixtures.cities, 1).unwrap();
    let b = second.get_or_create(&fixtures.cities, 1).unwrap();

    assert!(!a.ptr_eq(&b));
    assert!(a.ptr_eq(&first.get_or_create(&fixtures.cities, 1).unwrap()));
}

#[timeout(5000)]
#[test]
fn test_database_is_shared_across_threads() {
    let db = database();
    let fixtures = Fixtures::new();
    db.create_tables(&fixtures.all()).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let db = db.clone();
            let cities = fixtures.cities.clone();
            std::thread::spawn(move || {
                db.with_scope(&[&cities], |scope| {
                    for j in 0..10 {
                        scope.insert(&cities, |row| {
                            row.set("name", format!("City {}-{}", i, j));
                        })?;
                    }
                    Ok(())
                })
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let scope = db.open_scope();
    let ids: Vec<i64> = scope
        .select_all(&fixtures.cities)
        .unwrap()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, (1..=40).collect::<Vec<i64>>());
}

#[timeout(20000)]
#[test]
fn test_concurrent_insert_and_delete_keep_references_valid() {
    let db = database();
    let fixtures = Fixtures::new();
    db.create_tables(&fixtures.all()).unwrap();

    for round in 0..100 {
        let city = db
            .with_scope(&fixtures.all(), |scope| create_city(scope, "Contested"))
            .unwrap()
            .id()
            .value();
        let barrier = Arc::new(Barrier::new(2));

        let resident = {
            let (db, people, barrier) = (db.clone(), fixtures.people.clone(), barrier.clone());
            std::thread::spawn(move || {
                barrier.wait();
                db.with_scope(&[], |scope| {
                    scope.insert(&people, |row| {
                        row.set("name", format!("Resident {}", round)).set("city_id", city);
                    })
                })
            })
        };
        let demolition = {
            let (db, cities, barrier) = (db.clone(), fixtures.cities.clone(), barrier.clone());
            std::thread::spawn(move || {
                barrier.wait();
                db.with_scope(&[], |scope| scope.delete_where(&cities, Op::eq("id", city)))
            })
        };
        let inserted = resident.join().unwrap();
        let deleted = demolition.join().unwrap();

        // Exactly one side wins, the other is rejected by the constraint
        let insert_won = inserted.is_ok()
            && matches!(deleted, Err(DbError::ForeignKeyViolation { .. }));
        let delete_won = matches!(deleted, Ok(1))
            && matches!(inserted, Err(DbError::ForeignKeyViolation { .. }));
        assert!(
            insert_won || delete_won,
            "round {}: {:?} / {:?}",
            round,
            inserted,
            deleted
        );
    }

    let store = db.store();
    for row in store.scan("people", None).unwrap() {
        let city = row.get(&fixtures.people, "city_id").unwrap().as_long().unwrap();
        assert!(store.select_by_id("cities", city).unwrap().is_some());
    }
}

fn row_count(store: &Arc<dyn RowStore>, table: &str) -> usize {
    store.scan(table, None).unwrap().count()
}
