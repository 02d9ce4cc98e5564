//! Statement execution: insert, update, delete and select.

use ntest::timeout;

use rowmap_core::{DbError, Model, Op, Value};

use super::helpers::{create_city, create_person, database, with_tables, Fixtures};

#[timeout(5000)]
#[test]
fn test_insert_and_get_id_round_trip() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let city = scope.insert_and_get_id(&fixtures.cities, |row| {
            row.set("name", "Tallinn");
        })?;
        let person = scope.insert_and_get_id(&fixtures.people, |row| {
            row.set("name", "Mari").set("city_id", &city);
        })?;
        assert_eq!(person.table(), "people");

        let row = scope
            .store()
            .select_by_id("people", person.value())?
            .unwrap();
        assert_eq!(row.id, person.value());
        assert_eq!(row.get(&fixtures.people, "name")?, Value::from("Mari"));
        assert_eq!(row.get(&fixtures.people, "city_id")?, Value::Long(city.value()));
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_insert_rejects_bad_rows() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let missing = scope.insert(&fixtures.people, |row| {
            row.set("name", "Nobody");
        });
        assert!(matches!(missing, Err(DbError::NullValue { .. })));

        let unknown = scope.insert(&fixtures.cities, |row| {
            row.set("name", "X").set("population", 10i64);
        });
        assert!(matches!(unknown, Err(DbError::ColumnNotFound { .. })));

        let dangling = scope.insert(&fixtures.people, |row| {
            row.set("name", "Ghost").set("city_id", 404i64);
        });
        assert!(matches!(dangling, Err(DbError::ForeignKeyViolation { .. })));

        assert_eq!(scope.count(&fixtures.people, None)?, 0);
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_update_statement_refreshes_mapped_entities() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let riga = create_city(scope, "Riga")?;
        let vilnius = create_city(scope, "Vilnius")?;
        let anna = create_person(scope, "Anna", &riga)?;
        create_person(scope, "Jonas", &vilnius)?;
        assert!(anna.city(scope)?.same_as(&riga));

        let updated = scope.update(&fixtures.people, Op::eq("city_id", &riga.id()), |row| {
            row.set("city_id", &vilnius.id());
        })?;
        assert_eq!(updated, 1);
        assert!(anna.city(scope)?.same_as(&vilnius));

        let moved = scope.count(&fixtures.people, Some(Op::eq("city_id", &vilnius.id())))?;
        assert_eq!(moved, 2);

        let none = scope.update(&fixtures.people, Op::eq("name", "Nobody"), |row| {
            row.set("name", "Somebody");
        })?;
        assert_eq!(none, 0);
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_update_statement_sees_pending_assignments() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let city = create_city(scope, "Old")?;
        city.set_name("Renamed")?;

        let updated = scope.update(&fixtures.cities, Op::eq("name", "Renamed"), |row| {
            row.set("name", "Final");
        })?;
        assert_eq!(updated, 1);
        assert_eq!(city.name()?, "Final");
        assert!(!city.entity().is_dirty());
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_delete_where_evicts_entities() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let a = create_city(scope, "A")?;
        let b = create_city(scope, "B")?;
        let c = create_city(scope, "C")?;

        let deleted = scope.delete_where(&fixtures.cities, Op::in_list("name", ["A", "C"]))?;
        assert_eq!(deleted, 2);
        assert!(a.entity().is_removed());
        assert!(c.entity().is_removed());
        assert!(!b.entity().is_removed());
        assert!(scope.cached("cities", a.id().value()).is_none());

        let rest: Vec<i64> = scope.select_all(&fixtures.cities)?.map(|r| r.id).collect();
        assert_eq!(rest, vec![b.id().value()]);
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_delete_of_referenced_row_is_rejected() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let city = create_city(scope, "Kept")?;
        create_person(scope, "Resident", &city)?;

        let result = scope.delete_entity(city.entity());
        assert!(matches!(result, Err(DbError::ForeignKeyViolation { .. })));
        assert!(!city.entity().is_removed());
        assert_eq!(city.name()?, "Kept");
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_delete_after_reassigning_reference() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let mumbai = create_city(scope, "Mumbai")?;
        let pune = create_city(scope, "Pune")?;
        let david = create_person(scope, "David", &pune)?;

        david.set_city(&mumbai)?;
        scope.delete_entity(pune.entity())?;

        assert!(pune.entity().is_removed());
        assert_eq!(david.city(scope)?.name()?, "Mumbai");
        let row = scope.store().select_by_id("people", david.id().value())?.unwrap();
        assert_eq!(row.get(&fixtures.people, "city_id")?, Value::Long(mumbai.id().value()));
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_select_where_predicates() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        for name in ["Graz", "Linz", "Wien", "Salzburg"] {
            scope.insert(&fixtures.cities, |row| {
                row.set("name", name);
            })?;
        }

        let filter = Op::eq("name", "Graz").or(Op::eq("name", "Wien"));
        let ids: Vec<i64> = scope.select_where(&fixtures.cities, filter)?.map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);

        let filter = Op::neq("name", "Graz").and(Op::eq("id", 2i64).not());
        let ids: Vec<i64> = scope.select_where(&fixtures.cities, filter)?.map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 4]);

        let bad = scope.select_where(&fixtures.cities, Op::eq("country", "AT"));
        assert!(matches!(bad, Err(DbError::ColumnNotFound { .. })));
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_cursor_converts_rows_on_demand() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        for name in ["One", "Two", "Three"] {
            scope.insert(&fixtures.cities, |row| {
                row.set("name", name);
            })?;
        }
        assert_eq!(scope.cached_count(), 0);

        let cursor = scope.select_all(&fixtures.cities)?;
        let mut entities = scope.entities(&fixtures.cities, cursor);
        let first = entities.next().unwrap();
        assert_eq!(scope.cached_count(), 1);
        assert_eq!(first.get_string("name")?, "One");

        let again = scope.get_or_create(&fixtures.cities, 1)?;
        assert!(again.ptr_eq(&first));
        assert_eq!(entities.count(), 2);
        assert_eq!(scope.cached_count(), 3);
        Ok(())
    })
    .unwrap();
}
