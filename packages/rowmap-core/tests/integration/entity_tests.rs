//! Entity lifecycle through typed models.

use ntest::timeout;

use rowmap_core::{DbError, Model, Op};

use super::helpers::{create_city, create_person, database, names, with_tables, City, Fixtures, Person};

#[timeout(5000)]
#[test]
fn test_create_tables() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |_scope| {
        assert!(db.table_exists(&fixtures.cities)?);
        assert!(db.table_exists(&fixtures.people)?);
        assert!(db.table_exists(&fixtures.towns)?);
        Ok(())
    })
    .unwrap();

    assert!(!db.table_exists(&fixtures.cities).unwrap());
    assert!(!db.schema().contains("cities"));
}

#[timeout(5000)]
#[test]
fn test_create_records() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let st_petersburg = create_city(scope, "St. Petersburg")?;
        let munich = create_city(scope, "Munich")?;
        create_person(scope, "Andrey", &st_petersburg)?;
        create_person(scope, "Sergey", &munich)?;
        create_person(scope, "Eugene", &munich)?;

        let cities = scope.all::<City>()?.load()?;
        assert_eq!(names(&cities, City::name), vec!["Munich", "St. Petersburg"]);

        let people = scope.all::<Person>()?.load()?;
        assert_eq!(people.len(), 3);
        let sergey = people
            .iter()
            .find(|p| p.name().unwrap() == "Sergey")
            .unwrap();
        assert!(sergey.city(scope)?.same_as(&munich));

        assert_eq!(st_petersburg.id().value(), 1);
        assert_eq!(munich.id().value(), 2);
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_update_and_delete_records() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let mumbai = create_city(scope, "Mumbai")?;
        let pune = create_city(scope, "Pune")?;
        let david = create_person(scope, "David", &mumbai)?;

        david.set_name("Dave")?;
        assert!(david.entity().is_dirty());

        scope.delete_entity(pune.entity())?;
        assert!(matches!(pune.name(), Err(DbError::EntityNotFound { .. })));

        let cities = scope.all::<City>()?.load()?;
        assert_eq!(names(&cities, City::name), vec!["Mumbai"]);

        let people = scope.all::<Person>()?.load()?;
        assert_eq!(people.len(), 1);
        assert!(people[0].same_as(&david));
        assert!(!david.entity().is_dirty());
        assert_eq!(people[0].name()?, "Dave");
        assert!(people[0].city(scope)?.same_as(&mumbai));
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_get_or_create_returns_created_instance() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let city = create_city(scope, "Lyon")?;
        let found = scope.get_or_create(&fixtures.cities, city.id().value())?;
        assert!(found.ptr_eq(city.entity()));

        let by_query = scope
            .find_where::<City>(Op::eq("name", "Lyon"))?
            .single()?;
        assert!(by_query.same_as(&city));

        assert!(matches!(
            scope.get_or_create(&fixtures.cities, 99),
            Err(DbError::EntityNotFound { id: 99, .. })
        ));
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_new_requires_non_null_columns() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let result = scope.create::<City, _>(|_| Ok(()));
        assert!(matches!(result, Err(DbError::NullValue { .. })));
        assert_eq!(scope.all::<City>()?.count()?, 0);

        // The reserved key is not reused
        let city = create_city(scope, "Oslo")?;
        assert_eq!(city.id().value(), 2);
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_entities_are_detached_after_scope() {
    let db = database();
    let fixtures = Fixtures::new();
    db.create_tables(&fixtures.all()).unwrap();

    let scope = db.open_scope();
    let city = create_city(&scope, "Bern").unwrap();
    scope.commit().unwrap();

    assert!(city.entity().is_detached());
    assert_eq!(city.name().unwrap(), "Bern");
    assert!(matches!(
        city.set_name("Basel"),
        Err(DbError::TransactionConflict(_))
    ));

    let scope = db.open_scope();
    let attached = scope.attach(city.entity()).unwrap();
    assert!(attached.ptr_eq(city.entity()));
    city.set_name("Basel").unwrap();
    scope.commit().unwrap();

    let scope = db.open_scope();
    let reloaded = scope.find::<City>(city.id().value()).unwrap().unwrap();
    assert_eq!(reloaded.name().unwrap(), "Basel");
    assert!(!reloaded.same_as(&city));
}
