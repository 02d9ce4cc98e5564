//! Lazy and eager reference resolution.

use ntest::timeout;

use rowmap_core::{Database, DbError, Model, Op, OrmConfig, TableDef};

use super::helpers::{create_city, create_person, database, with_tables, City, Fixtures, Person, Town};

/// Commits `count` cities and one town per city, returns the database.
fn seeded_towns(config: OrmConfig, count: usize) -> (Database, Fixtures) {
    let db = Database::new(config);
    let fixtures = Fixtures::new();
    db.with_scope(&fixtures.all(), |scope| {
        for i in 0..count {
            let city = create_city(scope, &format!("City {}", i))?;
            scope.insert(&fixtures.towns, |row| {
                row.set("city_id", city.id().value());
            })?;
        }
        Ok(())
    })
    .unwrap();
    (db, fixtures)
}

#[timeout(5000)]
#[test]
fn test_raw_long_reference_resolves_lazily_and_eagerly() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let city_a = create_city(scope, "A")?;
        assert_eq!(city_a.id().value(), 1);
        let town = scope.create::<Town, _>(|town| town.set_city_id(1))?;

        let lazy = town.city(scope)?;
        assert!(lazy.same_as(&city_a));

        scope.with_eager_load(&[town.entity().clone()], "city_id")?;
        let eager = town.city(scope)?;
        assert!(eager.same_as(&lazy));
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_eager_and_lazy_yield_identical_objects() {
    let (db, _fixtures) = seeded_towns(OrmConfig::default(), 3);
    let scope = db.open_scope();

    let towns = scope.all::<Town>().unwrap().load().unwrap();
    let lazy: Vec<City> = towns.iter().map(|t| t.city(&scope).unwrap()).collect();

    let entities: Vec<_> = towns.iter().map(|t| t.entity().clone()).collect();
    scope.with_eager_load(&entities, "city_id").unwrap();
    for (town, city) in towns.iter().zip(&lazy) {
        assert!(town.city(&scope).unwrap().same_as(city));
    }
}

#[timeout(5000)]
#[test]
fn test_lazy_loading_selects_per_entity() {
    let (db, _fixtures) = seeded_towns(OrmConfig::default(), 5);
    let scope = db.open_scope();

    let towns = scope.all::<Town>().unwrap().load().unwrap();
    let before = db.store().stats();
    for town in &towns {
        town.city(&scope).unwrap();
    }
    // Second access is served from the entity
    for town in &towns {
        town.city(&scope).unwrap();
    }
    let delta = db.store().stats().since(&before);

    assert_eq!(delta.point_selects, 5);
    assert_eq!(delta.batch_selects, 0);
}

#[timeout(5000)]
#[test]
fn test_eager_loading_uses_one_batch_select() {
    let (db, _fixtures) = seeded_towns(OrmConfig::default(), 5);
    let scope = db.open_scope();

    let before = db.store().stats();
    let towns = scope.all::<Town>().unwrap().with("city_id").load().unwrap();
    for town in &towns {
        town.city(&scope).unwrap();
    }
    let delta = db.store().stats().since(&before);

    assert_eq!(towns.len(), 5);
    assert_eq!(delta.scans, 1);
    assert_eq!(delta.batch_selects, 1);
    assert_eq!(delta.point_selects, 0);
}

#[timeout(5000)]
#[test]
fn test_eager_loading_respects_batch_size() {
    let config = OrmConfig {
        eager_batch_size: 2,
        ..OrmConfig::default()
    };
    let (db, _fixtures) = seeded_towns(config, 5);
    let scope = db.open_scope();

    let before = db.store().stats();
    scope.all::<Town>().unwrap().with("city_id").load().unwrap();
    let delta = db.store().stats().since(&before);

    assert_eq!(delta.batch_selects, 3);
}

#[timeout(5000)]
#[test]
fn test_eager_loading_skips_mapped_targets() {
    let (db, _fixtures) = seeded_towns(OrmConfig::default(), 4);
    let scope = db.open_scope();
    let first = scope.find::<City>(1).unwrap().unwrap();

    let before = db.store().stats();
    let towns = scope.all::<Town>().unwrap().with("city_id").load().unwrap();
    let delta = db.store().stats().since(&before);

    assert_eq!(delta.batch_selects, 1);
    assert_eq!(scope.cached_count(), 4 + 4);
    assert!(towns[0].city(&scope).unwrap().same_as(&first));
}

#[timeout(5000)]
#[test]
fn test_eager_loading_with_everything_mapped_issues_no_select() {
    let (db, _fixtures) = seeded_towns(OrmConfig::default(), 2);
    let scope = db.open_scope();
    scope.all::<City>().unwrap().load().unwrap();

    let before = db.store().stats();
    scope.all::<Town>().unwrap().with("city_id").load().unwrap();
    assert_eq!(db.store().stats().since(&before).batch_selects, 0);
}

#[timeout(5000)]
#[test]
fn test_dangling_reference() {
    let config = OrmConfig {
        enforce_foreign_keys: false,
        ..OrmConfig::default()
    };
    let db = Database::new(config);
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let town = scope.create::<Town, _>(|town| town.set_city_id(42))?;

        let lazy = town.city(scope);
        assert!(matches!(
            lazy,
            Err(DbError::DanglingReference { ref target, id: 42, .. }) if target == "cities"
        ));

        let eager = scope.with_eager_load(&[town.entity().clone()], "city_id");
        assert!(matches!(eager, Err(DbError::DanglingReference { id: 42, .. })));
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_deleted_target_invalidates_reference() {
    let config = OrmConfig {
        enforce_foreign_keys: false,
        ..OrmConfig::default()
    };
    let db = Database::new(config);
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let city = create_city(scope, "Gone")?;
        let person = create_person(scope, "Left", &city)?;
        assert!(person.city(scope)?.same_as(&city));

        scope.delete_entity(city.entity())?;
        assert!(matches!(
            person.city(scope),
            Err(DbError::DanglingReference { .. })
        ));
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_reassigning_reference_drops_cached_target() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let rome = create_city(scope, "Rome")?;
        let milan = create_city(scope, "Milan")?;
        let person = create_person(scope, "Luca", &rome)?;
        assert!(person.city(scope)?.same_as(&rome));

        person.entity().set("city_id", milan.id().value())?;
        assert!(person.city(scope)?.same_as(&milan));

        person.set_city(&rome)?;
        assert!(person.city(scope)?.same_as(&rome));
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_optional_reference() {
    let db = database();
    let cities = TableDef::builder("cities").varchar("name", 50).build().unwrap();
    let offices = TableDef::builder("offices")
        .varchar("label", 20)
        .optional_reference("city_id", &cities)
        .build()
        .unwrap();

    db.with_scope(&[&cities, &offices], |scope| {
        let remote = scope.new_entity(&offices, |o| o.set("label", "remote"))?;
        assert!(scope.optional_reference(&remote, "city_id")?.is_none());
        assert!(matches!(
            scope.reference(&remote, "city_id"),
            Err(DbError::NullValue { .. })
        ));

        let berlin = scope.new_entity(&cities, |c| c.set("name", "Berlin"))?;
        let hq = scope.new_entity(&offices, |o| {
            o.set("label", "hq")?;
            o.set_reference("city_id", &berlin)
        })?;

        let linked = scope
            .select_where(&offices, Op::is_not_null("city_id"))?
            .count();
        assert_eq!(linked, 1);

        scope.with_eager_load(&[remote.clone(), hq.clone()], "city_id")?;
        assert!(scope
            .optional_reference(&hq, "city_id")?
            .unwrap()
            .ptr_eq(&berlin));
        assert!(scope.optional_reference(&remote, "city_id")?.is_none());
        Ok(())
    })
    .unwrap();
}

#[timeout(5000)]
#[test]
fn test_eager_load_rejects_non_reference_column() {
    let db = database();
    let fixtures = Fixtures::new();

    with_tables(&db, &fixtures, |scope| {
        let city = create_city(scope, "Nice")?;
        let person = create_person(scope, "Remy", &city)?;
        let result = scope.all::<Person>()?.with("name").load();
        assert!(matches!(result, Err(DbError::Schema { .. })));
        assert!(matches!(
            scope.with_eager_load(&[person.entity().clone(), city.entity().clone()], "city_id"),
            Err(DbError::TypeMismatch { .. })
        ));
        Ok(())
    })
    .unwrap();
}
