//! Table data access against SQLite.
//!
//! Run with: cargo test --test test_table

mod common;

use common::{database, PERSON_TABLE};
use sqlrow::{row, Config, Error, Row, ValidationError, Value};

#[test]
fn test_insert_and_load() {
    let mut db = database(Config::default(), PERSON_TABLE);

    let mut person = row! { "first_name" => "Ann", "age" => 30 };
    let id = db.table("person").unwrap().insert(&mut person).unwrap();
    assert_eq!(id, Some(Value::Integer(1)));
    assert_eq!(person.get_long("id").unwrap(), 1);

    let loaded = db.table("person").unwrap().load(1).unwrap().unwrap();
    assert_eq!(loaded.get_string("first_name").unwrap(), "Ann");
    assert_eq!(loaded.get_int("age").unwrap(), 30);
    assert_eq!(loaded.id(), Some(&Value::Integer(1)));

    assert!(db.table("person").unwrap().load(99).unwrap().is_none());
}

#[test]
fn test_insert_strips_null_primary_key() {
    let mut db = database(Config::default(), PERSON_TABLE);

    let mut person = row! { "id" => Value::Null, "first_name" => "Bo" };
    let id = db.table("person").unwrap().insert(&mut person).unwrap();
    assert!(id.is_some());
    assert_eq!(person.get("id"), id.as_ref());
}

#[test]
fn test_update_increments_revision() {
    let mut db = database(Config::new().with_revision_support("person"), PERSON_TABLE);

    let mut person = row! { "first_name" => "Ann" };
    db.table("person").unwrap().insert(&mut person).unwrap();
    assert_eq!(person.get_int("revision").unwrap(), 0);

    let stale = person.clone();
    person.insert("first_name", "Anna");
    db.table("person").unwrap().update(&mut person).unwrap();
    assert_eq!(person.get_int("revision").unwrap(), 1);

    let loaded = db.table("person").unwrap().load(person.get_long("id").unwrap()).unwrap().unwrap();
    assert_eq!(loaded.get_string("first_name").unwrap(), "Anna");
    assert_eq!(loaded.get_int("revision").unwrap(), 1);

    // An update based on the old revision must not overwrite the newer row
    let mut stale = stale;
    stale.insert("first_name", "Annie");
    let err = db.table("person").unwrap().update(&mut stale).unwrap_err();
    assert!(matches!(err, Error::Update { .. }));
    assert!(err.to_string().contains("0 rows were affected by update operation"));
}

#[test]
fn test_revision_is_not_caller_settable() {
    let mut db = database(Config::new().with_revision_support("person"), PERSON_TABLE);

    let mut person = row! { "first_name" => "Ann" };
    db.table("person").unwrap().insert(&mut person).unwrap();

    // The supplied revision is only used for the optimistic lock check
    person.insert("revision", 0);
    db.table("person").unwrap().update(&mut person).unwrap();
    assert_eq!(person.get_int("revision").unwrap(), 1);

    let mut missing = row! { "id" => person.get_long("id").unwrap(), "first_name" => "X" };
    let err = db.table("person").unwrap().update(&mut missing).unwrap_err();
    assert!(err.to_string().contains("Row must contain a revision."));
}

#[test]
fn test_update_where() {
    let mut db = database(Config::default(), PERSON_TABLE);
    let mut ann = row! { "first_name" => "Ann", "age" => 30 };
    db.table("person").unwrap().insert(&mut ann).unwrap();

    let mut values = row! { "age" => 31 };
    db.table("person")
        .unwrap()
        .update_where(&mut values, &row! { "first_name" => "Ann" })
        .unwrap();
    let loaded = db.table("person").unwrap().load(1).unwrap().unwrap();
    assert_eq!(loaded.get_int("age").unwrap(), 31);

    let err = db
        .table("person")
        .unwrap()
        .update_where(&mut values, &Row::new())
        .unwrap_err();
    assert!(matches!(err, Error::Update { .. }));
}

#[test]
fn test_save() {
    let mut db = database(Config::default(), PERSON_TABLE);

    let mut person = row! { "id" => 10, "first_name" => "Cy" };
    db.table("person").unwrap().save(&mut person).unwrap();
    person.insert("first_name", "Cyd");
    db.table("person").unwrap().save(&mut person).unwrap();

    let loaded = db.table("person").unwrap().load(10).unwrap().unwrap();
    assert_eq!(loaded.get_string("first_name").unwrap(), "Cyd");

    let mut fresh = row! { "first_name" => "Di" };
    let id = db.table("person").unwrap().save(&mut fresh).unwrap();
    assert_eq!(id, Some(Value::Integer(11)));
}

#[test]
fn test_delete() {
    let mut db = database(Config::default(), PERSON_TABLE);
    let mut person = row! { "first_name" => "Ed" };
    db.table("person").unwrap().insert(&mut person).unwrap();

    db.table("person").unwrap().delete_by_id(1).unwrap();
    assert!(db.table("person").unwrap().load(1).unwrap().is_none());

    let err = db.table("person").unwrap().delete_by_id(1).unwrap_err();
    assert!(matches!(err, Error::Delete { .. }));
}

#[test]
fn test_delete_with_revision() {
    let mut db = database(Config::new().with_revision_support("person"), PERSON_TABLE);
    let mut person = row! { "first_name" => "Ed" };
    db.table("person").unwrap().insert(&mut person).unwrap();

    let err = db.table("person").unwrap().delete_by_id(1).unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));

    let err = db
        .table("person")
        .unwrap()
        .delete(&row! { "id" => 1 })
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));

    let mut stale = person.clone();
    stale.insert("revision", 5);
    assert!(matches!(
        db.table("person").unwrap().delete(&stale),
        Err(Error::Delete { .. })
    ));

    db.table("person").unwrap().delete(&person).unwrap();
    assert!(db.table("person").unwrap().load(1).unwrap().is_none());
}

#[test]
fn test_validate() {
    let mut db = database(Config::default(), PERSON_TABLE);
    let table = db.table("person").unwrap();

    assert!(table
        .validate(&row! { "first_name" => "Ann", "age" => 3 })
        .is_empty());

    let errors = table.validate(&row! {
        "first_name" => "a name much longer than twenty",
        "age" => "old",
        "nickname" => "A",
    });
    assert_eq!(errors.len(), 3);
    assert!(matches!(
        errors["first_name"],
        ValidationError::StringTooLong { max: 20, .. }
    ));
    assert!(matches!(errors["age"], ValidationError::Type { .. }));
    assert!(matches!(errors["nickname"], ValidationError::Key { .. }));

    assert!(table.validate_value("age", &Value::Null).is_none());
}

#[test]
fn test_linked_row_rejects_invalid_values() {
    let mut db = database(Config::default(), PERSON_TABLE);
    let mut row = db.table("person").unwrap().new_row();
    row.put("first_name", "Fay").unwrap();
    assert!(row.put("age", "old").is_err());
    assert!(!row.contains_key("age"));

    let mut row = row.into_row();
    db.table("person").unwrap().insert(&mut row).unwrap();
}

#[test]
fn test_table_without_primary_key() {
    let mut db = database(
        Config::default(),
        &[
            "DROP TABLE IF EXISTS checks",
            "CREATE TABLE checks (yesno BOOLEAN)",
        ],
    );

    let mut row = row! { "yesno" => true };
    let id = db.table("checks").unwrap().insert(&mut row).unwrap();
    assert_eq!(id, None);

    let err = db.table("checks").unwrap().update(&mut row).unwrap_err();
    assert!(err
        .to_string()
        .contains("Can not update row without a primary key column."));

    let err = db.table("checks").unwrap().save(&mut row).unwrap_err();
    assert!(matches!(err, Error::DatabaseAccess { .. }));
}

#[test]
fn test_unknown_table_and_column() {
    let mut db = database(Config::default(), PERSON_TABLE);
    assert!(matches!(db.table("nope"), Err(Error::UnknownTable { .. })));

    let err = db
        .table("person")
        .unwrap()
        .insert(&mut row! { "nickname" => "A" })
        .unwrap_err();
    assert!(matches!(err, Error::Insert { .. }));
}

#[test]
fn test_ignored_columns() {
    let mut db = database(
        Config::new()
            .with_ignored_column("person", "age")
            .with_ignore_on_update("person", "first_name"),
        PERSON_TABLE,
    );

    let mut person = row! { "first_name" => "Gus", "age" => 40 };
    db.table("person").unwrap().insert(&mut person).unwrap();
    let loaded = db.table("person").unwrap().load(1).unwrap().unwrap();
    assert!(!loaded.contains_key("age"));

    // Nothing left to set: the update leaves the row alone
    person.insert("first_name", "Guy");
    db.table("person").unwrap().update(&mut person).unwrap();
    let loaded = db.table("person").unwrap().load(1).unwrap().unwrap();
    assert_eq!(loaded.get_string("first_name").unwrap(), "Gus");
}

#[test]
fn test_save_key_only_row_twice() {
    let mut db = database(Config::default(), PERSON_TABLE);
    let mut person = row! { "id" => 5 };
    let id = db.table("person").unwrap().save(&mut person).unwrap();
    assert_eq!(id, Some(Value::Integer(5)));
    let id = db.table("person").unwrap().save(&mut person).unwrap();
    assert_eq!(id, Some(Value::Integer(5)));
    assert!(db.table("person").unwrap().load(5).unwrap().is_some());

    let mut db = database(Config::new().with_revision_support("person"), PERSON_TABLE);
    let mut person = row! { "id" => 6 };
    db.table("person").unwrap().save(&mut person).unwrap();
    db.table("person").unwrap().save(&mut person).unwrap();
    assert_eq!(person.get_int("revision").unwrap(), 0);
}

#[test]
fn test_large_integers_round_trip() {
    let mut db = database(
        Config::default(),
        &[
            "DROP TABLE IF EXISTS ev",
            "CREATE TABLE ev (id INTEGER PRIMARY KEY, ts_millis INTEGER)",
        ],
    );
    let mut event = row! { "ts_millis" => 1_700_000_000_000_i64 };
    db.table("ev").unwrap().insert(&mut event).unwrap();

    let loaded = db.table("ev").unwrap().load(1).unwrap().unwrap();
    assert_eq!(loaded.get_long("ts_millis").unwrap(), 1_700_000_000_000);
}

#[test]
fn test_row_keys_match_column_names_exactly() {
    let mut db = database(Config::default(), PERSON_TABLE);
    let table = db.table("person").unwrap();
    let errors = table.validate(&row! { "FIRST_NAME" => "x" });
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors["FIRST_NAME"], ValidationError::Key { .. }));

    let err = db
        .table("person")
        .unwrap()
        .insert(&mut row! { "id" => 1, "ID" => 2 })
        .unwrap_err();
    assert!(matches!(err, Error::Insert { .. }));
}

#[test]
fn test_metadata_and_cache() {
    let mut db = database(Config::default(), PERSON_TABLE);
    let meta = db.table_metadata("person").unwrap();
    assert_eq!(meta.primary_key_name(), Some("id"));
    let described = meta.describe();
    assert_eq!(described.len(), 4);
    assert_eq!(described[1].display_name, "firstName");

    db.enable_revision_support("person", "revision").unwrap();
    assert!(db.table_metadata("person").unwrap().has_revision_support());

    db.reset_tables();
    assert!(!db.table_metadata("person").unwrap().has_revision_support());
}
