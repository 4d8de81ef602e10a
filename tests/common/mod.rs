//! Shared fixtures for the integration tests.
//!
//! `tests/.env` may set `SQLROW_SQLITE_PATH` to run against a database file
//! instead of a private in-memory database.

#![allow(dead_code)]

use sqlrow::backend::sqlite::SqliteConnection;
use sqlrow::{Config, Database};
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn database_path() -> String {
    dotenvy::from_path("tests/.env").ok();
    std::env::var("SQLROW_SQLITE_PATH").unwrap_or_else(|_| ":memory:".to_string())
}

/// Open a database and run `schema` (one statement per entry).
pub fn database(config: Config, schema: &[&str]) -> Database<SqliteConnection> {
    init_tracing();
    let conn = SqliteConnection::open(database_path()).unwrap();
    let mut db = Database::with_config(conn, config);
    for sql in schema {
        db.execute_sql(sql).unwrap();
    }
    db
}

pub const PERSON_TABLE: &[&str] = &[
    "DROP TABLE IF EXISTS person",
    "CREATE TABLE person (
        id INTEGER PRIMARY KEY,
        first_name VARCHAR(20),
        age INT,
        revision INT NOT NULL DEFAULT 0
    )",
];

pub const PERSON_ADDRESS_TABLES: &[&str] = &[
    "DROP TABLE IF EXISTS person",
    "DROP TABLE IF EXISTS address",
    "CREATE TABLE person (id INT PRIMARY KEY, name TEXT)",
    "INSERT INTO person (id, name) VALUES (1, 'person1')",
    "INSERT INTO person (id, name) VALUES (2, 'person2')",
    "CREATE TABLE address (id INT PRIMARY KEY, person_id INT, city TEXT)",
    "INSERT INTO address (id, person_id, city) VALUES (1, 1, 'city1')",
    "INSERT INTO address (id, person_id, city) VALUES (2, 1, 'city2')",
    "INSERT INTO address (id, person_id, city) VALUES (3, 2, 'city3')",
    "INSERT INTO address (id, person_id, city) VALUES (4, 2, 'city4')",
];
