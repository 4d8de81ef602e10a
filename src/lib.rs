//! Typed SQL access for Rust
//!
//! `sqlrow` sits between application code and a database connection. It
//! reads table metadata from the live schema, converts values in both
//! directions through a converter registry, parses SQL annotated with inline
//! parameter and type directives, and offers row-level CRUD with optional
//! optimistic locking.
//!
//! # Example
//!
//! ```no_run
//! use sqlrow::backend::sqlite::SqliteConnection;
//! use sqlrow::{row, Config, Database, Result};
//!
//! fn main() -> Result<()> {
//!     let conn = SqliteConnection::open_in_memory()?;
//!     let mut db = Database::with_config(conn, Config::new().with_revision_support("person"));
//!     db.execute_sql(
//!         "CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT, revision INT DEFAULT 0)",
//!     )?;
//!
//!     // Insert; the generated id and initial revision are written back
//!     let mut person = row! { "name" => "Ann" };
//!     let id = db.table("person")?.insert(&mut person)?;
//!
//!     // Annotated query: the parameter name is inferred from `name =`
//!     let stmt = db.statement("SELECT id /*:long*/, name FROM person WHERE name = /*=*/ 'x' /**/;")?;
//!     for row in db.query(&stmt, &row! { "name" => "Ann" })? {
//!         println!("{} {:?}", row?, id);
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod connection;
pub mod convert;
pub mod cursor;
pub mod database;
pub mod error;
pub mod naming;
pub mod row;
pub mod statement;
pub mod table;
pub mod tree;
pub mod types;
pub mod validation;

// Re-export main types
pub use config::Config;
pub use connection::{BufferedCursor, ColumnDescriptor, Connection, CursorColumn, RawCursor, TableName};
pub use convert::{Converter, ConverterRegistry};
pub use cursor::RowCursor;
pub use database::Database;
pub use error::{Error, Result};
pub use naming::{DisplayStyle, FoldCase, NamingConvention};
pub use row::{FromRow, FromValue, Row};
pub use statement::{BoundStatement, SqlFile, StatementKind, StatementTemplate};
pub use table::{Column, LinkedRow, Table, TableMetadata};
pub use tree::{rows_to_tree, TreeRow};
pub use types::{HostKind, SqlType, Value};
pub use validation::ValidationError;
