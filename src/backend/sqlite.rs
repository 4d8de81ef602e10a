//! SQLite connection over rusqlite.
//!
//! Schemas are the attached databases (`main`, `temp`, ...). Column types
//! come from the declared type text using SQLite's affinity rules.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, OptionalExtension};
use tracing::{debug, trace};

use crate::connection::{BufferedCursor, ColumnDescriptor, Connection, CursorColumn, RawCursor, TableName};
use crate::error::{Error, Result};
use crate::naming::quote_identifier;
use crate::types::{SqlType, Value};

/// A blocking SQLite session.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    last_insert: bool,
}

fn sqlite_error(context: &str, err: rusqlite::Error) -> Error {
    Error::database_with_source(format!("{}: {}", context, err), err)
}

impl SqliteConnection {
    /// Open or create a database file. `":memory:"` opens a private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening SQLite database");
        let conn = rusqlite::Connection::open(path).map_err(|e| sqlite_error("open", e))?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(|e| sqlite_error("open", e))?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self {
            conn,
            last_insert: false,
        }
    }

    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }

    pub fn inner_mut(&mut self) -> &mut rusqlite::Connection {
        &mut self.conn
    }

    fn schemas(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("PRAGMA database_list")
            .map_err(|e| sqlite_error("database_list", e))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(|e| sqlite_error("database_list", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| sqlite_error("database_list", e))?;
        Ok(names)
    }

    fn table_info(&self, table: &TableName) -> Result<Vec<TableInfoRow>> {
        let sql = match &table.schema {
            Some(schema) => format!(
                "PRAGMA {}.table_info({})",
                quote_identifier(schema),
                quote_identifier(&table.name)
            ),
            None => format!("PRAGMA table_info({})", quote_identifier(&table.name)),
        };
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| sqlite_error("table_info", e))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TableInfoRow {
                    name: row.get(1)?,
                    declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    not_null: row.get::<_, i64>(3)? != 0,
                    pk: row.get(5)?,
                })
            })
            .map_err(|e| sqlite_error("table_info", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| sqlite_error("table_info", e))?;
        Ok(rows)
    }
}

/// One `PRAGMA table_info` entry.
struct TableInfoRow {
    name: String,
    declared_type: String,
    not_null: bool,
    pk: i64,
}

/// SQL type and size for a declared column type.
pub(crate) fn declared_type(declared: &str) -> (SqlType, Option<u32>) {
    let upper = declared.trim().to_ascii_uppercase();
    let size = upper
        .split_once('(')
        .and_then(|(_, rest)| rest.split([',', ')']).next())
        .and_then(|n| n.trim().parse::<u32>().ok());

    let sql_type = if upper.is_empty() || upper.contains("BLOB") {
        SqlType::Blob
    } else if upper.contains("INT") {
        // INTEGER affinity stores up to 64 bits
        SqlType::BigInt
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        if size.is_some() {
            SqlType::Varchar
        } else {
            SqlType::LongVarchar
        }
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        SqlType::Double
    } else if upper.starts_with("BOOL") {
        SqlType::Boolean
    } else if upper.starts_with("DATETIME") || upper.starts_with("TIMESTAMP") {
        SqlType::Timestamp
    } else if upper.starts_with("DATE") {
        SqlType::Date
    } else if upper.starts_with("TIME") {
        SqlType::Time
    } else {
        SqlType::Decimal
    };
    let size = matches!(sql_type, SqlType::Varchar).then_some(size).flatten();
    (sql_type, size)
}

fn to_sqlite(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Integer(v) => SqliteValue::Integer(*v),
        Value::Double(v) => SqliteValue::Real(*v),
        Value::Decimal(v) => SqliteValue::Text(v.to_string()),
        Value::Bool(v) => SqliteValue::Integer(i64::from(*v)),
        Value::Text(v) => SqliteValue::Text(v.clone()),
        Value::Date(v) => SqliteValue::Text(format_date(v)),
        Value::Time(v) => SqliteValue::Text(v.format("%H:%M:%S%.f").to_string()),
        Value::Timestamp(v) => SqliteValue::Text(format_timestamp(v)),
        Value::Binary(v) => SqliteValue::Blob(v.to_vec()),
    }
}

fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Double(v),
        ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::Binary(bytes::Bytes::copy_from_slice(v)),
    }
}

fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("insert"))
}

impl Connection for SqliteConnection {
    fn find_tables(&mut self, schema: Option<&str>, table: &str) -> Result<Vec<TableName>> {
        let schemas = match schema {
            Some(schema) => vec![schema.to_string()],
            None => self.schemas()?,
        };
        let mut found = Vec::new();
        for schema in schemas {
            let sql = format!(
                "SELECT name FROM {}.sqlite_master \
                 WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE",
                quote_identifier(&schema)
            );
            let name: Option<String> = self
                .conn
                .query_row(&sql, [table], |row| row.get(0))
                .optional()
                .map_err(|e| sqlite_error("find_tables", e))?;
            if let Some(name) = name {
                found.push(TableName::new(Some(schema), name));
            }
        }
        Ok(found)
    }

    fn primary_key_columns(&mut self, table: &TableName) -> Result<Vec<String>> {
        let mut keys: Vec<TableInfoRow> = self
            .table_info(table)?
            .into_iter()
            .filter(|c| c.pk > 0)
            .collect();
        keys.sort_by_key(|c| c.pk);
        Ok(keys.into_iter().map(|c| c.name).collect())
    }

    fn columns(&mut self, table: &TableName) -> Result<Vec<ColumnDescriptor>> {
        Ok(self
            .table_info(table)?
            .into_iter()
            .map(|c| {
                let (sql_type, size) = declared_type(&c.declared_type);
                ColumnDescriptor::new(c.name, sql_type, size, !c.not_null && c.pk == 0)
            })
            .collect())
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let values: Vec<SqliteValue> = params.iter().map(to_sqlite).collect();
        let affected = self
            .conn
            .execute(sql, params_from_iter(values))
            .map_err(|e| sqlite_error("execute", e))?;
        self.last_insert = is_insert(sql) && affected > 0;
        Ok(affected as u64)
    }

    fn generated_key(&mut self) -> Result<Option<Value>> {
        if !self.last_insert {
            return Ok(None);
        }
        let rowid = self.conn.last_insert_rowid();
        trace!(rowid, "Last insert rowid");
        Ok(Some(Value::Integer(rowid)))
    }

    fn query<'c>(&'c mut self, sql: &str, params: &[Value]) -> Result<Box<dyn RawCursor + 'c>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| sqlite_error("prepare", e))?;
        let columns: Vec<CursorColumn> = stmt
            .columns()
            .iter()
            .map(|c| {
                let sql_type = c.decl_type().map(|t| declared_type(t).0);
                CursorColumn::new(c.name(), sql_type)
            })
            .collect();

        let values: Vec<SqliteValue> = params.iter().map(to_sqlite).collect();
        let mut rows = stmt
            .query(params_from_iter(values))
            .map_err(|e| sqlite_error("query", e))?;
        let mut buffered = Vec::new();
        while let Some(row) = rows.next().map_err(|e| sqlite_error("fetch", e))? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                let value = row.get_ref(idx).map_err(|e| sqlite_error("fetch", e))?;
                values.push(from_sqlite(value));
            }
            buffered.push(values);
        }
        Ok(Box::new(BufferedCursor::new(columns, buffered)))
    }
}
