//! Connection interface consumed from the external connection provider.
//!
//! The access layer never opens or pools connections itself. Anything that
//! can introspect a catalog, run positional-placeholder SQL and hand back a
//! forward-only cursor can be plugged in by implementing [`Connection`].

use std::collections::VecDeque;
use std::fmt;

use crate::error::Result;
use crate::types::{SqlType, Value};

/// Schema-qualified table name as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    /// Resolved schema, if the database has schemas.
    pub schema: Option<String>,
    /// Table name exactly as stored in the catalog.
    pub name: String,
}

impl TableName {
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
        }
    }

    /// Split `schema.table` at the first dot.
    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once('.') {
            Some((schema, name)) => Self::new(Some(schema.to_string()), name),
            None => Self::new(None, qualified),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One catalog column entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name as stored in the catalog.
    pub name: String,
    /// Declared SQL type.
    pub sql_type: SqlType,
    /// Declared size (character length or precision), if any.
    pub size: Option<u32>,
    /// Whether NULL is allowed.
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, sql_type: SqlType, size: Option<u32>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            sql_type,
            size,
            nullable,
        }
    }
}

/// Result-set column as reported by an open cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorColumn {
    /// Column label exactly as the database reports it.
    pub name: String,
    /// Declared type, when the driver knows it.
    pub sql_type: Option<SqlType>,
}

impl CursorColumn {
    pub fn new(name: impl Into<String>, sql_type: Option<SqlType>) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

/// Forward-only cursor over raw result rows.
///
/// Implementations release the server-side cursor in `close`; closing twice
/// is a no-op.
pub trait RawCursor {
    /// Result columns, in select-list order.
    fn columns(&self) -> &[CursorColumn];

    /// Next row, `Ok(None)` when exhausted.
    fn next_row(&mut self) -> Result<Option<Vec<Value>>>;

    /// Release the cursor.
    fn close(&mut self) -> Result<()>;

    /// Check if the cursor has been closed.
    fn is_closed(&self) -> bool;
}

/// A live database session.
///
/// All calls block. The layer assumes one connection per operation sequence
/// and never shares it across threads.
pub trait Connection {
    /// Catalog lookup of tables named `table`, optionally restricted to `schema`.
    ///
    /// Name matching follows the database's own identifier rules.
    fn find_tables(&mut self, schema: Option<&str>, table: &str) -> Result<Vec<TableName>>;

    /// Primary-key columns of a table, in key order. Empty when there is none.
    fn primary_key_columns(&mut self, table: &TableName) -> Result<Vec<String>>;

    /// All columns of a table in catalog order.
    fn columns(&mut self, table: &TableName) -> Result<Vec<ColumnDescriptor>>;

    /// Execute a command with positional `?` parameters, returning the affected-row count.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Key generated by the last INSERT on this connection, if any.
    fn generated_key(&mut self) -> Result<Option<Value>>;

    /// Run a query with positional `?` parameters.
    fn query<'c>(&'c mut self, sql: &str, params: &[Value]) -> Result<Box<dyn RawCursor + 'c>>;
}

/// Cursor over rows that were already fetched into memory.
///
/// Used by drivers whose native cursor cannot outlive the call that created
/// it, and by test doubles.
#[derive(Debug, Default)]
pub struct BufferedCursor {
    columns: Vec<CursorColumn>,
    rows: VecDeque<Vec<Value>>,
    closed: bool,
}

impl BufferedCursor {
    pub fn new(columns: Vec<CursorColumn>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            closed: false,
        }
    }

    /// Number of rows not yet returned.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RawCursor for BufferedCursor {
    fn columns(&self) -> &[CursorColumn] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) -> Result<()> {
        self.rows.clear();
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_parse() {
        let name = TableName::parse("public.person");
        assert_eq!(name.schema.as_deref(), Some("public"));
        assert_eq!(name.name, "person");
        assert_eq!(name.to_string(), "public.person");

        let name = TableName::parse("person");
        assert_eq!(name.schema, None);
        assert_eq!(name.to_string(), "person");
    }

    #[test]
    fn test_buffered_cursor() {
        let mut cursor = BufferedCursor::new(
            vec![CursorColumn::new("id", Some(SqlType::Integer))],
            vec![vec![Value::Integer(1)], vec![Value::Integer(2)]],
        );
        assert_eq!(cursor.columns().len(), 1);
        assert_eq!(cursor.next_row().unwrap(), Some(vec![Value::Integer(1)]));
        assert_eq!(cursor.remaining(), 1);
        cursor.close().unwrap();
        assert!(cursor.is_closed());
        assert_eq!(cursor.next_row().unwrap(), None);
        // Closing twice is fine
        cursor.close().unwrap();
    }
}
