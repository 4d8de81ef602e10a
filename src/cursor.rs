//! Lazy row sequence over an open query cursor.
//!
//! `RowCursor` wraps the raw driver cursor and turns each fetched value list
//! into a [`Row`], applying the output converter of every typed result
//! column. It holds the connection borrow for its lifetime, so only one
//! cursor per connection can be open at a time.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::connection::{CursorColumn, RawCursor};
use crate::convert::Converter;
use crate::error::Result;
use crate::row::{FromRow, Row};
use crate::types::Value;

/// Forward-only, finite sequence of converted rows.
///
/// # Lifecycle
///
/// 1. Created by a statement query
/// 2. Iterated via `Iterator::next`, `fetch_all()` or `first()`
/// 3. Closed when exhausted, on the first driver error, by `close()`, or on drop
///
/// # Example
///
/// ```no_run
/// use sqlrow::backend::sqlite::SqliteConnection;
/// use sqlrow::{row, Database};
///
/// fn main() -> sqlrow::Result<()> {
///     let mut db = Database::new(SqliteConnection::open_in_memory()?);
///     let stmt = db.statement("SELECT id, name FROM person WHERE name = /*=*/ 'x' /**/;")?;
///     for person in db.query(&stmt, &row! { "name" => "cus1" })? {
///         println!("{}", person?);
///     }
///     Ok(())
/// }
/// ```
pub struct RowCursor<'c> {
    /// Driver cursor, `None` once closed.
    inner: Option<Box<dyn RawCursor + 'c>>,
    /// Result columns captured at open time.
    columns: Vec<CursorColumn>,
    /// Row key per result column.
    keys: Vec<String>,
    /// Output converter per result column.
    converters: Vec<Option<Arc<dyn Converter>>>,
    /// Rows produced so far.
    rows_fetched: u64,
}

/// How one result column is turned into a row entry.
#[derive(Debug, Clone, Default)]
pub(crate) struct OutputColumn {
    /// Row key; the column label when `None`.
    pub key: Option<String>,
    /// Converter applied to every value; values pass through when `None`.
    pub converter: Option<Arc<dyn Converter>>,
}

impl<'c> RowCursor<'c> {
    /// Wrap a driver cursor. `outputs` is aligned with the cursor's columns;
    /// missing entries use the column label and leave values unconverted.
    pub(crate) fn new(inner: Box<dyn RawCursor + 'c>, mut outputs: Vec<OutputColumn>) -> Self {
        let columns = inner.columns().to_vec();
        outputs.resize_with(columns.len(), OutputColumn::default);
        let (keys, converters) = columns
            .iter()
            .zip(outputs)
            .map(|(column, out)| (out.key.unwrap_or_else(|| column.name.clone()), out.converter))
            .unzip();
        Self {
            inner: Some(inner),
            columns,
            keys,
            converters,
            rows_fetched: 0,
        }
    }

    /// Result column metadata.
    pub fn columns(&self) -> &[CursorColumn] {
        &self.columns
    }

    /// Result column labels as reported by the database.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Keys of produced rows, one per result column.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Number of rows produced so far.
    pub fn rowcount(&self) -> u64 {
        self.rows_fetched
    }

    /// Check if the underlying cursor has been released.
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Release the underlying cursor. Further iteration yields nothing.
    pub fn close(&mut self) -> Result<()> {
        match self.inner.take() {
            Some(mut inner) => {
                trace!(rows = self.rows_fetched, "Closing cursor");
                inner.close()
            }
            None => Ok(()),
        }
    }

    /// First row, closing the cursor afterwards.
    pub fn first(mut self) -> Result<Option<Row>> {
        let row = self.next().transpose()?;
        self.close()?;
        Ok(row)
    }

    /// All remaining rows. The cursor is closed after this call.
    pub fn fetch_all(mut self) -> Result<Vec<Row>> {
        let rows = self.by_ref().collect::<Result<Vec<_>>>()?;
        self.close()?;
        Ok(rows)
    }

    /// Read every row into a typed record.
    pub fn map_into<T: FromRow + 'c>(self) -> impl Iterator<Item = Result<T>> + 'c {
        self.map(|row| row.and_then(|r| T::from_row(&r)))
    }

    fn convert(&self, values: Vec<Value>) -> Result<Row> {
        let mut row = Row::new();
        for (idx, value) in values.into_iter().enumerate() {
            let Some(key) = self.keys.get(idx) else {
                break;
            };
            let value = match self.converters.get(idx).and_then(Option::as_ref) {
                Some(conv) => conv.from_sql(value)?,
                None => value,
            };
            row.insert(key.clone(), value);
        }
        Ok(row)
    }

    fn release(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to close cursor");
        }
    }
}

impl Iterator for RowCursor<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let inner = self.inner.as_mut()?;
        match inner.next_row() {
            Ok(Some(values)) => {
                self.rows_fetched += 1;
                Some(self.convert(values))
            }
            Ok(None) => {
                self.release();
                None
            }
            Err(e) => {
                self.release();
                Some(Err(e))
            }
        }
    }
}

impl Drop for RowCursor<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
