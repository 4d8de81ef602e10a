//! Parameter binding and statement execution.

use std::sync::Arc;

use tracing::debug;

use super::template::{ResultColumn, StatementKind, StatementTemplate};
use crate::connection::{Connection, CursorColumn};
use crate::convert::{Converter, ConverterRegistry};
use crate::cursor::{OutputColumn, RowCursor};
use crate::error::{Error, Result};
use crate::row::Row;
use crate::table::TableCache;
use crate::types::{HostKind, Value};

/// SQL text with every placeholder resolved to a concrete value.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    sql: String,
    params: Vec<Value>,
    kind: StatementKind,
    result_columns: Vec<ResultColumn>,
    primary_table: Option<String>,
}

impl BoundStatement {
    /// Bound statement for generated SQL; parameters are set afterwards.
    pub fn new(sql: impl Into<String>, kind: StatementKind) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
            kind,
            result_columns: Vec::new(),
            primary_table: None,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound values in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Set the value of placeholder `position` (0-based).
    pub fn set_param(&mut self, position: usize, value: Value) {
        if position >= self.params.len() {
            self.params.resize(position + 1, Value::Null);
        }
        self.params[position] = value;
    }

    /// Append a value after the last placeholder set so far.
    pub fn push_param(&mut self, value: Value) {
        self.params.push(value);
    }
}

/// Binds parameter rows and runs statements on a connection.
pub struct Executor<'a> {
    registry: &'a ConverterRegistry,
    tables: Option<&'a TableCache>,
}

impl<'a> Executor<'a> {
    pub fn new(registry: &'a ConverterRegistry) -> Self {
        Self {
            registry,
            tables: None,
        }
    }

    /// Use already loaded table metadata to pick parameter and column converters.
    pub fn with_tables(mut self, tables: &'a TableCache) -> Self {
        self.tables = Some(tables);
        self
    }

    /// Bind a parameter row to a template.
    ///
    /// A parameter value is looked up by key first, then by display name.
    pub fn bind(&self, template: &StatementTemplate, params: &Row) -> Result<BoundStatement> {
        let mut bound = BoundStatement {
            sql: template.sql.clone(),
            params: Vec::with_capacity(template.placeholders.len()),
            kind: template.kind,
            result_columns: template.result_columns.clone(),
            primary_table: template.primary_table.clone(),
        };

        for (position, key) in template.placeholders.iter().enumerate() {
            let param = template
                .parameter(key)
                .ok_or_else(|| Error::MissingParameter { name: key.clone() })?;
            let value = params
                .get(&param.key)
                .or_else(|| params.get(&param.display_name))
                .ok_or_else(|| Error::MissingParameter {
                    name: param.key.clone(),
                })?;

            match self.parameter_converter(template, key, param.host_kind, value) {
                Some(conv) => conv.set_value(&mut bound, position, value)?,
                None => bound.set_param(position, Value::Null),
            }
        }

        Ok(bound)
    }

    /// Converter for one parameter: explicit override, cached table column,
    /// declared kind, then the value's own kind.
    fn parameter_converter(
        &self,
        template: &StatementTemplate,
        key: &str,
        declared: Option<HostKind>,
        value: &Value,
    ) -> Option<Arc<dyn Converter>> {
        template
            .parameter_converter(key)
            .or_else(|| self.table_column_converter(key, template.primary_table.as_deref()))
            .or_else(|| declared.and_then(|kind| self.registry.for_host_kind(kind).ok()))
            .or_else(|| self.registry.for_value(value))
    }

    /// Converter of the cached column named by `table.column`, or by a bare
    /// column name in the statement's primary table.
    fn table_column_converter(&self, key: &str, primary: Option<&str>) -> Option<Arc<dyn Converter>> {
        let tables = self.tables?;
        let (table, column) = match key.rsplit_once('.') {
            Some((table, column)) => (table, column),
            None => (primary?, key),
        };
        let meta = tables.peek(table)?;
        meta.resolve_identifier(column).map(|c| c.converter().clone())
    }

    /// Execute a command, returning the affected-row count.
    pub fn execute(&self, conn: &mut dyn Connection, bound: &BoundStatement) -> Result<u64> {
        debug!(sql = %bound.sql, params = bound.params.len(), "Executing statement");
        conn.execute(&bound.sql, &bound.params)
            .map_err(Error::into_access)
    }

    /// Run a query. Rows are produced lazily; dropping the cursor releases it.
    pub fn query<'c>(
        &self,
        conn: &'c mut dyn Connection,
        bound: &BoundStatement,
    ) -> Result<RowCursor<'c>> {
        debug!(sql = %bound.sql, params = bound.params.len(), "Executing query");
        let raw = conn
            .query(&bound.sql, &bound.params)
            .map_err(Error::into_access)?;
        let outputs = self.output_columns(bound, raw.columns());
        Ok(RowCursor::new(raw, outputs))
    }

    /// Row key and converter for each result column.
    ///
    /// Typed result columns are matched by label in order. Other columns use
    /// the primary table's cached column converter or their declared type.
    fn output_columns(&self, bound: &BoundStatement, columns: &[CursorColumn]) -> Vec<OutputColumn> {
        let mut used = vec![false; bound.result_columns.len()];
        let table = bound
            .primary_table
            .as_deref()
            .and_then(|name| self.tables.and_then(|t| t.peek(name)));

        columns
            .iter()
            .map(|column| {
                let typed = bound
                    .result_columns
                    .iter()
                    .enumerate()
                    .find(|(i, rc)| !used[*i] && rc.label.eq_ignore_ascii_case(&column.name));
                if let Some((i, rc)) = typed {
                    used[i] = true;
                    return OutputColumn {
                        key: Some(rc.key.clone()),
                        converter: self.registry.for_host_kind(rc.host_kind).ok(),
                    };
                }
                let converter = table
                    .as_ref()
                    .and_then(|meta| meta.resolve_identifier(&column.name))
                    .map(|c| c.converter().clone())
                    .or_else(|| {
                        column
                            .sql_type
                            .and_then(|t| self.registry.resolve(t, None).ok())
                    });
                OutputColumn {
                    key: None,
                    converter,
                }
            })
            .collect()
    }
}
