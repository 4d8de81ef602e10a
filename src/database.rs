//! High-level database context.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::connection::Connection;
use crate::convert::ConverterRegistry;
use crate::cursor::RowCursor;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::statement::{BoundStatement, Executor, SqlFile, StatementTemplate};
use crate::table::{Table, TableCache, TableMetadata};

/// Owns a connection together with the converter registry, the
/// configuration and the table metadata cache.
///
/// Table metadata is read on first use and kept until
/// [`reset_tables`](Self::reset_tables).
pub struct Database<C: Connection> {
    /// Connection from the external provider.
    conn: C,
    /// Access-layer configuration.
    config: Config,
    /// Converters by SQL type, host kind and column.
    registry: ConverterRegistry,
    /// Loaded table metadata.
    tables: TableCache,
}

impl<C: Connection> Database<C> {
    /// Wrap a connection with the default configuration.
    pub fn new(conn: C) -> Self {
        Self::with_config(conn, Config::default())
    }

    /// Wrap a connection. Column converters from `config` are installed into the registry.
    pub fn with_config(conn: C, config: Config) -> Self {
        let mut registry = ConverterRegistry::new();
        for (table, column, converter) in config.column_converters() {
            registry.register_column(table.clone(), column.clone(), Arc::clone(converter));
        }
        Self {
            conn,
            config,
            registry,
            tables: TableCache::new(),
        }
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    /// Release the connection.
    pub fn into_inner(self) -> C {
        self.conn
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// Mutable registry. Tables loaded before a change keep their converters
    /// until [`reset_tables`](Self::reset_tables).
    pub fn registry_mut(&mut self) -> &mut ConverterRegistry {
        &mut self.registry
    }

    /// Data access for a table, reading its metadata on first use.
    pub fn table(&mut self, name: &str) -> Result<Table<'_>> {
        let meta = self
            .tables
            .get_or_load(&mut self.conn, &self.registry, &self.config, name)?;
        Ok(Table::new(meta, &mut self.conn))
    }

    pub fn table_metadata(&mut self, name: &str) -> Result<Arc<TableMetadata>> {
        self.tables
            .get_or_load(&mut self.conn, &self.registry, &self.config, name)
    }

    /// Use `column` of `table` for optimistic locking.
    pub fn enable_revision_support(&mut self, table: &str, column: &str) -> Result<()> {
        self.tables.enable_revision_support(
            &mut self.conn,
            &self.registry,
            &self.config,
            table,
            column,
        )
    }

    /// Forget all loaded table metadata.
    pub fn reset_tables(&mut self) {
        self.tables.reset();
    }

    /// Parse an annotated statement with the configured naming convention.
    pub fn statement(&self, sql: &str) -> Result<StatementTemplate> {
        StatementTemplate::parse_with(sql, self.config.naming)
    }

    pub fn load_sql_file(&self, path: impl AsRef<Path>) -> Result<SqlFile> {
        SqlFile::load(path, self.config.naming)
    }

    pub fn parse_sql_file(&self, name: &str, content: &str) -> Result<SqlFile> {
        SqlFile::parse(name, content, self.config.naming)
    }

    /// Bind parameters without executing.
    pub fn bind(&self, template: &StatementTemplate, params: &Row) -> Result<BoundStatement> {
        Executor::new(&self.registry)
            .with_tables(&self.tables)
            .bind(template, params)
    }

    /// Execute a command, returning the affected-row count.
    pub fn execute(&mut self, template: &StatementTemplate, params: &Row) -> Result<u64> {
        let executor = Executor::new(&self.registry).with_tables(&self.tables);
        let bound = executor.bind(template, params)?;
        executor.execute(&mut self.conn, &bound)
    }

    /// Run a query. The cursor borrows the connection until it is dropped.
    pub fn query(&mut self, template: &StatementTemplate, params: &Row) -> Result<RowCursor<'_>> {
        let executor = Executor::new(&self.registry).with_tables(&self.tables);
        let bound = executor.bind(template, params)?;
        executor.query(&mut self.conn, &bound)
    }

    /// Run raw SQL without directives or parameters.
    pub fn execute_sql(&mut self, sql: &str) -> Result<u64> {
        debug!(sql = %sql, "Executing raw SQL");
        self.conn.execute(sql, &[]).map_err(Error::into_access)
    }
}

impl<C: Connection + std::fmt::Debug> std::fmt::Debug for Database<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("conn", &self.conn)
            .field("config", &self.config)
            .field("tables", &self.tables.len())
            .finish()
    }
}
