//! Table metadata cache owned by a database context.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::metadata::TableMetadata;
use crate::config::Config;
use crate::connection::{Connection, TableName};
use crate::convert::ConverterRegistry;
use crate::error::Result;

/// Loaded table metadata, keyed by resolved table name.
///
/// Entries are read on first access and kept until [`reset`](Self::reset).
#[derive(Debug, Default)]
pub struct TableCache {
    tables: HashMap<TableName, Arc<TableMetadata>>,
    // Requested name (lower case) -> resolved name
    aliases: HashMap<String, TableName>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metadata for `name`, reading the catalog on a miss.
    pub fn get_or_load(
        &mut self,
        conn: &mut dyn Connection,
        registry: &ConverterRegistry,
        config: &Config,
        name: &str,
    ) -> Result<Arc<TableMetadata>> {
        if let Some(meta) = self.peek(name) {
            return Ok(meta);
        }
        let meta = Arc::new(TableMetadata::load(conn, registry, config, name)?);
        let resolved = meta.name().clone();
        debug!(requested = name, table = %resolved, "Cached table metadata");
        self.aliases.insert(name.to_ascii_lowercase(), resolved.clone());
        self.tables.insert(resolved, Arc::clone(&meta));
        Ok(meta)
    }

    /// Cached metadata without touching the catalog.
    ///
    /// Matches a previously requested name, a qualified `schema.table` or a
    /// bare table name, ignoring ASCII case. A bare name cached under more
    /// than one schema is not a hit.
    pub fn peek(&self, name: &str) -> Option<Arc<TableMetadata>> {
        if let Some(resolved) = self.aliases.get(&name.to_ascii_lowercase()) {
            return self.tables.get(resolved).cloned();
        }
        let wanted = TableName::parse(name);
        let mut matches = self.tables.iter().filter(|(table, _)| {
            table.name.eq_ignore_ascii_case(&wanted.name)
                && match (&wanted.schema, &table.schema) {
                    (None, _) => true,
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                    (Some(_), None) => false,
                }
        });
        // More than one match is left to the catalog to report as ambiguous
        match (matches.next(), matches.next()) {
            (Some((_, meta)), None) => Some(Arc::clone(meta)),
            _ => None,
        }
    }

    /// Enable revision support on a table, loading it if needed.
    pub fn enable_revision_support(
        &mut self,
        conn: &mut dyn Connection,
        registry: &ConverterRegistry,
        config: &Config,
        table: &str,
        column: &str,
    ) -> Result<()> {
        let meta = self.get_or_load(conn, registry, config, table)?;
        let mut updated = (*meta).clone();
        updated.enable_revision_support(column)?;
        self.tables.insert(updated.name().clone(), Arc::new(updated));
        Ok(())
    }

    /// Forget every cached table.
    pub fn reset(&mut self) {
        debug!(tables = self.tables.len(), "Reset table metadata cache");
        self.tables.clear();
        self.aliases.clear();
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
