//! Access-layer configuration.

use std::collections::HashSet;
use std::sync::Arc;

use crate::connection::TableName;
use crate::convert::Converter;
use crate::naming::NamingConvention;

/// Default name of the optimistic-locking column.
pub const DEFAULT_REVISION_COLUMN: &str = "revision";

/// Configuration for a [`Database`](crate::Database).
///
/// Table names given here match either the bare or the schema-qualified
/// catalog name, ignoring ASCII case.
///
/// # Example
///
/// ```
/// use sqlrow::Config;
///
/// let config = Config::new()
///     .with_revision_support("person")
///     .with_ignored_column("person", "search_vector")
///     .with_ignore_on_update("person", "created_at");
/// assert_eq!(config.revision_column_for_name("person"), Some("revision"));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Identifier folding and display style.
    pub naming: NamingConvention,
    /// Revision column used by `with_revision_support`.
    pub default_revision_column: String,
    // (table, column) in declaration order
    revision_columns: Vec<(String, String)>,
    ignored_columns: HashSet<(String, String)>,
    ignore_on_update_columns: HashSet<(String, String)>,
    column_converters: Vec<(String, String, Arc<dyn Converter>)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            naming: NamingConvention::default(),
            default_revision_column: DEFAULT_REVISION_COLUMN.to_string(),
            revision_columns: Vec::new(),
            ignored_columns: HashSet::new(),
            ignore_on_update_columns: HashSet::new(),
            column_converters: Vec::new(),
        }
    }
}

fn key(table: &str, column: &str) -> (String, String) {
    (table.to_ascii_lowercase(), column.to_ascii_lowercase())
}

fn table_matches(configured: &str, table: &TableName) -> bool {
    configured.eq_ignore_ascii_case(&table.name)
        || configured.eq_ignore_ascii_case(&table.to_string())
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_default_revision_column(mut self, column: impl Into<String>) -> Self {
        self.default_revision_column = column.into();
        self
    }

    /// Enable optimistic locking for `table` using the default revision column.
    pub fn with_revision_support(self, table: impl Into<String>) -> Self {
        let column = self.default_revision_column.clone();
        self.with_revision_column(table, column)
    }

    /// Enable optimistic locking for `table` using `column`.
    pub fn with_revision_column(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        let table = table.into().to_ascii_lowercase();
        let column = column.into();
        match self.revision_columns.iter_mut().find(|(t, _)| *t == table) {
            Some(entry) => entry.1 = column,
            None => self.revision_columns.push((table, column)),
        }
        self
    }

    /// Never read or write `column` of `table`.
    pub fn with_ignored_column(mut self, table: &str, column: &str) -> Self {
        self.ignored_columns.insert(key(table, column));
        self
    }

    /// Leave `column` of `table` out of UPDATE statements.
    pub fn with_ignore_on_update(mut self, table: &str, column: &str) -> Self {
        self.ignore_on_update_columns.insert(key(table, column));
        self
    }

    /// Converter override for one column.
    pub fn with_column_converter(
        mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        converter: Arc<dyn Converter>,
    ) -> Self {
        self.column_converters
            .push((table.into(), column.into(), converter));
        self
    }

    /// Configured revision column for a table name as written in the configuration.
    pub fn revision_column_for_name(&self, table: &str) -> Option<&str> {
        self.revision_columns
            .iter()
            .find(|(configured, _)| configured.eq_ignore_ascii_case(table))
            .map(|(_, column)| column.as_str())
    }

    /// Configured revision column for a resolved table.
    ///
    /// A schema-qualified entry wins over a bare one; otherwise the first
    /// declared match applies.
    pub fn revision_column(&self, table: &TableName) -> Option<&str> {
        let qualified = table.to_string();
        self.revision_columns
            .iter()
            .find(|(configured, _)| configured.eq_ignore_ascii_case(&qualified))
            .or_else(|| {
                self.revision_columns
                    .iter()
                    .find(|(configured, _)| table_matches(configured, table))
            })
            .map(|(_, column)| column.as_str())
    }

    pub fn is_ignored(&self, table: &TableName, column: &str) -> bool {
        Self::contains(&self.ignored_columns, table, column)
    }

    pub fn is_ignored_on_update(&self, table: &TableName, column: &str) -> bool {
        Self::contains(&self.ignore_on_update_columns, table, column)
    }

    pub(crate) fn column_converters(&self) -> impl Iterator<Item = &(String, String, Arc<dyn Converter>)> {
        self.column_converters.iter()
    }

    fn contains(set: &HashSet<(String, String)>, table: &TableName, column: &str) -> bool {
        set.iter()
            .any(|(t, c)| c.eq_ignore_ascii_case(column) && table_matches(t, table))
    }
}
