//! Table metadata read from the live schema.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::column::Column;
use crate::config::Config;
use crate::connection::{Connection, TableName};
use crate::convert::ConverterRegistry;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::types::{HostKind, SqlType, Value};
use crate::validation::ValidationError;

/// Column summary handed to code generators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    pub display_name: String,
    pub sql_type: SqlType,
    pub host_kind: HostKind,
    pub nullable: bool,
    pub primary_key: bool,
}

/// Schema model of one table: columns in catalog order, optional primary
/// key and optional revision column.
#[derive(Debug, Clone)]
pub struct TableMetadata {
    name: TableName,
    columns: Vec<Column>,
    primary_key: Option<String>,
    revision: Option<String>,
}

impl TableMetadata {
    /// Build metadata from columns. A primary key must name one of the columns.
    pub fn new(name: TableName, columns: Vec<Column>, primary_key: Option<String>) -> Result<Self> {
        let mut meta = Self {
            name,
            columns,
            primary_key: None,
            revision: None,
        };
        if let Some(pk) = primary_key {
            let column = meta.require_column(&pk)?.name().to_string();
            meta.primary_key = Some(column);
        }
        Ok(meta)
    }

    /// Read a table from the catalog.
    ///
    /// `name` may be schema-qualified (`schema.table`). Exactly one table must match.
    pub fn load(
        conn: &mut dyn Connection,
        registry: &ConverterRegistry,
        config: &Config,
        name: &str,
    ) -> Result<Self> {
        let requested = TableName::parse(name);
        let mut matches = conn
            .find_tables(requested.schema.as_deref(), &requested.name)
            .map_err(Error::into_access)?;
        let table = match matches.len() {
            0 => {
                return Err(Error::UnknownTable {
                    name: name.to_string(),
                })
            }
            1 => matches.remove(0),
            n => {
                return Err(Error::AmbiguousTable {
                    name: name.to_string(),
                    matches: n,
                })
            }
        };

        // First key column is authoritative
        let primary_key = conn
            .primary_key_columns(&table)
            .map_err(Error::into_access)?
            .into_iter()
            .next();

        let descriptors = conn.columns(&table).map_err(Error::into_access)?;
        let mut columns = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let converter = registry.resolve_for_column(
                table.schema.as_deref(),
                &table.name,
                &descriptor.name,
                descriptor.sql_type,
            )?;
            debug!(
                table = %table,
                column = %descriptor.name,
                sql_type = %descriptor.sql_type,
                size = ?descriptor.size,
                nullable = descriptor.nullable,
                host_kind = %converter.host_kind(),
                "Read column"
            );
            let ignored = config.is_ignored(&table, &descriptor.name);
            let ignore_on_update = config.is_ignored_on_update(&table, &descriptor.name);
            let display_name = config.naming.display_key(&descriptor.name);
            columns.push(
                Column::new(descriptor, display_name, converter)
                    .with_policies(ignored, ignore_on_update),
            );
        }

        let primary_key = primary_key.filter(|pk| {
            let known = columns.iter().any(|c| c.name() == pk);
            if !known {
                warn!(table = %table, column = %pk, "Primary key column not in column list");
            }
            known
        });
        debug!(table = %table, columns = columns.len(), primary_key = ?primary_key, "Loaded table metadata");

        let mut meta = Self::new(table, columns, primary_key)?;
        if let Some(revision) = config.revision_column(&meta.name).map(str::to_string) {
            meta.enable_revision_support(&revision)?;
        }
        Ok(meta)
    }

    pub fn name(&self) -> &TableName {
        &self.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.name.schema.as_deref()
    }

    pub fn table_name(&self) -> &str {
        &self.name.name
    }

    /// Columns in catalog order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column by row key. Row keys match column names exactly.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Column named by an SQL identifier: exact match first, then ignoring
    /// ASCII case, since unquoted identifiers may be folded by the database.
    pub(crate) fn resolve_identifier(&self, name: &str) -> Option<&Column> {
        self.column(name)
            .or_else(|| self.columns.iter().find(|c| c.name().eq_ignore_ascii_case(name)))
    }

    pub(crate) fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name).ok_or_else(|| Error::UnknownColumn {
            table: self.name.to_string(),
            column: name.to_string(),
        })
    }

    pub fn primary_key(&self) -> Option<&Column> {
        self.primary_key.as_deref().and_then(|pk| self.column(pk))
    }

    pub fn primary_key_name(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn revision_column(&self) -> Option<&Column> {
        self.revision.as_deref().and_then(|rev| self.column(rev))
    }

    pub fn has_revision_support(&self) -> bool {
        self.revision.is_some()
    }

    /// Use `column` for optimistic locking.
    pub fn enable_revision_support(&mut self, column: &str) -> Result<()> {
        let name = self
            .resolve_identifier(column)
            .ok_or_else(|| Error::UnknownColumn {
                table: self.name.to_string(),
                column: column.to_string(),
            })?
            .name()
            .to_string();
        debug!(table = %self.name, column = %name, "Enabled revision support");
        self.revision = Some(name);
        Ok(())
    }

    /// Validate every entry of a row. One error per offending key.
    pub fn validate(&self, row: &Row) -> BTreeMap<String, ValidationError> {
        row.iter()
            .filter_map(|(key, value)| {
                self.validate_value(key, value)
                    .map(|err| (key.to_string(), err))
            })
            .collect()
    }

    /// Validate one value for one column.
    pub fn validate_value(&self, column: &str, value: &Value) -> Option<ValidationError> {
        match self.column(column) {
            Some(col) => col.validate(value),
            None => Some(ValidationError::Key {
                table: self.name.to_string(),
                column: column.to_string(),
            }),
        }
    }

    /// Column list for code generation.
    pub fn describe(&self) -> Vec<ColumnDescription> {
        self.columns
            .iter()
            .map(|c| ColumnDescription {
                name: c.name().to_string(),
                display_name: c.display_name().to_string(),
                sql_type: c.sql_type(),
                host_kind: c.host_kind(),
                nullable: c.is_nullable(),
                primary_key: self.primary_key.as_deref() == Some(c.name()),
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::connection::{ColumnDescriptor, RawCursor};
    use crate::row;

    /// Catalog-only connection double.
    pub(crate) struct CatalogConnection {
        pub tables: Vec<(TableName, Vec<ColumnDescriptor>, Vec<String>)>,
    }

    impl CatalogConnection {
        pub fn person() -> Self {
            Self {
                tables: vec![(
                    TableName::new(Some("main".to_string()), "person"),
                    vec![
                        ColumnDescriptor::new("id", SqlType::Integer, None, false),
                        ColumnDescriptor::new("first_name", SqlType::Varchar, Some(5), true),
                        ColumnDescriptor::new("revision", SqlType::Integer, None, false),
                    ],
                    vec!["id".to_string()],
                )],
            }
        }
    }

    impl Connection for CatalogConnection {
        fn find_tables(&mut self, schema: Option<&str>, table: &str) -> Result<Vec<TableName>> {
            Ok(self
                .tables
                .iter()
                .map(|(name, _, _)| name.clone())
                .filter(|name| name.name.eq_ignore_ascii_case(table))
                .filter(|name| schema.map_or(true, |s| name.schema.as_deref() == Some(s)))
                .collect())
        }

        fn primary_key_columns(&mut self, table: &TableName) -> Result<Vec<String>> {
            Ok(self
                .tables
                .iter()
                .find(|(name, _, _)| name == table)
                .map(|(_, _, pk)| pk.clone())
                .unwrap_or_default())
        }

        fn columns(&mut self, table: &TableName) -> Result<Vec<ColumnDescriptor>> {
            Ok(self
                .tables
                .iter()
                .find(|(name, _, _)| name == table)
                .map(|(_, cols, _)| cols.clone())
                .unwrap_or_default())
        }

        fn execute(&mut self, _sql: &str, _params: &[Value]) -> Result<u64> {
            Err(Error::database("catalog only"))
        }

        fn generated_key(&mut self) -> Result<Option<Value>> {
            Ok(None)
        }

        fn query<'c>(&'c mut self, _sql: &str, _params: &[Value]) -> Result<Box<dyn RawCursor + 'c>> {
            Err(Error::database("catalog only"))
        }
    }

    pub(crate) fn load_person(config: &Config) -> TableMetadata {
        let mut conn = CatalogConnection::person();
        TableMetadata::load(&mut conn, &ConverterRegistry::new(), config, "person").unwrap()
    }

    #[test]
    fn test_load_columns_in_catalog_order() {
        let meta = load_person(&Config::default());
        assert_eq!(meta.table_name(), "person");
        assert_eq!(meta.schema(), Some("main"));
        let names: Vec<_> = meta.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["id", "first_name", "revision"]);
        assert_eq!(meta.primary_key_name(), Some("id"));
        assert_eq!(meta.column("first_name").unwrap().host_kind(), HostKind::String);
        assert_eq!(meta.column("first_name").unwrap().display_name(), "firstName");
        assert!(meta.column("missing").is_none());
        assert!(!meta.has_revision_support());
    }

    #[test]
    fn test_unknown_and_ambiguous_tables() {
        let mut conn = CatalogConnection::person();
        let registry = ConverterRegistry::new();
        let err = TableMetadata::load(&mut conn, &registry, &Config::default(), "nope").unwrap_err();
        assert!(matches!(err, Error::UnknownTable { name } if name == "nope"));

        let (name, cols, pk) = conn.tables[0].clone();
        conn.tables
            .push((TableName::new(Some("aux".to_string()), name.name), cols, pk));
        let err = TableMetadata::load(&mut conn, &registry, &Config::default(), "person").unwrap_err();
        assert!(matches!(err, Error::AmbiguousTable { matches: 2, .. }));

        // Qualified name disambiguates
        let meta = TableMetadata::load(&mut conn, &registry, &Config::default(), "aux.person").unwrap();
        assert_eq!(meta.schema(), Some("aux"));
    }

    #[test]
    fn test_revision_support() {
        let mut meta = load_person(&Config::default());
        let err = meta.enable_revision_support("version").unwrap_err();
        assert!(matches!(err, Error::UnknownColumn { column, .. } if column == "version"));
        meta.enable_revision_support("revision").unwrap();
        assert_eq!(meta.revision_column().unwrap().name(), "revision");

        let meta = load_person(&Config::new().with_revision_support("person"));
        assert!(meta.has_revision_support());
    }

    #[test]
    fn test_no_primary_key() {
        let mut conn = CatalogConnection {
            tables: vec![(
                TableName::parse("checks"),
                vec![ColumnDescriptor::new("yesno", SqlType::Boolean, None, true)],
                Vec::new(),
            )],
        };
        let meta =
            TableMetadata::load(&mut conn, &ConverterRegistry::new(), &Config::default(), "checks")
                .unwrap();
        assert!(meta.primary_key().is_none());
    }

    #[test]
    fn test_validate_returns_errors_as_data() {
        let meta = load_person(&Config::default());
        assert!(meta
            .validate(&row! { "id" => 1, "first_name" => "Ann" })
            .is_empty());

        let errors = meta.validate(&row! {
            "id" => "one",
            "first_name" => "Annabel",
            "nickname" => "A",
        });
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors["id"], ValidationError::Type { .. }));
        assert!(matches!(
            errors["first_name"],
            ValidationError::StringTooLong { max: 5, actual: 7, .. }
        ));
        assert!(matches!(errors["nickname"], ValidationError::Key { .. }));
    }

    #[test]
    fn test_row_keys_are_case_sensitive() {
        let meta = load_person(&Config::default());
        assert!(meta.column("FIRST_NAME").is_none());
        let errors = meta.validate(&row! { "FIRST_NAME" => "x" });
        assert!(matches!(errors["FIRST_NAME"], ValidationError::Key { .. }));
        assert_eq!(errors.len(), 1);

        // SQL identifiers still resolve regardless of case
        assert_eq!(meta.resolve_identifier("FIRST_NAME").unwrap().name(), "first_name");
    }

    #[test]
    fn test_describe() {
        let meta = load_person(&Config::default());
        let described = meta.describe();
        assert_eq!(described.len(), 3);
        assert!(described[0].primary_key);
        assert!(!described[0].nullable);
        assert_eq!(described[1].display_name, "firstName");
        assert_eq!(described[1].host_kind, HostKind::String);
    }

    #[test]
    fn test_ignored_columns() {
        let meta = load_person(
            &Config::new()
                .with_ignored_column("person", "first_name")
                .with_ignore_on_update("person", "id"),
        );
        assert!(meta.column("first_name").unwrap().is_ignored());
        assert!(meta.column("id").unwrap().is_ignored_on_update());
    }
}
