//! Converter lookup.

use std::collections::HashMap;
use std::sync::Arc;

use super::builtin::{
    BinaryConverter, BoolConverter, DateConverter, DecimalConverter, DoubleConverter,
    IntConverter, LongConverter, StringConverter, TimeConverter, TimestampConverter,
};
use super::Converter;
use crate::error::{Error, Result};
use crate::types::{HostKind, SqlType, Value};

/// Built-in converter for a SQL type code.
fn builtin_for_sql_type(sql_type: SqlType) -> Option<Arc<dyn Converter>> {
    let conv: Arc<dyn Converter> = match sql_type {
        SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer => Arc::new(IntConverter),
        SqlType::BigInt => Arc::new(LongConverter),
        SqlType::Float | SqlType::Real | SqlType::Double => Arc::new(DoubleConverter),
        SqlType::Numeric | SqlType::Decimal => Arc::new(DecimalConverter),
        SqlType::Bit | SqlType::Boolean => Arc::new(BoolConverter),
        SqlType::Char
        | SqlType::Varchar
        | SqlType::LongVarchar
        | SqlType::NChar
        | SqlType::NVarchar
        | SqlType::Clob => Arc::new(StringConverter),
        SqlType::Date => Arc::new(DateConverter),
        SqlType::Time => Arc::new(TimeConverter),
        SqlType::Timestamp => Arc::new(TimestampConverter),
        SqlType::Binary | SqlType::VarBinary | SqlType::LongVarBinary | SqlType::Blob => {
            Arc::new(BinaryConverter)
        }
        SqlType::Null | SqlType::Other(_) => return None,
    };
    Some(conv)
}

/// Built-in converter for a host kind.
fn builtin_for_host_kind(kind: HostKind) -> Arc<dyn Converter> {
    match kind {
        HostKind::Int => Arc::new(IntConverter),
        HostKind::Long => Arc::new(LongConverter),
        HostKind::Double => Arc::new(DoubleConverter),
        HostKind::Decimal => Arc::new(DecimalConverter),
        HostKind::Bool => Arc::new(BoolConverter),
        HostKind::String => Arc::new(StringConverter),
        HostKind::Date => Arc::new(DateConverter),
        HostKind::Time => Arc::new(TimeConverter),
        HostKind::Timestamp => Arc::new(TimestampConverter),
        HostKind::Binary => Arc::new(BinaryConverter),
    }
}

/// Registry mapping SQL types, host kinds and table columns to converters.
///
/// Lookups are pure. A per-column override always wins over the SQL type
/// table, and an explicit host kind wins over the SQL type.
#[derive(Debug, Clone)]
pub struct ConverterRegistry {
    by_sql_type: HashMap<SqlType, Arc<dyn Converter>>,
    by_host_kind: HashMap<HostKind, Arc<dyn Converter>>,
    by_column: HashMap<(String, String), Arc<dyn Converter>>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterRegistry {
    /// Registry with every built-in converter installed.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for sql_type in SqlType::KNOWN {
            if let Some(conv) = builtin_for_sql_type(sql_type) {
                registry.by_sql_type.insert(sql_type, conv);
            }
        }
        for kind in HostKind::ALL {
            registry.by_host_kind.insert(kind, builtin_for_host_kind(kind));
        }
        registry
    }

    /// Registry without any converters.
    pub fn empty() -> Self {
        Self {
            by_sql_type: HashMap::new(),
            by_host_kind: HashMap::new(),
            by_column: HashMap::new(),
        }
    }

    /// Register (or replace) the converter for a SQL type.
    pub fn register(&mut self, sql_type: SqlType, converter: Arc<dyn Converter>) {
        self.by_sql_type.insert(sql_type, converter);
    }

    /// Register (or replace) the converter for a host kind.
    pub fn register_host_kind(&mut self, kind: HostKind, converter: Arc<dyn Converter>) {
        self.by_host_kind.insert(kind, converter);
    }

    /// Register a converter for one column of one table.
    ///
    /// `table` is matched against both the bare and the schema-qualified table name.
    pub fn register_column(
        &mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        converter: Arc<dyn Converter>,
    ) {
        self.by_column
            .insert((table.into(), column.into()), converter);
    }

    /// Resolve a converter for a SQL type, with an optional explicit host kind.
    pub fn resolve(&self, sql_type: SqlType, host: Option<HostKind>) -> Result<Arc<dyn Converter>> {
        let found = match host {
            Some(kind) => self.by_host_kind.get(&kind),
            None => self.by_sql_type.get(&sql_type),
        };
        found
            .cloned()
            .ok_or(Error::UnsupportedType { sql_type, host })
    }

    /// Resolve the converter of a table column: column override first, then SQL type.
    pub fn resolve_for_column(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &str,
        sql_type: SqlType,
    ) -> Result<Arc<dyn Converter>> {
        match self.column_override(schema, table, column) {
            Some(conv) => Ok(conv),
            None => self.resolve(sql_type, None),
        }
    }

    /// Per-column override, if one is registered.
    pub fn column_override(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &str,
    ) -> Option<Arc<dyn Converter>> {
        if let Some(schema) = schema {
            let qualified = format!("{}.{}", schema, table);
            if let Some(conv) = self.by_column.get(&(qualified, column.to_string())) {
                return Some(conv.clone());
            }
        }
        self.by_column
            .get(&(table.to_string(), column.to_string()))
            .cloned()
    }

    /// Converter for a host kind.
    pub fn for_host_kind(&self, kind: HostKind) -> Result<Arc<dyn Converter>> {
        self.by_host_kind
            .get(&kind)
            .cloned()
            .ok_or(Error::UnsupportedType {
                sql_type: SqlType::Other(0),
                host: Some(kind),
            })
    }

    /// Converter for the runtime kind of a value. `None` for NULL.
    pub fn for_value(&self, value: &Value) -> Option<Arc<dyn Converter>> {
        value
            .kind()
            .and_then(|kind| self.by_host_kind.get(&kind).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    /// Stores booleans as 'Y' / 'N'.
    #[derive(Debug)]
    struct YesNoConverter;

    impl Converter for YesNoConverter {
        fn host_kind(&self) -> HostKind {
            HostKind::Bool
        }

        fn sql_type(&self) -> SqlType {
            SqlType::Char
        }

        fn to_sql(&self, value: &Value) -> Result<Value> {
            match value {
                Value::Null => Ok(Value::Null),
                Value::Bool(b) => Ok(Value::from(if *b { "Y" } else { "N" })),
                other => Err(Error::conversion(format!("not a bool: {}", other))),
            }
        }

        fn from_sql(&self, value: Value) -> Result<Value> {
            match value.as_str() {
                Some("Y") => Ok(Value::Bool(true)),
                Some("N") => Ok(Value::Bool(false)),
                _ => Ok(Value::Null),
            }
        }
    }

    #[test]
    fn test_resolve_builtin() {
        let registry = ConverterRegistry::new();
        let conv = registry.resolve(SqlType::Varchar, None).unwrap();
        assert_eq!(conv.host_kind(), HostKind::String);
        let conv = registry.resolve(SqlType::Numeric, None).unwrap();
        assert_eq!(conv.host_kind(), HostKind::Decimal);
        let conv = registry.resolve(SqlType::LongVarBinary, None).unwrap();
        assert_eq!(conv.host_kind(), HostKind::Binary);
    }

    #[test]
    fn test_explicit_host_kind_wins() {
        let registry = ConverterRegistry::new();
        let conv = registry
            .resolve(SqlType::Integer, Some(HostKind::Long))
            .unwrap();
        assert_eq!(conv.host_kind(), HostKind::Long);
    }

    #[test]
    fn test_unsupported_type() {
        let registry = ConverterRegistry::new();
        let err = registry.resolve(SqlType::Other(1111), None).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedType {
                sql_type: SqlType::Other(1111),
                host: None
            }
        ));

        let err = ConverterRegistry::empty()
            .resolve(SqlType::Integer, Some(HostKind::Int))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedType { host: Some(HostKind::Int), .. }));
    }

    #[test]
    fn test_column_override_priority() {
        let mut registry = ConverterRegistry::new();
        registry.register_column("checks", "yesno", Arc::new(YesNoConverter));

        let conv = registry
            .resolve_for_column(Some("main"), "checks", "yesno", SqlType::Char)
            .unwrap();
        assert_eq!(conv.to_sql(&Value::Bool(true)).unwrap(), Value::from("Y"));
        assert_eq!(conv.from_sql(Value::from("N")).unwrap(), Value::Bool(false));

        // Other columns of the same type are unaffected
        let conv = registry
            .resolve_for_column(Some("main"), "checks", "label", SqlType::Char)
            .unwrap();
        assert_eq!(conv.host_kind(), HostKind::String);
    }

    #[test]
    fn test_qualified_column_override() {
        let mut registry = ConverterRegistry::new();
        registry.register_column("audit.checks", "yesno", Arc::new(YesNoConverter));
        assert!(registry.column_override(Some("audit"), "checks", "yesno").is_some());
        assert!(registry.column_override(Some("main"), "checks", "yesno").is_none());
    }

    #[test]
    fn test_custom_converter_default_validation() {
        let conv = YesNoConverter;
        assert_eq!(conv.validate("yesno", &Value::Bool(true), Some(1)), None);
        assert!(matches!(
            conv.validate("yesno", &Value::from("Y"), Some(1)),
            Some(ValidationError::Type { .. })
        ));
    }

    #[test]
    fn test_for_value() {
        let registry = ConverterRegistry::new();
        assert!(registry.for_value(&Value::Null).is_none());
        let conv = registry.for_value(&Value::from("x")).unwrap();
        assert_eq!(conv.host_kind(), HostKind::String);
    }
}
