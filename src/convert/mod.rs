//! Bidirectional value converters.
//!
//! A converter maps one host value kind to the value handed to the driver
//! when binding a parameter, and normalizes whatever the driver returns for
//! a result column back into that host kind. Converters are stateless and
//! shared through the [`ConverterRegistry`].

mod builtin;
mod registry;

pub use builtin::{
    BinaryConverter, BoolConverter, DateConverter, DecimalConverter, DoubleConverter,
    IntConverter, LongConverter, StringConverter, TimeConverter, TimestampConverter,
};
pub use registry::ConverterRegistry;

use std::fmt;

use crate::error::Result;
use crate::row::Row;
use crate::statement::BoundStatement;
use crate::types::{HostKind, SqlType, Value};
use crate::validation::ValidationError;

/// Bidirectional mapping between one host kind and its SQL representation.
pub trait Converter: fmt::Debug + Send + Sync {
    /// Host kind produced by `from_sql` and accepted by `to_sql`.
    fn host_kind(&self) -> HostKind;

    /// SQL type used when binding.
    fn sql_type(&self) -> SqlType;

    /// Convert a host value into the value bound as a statement parameter.
    ///
    /// NULL always converts to NULL.
    fn to_sql(&self, value: &Value) -> Result<Value>;

    /// Convert a value read from a result set into the host kind.
    fn from_sql(&self, value: Value) -> Result<Value>;

    /// Check a value against this converter and the column's declared size.
    fn validate(&self, column: &str, value: &Value, _size: Option<u32>) -> Option<ValidationError> {
        let kind = value.kind()?;
        if self.host_kind().accepts(kind) && self.to_sql(value).is_ok() {
            None
        } else {
            Some(ValidationError::Type {
                column: column.to_string(),
                expected: self.host_kind(),
                actual: value.type_name().to_string(),
            })
        }
    }

    /// Set parameter `position` (0-based) of a bound statement.
    fn set_value(&self, bound: &mut BoundStatement, position: usize, value: &Value) -> Result<()> {
        let sql_value = self.to_sql(value)?;
        bound.set_param(position, sql_value);
        Ok(())
    }

    /// Extract the value of column `name` from a raw result row.
    ///
    /// A missing column reads as NULL.
    fn get_value(&self, row: &Row, name: &str) -> Result<Value> {
        match row.get(name) {
            Some(value) => self.from_sql(value.clone()),
            None => Ok(Value::Null),
        }
    }
}
