//! Table column model.

use std::sync::Arc;

use crate::connection::ColumnDescriptor;
use crate::convert::Converter;
use crate::types::{HostKind, SqlType, Value};
use crate::validation::ValidationError;

/// One column of a table, with its assigned converter.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    display_name: String,
    sql_type: SqlType,
    size: Option<u32>,
    nullable: bool,
    converter: Arc<dyn Converter>,
    ignored: bool,
    ignore_on_update: bool,
}

impl Column {
    pub fn new(descriptor: ColumnDescriptor, display_name: String, converter: Arc<dyn Converter>) -> Self {
        Self {
            name: descriptor.name,
            display_name,
            sql_type: descriptor.sql_type,
            size: descriptor.size,
            nullable: descriptor.nullable,
            converter,
            ignored: false,
            ignore_on_update: false,
        }
    }

    pub(crate) fn with_policies(mut self, ignored: bool, ignore_on_update: bool) -> Self {
        self.ignored = ignored;
        self.ignore_on_update = ignore_on_update;
        self
    }

    /// Catalog name, also the row key.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn size(&self) -> Option<u32> {
        self.size
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn host_kind(&self) -> HostKind {
        self.converter.host_kind()
    }

    pub fn converter(&self) -> &Arc<dyn Converter> {
        &self.converter
    }

    /// Excluded from every generated statement.
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Excluded from UPDATE SET lists.
    pub fn is_ignored_on_update(&self) -> bool {
        self.ignore_on_update
    }

    /// Check a value against the converter and declared size.
    pub fn validate(&self, value: &Value) -> Option<ValidationError> {
        self.converter.validate(&self.name, value, self.size)
    }
}
