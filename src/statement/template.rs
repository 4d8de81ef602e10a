//! Parsed statement templates.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::convert::Converter;
use crate::error::Result;
use crate::naming::NamingConvention;
use crate::row::Row;
use crate::types::{HostKind, Value};

/// Whether a statement produces rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// SELECT, WITH or VALUES.
    Query,
    /// Anything else: INSERT, UPDATE, DELETE, DDL.
    Command,
}

/// A named bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Canonical key looked up in the parameter row, e.g. `person1.id`.
    pub key: String,
    /// Host-style name, e.g. `person1Id`.
    pub display_name: String,
    /// Declared or inferred host kind, `None` when unresolved.
    pub host_kind: Option<HostKind>,
    /// Value of the literal the directive replaced, if it was a plain literal.
    pub default: Option<Value>,
}

/// A result column with a declared host kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumn {
    /// Canonical row key: the source identifier chain as written (folded if
    /// unquoted), or the alias when the source is an expression.
    pub key: String,
    /// Label the database reports for the column: alias or last source segment.
    pub label: String,
    /// Host-style name. A quoted alias is used verbatim.
    pub display_name: String,
    pub host_kind: HostKind,
}

/// Parameter summary handed to code generators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescription {
    pub name: String,
    pub display_name: String,
    pub host_kind: Option<HostKind>,
    /// False only when the directive replaced a non-NULL literal.
    pub nullable: bool,
}

/// Per-parameter converter overrides.
///
/// Converters carry no comparable state, so two override sets are equal when
/// they name the same parameters with the same converter instances.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParameterConverters(BTreeMap<String, Arc<dyn Converter>>);

impl PartialEq for ParameterConverters {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|((ka, a), (kb, b))| ka == kb && Arc::ptr_eq(a, b))
    }
}

/// A parsed SQL statement: executable text with positional `?` placeholders
/// plus the named parameter for every placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementTemplate {
    pub(crate) name: Option<String>,
    /// Executable SQL without terminator.
    pub(crate) sql: String,
    /// Parameter key per placeholder, in placeholder order.
    pub(crate) placeholders: Vec<String>,
    /// Unique parameters in first-appearance order.
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) result_columns: Vec<ResultColumn>,
    pub(crate) kind: StatementKind,
    /// First table named after FROM, UPDATE or INTO.
    pub(crate) primary_table: Option<String>,
    pub(crate) naming: NamingConvention,
    pub(crate) converters: ParameterConverters,
}

impl StatementTemplate {
    /// Parse SQL text with the default naming convention.
    pub fn parse(sql: &str) -> Result<Self> {
        super::parser::Parser::new(NamingConvention::default()).parse(sql)
    }

    /// Parse SQL text with an explicit naming convention.
    pub fn parse_with(sql: &str, naming: NamingConvention) -> Result<Self> {
        super::parser::Parser::new(naming).parse(sql)
    }

    /// Name given by a SQL file block, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Executable SQL with `?` placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn primary_table(&self) -> Option<&str> {
        self.primary_table.as_deref()
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders.len()
    }

    /// Parameter key for each placeholder position.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn parameter(&self, key: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.key == key)
    }

    pub fn parameter_list(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn result_columns(&self) -> &[ResultColumn] {
        &self.result_columns
    }

    /// Ordered parameter summary for code generation.
    pub fn parameters(&self) -> Vec<ParameterDescription> {
        self.parameters
            .iter()
            .map(|p| ParameterDescription {
                name: p.key.clone(),
                display_name: p.display_name.clone(),
                host_kind: p.host_kind,
                nullable: !matches!(&p.default, Some(v) if !v.is_null()),
            })
            .collect()
    }

    /// Use `converter` for every placeholder bound to parameter `key`.
    pub fn with_parameter_converter(
        mut self,
        key: impl Into<String>,
        converter: Arc<dyn Converter>,
    ) -> Self {
        self.converters.0.insert(key.into(), converter);
        self
    }

    pub(crate) fn parameter_converter(&self, key: &str) -> Option<Arc<dyn Converter>> {
        self.converters.0.get(key).cloned()
    }

    /// Display name for a row key produced by this statement.
    pub fn display_name(&self, key: &str) -> String {
        self.result_columns
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.display_name.clone())
            .unwrap_or_else(|| self.naming.display_key(key))
    }

    /// Copy of a result row keyed by display names. The row itself is unchanged.
    pub fn display_row(&self, row: &Row) -> Row {
        row.iter()
            .map(|(k, v)| (self.display_name(k), v.clone()))
            .collect()
    }
}

impl fmt::Display for StatementTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}: {}", name, self.sql),
            None => write!(f, "{}", self.sql),
        }
    }
}
