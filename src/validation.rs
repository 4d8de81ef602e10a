//! Validation errors.
//!
//! These are returned as data by table validation, never raised, so a whole
//! row can be checked in one pass.

use thiserror::Error;

use crate::types::HostKind;

/// A problem with one value of a row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The key does not name a column of the table.
    #[error("Column '{column}' does not exist in table '{table}'")]
    Key { table: String, column: String },

    /// The value kind is not accepted by the column's converter.
    #[error("Column '{column}' expects {expected} but got {actual}")]
    Type {
        column: String,
        expected: HostKind,
        actual: String,
    },

    /// The string is longer than the declared column size.
    #[error("Value for column '{column}' is {actual} characters long (max {max})")]
    StringTooLong {
        column: String,
        max: u32,
        actual: usize,
    },
}

impl ValidationError {
    /// Column the error refers to.
    pub fn column(&self) -> &str {
        match self {
            ValidationError::Key { column, .. }
            | ValidationError::Type { column, .. }
            | ValidationError::StringTooLong { column, .. } => column,
        }
    }
}
