//! Error types for the typed SQL access layer.

use std::io;
use thiserror::Error;

use crate::types::{HostKind, SqlType};

/// Result type alias for sqlrow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed low-level cause attached to write and access errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for schema introspection, statement handling and table access.
#[derive(Error, Debug)]
pub enum Error {
    /// No converter is registered for the SQL type / host kind pairing.
    #[error("Unsupported type: no converter for SQL type {sql_type}{}", host_suffix(.host))]
    UnsupportedType {
        sql_type: SqlType,
        host: Option<HostKind>,
    },

    /// Schema introspection found no table with this name.
    #[error("Unknown table '{name}'")]
    UnknownTable { name: String },

    /// Schema introspection found more than one table with this name.
    #[error("Table name '{name}' is ambiguous: {matches} tables match")]
    AmbiguousTable { name: String, matches: usize },

    /// Column reference not present in the table metadata.
    #[error("Column '{column}' does not exist in table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// SQL directive syntax is unterminated or the statement has no delimiter.
    #[error("Malformed statement: {message} near `{snippet}`")]
    MalformedStatement { message: String, snippet: String },

    /// A bind placeholder has no value in the supplied parameters.
    #[error("Missing value for parameter '{name}'")]
    MissingParameter { name: String },

    /// Value cannot be converted to or from its SQL representation.
    #[error("Conversion error: {message}")]
    Conversion { message: String },

    /// INSERT failed or affected an unexpected number of rows.
    #[error("Insert failed: {message}")]
    Insert {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// UPDATE failed or affected an unexpected number of rows.
    #[error("Update failed: {message}")]
    Update {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// DELETE failed or affected an unexpected number of rows.
    #[error("Delete failed: {message}")]
    Delete {
        message: String,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Operation called on an object that is not in a usable state.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Underlying database failure not otherwise classified.
    #[error("Database access error: {message}")]
    DatabaseAccess {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// I/O error while reading SQL resources.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn host_suffix(host: &Option<HostKind>) -> String {
    match host {
        Some(kind) => format!(" and host kind {}", kind),
        None => String::new(),
    }
}

impl Error {
    /// Create a malformed statement error with the offending snippet.
    pub fn malformed(message: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self::MalformedStatement {
            message: message.into(),
            snippet: snippet.into(),
        }
    }

    /// Create a conversion error.
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }

    /// Create a database access error without an underlying cause.
    pub fn database(message: impl Into<String>) -> Self {
        Self::DatabaseAccess {
            message: message.into(),
            source: None,
        }
    }

    /// Create a database access error wrapping a driver failure.
    pub fn database_with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::DatabaseAccess {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an insert error without a cause.
    pub fn insert(message: impl Into<String>) -> Self {
        Self::Insert {
            message: message.into(),
            source: None,
        }
    }

    /// Create an update error without a cause.
    pub fn update(message: impl Into<String>) -> Self {
        Self::Update {
            message: message.into(),
            source: None,
        }
    }

    /// Create a delete error without a cause.
    pub fn delete(message: impl Into<String>) -> Self {
        Self::Delete {
            message: message.into(),
            source: None,
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Wrap any error raised during an insert. Insert errors pass through unchanged.
    pub(crate) fn into_insert(self) -> Self {
        match self {
            e @ Error::Insert { .. } => e,
            other => Error::Insert {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }

    /// Wrap any error raised during an update. Update errors pass through unchanged.
    pub(crate) fn into_update(self) -> Self {
        match self {
            e @ Error::Update { .. } => e,
            other => Error::Update {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }

    /// Wrap any error raised during a delete. Delete and state errors pass through.
    pub(crate) fn into_delete(self) -> Self {
        match self {
            e @ (Error::Delete { .. } | Error::InvalidState { .. }) => e,
            other => Error::Delete {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }

    /// Wrap driver-level failures as database access errors, keeping typed errors.
    pub(crate) fn into_access(self) -> Self {
        match self {
            e @ (Error::DatabaseAccess { .. }
            | Error::Insert { .. }
            | Error::Update { .. }
            | Error::Delete { .. }) => e,
            other => Error::DatabaseAccess {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

/// Message for write operations whose affected-row count is not exactly one.
pub(crate) fn affected_rows_message(operation: &str, affected: u64) -> String {
    format!(
        "{} rows were affected by {} operation (expected 1). \
         Either the ID or the revision (if enabled) is wrong.",
        affected, operation
    )
}
