//! Bundled [`Connection`](crate::Connection) implementations.

#[cfg(feature = "sqlite")]
pub mod sqlite;
