//! Table metadata and row-level data access.

mod access;
mod cache;
mod column;
mod linked_row;
mod metadata;
mod sql;

pub use access::Table;
pub use cache::TableCache;
pub use column::Column;
pub use linked_row::LinkedRow;
pub use metadata::{ColumnDescription, TableMetadata};
