//! Annotated SQL statements: parsing, binding and execution.

mod executor;
mod lexer;
mod parser;
mod sql_file;
mod template;

pub use executor::{BoundStatement, Executor};
pub use sql_file::SqlFile;
pub use template::{
    Parameter, ParameterDescription, ResultColumn, StatementKind, StatementTemplate,
};
