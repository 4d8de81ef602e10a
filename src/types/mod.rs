//! Value, SQL type and host kind definitions shared by every layer.

mod constants;
mod host_kind;
mod sql_type;
mod value;

pub use constants::*;
pub use host_kind::HostKind;
pub use sql_type::SqlType;
pub use value::Value;
