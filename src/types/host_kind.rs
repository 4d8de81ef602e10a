//! Host value kinds.
//!
//! A host kind names the Rust-side representation a converter produces. It is
//! also the vocabulary of `/*:kind*/` type annotations in SQL text.

use std::fmt;

/// Supported host value representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostKind {
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    Long,
    /// Floating point.
    Double,
    /// Exact decimal.
    Decimal,
    /// Boolean.
    Bool,
    /// Text.
    String,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time without zone.
    Timestamp,
    /// Raw bytes.
    Binary,
}

impl HostKind {
    /// All host kinds, in declaration order.
    pub const ALL: [HostKind; 10] = [
        HostKind::Int,
        HostKind::Long,
        HostKind::Double,
        HostKind::Decimal,
        HostKind::Bool,
        HostKind::String,
        HostKind::Date,
        HostKind::Time,
        HostKind::Timestamp,
        HostKind::Binary,
    ];

    /// Parse a type annotation name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "int4" => HostKind::Int,
            "long" | "bigint" | "int8" => HostKind::Long,
            "double" | "float" | "real" => HostKind::Double,
            "decimal" | "number" | "numeric" => HostKind::Decimal,
            "bool" | "boolean" => HostKind::Bool,
            "string" | "text" | "varchar" => HostKind::String,
            "date" => HostKind::Date,
            "time" => HostKind::Time,
            "timestamp" | "datetime" => HostKind::Timestamp,
            "bytes" | "binary" | "blob" => HostKind::Binary,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical annotation name.
    pub fn name(&self) -> &'static str {
        match self {
            HostKind::Int => "int",
            HostKind::Long => "long",
            HostKind::Double => "double",
            HostKind::Decimal => "decimal",
            HostKind::Bool => "bool",
            HostKind::String => "string",
            HostKind::Date => "date",
            HostKind::Time => "time",
            HostKind::Timestamp => "timestamp",
            HostKind::Binary => "binary",
        }
    }

    /// Check whether a value of kind `other` is acceptable where `self` is expected.
    ///
    /// Integers widen into longs, doubles and decimals; everything else must match.
    pub fn accepts(&self, other: HostKind) -> bool {
        if *self == other {
            return true;
        }
        matches!(
            (self, other),
            (HostKind::Int, HostKind::Long)
                | (HostKind::Long, HostKind::Int)
                | (HostKind::Double, HostKind::Int | HostKind::Long | HostKind::Decimal)
                | (HostKind::Decimal, HostKind::Int | HostKind::Long | HostKind::Double)
        )
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
