//! SQL column type enum.
//!
//! Nullability and declared size are column properties, not type properties.

use super::constants::*;

/// SQL type reported by schema introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    LongVarchar,
    NChar,
    NVarchar,
    Clob,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    LongVarBinary,
    Blob,
    Boolean,
    Null,
    /// Any code without a dedicated variant.
    Other(i32),
}

impl SqlType {
    /// Every variant with a dedicated type code.
    pub const KNOWN: [SqlType; 25] = [
        SqlType::Bit,
        SqlType::TinyInt,
        SqlType::SmallInt,
        SqlType::Integer,
        SqlType::BigInt,
        SqlType::Float,
        SqlType::Real,
        SqlType::Double,
        SqlType::Numeric,
        SqlType::Decimal,
        SqlType::Char,
        SqlType::Varchar,
        SqlType::LongVarchar,
        SqlType::NChar,
        SqlType::NVarchar,
        SqlType::Clob,
        SqlType::Date,
        SqlType::Time,
        SqlType::Timestamp,
        SqlType::Binary,
        SqlType::VarBinary,
        SqlType::LongVarBinary,
        SqlType::Blob,
        SqlType::Boolean,
        SqlType::Null,
    ];

    /// Create from a raw type code.
    pub fn from_code(code: i32) -> Self {
        match code {
            SQL_TYPE_BIT => SqlType::Bit,
            SQL_TYPE_TINYINT => SqlType::TinyInt,
            SQL_TYPE_SMALLINT => SqlType::SmallInt,
            SQL_TYPE_INTEGER => SqlType::Integer,
            SQL_TYPE_BIGINT => SqlType::BigInt,
            SQL_TYPE_FLOAT => SqlType::Float,
            SQL_TYPE_REAL => SqlType::Real,
            SQL_TYPE_DOUBLE => SqlType::Double,
            SQL_TYPE_NUMERIC => SqlType::Numeric,
            SQL_TYPE_DECIMAL => SqlType::Decimal,
            SQL_TYPE_CHAR => SqlType::Char,
            SQL_TYPE_VARCHAR => SqlType::Varchar,
            SQL_TYPE_LONGVARCHAR => SqlType::LongVarchar,
            SQL_TYPE_NCHAR => SqlType::NChar,
            SQL_TYPE_NVARCHAR => SqlType::NVarchar,
            SQL_TYPE_CLOB => SqlType::Clob,
            SQL_TYPE_DATE => SqlType::Date,
            SQL_TYPE_TIME => SqlType::Time,
            SQL_TYPE_TIMESTAMP => SqlType::Timestamp,
            SQL_TYPE_BINARY => SqlType::Binary,
            SQL_TYPE_VARBINARY => SqlType::VarBinary,
            SQL_TYPE_LONGVARBINARY => SqlType::LongVarBinary,
            SQL_TYPE_BLOB => SqlType::Blob,
            SQL_TYPE_BOOLEAN => SqlType::Boolean,
            SQL_TYPE_NULL => SqlType::Null,
            other => SqlType::Other(other),
        }
    }

    /// Get the raw type code.
    pub fn code(&self) -> i32 {
        match self {
            SqlType::Bit => SQL_TYPE_BIT,
            SqlType::TinyInt => SQL_TYPE_TINYINT,
            SqlType::SmallInt => SQL_TYPE_SMALLINT,
            SqlType::Integer => SQL_TYPE_INTEGER,
            SqlType::BigInt => SQL_TYPE_BIGINT,
            SqlType::Float => SQL_TYPE_FLOAT,
            SqlType::Real => SQL_TYPE_REAL,
            SqlType::Double => SQL_TYPE_DOUBLE,
            SqlType::Numeric => SQL_TYPE_NUMERIC,
            SqlType::Decimal => SQL_TYPE_DECIMAL,
            SqlType::Char => SQL_TYPE_CHAR,
            SqlType::Varchar => SQL_TYPE_VARCHAR,
            SqlType::LongVarchar => SQL_TYPE_LONGVARCHAR,
            SqlType::NChar => SQL_TYPE_NCHAR,
            SqlType::NVarchar => SQL_TYPE_NVARCHAR,
            SqlType::Clob => SQL_TYPE_CLOB,
            SqlType::Date => SQL_TYPE_DATE,
            SqlType::Time => SQL_TYPE_TIME,
            SqlType::Timestamp => SQL_TYPE_TIMESTAMP,
            SqlType::Binary => SQL_TYPE_BINARY,
            SqlType::VarBinary => SQL_TYPE_VARBINARY,
            SqlType::LongVarBinary => SQL_TYPE_LONGVARBINARY,
            SqlType::Blob => SQL_TYPE_BLOB,
            SqlType::Boolean => SQL_TYPE_BOOLEAN,
            SqlType::Null => SQL_TYPE_NULL,
            SqlType::Other(code) => *code,
        }
    }

    /// Check if this is a character type whose declared size limits the length.
    pub fn is_character(&self) -> bool {
        matches!(
            self,
            SqlType::Char
                | SqlType::Varchar
                | SqlType::LongVarchar
                | SqlType::NChar
                | SqlType::NVarchar
                | SqlType::Clob
        )
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SqlType::Bit => "BIT",
            SqlType::TinyInt => "TINYINT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Float => "FLOAT",
            SqlType::Real => "REAL",
            SqlType::Double => "DOUBLE",
            SqlType::Numeric => "NUMERIC",
            SqlType::Decimal => "DECIMAL",
            SqlType::Char => "CHAR",
            SqlType::Varchar => "VARCHAR",
            SqlType::LongVarchar => "LONGVARCHAR",
            SqlType::NChar => "NCHAR",
            SqlType::NVarchar => "NVARCHAR",
            SqlType::Clob => "CLOB",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Binary => "BINARY",
            SqlType::VarBinary => "VARBINARY",
            SqlType::LongVarBinary => "LONGVARBINARY",
            SqlType::Blob => "BLOB",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Null => "NULL",
            SqlType::Other(code) => return write!(f, "OTHER({})", code),
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_known() {
        assert_eq!(SqlType::from_code(SQL_TYPE_VARCHAR), SqlType::Varchar);
        assert_eq!(SqlType::from_code(SQL_TYPE_BIGINT), SqlType::BigInt);
        assert_eq!(SqlType::from_code(SQL_TYPE_BOOLEAN), SqlType::Boolean);
    }

    #[test]
    fn test_from_code_unknown() {
        assert_eq!(SqlType::from_code(1111), SqlType::Other(1111));
        assert_eq!(SqlType::from_code(4242).code(), 4242);
    }

    #[test]
    fn test_code_matches_from_code() {
        for code in [SQL_TYPE_INTEGER, SQL_TYPE_DATE, SQL_TYPE_BLOB, SQL_TYPE_BIT] {
            assert_eq!(SqlType::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", SqlType::Timestamp), "TIMESTAMP");
        assert_eq!(format!("{}", SqlType::Other(7777)), "OTHER(7777)");
    }

    #[test]
    fn test_is_character() {
        assert!(SqlType::Varchar.is_character());
        assert!(SqlType::Clob.is_character());
        assert!(!SqlType::Integer.is_character());
    }
}
