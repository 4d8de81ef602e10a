//! Built-in converters for the supported host kinds.
//!
//! Binding (`to_sql`) is strict: a value must already be of an acceptable
//! kind. Reading (`from_sql`) is lenient and normalizes the representations
//! drivers commonly hand back (numbers as text, booleans as 0/1, dates as
//! ISO text or epoch seconds).

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::Converter;
use crate::error::{Error, Result};
use crate::types::{HostKind, SqlType, Value};
use crate::validation::ValidationError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

fn cannot_bind(target: HostKind, value: &Value) -> Error {
    Error::conversion(format!(
        "cannot bind {} value '{}' as {}",
        value.type_name(),
        value,
        target
    ))
}

fn cannot_read(target: HostKind, value: &Value) -> Error {
    Error::conversion(format!(
        "cannot read {} value '{}' as {}",
        value.type_name(),
        value,
        target
    ))
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Decimal from a double via its shortest round-trip text form.
fn decimal_from_f64(v: f64) -> Option<Decimal> {
    if !v.is_finite() {
        return None;
    }
    parse_decimal(&v.to_string())
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
}

fn timestamp_from_epoch(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

/// `d` as i64 when it is finite, has no fraction and fits.
fn whole_number(d: f64) -> Option<i64> {
    // 2^63 is exact as f64; i64::MAX is not
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (d.is_finite() && d.fract() == 0.0 && (-LIMIT..LIMIT).contains(&d)).then_some(d as i64)
}

/// 32-bit integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntConverter;

impl IntConverter {
    fn narrow(value: &Value) -> Option<i64> {
        value
            .to_i64()
            .filter(|v| i32::try_from(*v).is_ok())
    }
}

impl Converter for IntConverter {
    fn host_kind(&self) -> HostKind {
        HostKind::Int
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Integer
    }

    fn to_sql(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Self::narrow(value)
            .map(Value::Integer)
            .ok_or_else(|| cannot_bind(HostKind::Int, value))
    }

    fn from_sql(&self, value: Value) -> Result<Value> {
        let narrowed = match &value {
            Value::Null => return Ok(Value::Null),
            Value::Double(d) => whole_number(*d),
            Value::Text(s) => s.trim().parse::<i64>().ok(),
            other => other.to_i64(),
        };
        narrowed
            .filter(|v| i32::try_from(*v).is_ok())
            .map(Value::Integer)
            .ok_or_else(|| cannot_read(HostKind::Int, &value))
    }
}

/// 64-bit integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongConverter;

impl Converter for LongConverter {
    fn host_kind(&self) -> HostKind {
        HostKind::Long
    }

    fn sql_type(&self) -> SqlType {
        SqlType::BigInt
    }

    fn to_sql(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        value
            .to_i64()
            .map(Value::Integer)
            .ok_or_else(|| cannot_bind(HostKind::Long, value))
    }

    fn from_sql(&self, value: Value) -> Result<Value> {
        let long = match &value {
            Value::Null => return Ok(Value::Null),
            Value::Double(d) => whole_number(*d),
            Value::Text(s) => s.trim().parse::<i64>().ok(),
            other => other.to_i64(),
        };
        long.map(Value::Integer)
            .ok_or_else(|| cannot_read(HostKind::Long, &value))
    }
}

/// Floating point.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleConverter;

impl Converter for DoubleConverter {
    fn host_kind(&self) -> HostKind {
        HostKind::Double
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Double
    }

    fn to_sql(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        value
            .to_f64()
            .map(Value::Double)
            .ok_or_else(|| cannot_bind(HostKind::Double, value))
    }

    fn from_sql(&self, value: Value) -> Result<Value> {
        let double = match &value {
            Value::Null => return Ok(Value::Null),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            other => other.to_f64(),
        };
        double
            .map(Value::Double)
            .ok_or_else(|| cannot_read(HostKind::Double, &value))
    }
}

/// Exact decimal.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalConverter;

impl Converter for DecimalConverter {
    fn host_kind(&self) -> HostKind {
        HostKind::Decimal
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Decimal
    }

    fn to_sql(&self, value: &Value) -> Result<Value> {
        let decimal = match value {
            Value::Null => return Ok(Value::Null),
            Value::Decimal(d) => Some(*d),
            Value::Integer(v) => Some(Decimal::from(*v)),
            Value::Double(v) => decimal_from_f64(*v),
            _ => None,
        };
        decimal
            .map(Value::Decimal)
            .ok_or_else(|| cannot_bind(HostKind::Decimal, value))
    }

    fn from_sql(&self, value: Value) -> Result<Value> {
        let decimal = match &value {
            Value::Null => return Ok(Value::Null),
            Value::Decimal(d) => Some(*d),
            Value::Integer(v) => Some(Decimal::from(*v)),
            Value::Double(v) => decimal_from_f64(*v),
            Value::Text(s) => parse_decimal(s),
            _ => None,
        };
        decimal
            .map(Value::Decimal)
            .ok_or_else(|| cannot_read(HostKind::Decimal, &value))
    }
}

/// Boolean. Reads integer 0/1 and common text spellings.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolConverter;

impl Converter for BoolConverter {
    fn host_kind(&self) -> HostKind {
        HostKind::Bool
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Boolean
    }

    fn to_sql(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(cannot_bind(HostKind::Bool, other)),
        }
    }

    fn from_sql(&self, value: Value) -> Result<Value> {
        let flag = match &value {
            Value::Null => return Ok(Value::Null),
            Value::Bool(b) => Some(*b),
            Value::Integer(v) => Some(*v != 0),
            Value::Decimal(d) => Some(!d.is_zero()),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(true),
                "false" | "f" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        };
        flag.map(Value::Bool)
            .ok_or_else(|| cannot_read(HostKind::Bool, &value))
    }
}

/// Text, with length enforcement against the declared column size.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringConverter;

impl Converter for StringConverter {
    fn host_kind(&self) -> HostKind {
        HostKind::String
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Varchar
    }

    fn to_sql(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Text(s) => Ok(Value::Text(s.clone())),
            other => Err(cannot_bind(HostKind::String, other)),
        }
    }

    fn from_sql(&self, value: Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Text(s) => Ok(Value::Text(s)),
            Value::Binary(bytes) => String::from_utf8(bytes.to_vec())
                .map(Value::Text)
                .map_err(|e| Error::conversion(format!("cannot read binary as string: {}", e))),
            other => Ok(Value::Text(other.to_string())),
        }
    }

    fn validate(&self, column: &str, value: &Value, size: Option<u32>) -> Option<ValidationError> {
        let text = match value {
            Value::Null => return None,
            Value::Text(s) => s,
            other => {
                return Some(ValidationError::Type {
                    column: column.to_string(),
                    expected: HostKind::String,
                    actual: other.type_name().to_string(),
                })
            }
        };
        let max = size.filter(|max| *max > 0)?;
        let actual = text.chars().count();
        if actual > max as usize {
            Some(ValidationError::StringTooLong {
                column: column.to_string(),
                max,
                actual,
            })
        } else {
            None
        }
    }
}

/// Calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateConverter;

impl Converter for DateConverter {
    fn host_kind(&self) -> HostKind {
        HostKind::Date
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Date
    }

    fn to_sql(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Date(d) => Ok(Value::Date(*d)),
            other => Err(cannot_bind(HostKind::Date, other)),
        }
    }

    fn from_sql(&self, value: Value) -> Result<Value> {
        let date = match &value {
            Value::Null => return Ok(Value::Null),
            Value::Date(d) => Some(*d),
            Value::Timestamp(ts) => Some(ts.date()),
            Value::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .ok()
                .or_else(|| parse_timestamp(s).map(|ts| ts.date())),
            Value::Integer(secs) => timestamp_from_epoch(*secs).map(|ts| ts.date()),
            _ => None,
        };
        date.map(Value::Date)
            .ok_or_else(|| cannot_read(HostKind::Date, &value))
    }
}

/// Time of day.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeConverter;

impl Converter for TimeConverter {
    fn host_kind(&self) -> HostKind {
        HostKind::Time
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Time
    }

    fn to_sql(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Time(t) => Ok(Value::Time(*t)),
            other => Err(cannot_bind(HostKind::Time, other)),
        }
    }

    fn from_sql(&self, value: Value) -> Result<Value> {
        let time = match &value {
            Value::Null => return Ok(Value::Null),
            Value::Time(t) => Some(*t),
            Value::Timestamp(ts) => Some(ts.time()),
            Value::Text(s) => parse_time(s),
            _ => None,
        };
        time.map(Value::Time)
            .ok_or_else(|| cannot_read(HostKind::Time, &value))
    }
}

/// Date and time without zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampConverter;

impl Converter for TimestampConverter {
    fn host_kind(&self) -> HostKind {
        HostKind::Timestamp
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Timestamp
    }

    fn to_sql(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Timestamp(ts) => Ok(Value::Timestamp(*ts)),
            other => Err(cannot_bind(HostKind::Timestamp, other)),
        }
    }

    fn from_sql(&self, value: Value) -> Result<Value> {
        let ts = match &value {
            Value::Null => return Ok(Value::Null),
            Value::Timestamp(ts) => Some(*ts),
            Value::Date(d) => d.and_hms_opt(0, 0, 0),
            Value::Text(s) => parse_timestamp(s),
            Value::Integer(secs) => timestamp_from_epoch(*secs),
            _ => None,
        };
        ts.map(Value::Timestamp)
            .ok_or_else(|| cannot_read(HostKind::Timestamp, &value))
    }
}

/// Raw bytes. Also the fallback for binary and unknown large-object types.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryConverter;

impl Converter for BinaryConverter {
    fn host_kind(&self) -> HostKind {
        HostKind::Binary
    }

    fn sql_type(&self) -> SqlType {
        SqlType::Blob
    }

    fn to_sql(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Binary(bytes) => Ok(Value::Binary(bytes.clone())),
            other => Err(cannot_bind(HostKind::Binary, other)),
        }
    }

    fn from_sql(&self, value: Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Binary(bytes) => Ok(Value::Binary(bytes)),
            Value::Text(s) => Ok(Value::Binary(Bytes::from(s.into_bytes()))),
            other => Err(cannot_read(HostKind::Binary, &other)),
        }
    }
}
