//! Ordered key/value row container.
//!
//! A `Row` is the unit exchanged with statements and tables: an ordered map
//! from column or parameter key to [`Value`]. Keys are unique; setting an
//! existing key replaces its value in place.

use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::fmt;

use crate::error::{Error, Result};
use crate::naming::NamingConvention;
use crate::types::Value;

/// Build a [`Row`] from `key => value` pairs.
///
/// ```
/// use sqlrow::row;
///
/// let r = row! { "name" => "cus1", "age" => 3 };
/// assert_eq!(r.len(), 2);
/// ```
#[macro_export]
macro_rules! row {
    () => { $crate::Row::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut r = $crate::Row::new();
        $( r.insert($key, $value); )+
        r
    }};
}

/// An ordered row of named values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a row from key/value pairs. Later duplicates replace earlier ones.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut row = Self::new();
        row.add_key_vals(pairs);
        row
    }

    /// Bulk-set key/value pairs.
    pub fn add_key_vals<K, V, I>(&mut self, pairs: I) -> &mut Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in pairs {
            self.insert(key, value);
        }
        self
    }

    /// Set a value, returning the previous one for that key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(idx) => Some(std::mem::replace(&mut self.entries[idx].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.position(key).map(|idx| &self.entries[idx].1)
    }

    /// Get a mutable value by key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.position(key).map(move |idx| &mut self.entries[idx].1)
    }

    /// Remove a key, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.position(key).map(|idx| self.entries.remove(idx).1)
    }

    /// Check whether the key is present (its value may be NULL).
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Check whether the key is present with a non-NULL value.
    pub fn has_value(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_null())
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the row is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Iterate over entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Get a value converted to a host type.
    pub fn get_as<T: FromValue>(&self, key: &str) -> Result<T> {
        match self.get(key) {
            Some(value) => T::from_value(value).map_err(|e| match e {
                Error::Conversion { message } => {
                    Error::conversion(format!("key '{}': {}", key, message))
                }
                other => other,
            }),
            None => T::from_missing(key),
        }
    }

    pub fn get_int(&self, key: &str) -> Result<i32> {
        self.get_as(key)
    }

    pub fn get_long(&self, key: &str) -> Result<i64> {
        self.get_as(key)
    }

    pub fn get_double(&self, key: &str) -> Result<f64> {
        self.get_as(key)
    }

    pub fn get_decimal(&self, key: &str) -> Result<Decimal> {
        self.get_as(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get_as(key)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get_as(key)
    }

    pub fn get_date(&self, key: &str) -> Result<NaiveDate> {
        self.get_as(key)
    }

    pub fn get_timestamp(&self, key: &str) -> Result<NaiveDateTime> {
        self.get_as(key)
    }

    /// Copy of this row with every key replaced by its display name.
    ///
    /// Keys are never renamed in place; the original row stays the canonical form.
    pub fn with_display_names(&self, naming: &NamingConvention) -> Row {
        self.entries
            .iter()
            .map(|(k, v)| (naming.display_key(k), v.clone()))
            .collect()
    }

    /// Copy `target` with every key it shares with `self` overwritten by this row's value.
    pub fn assign_into(&self, target: &Row) -> Row {
        let mut out = target.clone();
        for (key, value) in out.entries.iter_mut() {
            if let Some(v) = self.get(key) {
                *value = v.clone();
            }
        }
        out
    }

    /// Copy of this row taking the values for shared keys from `other`.
    pub fn updated_with(&self, other: &Row) -> Row {
        other.assign_into(self)
    }

    /// Restrict to the given keys, in the given order. Missing keys are skipped.
    pub fn project(&self, keys: &[&str]) -> Row {
        keys.iter()
            .filter_map(|k| self.get(k).map(|v| (k.to_string(), v.clone())))
            .collect()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row::from_pairs(iter)
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Row {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.add_key_vals(iter);
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Conversion from a row value to a host type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;

    /// Result when the key is absent. Non-optional types fail.
    fn from_missing(key: &str) -> Result<Self> {
        Err(Error::conversion(format!("no value for key '{}'", key)))
    }
}

fn mismatch<T>(expected: &str, value: &Value) -> Result<T> {
    Err(Error::conversion(format!(
        "cannot read {} value '{}' as {}",
        value.type_name(),
        value,
        expected
    )))
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value.to_i64() {
            Some(v) => i32::try_from(v)
                .map_err(|_| Error::conversion(format!("value {} out of range for int", v))),
            None => mismatch("int", value),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.to_i64().map_or_else(|| mismatch("long", value), Ok)
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.to_f64().map_or_else(|| mismatch("double", value), Ok)
    }
}

impl FromValue for Decimal {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_decimal().map_or_else(|| mismatch("decimal", value), Ok)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_bool().map_or_else(|| mismatch("bool", value), Ok)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            other => mismatch("string", other),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_date().map_or_else(|| mismatch("date", value), Ok)
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_time().map_or_else(|| mismatch("time", value), Ok)
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_timestamp().map_or_else(|| mismatch("timestamp", value), Ok)
    }
}

impl FromValue for Bytes {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Binary(b) => Ok(b.clone()),
            other => mismatch("binary", other),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }

    fn from_missing(_key: &str) -> Result<Self> {
        Ok(None)
    }
}

/// Record shapes that can be read field by field from a row.
///
/// Implemented by typed wrappers (usually generated code):
///
/// ```
/// use sqlrow::{FromRow, Result, Row};
///
/// struct Person {
///     id: i64,
///     first_name: Option<String>,
/// }
///
/// impl FromRow for Person {
///     fn from_row(row: &Row) -> Result<Self> {
///         Ok(Person {
///             id: row.get_as("id")?,
///             first_name: row.get_as("first_name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(row.clone())
    }
}
