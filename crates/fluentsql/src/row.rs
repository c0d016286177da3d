//! Result rows and row mapping.
//!
//! Drivers speak the text protocol, so every cell arrives as an optional
//! string; typed access parses it on demand.

use std::fmt::Display;
use std::str::FromStr;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{SqlError, SqlResult};

/// One result row: column names in result order with their text values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Option<String>>,
}

impl Row {
    /// Build a row; `values` are padded or cut to the column count.
    pub fn new(columns: Vec<String>, mut values: Vec<Option<String>>) -> Self {
        values.resize(columns.len(), None);
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.map(Into::into)))
            .unzip();
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Text value of `column`; `None` when the column is missing or NULL.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.index_of(column).and_then(|i| self.get_idx(i))
    }

    /// Text value at position `idx`.
    pub fn get_idx(&self, idx: usize) -> Option<&str> {
        self.values.get(idx).and_then(|v| v.as_deref())
    }

    /// Parse `column` into `T`; a missing column or NULL is a decode error.
    pub fn try_get<T>(&self, column: &str) -> SqlResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.try_get_opt(column)? {
            Some(v) => Ok(v),
            None => Err(SqlError::decode(column, "unexpected NULL")),
        }
    }

    /// Parse `column` into `T`, mapping NULL to `None`.
    pub fn try_get_opt<T>(&self, column: &str) -> SqlResult<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        let idx = self
            .index_of(column)
            .ok_or_else(|| SqlError::decode(column, "no such column"))?;
        match self.get_idx(idx) {
            None => Ok(None),
            Some(text) => text
                .parse::<T>()
                .map(Some)
                .map_err(|e| SqlError::decode(column, format!("cannot parse '{text}': {e}"))),
        }
    }

    /// `(column, value)` pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.columns
            .iter()
            .zip(&self.values)
            .map(|(c, v)| (c.as_str(), v.as_deref()))
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, &value)?;
        }
        map.end()
    }
}

/// Trait for converting a result row into a Rust type.
///
/// ```ignore
/// struct User {
///     id: i64,
///     email: Option<String>,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> SqlResult<Self> {
///         Ok(Self {
///             id: row.try_get("id")?,
///             email: row.try_get_opt("email")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a result row into Self
    fn from_row(row: &Row) -> SqlResult<Self>;

    /// Convert every row, stopping at the first failure.
    fn from_rows(rows: &[Row]) -> SqlResult<Vec<Self>> {
        rows.iter().map(Self::from_row).collect()
    }
}

impl FromRow for Row {
    fn from_row(row: &Row) -> SqlResult<Self> {
        Ok(row.clone())
    }
}
