//! Value and result types for NimbusData.
//!
//! Defines the scalar values exchanged with the store and the `RowSet`
//! produced by the query executor.

use crate::error::{NimbusError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::DeserializeOwned;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name as reported by the store.
    pub name: String,

    /// Column data type as reported by the store.
    pub data_type: String,
}

impl ColumnInfo {
    /// Creates a new column info with the given name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A single scalar value, used both for bind parameters and result cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),

    /// Binary data. Never present in a `RowSet`.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value with binary data rendered as base64 text.
    pub fn into_text_safe(self) -> Value {
        match self {
            Value::Bytes(bytes) => Value::String(STANDARD.encode(bytes)),
            other => other,
        }
    }

    /// Returns a short name for the variant, used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

// Conversion implementations for common types
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// A row of raw values as decoded from the store.
pub type Row = Vec<Value>;

/// What a session hands back after running one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementOutput {
    /// Result-column metadata; `None` when the statement produces no columns.
    pub columns: Option<Vec<ColumnInfo>>,

    /// Decoded rows, each aligned with `columns`.
    pub rows: Vec<Row>,
}

impl StatementOutput {
    /// Output of a statement without result columns (writes, DDL).
    pub fn no_columns() -> Self {
        Self::default()
    }

    /// Output of a result-bearing statement.
    pub fn with_rows(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self {
            columns: Some(columns),
            rows,
        }
    }
}

/// Ordered, uniformly shaped rows produced by a query.
///
/// Every row shares the single column list, so all rows have the same keys
/// in the same order. Binary values are stored as base64 text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RowSet {
    /// Creates an empty row set with no columns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a row set with the given columns and no rows.
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, rendering binary values as text.
    ///
    /// Fails when the row width differs from the column count.
    pub fn push_row(&mut self, values: Row) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(NimbusError::unexpected(format!(
                "row has {} values but the result has {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        self.rows
            .push(values.into_iter().map(Value::into_text_safe).collect());
        Ok(())
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the row at `index`.
    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        self.rows.get(index).map(|values| RowRef {
            columns: &self.columns,
            values,
        })
    }

    /// Iterates over the rows.
    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(|values| RowRef {
            columns: &self.columns,
            values,
        })
    }

    /// Serializes into the JSON interchange representation.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| NimbusError::unexpected(format!("Failed to serialize rows: {e}")))
    }

    /// Deserializes every row into a typed record.
    pub fn to_records<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let value = serde_json::to_value(self)
            .map_err(|e| NimbusError::unexpected(format!("Failed to serialize rows: {e}")))?;
        serde_json::from_value(value)
            .map_err(|e| NimbusError::unexpected(format!("Failed to decode rows: {e}")))
    }
}

impl Serialize for RowSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in self.rows() {
            seq.serialize_element(&row)?;
        }
        seq.end()
    }
}

/// A borrowed view of one row in a `RowSet`.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> RowRef<'a> {
    /// Looks up a value by column name (first match).
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Column names of this row.
    pub fn keys(&self) -> &'a [String] {
        self.columns
    }

    /// Values of this row, in column order.
    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    /// Iterates over `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl Serialize for RowRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
