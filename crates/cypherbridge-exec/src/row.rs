//! Typed rows at the driver boundary.
//!
//! Backends answer with maps, key/value pair lists or positional arrays.
//! Drivers hand those over as [`RawRecord`]s and [`RowSet::new`] normalizes
//! them into one [`Row`] shape, so nothing downstream branches on
//! representation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RowError {
    #[error("column `{0}` is not present in the row")]
    Missing(String),

    #[error("column `{column}` could not be decoded: {source}")]
    Decode {
        column: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("column `{column}` value {value} cannot be cast to {cast:?}")]
    Cast {
        column: String,
        cast: Cast,
        value: String,
    },
}

/// One record as a backend produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Map(Map<String, Value>),
    Pairs(Vec<(String, Value)>),
    Positional(Vec<Value>),
}

/// Closed set of value casters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cast {
    String,
    Integer,
    Float,
    Boolean,
    /// Parse a JSON document stored as a string
    Json,
    /// Wrap scalars, parse JSON arrays stored as strings
    Array,
}

impl Cast {
    /// Cast a value. Null passes through; `None` means not representable.
    pub fn apply(&self, value: &Value) -> Option<Value> {
        if value.is_null() {
            return Some(Value::Null);
        }
        match self {
            Cast::String => Some(match value {
                Value::String(s) => Value::String(s.clone()),
                Value::Number(n) => Value::String(n.to_string()),
                Value::Bool(b) => Value::String(b.to_string()),
                other => Value::String(other.to_string()),
            }),
            Cast::Integer => match value {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                    .map(Value::from),
                Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
                Value::Bool(b) => Some(Value::from(i64::from(*b))),
                _ => None,
            },
            Cast::Float => match value {
                Value::Number(n) => n.as_f64().map(Value::from),
                Value::String(s) => s.trim().parse::<f64>().ok().map(Value::from),
                _ => None,
            },
            Cast::Boolean => match value {
                Value::Bool(b) => Some(Value::Bool(*b)),
                Value::Number(n) => n.as_f64().map(|f| Value::Bool(f != 0.0)),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => Some(Value::Bool(true)),
                    "false" | "0" | "no" | "" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
            Cast::Json => match value {
                Value::String(s) => serde_json::from_str(s).ok(),
                other => Some(other.clone()),
            },
            Cast::Array => match value {
                Value::Array(_) => Some(value.clone()),
                Value::String(s) if s.trim_start().starts_with('[') => serde_json::from_str(s).ok(),
                other => Some(Value::Array(vec![other.clone()])),
            },
        }
    }
}

/// A normalized record: ordered columns with values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Normalize a record. Positional values take their names from `columns`;
    /// values beyond the known columns are named by index.
    pub fn from_record(record: RawRecord, columns: &[String]) -> Self {
        match record {
            RawRecord::Map(map) => {
                let (columns, values) = map.into_iter().unzip();
                Self { columns, values }
            }
            RawRecord::Pairs(pairs) => {
                let (columns, values) = pairs.into_iter().unzip();
                Self { columns, values }
            }
            RawRecord::Positional(values) => {
                let columns = (0..values.len())
                    .map(|i| columns.get(i).cloned().unwrap_or_else(|| i.to_string()))
                    .collect();
                Self { columns, values }
            }
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Deserialize one column.
    pub fn get_as<T: DeserializeOwned>(&self, column: &str) -> Result<T, RowError> {
        let value = self
            .get(column)
            .ok_or_else(|| RowError::Missing(column.to_string()))?;
        serde_json::from_value(value.clone()).map_err(|source| RowError::Decode {
            column: column.to_string(),
            source,
        })
    }

    pub fn cast(&self, column: &str, cast: Cast) -> Result<Value, RowError> {
        let value = self
            .get(column)
            .ok_or_else(|| RowError::Missing(column.to_string()))?;
        cast.apply(value).ok_or_else(|| RowError::Cast {
            column: column.to_string(),
            cast,
            value: value.to_string(),
        })
    }

    /// Deserialize the whole row as a struct keyed by column name.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, RowError> {
        serde_json::from_value(Value::Object(self.to_map())).map_err(|source| RowError::Decode {
            column: "*".to_string(),
            source,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.iter()
            .map(|(column, value)| (column.to_string(), value.clone()))
            .collect()
    }
}

/// Result of one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, records: Vec<RawRecord>) -> Self {
        let rows = records
            .into_iter()
            .map(|record| Row::from_record(record, &columns))
            .collect();
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Every row's value for one column; rows without it are skipped.
    pub fn column(&self, name: &str) -> Vec<&Value> {
        self.rows.iter().filter_map(|row| row.get(name)).collect()
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<Vec<T>, RowError> {
        self.rows.iter().map(Row::deserialize).collect()
    }
}

impl IntoIterator for RowSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a RowSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
