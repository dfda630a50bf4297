use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, fmt, str::FromStr};

/// A primary-key value.
///
/// Keys are compared by value and type: `Integer(1)` and `Text("1")` are
/// different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Integer(i64),
    Text(String),
}

impl KeyValue {
    /// Convert a raw column value into a key. `NULL`, reals and blobs are not keys.
    #[must_use]
    pub fn from_column(value: Value) -> Option<Self> {
        match value {
            Value::Integer(n) => Some(Self::Integer(n)),
            Value::Text(s) => Some(Self::Text(s)),
            Value::Null | Value::Real(_) | Value::Blob(_) => None,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Integers win; anything else is taken verbatim as a text key.
impl FromStr for KeyValue {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(trimmed
            .parse::<i64>()
            .map_or_else(|_| Self::Text(trimmed.to_string()), Self::Integer))
    }
}

impl From<i64> for KeyValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<&str> for KeyValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<KeyValue> for Value {
    fn from(key: KeyValue) -> Self {
        match key {
            KeyValue::Integer(n) => Self::Integer(n),
            KeyValue::Text(s) => Self::Text(s),
        }
    }
}

impl ToSql for KeyValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Integer(n) => Ok(ToSqlOutput::from(*n)),
            Self::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
        }
    }
}
