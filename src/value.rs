//! Portable, JSON-stable encoding for the values a [`Statement`](crate::statement::Statement)
//! can carry: primitives, timestamps, byte sequences, and nested maps/lists.
//!
//! Timestamps and byte sequences round-trip through tagged `data:` URI
//! strings so that a `Value` survives a `serde_json` round trip without a
//! custom wire schema per type.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIMESTAMP_PREFIX: &str = "data:object;<DateTime>,";
const BYTES_PREFIX: &str = "data:application/octet-stream;base64,";

/// A value carried by a statement's parameters, predicate leaves, or
/// variable bindings.
///
/// `List` doubles as the raw-SQL-fragment escape hatch: a one-element list
/// is rendered verbatim by the statement renderer instead of being quoted.
/// See [`Value::as_raw_fragment`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// A one-element list is the raw-fragment convention from the spec:
    /// its sole element is emitted verbatim, bypassing quoting.
    pub fn as_raw_fragment(&self) -> Option<&Value> {
        match self {
            Value::List(items) if items.len() == 1 => Some(&items[0]),
            _ => None,
        }
    }

    /// Renders the value the way `toString()` would in the source system,
    /// used both for `NULL` comparison in predicates and for arithmetic
    /// fragment substitution.
    pub fn stringify(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
            Value::Bytes(bytes) => BASE64.encode(bytes),
            Value::List(items) => items
                .iter()
                .map(Value::stringify)
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(_) => "[object Object]".to_string(),
        }
    }

    /// True if the stringified value is the literal `null` (case-insensitive),
    /// used to normalize `field = null` into `field IS NULL`.
    pub fn is_sql_null(&self) -> bool {
        matches!(self, Value::Null) || self.stringify().eq_ignore_ascii_case("null")
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Decode a `serde_json::Value` produced by [`Value::encode`].
    pub fn decode(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => decode_string(s),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::decode).collect()),
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::decode(v)))
                    .collect(),
            ),
        }
    }

    /// Encode to the portable JSON representation described in the spec.
    pub fn encode(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(ts) => serde_json::Value::String(format!(
                "{TIMESTAMP_PREFIX}{}",
                ts.format(TIMESTAMP_FORMAT)
            )),
            Value::Bytes(bytes) => {
                serde_json::Value::String(format!("{BYTES_PREFIX}{}", BASE64.encode(bytes)))
            }
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::encode).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.encode()))
                    .collect(),
            ),
        }
    }

    /// Scans the value's textual form (recursing into lists) for any
    /// `%NAME%` or `#table:id#` placeholder syntax.
    pub fn is_placeholder_bearing(&self) -> bool {
        match self {
            Value::Text(s) => crate::resolver::contains_placeholder(s),
            Value::List(items) => items.iter().any(Value::is_placeholder_bearing),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stringify())
    }
}

fn decode_string(s: &str) -> Value {
    if let Some(rest) = s.strip_prefix(TIMESTAMP_PREFIX) {
        if let Ok(ts) = NaiveDateTime::parse_from_str(rest, TIMESTAMP_FORMAT) {
            return Value::Timestamp(ts);
        }
    }
    if let Some(rest) = s.strip_prefix(BYTES_PREFIX) {
        if let Ok(bytes) = BASE64.decode(rest) {
            return Value::Bytes(bytes);
        }
    }
    Value::Text(s.to_string())
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.encode().serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::decode(&raw))
    }
}
