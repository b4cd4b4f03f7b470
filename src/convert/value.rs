//! Native field values held by records.

use std::net::Ipv4Addr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Number, Value};
use uuid::Uuid;

use super::secret::SecretHash;

/// ISO-8601 layout used for datetimes in documents
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
/// ISO-8601 layout used for dates in documents
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
/// ISO-8601 layout used for times in documents
pub(crate) const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// A strongly typed attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Blob(Vec<u8>),
    Uuid(Uuid),
    Ipv4(Ipv4Addr),
    /// Enum member, by symbolic name
    Enum(String),
    /// Identity of a related record
    Reference(i64),
    Secret(SecretHash),
    /// Structured JSON kept as-is
    Json(Value),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns the variant name for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "text",
            FieldValue::Date(_) => "date",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::Time(_) => "time",
            FieldValue::Blob(_) => "blob",
            FieldValue::Uuid(_) => "uuid",
            FieldValue::Ipv4(_) => "ipv4",
            FieldValue::Enum(_) => "enum",
            FieldValue::Reference(_) => "reference",
            FieldValue::Secret(_) => "secret",
            FieldValue::Json(_) => "json",
        }
    }

    /// Integer view of identity-like values
    pub fn as_identity(&self) -> Option<i64> {
        match self {
            FieldValue::Int(id) | FieldValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) | FieldValue::Enum(text) => Some(text),
            _ => None,
        }
    }

    /// Identity mapping from a JSON value.
    ///
    /// Scalars map to their native variant; arrays and objects stay JSON.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => n.as_f64().map_or(FieldValue::Json(value.clone()), FieldValue::Float),
            },
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => FieldValue::Json(value.clone()),
        }
    }

    /// Generic JSON rendering, used when no typed encoder applies.
    ///
    /// Non-finite floats render as `null`.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) | FieldValue::Reference(i) => Value::from(*i),
            FieldValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            FieldValue::Text(s) | FieldValue::Enum(s) => Value::String(s.clone()),
            FieldValue::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
            FieldValue::DateTime(dt) => Value::String(dt.format(DATETIME_FORMAT).to_string()),
            FieldValue::Time(t) => Value::String(t.format(TIME_FORMAT).to_string()),
            FieldValue::Blob(bytes) => Value::String(STANDARD.encode(bytes)),
            FieldValue::Uuid(u) => Value::String(u.simple().to_string()),
            FieldValue::Ipv4(ip) => Value::String(ip.to_string()),
            FieldValue::Secret(hash) => Value::String(hash.as_str().to_string()),
            FieldValue::Json(v) => v.clone(),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}
