//! Conversion of raw response bodies into a value tree.
//!
//! JSON bodies become [`ApiValue`] trees whose date-bearing string fields are
//! upgraded to [`chrono::DateTime`]. Anything that isn't JSON is handed back
//! as text, which is how raw file content comes through.

use crate::errors::{GitHubError, GitHubResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// Field names whose string values are parsed as date-times.
pub const DATE_PROPERTIES: &[&str] = &[
    "closed_at",
    "committed_at",
    "completed_at",
    "created_at",
    "date",
    "due_on",
    "last_edited_at",
    "last_read_at",
    "merged_at",
    "published_at",
    "pushed_at",
    "starred_at",
    "started_at",
    "submitted_at",
    "timestamp",
    "updated_at",
];

/// Ordered, case-sensitive object map.
pub type ApiMap = Vec<(String, ApiValue)>;

/// Materialized response value.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiValue {
    /// JSON null.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number.
    Number(Number),
    /// JSON string, or a non-JSON body returned verbatim.
    String(String),
    /// A date field upgraded from its string form.
    DateTime(DateTime<Utc>),
    /// JSON array.
    Array(Vec<ApiValue>),
    /// JSON object with keys kept in document order.
    Object(ApiMap),
}

impl ApiValue {
    /// Looks up a field of an object.
    pub fn get(&self, key: &str) -> Option<&ApiValue> {
        match self {
            Self::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Sets a field of an object, replacing an existing value with the same key.
    /// Has no effect on non-objects.
    pub fn insert(&mut self, key: impl Into<String>, value: ApiValue) {
        if let Self::Object(fields) = self {
            let key = key.into();
            match fields.iter_mut().find(|(k, _)| *k == key) {
                Some((_, existing)) => *existing = value,
                None => fields.push((key, value)),
            }
        }
    }

    /// String content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, if this is an integral number.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Unsigned integer content, if this is a non-negative integral number.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Boolean content.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Upgraded date-time content.
    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::DateTime(d) => Some(d),
            _ => None,
        }
    }

    /// Array content.
    pub fn as_array(&self) -> Option<&[ApiValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns true for objects.
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Returns true for null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts back to JSON. Dates render as RFC 3339 strings.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::DateTime(d) => Value::String(format_datetime(d)),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(fields) => {
                let mut map = Map::with_capacity(fields.len());
                for (k, v) in fields {
                    map.insert(k.clone(), v.to_json());
                }
                Value::Object(map)
            }
        }
    }

    /// Projects the value onto a typed structure.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> GitHubResult<T> {
        serde_json::from_value(self.to_json()).map_err(|e| {
            GitHubError::deserialization(format!("Failed to deserialize response: {}", e))
        })
    }

    /// Flattens into a list: arrays yield their items, null yields nothing.
    pub fn into_items(self) -> Vec<ApiValue> {
        match self {
            Self::Array(items) => items,
            Self::Null => Vec::new(),
            other => vec![other],
        }
    }
}

impl From<Value> for ApiValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

impl From<&str> for ApiValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ApiValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<u64> for ApiValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl Serialize for ApiValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::DateTime(d) => serializer.serialize_str(&format_datetime(d)),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

fn format_datetime(d: &DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Materializes a response body.
///
/// JSON is parsed into a tree; any other content is returned as
/// [`ApiValue::String`]. Empty bodies (204, most DELETEs) become
/// [`ApiValue::Null`]. With `smarter_objects` off the date walk is skipped.
pub fn materialize(raw: &[u8], smarter_objects: bool) -> ApiValue {
    let text = String::from_utf8_lossy(raw);
    if text.trim().is_empty() {
        return ApiValue::Null;
    }

    let parsed = match serde_json::from_str::<Value>(&text) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Response body is not JSON, returning raw content");
            return ApiValue::String(text.into_owned());
        }
    };

    let mut value = ApiValue::from(parsed);
    if smarter_objects && !is_integer_sequence(&value) {
        upgrade_dates(&mut value);
    }
    value
}

/// Bare integer arrays never carry dates.
fn is_integer_sequence(value: &ApiValue) -> bool {
    match value {
        ApiValue::Number(_) => true,
        ApiValue::Array(items) => items
            .iter()
            .all(|v| matches!(v, ApiValue::Number(n) if n.is_i64() || n.is_u64())),
        _ => false,
    }
}

/// Walks the tree and replaces allow-listed date strings with date-times.
pub fn upgrade_dates(value: &mut ApiValue) {
    match value {
        ApiValue::Array(items) => items.iter_mut().for_each(upgrade_dates),
        ApiValue::Object(fields) => {
            for (key, field) in fields.iter_mut() {
                if let ApiValue::String(s) = field {
                    if DATE_PROPERTIES.contains(&key.as_str()) && !s.is_empty() {
                        match DateTime::parse_from_rfc3339(s) {
                            Ok(parsed) => *field = ApiValue::DateTime(parsed.with_timezone(&Utc)),
                            Err(e) => {
                                tracing::debug!(property = %key, value = %s, error = %e, "Unable to convert property to a date-time");
                            }
                        }
                    }
                    continue;
                }
                upgrade_dates(field);
            }
        }
        _ => {}
    }
}
