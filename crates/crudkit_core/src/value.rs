//! Canonical field values
//!
//! Every part of the toolkit that has to talk about "the value of a field"
//! without knowing the entity type statically (filters, equality sets, the
//! in-memory backing, schema parsing) does so through [`FieldValue`]. The
//! wire rules live here too: identifiers and timestamps cross process
//! boundaries as text, and incoming values are normalized to the canonical
//! representation on ingress.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Wire-level type of an entity field
///
/// Declared on every field descriptor and used to coerce untyped wire input
/// into a [`FieldValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireType {
    /// UUID identifier, serialized as text
    Uuid,
    /// UTF-8 string
    Text,
    /// 64-bit signed integer
    Integer,
    /// 64-bit float
    Float,
    /// Boolean
    Boolean,
    /// UTC timestamp, serialized as RFC 3339 text
    DateTime,
    /// Calendar date, serialized as `YYYY-MM-DD` text
    Date,
    /// Arbitrary JSON document
    Json,
}

/// A canonical field value
///
/// The closed set of value shapes the toolkit moves between callers,
/// schemas, and backings.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Uuid(Uuid),
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Json(JsonValue),
}

impl FieldValue {
    /// Returns the wire type this value naturally serializes as
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldValue::Uuid(_) => WireType::Uuid,
            FieldValue::Text(_) => WireType::Text,
            FieldValue::Integer(_) => WireType::Integer,
            FieldValue::Float(_) => WireType::Float,
            FieldValue::Boolean(_) => WireType::Boolean,
            FieldValue::DateTime(_) => WireType::DateTime,
            FieldValue::Date(_) => WireType::Date,
            FieldValue::Json(_) => WireType::Json,
        }
    }

    /// Returns the underlying UUID for identifier values
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(id) => Some(*id),
            _ => None,
        }
    }

    /// Compares two values of the same shape
    ///
    /// Integers and floats compare across the two numeric shapes. Values of
    /// any other differing shapes, and shapes with no meaningful order
    /// (booleans, JSON documents), return `None`.
    pub fn try_cmp(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Uuid(a), FieldValue::Uuid(b)) => Some(a.cmp(b)),
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.partial_cmp(b),
            (FieldValue::Integer(a), FieldValue::Float(b)) => (*a as f64).partial_cmp(b),
            (FieldValue::Float(a), FieldValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => Some(a.cmp(b)),
            (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Serializes the value to its wire representation
    ///
    /// Identifiers, timestamps, and dates become text; everything else maps
    /// onto the matching JSON shape.
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Uuid(id) => JsonValue::String(id.to_string()),
            FieldValue::Text(s) => JsonValue::String(s.clone()),
            FieldValue::Integer(n) => JsonValue::from(*n),
            FieldValue::Float(n) => {
                serde_json::Number::from_f64(*n).map(JsonValue::Number).unwrap_or(JsonValue::Null)
            }
            FieldValue::Boolean(b) => JsonValue::Bool(*b),
            FieldValue::DateTime(ts) => JsonValue::String(ts.to_rfc3339()),
            FieldValue::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            FieldValue::Json(v) => v.clone(),
        }
    }

    /// Coerces an untyped wire value into the canonical representation
    ///
    /// Returns `Ok(None)` for JSON `null`. UUIDs are accepted in any textual
    /// form `uuid` itself parses (hyphenated, simple, urn), so both wire text
    /// and database-native renderings normalize to the same identifier.
    ///
    /// # Arguments
    ///
    /// * `wire` - The declared wire type of the target field
    /// * `value` - The raw JSON value received
    ///
    /// # Errors
    ///
    /// A human-readable message describing the mismatch, suitable for a
    /// field-level validation error.
    pub fn from_json(wire: WireType, value: &JsonValue) -> Result<Option<FieldValue>, String> {
        if value.is_null() {
            return Ok(None);
        }
        let coerced = match wire {
            WireType::Uuid => match value.as_str() {
                Some(s) => FieldValue::Uuid(
                    Uuid::parse_str(s).map_err(|_| format!("`{s}` is not a valid UUID"))?,
                ),
                None => return Err("expected a UUID string".to_string()),
            },
            WireType::Text => match value.as_str() {
                Some(s) => FieldValue::Text(s.to_string()),
                None => return Err("expected a string".to_string()),
            },
            WireType::Integer => match value.as_i64() {
                Some(n) => FieldValue::Integer(n),
                None => return Err("expected an integer".to_string()),
            },
            WireType::Float => match value.as_f64() {
                Some(n) => FieldValue::Float(n),
                None => return Err("expected a number".to_string()),
            },
            WireType::Boolean => match value.as_bool() {
                Some(b) => FieldValue::Boolean(b),
                None => return Err("expected a boolean".to_string()),
            },
            WireType::DateTime => match value.as_str() {
                Some(s) => FieldValue::DateTime(
                    DateTime::parse_from_rfc3339(s)
                        .map(|ts| ts.with_timezone(&Utc))
                        .map_err(|_| format!("`{s}` is not an RFC 3339 timestamp"))?,
                ),
                None => return Err("expected a timestamp string".to_string()),
            },
            WireType::Date => match value.as_str() {
                Some(s) => FieldValue::Date(
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .map_err(|_| format!("`{s}` is not a `YYYY-MM-DD` date"))?,
                ),
                None => return Err("expected a date string".to_string()),
            },
            WireType::Json => FieldValue::Json(value.clone()),
        };
        Ok(Some(coerced))
    }
}

impl From<Uuid> for FieldValue {
    fn from(id: Uuid) -> Self {
        FieldValue::Uuid(id)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Float(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FieldValue::DateTime(ts)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}
