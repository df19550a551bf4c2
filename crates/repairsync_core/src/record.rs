//! Record representation.
//!
//! A record is a dynamic JSON-like document with four columns owned by the
//! store (`id`, `created_at`, `modified_at`, `deleted`) and any number of
//! entity-specific fields.

use crate::clock::Millis;
use crate::error::{StoreError, StoreResult};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Column names managed by the store. They never appear in [`Record::fields`].
pub const RESERVED_COLUMNS: [&str; 4] = ["id", "created_at", "modified_at", "deleted"];

/// A stored timestamp.
///
/// Timestamps are epoch milliseconds. Records imported from outside may carry
/// a formatted date string instead; those are kept as [`Timestamp::Text`]
/// until the normalizer repairs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamp {
    /// Epoch milliseconds.
    Epoch(Millis),
    /// A date string that has not been normalized yet.
    Text(String),
}

impl Timestamp {
    /// Returns the epoch value, or `None` for a text timestamp.
    pub fn as_millis(&self) -> Option<Millis> {
        match self {
            Timestamp::Epoch(ms) => Some(*ms),
            Timestamp::Text(_) => None,
        }
    }

    /// Returns true if this timestamp still needs normalizing.
    pub fn is_text(&self) -> bool {
        matches!(self, Timestamp::Text(_))
    }
}

impl From<Millis> for Timestamp {
    fn from(ms: Millis) -> Self {
        Timestamp::Epoch(ms)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Timestamp::Epoch(ms) => serializer.serialize_i64(*ms),
            Timestamp::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimestampVisitor;

        impl<'de> Visitor<'de> for TimestampVisitor {
            type Value = Timestamp;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("epoch milliseconds or a date string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Timestamp, E> {
                Ok(Timestamp::Epoch(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Timestamp, E> {
                i64::try_from(v)
                    .map(Timestamp::Epoch)
                    .map_err(|_| E::custom("timestamp out of range"))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Timestamp, E> {
                if v.is_finite() {
                    Ok(Timestamp::Epoch(v.trunc() as i64))
                } else {
                    Err(E::custom("timestamp is not finite"))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Timestamp, E> {
                Ok(Timestamp::Text(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Timestamp, E> {
                Ok(Timestamp::Text(v))
            }
        }

        deserializer.deserialize_any(TimestampVisitor)
    }
}

/// A single record of any entity kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// UUID string; `None` until the store assigns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    /// Last modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<Timestamp>,
    /// Tombstone flag.
    #[serde(
        default,
        deserialize_with = "deserialize_flag",
        skip_serializing_if = "is_false"
    )]
    pub deleted: bool,
    /// Entity-specific columns.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from a JSON object.
    pub fn from_json(value: Value) -> StoreResult<Self> {
        if !value.is_object() {
            return Err(StoreError::invalid_record("expected a JSON object"));
        }
        serde_json::from_value(value).map_err(|e| StoreError::invalid_record(e.to_string()))
    }

    /// Converts the record to a JSON object.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Sets a field, returning the record for chaining.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets the id, returning the record for chaining.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns the id, if assigned.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns a field value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns a field as a string slice.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Sets an entity field. Store-managed columns are ignored.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        if RESERVED_COLUMNS.contains(&key) {
            return;
        }
        self.fields.insert(key.to_owned(), value.into());
    }

    /// Removes an entity field.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Returns `created_at` as epoch milliseconds, if numeric.
    pub fn created_millis(&self) -> Option<Millis> {
        self.created_at.as_ref().and_then(Timestamp::as_millis)
    }

    /// Returns `modified_at` as epoch milliseconds, if numeric.
    pub fn modified_millis(&self) -> Option<Millis> {
        self.modified_at.as_ref().and_then(Timestamp::as_millis)
    }

    /// Returns true if this record is a tombstone.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Returns the populated `customer_id` reference, if any.
    pub fn customer_id(&self) -> Option<&str> {
        self.get_str("customer_id").filter(|s| !s.is_empty())
    }

    /// Drops reserved column names that slipped into `fields`.
    pub(crate) fn strip_reserved_columns(&mut self) {
        for column in RESERVED_COLUMNS {
            self.fields.remove(column);
        }
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}
