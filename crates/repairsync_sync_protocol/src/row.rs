//! Remote row representation.

use repairsync_core::{Millis, Record, StoreError, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A row as stored by the remote collection: a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteRow(Map<String, Value>);

impl RemoteRow {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Returns the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the row, returning the JSON object.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Returns the `id` column.
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// Returns the `modified_at` column as epoch milliseconds.
    pub fn modified_millis(&self) -> Option<Millis> {
        self.timestamp("modified_at")
    }

    /// Returns the `created_at` column as epoch milliseconds.
    pub fn created_millis(&self) -> Option<Millis> {
        self.timestamp("created_at")
    }

    fn timestamp(&self, column: &str) -> Option<Millis> {
        match self.0.get(column)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as Millis)),
            _ => None,
        }
    }

    /// Returns a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Sets a column value.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.0.insert(column.to_owned(), value.into());
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the row into a local record without any projection.
    pub fn into_record(self) -> Result<Record, StoreError> {
        Record::from_json(Value::Object(self.0))
    }
}

/// Converts a stored timestamp into a JSON column value.
pub(crate) fn timestamp_value(ts: &Timestamp) -> Value {
    match ts {
        Timestamp::Epoch(ms) => Value::from(*ms),
        Timestamp::Text(s) => Value::from(s.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accessors() {
        let row: RemoteRow = serde_json::from_value(json!({
            "id": "abc",
            "created_at": 10,
            "modified_at": 20.0,
            "status": "delivered",
        }))
        .unwrap();

        assert_eq!(row.id(), Some("abc"));
        assert_eq!(row.created_millis(), Some(10));
        assert_eq!(row.modified_millis(), Some(20));
        assert_eq!(row.get("status"), Some(&json!("delivered")));
        assert_eq!(row.len(), 4);
    }

    #[test]
    fn text_timestamp_is_not_numeric() {
        let mut row = RemoteRow::new();
        row.set("modified_at", "2024-01-01");
        assert_eq!(row.modified_millis(), None);
    }

    #[test]
    fn serializes_as_plain_object() {
        let mut row = RemoteRow::new();
        row.set("id", "x");
        assert_eq!(serde_json::to_value(&row).unwrap(), json!({ "id": "x" }));
    }
}
