//! The shared pull/push cursor.

use repairsync_core::{Millis, RecordStore, StoreResult};
use serde_json::Value;

/// Metadata key holding the cursor.
pub const LAST_SYNC_KEY: &str = "last_sync";

/// Reads the cursor; `0` before the first successful cycle.
pub fn read_cursor(store: &RecordStore) -> Millis {
    store
        .meta_get(LAST_SYNC_KEY)
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
}

/// Persists a new cursor value.
pub fn commit_cursor(store: &RecordStore, cursor: Millis) -> StoreResult<()> {
    store.meta_set(LAST_SYNC_KEY, Value::from(cursor))?;
    tracing::debug!(cursor, "sync cursor committed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_zero_and_persists() {
        let store = RecordStore::open_in_memory().unwrap();
        assert_eq!(read_cursor(&store), 0);

        commit_cursor(&store, 1_700_000_000_000).unwrap();
        assert_eq!(read_cursor(&store), 1_700_000_000_000);
    }

    #[test]
    fn non_numeric_cursor_reads_as_zero() {
        let store = RecordStore::open_in_memory().unwrap();
        store
            .meta_set(LAST_SYNC_KEY, Value::from("2024-01-01"))
            .unwrap();
        assert_eq!(read_cursor(&store), 0);
    }
}
