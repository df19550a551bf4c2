//! Record fixtures and store helpers.

use repairsync_core::{
    EntityKind, FileBackend, InMemoryBackend, ManualClock, Millis, Record, RecordStore,
    StoreBackend, Timestamp,
};
use repairsync_sync_protocol::RemoteRow;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A fixed reference time (2025-10-09T08:53:20Z).
pub const T0: Millis = 1_760_000_000_000;

/// One day in milliseconds.
pub const DAY: Millis = 24 * 60 * 60 * 1000;

/// Returns a deterministic UUID string for `n`.
pub fn uuid(n: u128) -> String {
    ::uuid::Uuid::from_u128(n).to_string()
}

/// A customer without id.
pub fn customer(name: &str) -> Record {
    Record::new()
        .with("name", name)
        .with("phone", "600000000")
}

/// A repair order for `customer_id` in `status`.
pub fn repair_order(customer_id: &str, status: &str) -> Record {
    Record::new()
        .with("customer_id", customer_id)
        .with("device_type", "phone")
        .with("brand", "Acme")
        .with("problem", "cracked screen")
        .with("status", status)
}

/// An invoice for `customer_id`.
pub fn invoice(customer_id: &str, total: f64) -> Record {
    Record::new()
        .with("customer_id", customer_id)
        .with("invoice_number", "F-0001")
        .with("total", total)
        .with("status", "paid")
}

/// Sets `id`, `created_at` and `modified_at` explicitly.
///
/// Such a record must be written through [`TestStore::seeded`], since
/// `save` would restamp it.
pub fn stamped(record: Record, id: &str, created: Millis, modified: Millis) -> Record {
    let mut record = record.with_id(id);
    record.created_at = Some(Timestamp::Epoch(created));
    record.modified_at = Some(Timestamp::Epoch(modified));
    record
}

/// Builds a remote row from a JSON object.
pub fn remote_row(value: Value) -> RemoteRow {
    serde_json::from_value(value).expect("remote row must be a JSON object")
}

/// A store with a manual clock, cleaned up on drop.
pub struct TestStore {
    /// The store.
    pub store: Arc<RecordStore>,
    /// The clock driving it.
    pub clock: Arc<ManualClock>,
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// An empty in-memory store at `now`.
    pub fn memory(now: Millis) -> Self {
        Self::seeded(now, &[])
    }

    /// An in-memory store whose tables already hold `records`, exactly as
    /// given (no id assignment, no timestamp stamping).
    pub fn seeded(now: Millis, records: &[(EntityKind, Record)]) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        write_raw(backend.as_ref(), records);

        let clock = Arc::new(ManualClock::new(now));
        let store = RecordStore::open(backend, clock.clone()).expect("open in-memory store");
        Self {
            store: Arc::new(store),
            clock,
            _temp_dir: None,
        }
    }

    /// A file-backed store in a fresh temporary directory.
    pub fn file(now: Millis) -> Self {
        let temp_dir = TempDir::new().expect("create temp directory");
        let clock = Arc::new(ManualClock::new(now));
        let store = open_file_store(temp_dir.path(), clock.clone());
        Self {
            store: Arc::new(store),
            clock,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the directory of a file-backed store.
    pub fn path(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }

    /// Moves the clock forward by `ms`.
    pub fn advance(&self, ms: Millis) {
        self.clock.set(self.clock_now() + ms);
    }

    /// Returns the clock's current value.
    pub fn clock_now(&self) -> Millis {
        self.store.now_millis()
    }
}

impl std::ops::Deref for TestStore {
    type Target = RecordStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Opens a file-backed store at `path`.
pub fn open_file_store(path: &Path, clock: Arc<ManualClock>) -> RecordStore {
    let backend = FileBackend::open(path).expect("open file backend");
    RecordStore::open(Arc::new(backend), clock).expect("open file store")
}

/// Writes records straight to a backend, grouped by kind.
pub fn write_raw(backend: &dyn StoreBackend, records: &[(EntityKind, Record)]) {
    for kind in EntityKind::ALL {
        let rows: Vec<&Record> = records
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, r)| r)
            .collect();
        if !rows.is_empty() {
            backend.write_table(kind, &rows).expect("write raw table");
        }
    }
}
