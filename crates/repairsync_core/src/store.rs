//! The record store.
//!
//! `RecordStore` owns every record timestamp. Collaborators hand it records
//! and get back what was committed; they never stamp `id`, `created_at` or
//! `modified_at` themselves.

use crate::backend::{InMemoryBackend, MetaTable, StoreBackend};
use crate::change_feed::{ChangeEvent, ChangeFeed, ChangeType, StoreObserver};
use crate::clock::{next_timestamp, Clock, Millis, SystemClock};
use crate::error::{StoreError, StoreResult};
use crate::id::new_record_id;
use crate::kind::EntityKind;
use crate::merge::{overlay, remote_wins, MergeOutcome};
use crate::record::{Record, Timestamp};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Active and tombstoned record counts for one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    /// Records without a tombstone.
    pub active: usize,
    /// Soft-deleted records.
    pub tombstones: usize,
}

/// One table's rows, keyed by id.
#[derive(Default)]
struct Table {
    rows: BTreeMap<String, Record>,
}

impl Table {
    fn load(kind: EntityKind, records: Vec<Record>) -> Self {
        let mut rows = BTreeMap::new();
        for record in records {
            match record.id.clone().filter(|id| !id.is_empty()) {
                Some(id) => {
                    rows.insert(id, record);
                }
                None => tracing::warn!(table = %kind, "dropping persisted record without id"),
            }
        }
        Self { rows }
    }

    /// Inserts `record` and persists the table, undoing the insert if the
    /// backend write fails.
    fn commit(
        &mut self,
        backend: &dyn StoreBackend,
        kind: EntityKind,
        id: &str,
        record: Record,
    ) -> StoreResult<()> {
        let previous = self.rows.insert(id.to_owned(), record);

        let snapshot: Vec<&Record> = self.rows.values().collect();
        if let Err(e) = backend.write_table(kind, &snapshot) {
            match previous {
                Some(prev) => {
                    self.rows.insert(id.to_owned(), prev);
                }
                None => {
                    self.rows.remove(id);
                }
            }
            return Err(e);
        }
        Ok(())
    }
}

/// Builder for [`RecordStore`].
///
/// Optional collaborators (observers, a custom clock) are injected here,
/// once, before the store is shared.
pub struct StoreBuilder {
    backend: Arc<dyn StoreBackend>,
    clock: Arc<dyn Clock>,
    observers: Vec<Arc<dyn StoreObserver>>,
}

impl StoreBuilder {
    /// Sets the persistence backend.
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn StoreBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attaches a post-commit observer.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn StoreObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Loads all tables from the backend and builds the store.
    pub fn build(self) -> StoreResult<RecordStore> {
        let mut tables = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            let records = self.backend.load_table(kind)?;
            tables.push(Mutex::new(Table::load(kind, records)));
        }
        let meta = self.backend.load_meta()?;

        let mut feed = ChangeFeed::new();
        for observer in self.observers {
            feed.attach(observer);
        }

        let store = RecordStore {
            tables,
            meta: Mutex::new(meta),
            backend: self.backend,
            clock: self.clock,
            feed,
            sequence: AtomicU64::new(0),
        };

        tracing::debug!(
            records = store.tables.iter().map(|t| t.lock().rows.len()).sum::<usize>(),
            observers = store.feed.observer_count(),
            "record store opened"
        );
        Ok(store)
    }
}

/// The local record store.
///
/// Each table sits behind its own lock, which serializes operations on one
/// entity kind. Operations on different kinds never contend.
pub struct RecordStore {
    tables: Vec<Mutex<Table>>,
    meta: Mutex<MetaTable>,
    backend: Arc<dyn StoreBackend>,
    clock: Arc<dyn Clock>,
    feed: ChangeFeed,
    sequence: AtomicU64,
}

impl RecordStore {
    /// Starts building a store with an in-memory backend and the system clock.
    pub fn builder() -> StoreBuilder {
        StoreBuilder {
            backend: Arc::new(InMemoryBackend::new()),
            clock: Arc::new(SystemClock),
            observers: Vec::new(),
        }
    }

    /// Opens a store over `backend`.
    pub fn open(backend: Arc<dyn StoreBackend>, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        Self::builder().backend(backend).clock(clock).build()
    }

    /// Opens an empty, ephemeral store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::builder().build()
    }

    /// Returns the current time according to the store's clock.
    pub fn now_millis(&self) -> Millis {
        self.clock.now_millis()
    }

    fn table(&self, kind: EntityKind) -> &Mutex<Table> {
        &self.tables[kind as usize]
    }

    fn emit(&self, kind: EntityKind, id: String, change_type: ChangeType, record: Record) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.feed.emit(ChangeEvent {
            sequence,
            kind,
            id,
            change_type,
            record,
        });
    }

    /// Creates or replaces a record.
    ///
    /// A record without an id is assigned a fresh UUID and `created_at = now`;
    /// any `created_at` it carries is ignored. A record with an id keeps the
    /// stored `created_at`. A record with an id that is not stored yet
    /// (an import) keeps its own `created_at`, or gets `now` if it has none.
    /// In every case `modified_at` is set to a value strictly greater than any
    /// previous one.
    ///
    /// Returns the record as committed.
    pub fn save(&self, kind: EntityKind, mut record: Record) -> StoreResult<Record> {
        record.strip_reserved_columns();
        let now = self.clock.now_millis();

        let (committed, change_type) = {
            let mut table = self.table(kind).lock();

            let (id, generated) = match record.id.take().filter(|id| !id.is_empty()) {
                Some(id) => (id, false),
                None => (new_record_id(), true),
            };
            if generated {
                record.created_at = None;
            }

            let (created_at, previous_modified, change_type) = match table.rows.get(&id) {
                Some(existing) => (
                    existing.created_at.clone().or(record.created_at.take()),
                    existing.modified_millis(),
                    ChangeType::Update,
                ),
                None => (record.created_at.take(), None, ChangeType::Insert),
            };

            record.id = Some(id.clone());
            record.created_at = Some(created_at.unwrap_or(Timestamp::Epoch(now)));
            record.modified_at = Some(Timestamp::Epoch(next_timestamp(now, previous_modified)));

            table.commit(self.backend.as_ref(), kind, &id, record.clone())?;
            (record, change_type)
        };

        tracing::debug!(table = %kind, id = ?committed.id(), ?change_type, "record saved");
        let id = committed.id.clone().unwrap_or_default();
        self.emit(kind, id, change_type, committed.clone());
        Ok(committed)
    }

    /// Returns a record by id, tombstones included.
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<Record> {
        self.table(kind).lock().rows.get(id).cloned()
    }

    /// Returns every record of `kind` that is not soft-deleted.
    pub fn get_all(&self, kind: EntityKind) -> Vec<Record> {
        self.table(kind)
            .lock()
            .rows
            .values()
            .filter(|r| !r.is_deleted())
            .cloned()
            .collect()
    }

    /// Returns every record of `kind`, tombstones included.
    pub fn get_all_with_tombstones(&self, kind: EntityKind) -> Vec<Record> {
        self.table(kind).lock().rows.values().cloned().collect()
    }

    /// Returns every record, tombstones included, whose numeric
    /// `modified_at` is greater than `cursor`.
    pub fn get_modified_after(&self, kind: EntityKind, cursor: Millis) -> Vec<Record> {
        self.table(kind)
            .lock()
            .rows
            .values()
            .filter(|r| r.modified_millis().is_some_and(|m| m > cursor))
            .cloned()
            .collect()
    }

    /// Applies `f` to a stored record and bumps its `modified_at`.
    ///
    /// This is the maintenance entry point (timestamp repair, tombstoning).
    /// `f` may rewrite any column except `id`. Returns `None` when no record
    /// with that id exists.
    pub fn modify<F>(&self, kind: EntityKind, id: &str, f: F) -> StoreResult<Option<Record>>
    where
        F: FnOnce(&mut Record),
    {
        self.modify_as(kind, id, ChangeType::Update, f)
    }

    fn modify_as<F>(
        &self,
        kind: EntityKind,
        id: &str,
        change_type: ChangeType,
        f: F,
    ) -> StoreResult<Option<Record>>
    where
        F: FnOnce(&mut Record),
    {
        let now = self.clock.now_millis();

        let committed = {
            let mut table = self.table(kind).lock();
            let Some(existing) = table.rows.get(id) else {
                return Ok(None);
            };

            let before = existing.modified_millis();
            let mut record = existing.clone();
            f(&mut record);

            let previous = match (before, record.modified_millis()) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
            record.id = Some(id.to_owned());
            record.modified_at = Some(Timestamp::Epoch(next_timestamp(now, previous)));

            table.commit(self.backend.as_ref(), kind, id, record.clone())?;
            record
        };

        self.emit(kind, id.to_owned(), change_type, committed.clone());
        Ok(Some(committed))
    }

    /// Soft-deletes a record.
    ///
    /// Deleting an unknown id is a successful no-op and returns `false`.
    /// Deleting a customer also soft-deletes that customer's repair orders,
    /// one by one; invoices are left alone.
    pub fn delete(&self, kind: EntityKind, id: &str) -> StoreResult<bool> {
        let tombstone = self.modify_as(kind, id, ChangeType::Delete, |r| r.deleted = true)?;
        if tombstone.is_none() {
            tracing::debug!(table = %kind, id, "delete of unknown record ignored");
            return Ok(false);
        }
        tracing::debug!(table = %kind, id, "record tombstoned");

        if kind == EntityKind::Customer {
            let orders: Vec<String> = self
                .get_all(EntityKind::RepairOrder)
                .into_iter()
                .filter(|o| o.customer_id() == Some(id))
                .filter_map(|o| o.id)
                .collect();

            for order_id in orders {
                self.delete(EntityKind::RepairOrder, &order_id)?;
            }
        }

        Ok(true)
    }

    /// Merges a record received from the remote store.
    ///
    /// Inserts it if no local record has the same id. Otherwise the remote
    /// version replaces the local one only if its `modified_at` is strictly
    /// greater; ties leave the local record untouched. The comparison and the
    /// write happen under the same table lock.
    ///
    /// Remote timestamps are kept as received. Because an overwrite requires
    /// a strictly greater `modified_at`, the local value still only grows.
    pub fn merge_remote(&self, kind: EntityKind, remote: Record) -> StoreResult<MergeOutcome> {
        let id = remote
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::invalid_record("remote record has no id"))?;
        let now = self.clock.now_millis();

        let (outcome, committed) = {
            let mut table = self.table(kind).lock();

            let (outcome, mut record) = match table.rows.get(&id) {
                None => {
                    let mut inserted = remote;
                    inserted.fields.retain(|_, v| !v.is_null());
                    (MergeOutcome::Inserted, inserted)
                }
                Some(local) if remote_wins(local.modified_millis(), remote.modified_millis()) => {
                    (MergeOutcome::Updated, overlay(local, remote))
                }
                Some(_) => return Ok(MergeOutcome::Unchanged),
            };

            record.strip_reserved_columns();
            if record.created_at.is_none() {
                record.created_at = Some(Timestamp::Epoch(now));
            }
            if record.modified_at.is_none() {
                record.modified_at = Some(Timestamp::Epoch(now));
            }

            table.commit(self.backend.as_ref(), kind, &id, record.clone())?;
            (outcome, record)
        };

        tracing::debug!(table = %kind, id = %id, ?outcome, "remote record merged");
        self.emit(kind, id, ChangeType::Merge, committed);
        Ok(outcome)
    }

    /// Reads a metadata value.
    pub fn meta_get(&self, key: &str) -> Option<Value> {
        self.meta.lock().get(key).cloned()
    }

    /// Writes a metadata value and persists the metadata table.
    pub fn meta_set(&self, key: &str, value: Value) -> StoreResult<()> {
        let mut meta = self.meta.lock();
        let previous = meta.insert(key.to_owned(), value);

        if let Err(e) = self.backend.write_meta(&meta) {
            match previous {
                Some(prev) => {
                    meta.insert(key.to_owned(), prev);
                }
                None => {
                    meta.remove(key);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Returns active and tombstone counts for a table.
    pub fn counts(&self, kind: EntityKind) -> TableCounts {
        let table = self.table(kind).lock();
        table
            .rows
            .values()
            .fold(TableCounts::default(), |mut counts, record| {
                if record.is_deleted() {
                    counts.tombstones += 1;
                } else {
                    counts.active += 1;
                }
                counts
            })
    }

    /// Subscribes to post-commit change events.
    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}
