//! In-memory backend for testing.

use super::{MetaTable, StoreBackend};
use crate::error::StoreResult;
use crate::kind::EntityKind;
use crate::record::Record;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory backend.
///
/// Snapshots survive as long as the backend does, so sharing one backend
/// between two store instances simulates a restart.
///
/// # Example
///
/// ```rust
/// use repairsync_core::{EntityKind, InMemoryBackend, Record, StoreBackend};
///
/// let backend = InMemoryBackend::new();
/// let record = Record::new().with_id("a");
/// backend.write_table(EntityKind::Customer, &[&record]).unwrap();
/// assert_eq!(backend.load_table(EntityKind::Customer).unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: RwLock<HashMap<EntityKind, Vec<Record>>>,
    meta: RwLock<MetaTable>,
    writes: RwLock<u64>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of snapshot writes performed so far.
    pub fn write_count(&self) -> u64 {
        *self.writes.read()
    }
}

impl StoreBackend for InMemoryBackend {
    fn load_table(&self, kind: EntityKind) -> StoreResult<Vec<Record>> {
        Ok(self.tables.read().get(&kind).cloned().unwrap_or_default())
    }

    fn write_table(&self, kind: EntityKind, records: &[&Record]) -> StoreResult<()> {
        let snapshot = records.iter().map(|r| (*r).clone()).collect();
        self.tables.write().insert(kind, snapshot);
        *self.writes.write() += 1;
        Ok(())
    }

    fn load_meta(&self) -> StoreResult<MetaTable> {
        Ok(self.meta.read().clone())
    }

    fn write_meta(&self, meta: &MetaTable) -> StoreResult<()> {
        *self.meta.write() = meta.clone();
        *self.writes.write() += 1;
        Ok(())
    }
}
