//! Persistence backends for the record store.
//!
//! A backend stores whole-table snapshots. The store keeps every table in
//! memory and hands the backend the full table after each commit, so
//! backends never need to understand individual mutations.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral stores
//! - [`FileBackend`] - One CBOR snapshot file per table in a locked directory

use crate::error::StoreResult;
use crate::kind::EntityKind;
use crate::record::Record;
use serde_json::Value;
use std::collections::BTreeMap;

#[cfg(feature = "std")]
mod file;
mod memory;

#[cfg(feature = "std")]
pub use file::FileBackend;
pub use memory::InMemoryBackend;

/// Key-value metadata table.
pub type MetaTable = BTreeMap<String, Value>;

/// A persistence backend for record tables.
///
/// # Invariants
///
/// - `load_table` returns exactly the records passed to the last successful
///   `write_table` for that kind (empty if never written)
/// - a failed `write_table` leaves the previous snapshot intact
/// - backends must be `Send + Sync`; the store serializes writes per table
pub trait StoreBackend: Send + Sync {
    /// Loads all records of a table.
    fn load_table(&self, kind: EntityKind) -> StoreResult<Vec<Record>>;

    /// Replaces the persisted contents of a table.
    fn write_table(&self, kind: EntityKind, records: &[&Record]) -> StoreResult<()>;

    /// Loads the metadata table.
    fn load_meta(&self) -> StoreResult<MetaTable>;

    /// Replaces the persisted metadata table.
    fn write_meta(&self, meta: &MetaTable) -> StoreResult<()>;
}
