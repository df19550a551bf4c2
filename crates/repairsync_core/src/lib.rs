//! # repairsync core
//!
//! Offline-first local record store.
//!
//! This crate provides:
//! - [`RecordStore`]: per-table serialized mutations with store-owned
//!   identifiers and timestamps
//! - Soft deletes (tombstones) that stay visible to change queries so
//!   deletions can propagate
//! - Record-level last-writer-wins merging of remote records
//! - A post-commit change feed for decoupled subscribers
//! - In-memory and file-backed persistence
//!
//! ## Key Invariants
//!
//! - `id` is assigned once at creation and never reassigned
//! - `modified_at` strictly increases on every committed mutation
//! - `delete` never removes a row; it writes a tombstone
//! - Observer failures never fail the mutation that triggered them
//!
//! ## Example
//!
//! ```rust
//! use repairsync_core::{EntityKind, Record, RecordStore};
//!
//! let store = RecordStore::open_in_memory().unwrap();
//! let saved = store
//!     .save(EntityKind::Customer, Record::new().with("name", "Ana"))
//!     .unwrap();
//! assert!(saved.id().is_some());
//!
//! store.delete(EntityKind::Customer, saved.id().unwrap()).unwrap();
//! assert!(store.get_all(EntityKind::Customer).is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod change_feed;
mod clock;
mod error;
mod id;
mod kind;
mod merge;
mod record;
mod store;

#[cfg(feature = "std")]
pub use backend::FileBackend;
pub use backend::{InMemoryBackend, MetaTable, StoreBackend};
pub use change_feed::{ChangeEvent, ChangeFeed, ChangeType, ObserverError, StoreObserver};
pub use clock::{next_timestamp, Clock, ManualClock, Millis, SystemClock};
pub use error::{StoreError, StoreResult};
pub use id::{is_valid_uuid, new_record_id};
pub use kind::EntityKind;
pub use merge::{local_is_newer, remote_wins, MergeOutcome};
pub use record::{Record, Timestamp, RESERVED_COLUMNS};
pub use store::{RecordStore, StoreBuilder, TableCounts};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
