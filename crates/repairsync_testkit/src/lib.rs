//! # repairsync testkit
//!
//! Test utilities for repairsync.
//!
//! This crate provides:
//! - Record fixtures and deterministic ids
//! - [`TestStore`]: a record store driven by a [`ManualClock`](repairsync_core::ManualClock),
//!   in memory or in a temporary directory, optionally seeded with raw
//!   (unstamped) records
//! - [`SyncRig`]: a store, an in-memory remote and an engine wired together
//! - Property-based generators for ids and date strings
//!
//! ## Usage
//!
//! ```rust,ignore
//! use repairsync_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn pushes_new_customer() {
//!     let rig = SyncRig::new(T0);
//!     rig.store.save(EntityKind::Customer, customer("Ana")).unwrap();
//!     assert!(rig.sync_as_user().await.success);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod rig;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::rig::*;
    pub use repairsync_core::{EntityKind, Record, RecordStore, Timestamp};
}

pub use fixtures::*;
pub use generators::*;
pub use rig::*;
