//! # repairsync sync engine
//!
//! Reconciles a local [`RecordStore`](repairsync_core::RecordStore) with a
//! shared remote store.
//!
//! This crate provides:
//! - [`SyncEngine`]: single-flight cycle of normalize, retention sweep,
//!   pull, push and cursor commit
//! - [`RemoteStore`]: typed per-kind remote access, with the PostgREST
//!   [`RestRemote`] and the in-memory [`MemoryRemote`]
//! - [`normalize`]: repair of string timestamps before upload
//! - [`RetentionSweeper`]: removal of aged, delivered repair orders from the
//!   remote only
//!
//! ## Key Invariants
//!
//! - Pull always happens before push
//! - Conflicts are whole-record last-writer-wins on `modified_at`; ties keep
//!   the existing version on either side
//! - A record with a malformed id is never transmitted
//! - The cursor advances only after a push with zero errors
//! - The remote client never retries; the unmoved cursor is the retry

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod config;
mod cursor;
mod engine;
mod error;
mod http;
mod memory;
mod normalizer;
mod remote;
mod retention;
mod stats;

pub use auth::{AuthContext, NoSession, Session, SessionProvider, StaticSession};
pub use config::{RemoteConfig, RetentionPolicy, SyncConfig, ENV_REMOTE_URL, ENV_SERVICE_KEY};
pub use cursor::{commit_cursor, read_cursor, LAST_SYNC_KEY};
pub use engine::{SyncEngine, SyncState};
pub use error::{SyncError, SyncResult};
#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, RestRemote};
pub use memory::{CallCounts, MemoryRemote};
pub use normalizer::{normalize, parse_date, NormalizeReport};
pub use remote::RemoteStore;
pub use retention::{RetentionSweeper, SweepReport};
pub use stats::{EngineHistory, KindCounts, SyncOutcome, SyncStats, UploadStats};
