//! A store, an in-memory remote and an engine wired together.

use crate::fixtures::TestStore;
use repairsync_core::{EntityKind, Millis, Record};
use repairsync_sync_engine::{
    read_cursor, AuthContext, MemoryRemote, Session, SyncConfig, SyncEngine, SyncOutcome,
};
use std::sync::Arc;

/// Bearer token used by [`user_auth`].
pub const TEST_TOKEN: &str = "test-user-token";

/// An auth context with an active user session.
pub fn user_auth() -> AuthContext {
    AuthContext::user(Session::new(TEST_TOKEN).with_user_id("test-user"))
}

/// One device: its store and engine, talking to a shared remote.
pub struct SyncRig {
    /// The local store.
    pub store: TestStore,
    /// The remote shared by every rig built with [`SyncRig::sharing`].
    pub remote: Arc<MemoryRemote>,
    /// The engine.
    pub engine: Arc<SyncEngine>,
}

impl SyncRig {
    /// A rig with an empty store and an empty remote.
    pub fn new(now: Millis) -> Self {
        Self::with_store(TestStore::memory(now), Arc::new(MemoryRemote::new()))
    }

    /// A second device talking to the same remote as `other`.
    pub fn sharing(other: &SyncRig, now: Millis) -> Self {
        Self::with_store(TestStore::memory(now), other.remote.clone())
    }

    /// A rig over an existing store.
    pub fn with_store(store: TestStore, remote: Arc<MemoryRemote>) -> Self {
        Self::with_config(store, remote, SyncConfig::default())
    }

    /// A rig with a custom configuration.
    pub fn with_config(store: TestStore, remote: Arc<MemoryRemote>, config: SyncConfig) -> Self {
        let engine = SyncEngine::new(store.store.clone(), config).with_remote(remote.clone());
        Self {
            store,
            remote,
            engine: Arc::new(engine),
        }
    }

    /// Runs a cycle with a user session.
    pub async fn sync_as_user(&self) -> SyncOutcome {
        self.engine.sync_with(user_auth()).await
    }

    /// Runs a cycle without a user session.
    pub async fn sync_anonymous(&self) -> SyncOutcome {
        self.engine.sync_with(AuthContext::service()).await
    }

    /// Saves a record and returns it as committed.
    pub fn save(&self, kind: EntityKind, record: Record) -> Record {
        self.store.save(kind, record).expect("save record")
    }

    /// Returns the current cursor.
    pub fn cursor(&self) -> Millis {
        read_cursor(&self.store)
    }
}
