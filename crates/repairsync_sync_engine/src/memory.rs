//! In-memory remote store for testing and offline demos.

use crate::auth::AuthContext;
use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use repairsync_core::EntityKind;
use repairsync_sync_protocol::{Filter, RemoteRow};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Number of calls received per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `select` calls (list, list-modified-after and get).
    pub select: usize,
    /// `create` calls.
    pub create: usize,
    /// `update` calls.
    pub update: usize,
    /// `upsert` calls.
    pub upsert: usize,
    /// `delete` calls.
    pub delete: usize,
}

impl CallCounts {
    /// Calls that write to the remote.
    pub fn writes(&self) -> usize {
        self.create + self.update + self.upsert + self.delete
    }
}

/// A remote store held in memory.
///
/// Behaves like the REST endpoint: creates fail on duplicate ids, updates
/// patch columns, deletes of missing rows succeed. Failures can be injected
/// per record id, and a pause gate holds every call until released.
pub struct MemoryRemote {
    tables: Mutex<HashMap<EntityKind, BTreeMap<String, RemoteRow>>>,
    calls: Mutex<CallCounts>,
    auth_log: Mutex<Vec<AuthContext>>,
    fail_deletes: Mutex<HashSet<String>>,
    fail_writes: Mutex<HashSet<String>>,
    available: AtomicBool,
    paused: watch::Sender<bool>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    /// Creates an empty, reachable remote.
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            tables: Mutex::new(HashMap::new()),
            calls: Mutex::new(CallCounts::default()),
            auth_log: Mutex::new(Vec::new()),
            fail_deletes: Mutex::new(HashSet::new()),
            fail_writes: Mutex::new(HashSet::new()),
            available: AtomicBool::new(true),
            paused,
        }
    }

    /// Stores a row directly, bypassing call counters.
    pub fn insert(&self, kind: EntityKind, row: RemoteRow) {
        if let Some(id) = row.id().map(str::to_owned) {
            self.tables
                .lock()
                .entry(kind)
                .or_default()
                .insert(id, row);
        }
    }

    /// Returns a stored row.
    pub fn row(&self, kind: EntityKind, id: &str) -> Option<RemoteRow> {
        self.tables.lock().get(&kind)?.get(id).cloned()
    }

    /// Returns every stored row of `kind`, ordered by id.
    pub fn rows(&self, kind: EntityKind) -> Vec<RemoteRow> {
        self.tables
            .lock()
            .get(&kind)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of rows of `kind`.
    pub fn len(&self, kind: EntityKind) -> usize {
        self.tables.lock().get(&kind).map_or(0, BTreeMap::len)
    }

    /// Returns true if no table holds any row.
    pub fn is_empty(&self) -> bool {
        self.tables.lock().values().all(BTreeMap::is_empty)
    }

    /// Returns the call counters.
    pub fn calls(&self) -> CallCounts {
        *self.calls.lock()
    }

    /// Returns the auth context of every call, in order.
    pub fn auth_log(&self) -> Vec<AuthContext> {
        self.auth_log.lock().clone()
    }

    /// Makes deletes of `id` fail with a server error.
    pub fn fail_deletes_for(&self, id: &str) {
        self.fail_deletes.lock().insert(id.to_owned());
    }

    /// Makes creates, updates and upserts of `id` fail with a server error.
    pub fn fail_writes_for(&self, id: &str) {
        self.fail_writes.lock().insert(id.to_owned());
    }

    /// Clears injected failures.
    pub fn clear_failures(&self) {
        self.fail_deletes.lock().clear();
        self.fail_writes.lock().clear();
    }

    /// Sets whether the remote answers at all.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Holds every subsequent call until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    /// Releases held calls.
    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    async fn enter(&self, auth: Option<&AuthContext>) -> SyncResult<()> {
        let mut gate = self.paused.subscribe();
        while *gate.borrow_and_update() {
            if gate.changed().await.is_err() {
                break;
            }
        }

        if let Some(auth) = auth {
            self.auth_log.lock().push(auth.clone());
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(SyncError::Transport("remote unreachable".into()));
        }
        Ok(())
    }

    fn check_write(&self, id: Option<&str>) -> SyncResult<()> {
        match id {
            Some(id) if self.fail_writes.lock().contains(id) => {
                Err(SyncError::remote(500, format!("injected write failure for {id}")))
            }
            _ => Ok(()),
        }
    }
}

fn merge_columns(target: &mut RemoteRow, patch: RemoteRow) {
    for (column, value) in patch.into_map() {
        target.set(&column, value);
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn select(
        &self,
        kind: EntityKind,
        filters: &[Filter],
        auth: &AuthContext,
    ) -> SyncResult<Vec<RemoteRow>> {
        self.enter(Some(auth)).await?;
        self.calls.lock().select += 1;

        let tables = self.tables.lock();
        let rows = tables
            .get(&kind)
            .map(|t| {
                t.values()
                    .filter(|row| filters.iter().all(|f| f.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    async fn create(
        &self,
        kind: EntityKind,
        row: RemoteRow,
        auth: &AuthContext,
    ) -> SyncResult<RemoteRow> {
        self.enter(Some(auth)).await?;
        self.calls.lock().create += 1;
        self.check_write(row.id())?;

        let id = row
            .id()
            .map(str::to_owned)
            .ok_or_else(|| SyncError::remote(400, "null value in column \"id\""))?;

        let mut tables = self.tables.lock();
        let table = tables.entry(kind).or_default();
        if table.contains_key(&id) {
            return Err(SyncError::remote(
                409,
                format!("duplicate key value violates unique constraint ({id})"),
            ));
        }
        table.insert(id, row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        patch: RemoteRow,
        auth: &AuthContext,
    ) -> SyncResult<()> {
        self.enter(Some(auth)).await?;
        self.calls.lock().update += 1;
        self.check_write(Some(id))?;

        if let Some(existing) = self
            .tables
            .lock()
            .get_mut(&kind)
            .and_then(|t| t.get_mut(id))
        {
            merge_columns(existing, patch);
        }
        Ok(())
    }

    async fn upsert(
        &self,
        kind: EntityKind,
        row: RemoteRow,
        auth: &AuthContext,
    ) -> SyncResult<RemoteRow> {
        self.enter(Some(auth)).await?;
        self.calls.lock().upsert += 1;
        self.check_write(row.id())?;

        let id = row
            .id()
            .map(str::to_owned)
            .ok_or_else(|| SyncError::remote(400, "null value in column \"id\""))?;

        let mut tables = self.tables.lock();
        let stored = tables.entry(kind).or_default().entry(id).or_default();
        merge_columns(stored, row);
        Ok(stored.clone())
    }

    async fn delete(&self, kind: EntityKind, id: &str, auth: &AuthContext) -> SyncResult<()> {
        self.enter(Some(auth)).await?;
        self.calls.lock().delete += 1;

        if self.fail_deletes.lock().contains(id) {
            return Err(SyncError::remote(
                500,
                format!("injected delete failure for {id}"),
            ));
        }
        if let Some(table) = self.tables.lock().get_mut(&kind) {
            table.remove(id);
        }
        Ok(())
    }

    async fn health(&self) -> SyncResult<()> {
        self.enter(None).await
    }
}
