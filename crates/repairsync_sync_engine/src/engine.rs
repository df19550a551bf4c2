//! Sync engine state machine.
//!
//! One cycle runs normalize, sweep, pull, push and cursor commit, in that
//! order. Only one cycle runs at a time; a request that arrives while a
//! cycle is running is refused, never queued.

use crate::auth::{AuthContext, NoSession, SessionProvider};
use crate::config::SyncConfig;
use crate::cursor::{commit_cursor, read_cursor};
use crate::error::{SyncError, SyncResult};
use crate::normalizer::normalize;
use crate::remote::RemoteStore;
use crate::retention::RetentionSweeper;
use crate::stats::{EngineHistory, SyncOutcome, SyncStats};
use futures::future::join_all;
use parking_lot::RwLock;
use repairsync_core::{
    is_valid_uuid, local_is_newer, EntityKind, MergeOutcome, Millis, Record, RecordStore,
    StoreError,
};
use repairsync_sync_protocol::{project, project_patch, unproject};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No cycle has run yet.
    Idle,
    /// A cycle is running.
    Syncing,
    /// The last cycle completed.
    Synced,
    /// The last cycle failed.
    Failed,
}

impl SyncState {
    /// Returns true while a cycle is running.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Syncing)
    }

    /// Returns true if a new cycle may start.
    pub fn can_start_sync(&self) -> bool {
        !self.is_active()
    }
}

/// What the push phase did with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PushAction {
    Created,
    Updated,
    Deleted,
    Unchanged,
    Skipped,
}

/// Clears the single-flight flag on every exit path.
struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Coordinates the local store and the remote store.
pub struct SyncEngine {
    store: Arc<RecordStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    sessions: Arc<dyn SessionProvider>,
    config: SyncConfig,
    syncing: AtomicBool,
    state: RwLock<SyncState>,
    history: RwLock<EngineHistory>,
}

impl SyncEngine {
    /// Creates an engine with no remote and no user session.
    pub fn new(store: Arc<RecordStore>, config: SyncConfig) -> Self {
        Self {
            store,
            remote: None,
            sessions: Arc::new(NoSession),
            config,
            syncing: AtomicBool::new(false),
            state: RwLock::new(SyncState::Idle),
            history: RwLock::new(EngineHistory::default()),
        }
    }

    /// Sets the remote store.
    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Sets the source of the user session used by [`sync`](Self::sync).
    #[must_use]
    pub fn with_session_provider(mut self, sessions: Arc<dyn SessionProvider>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Returns the local store.
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns true if a remote store is configured.
    pub fn is_configured(&self) -> bool {
        self.remote.is_some()
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Returns true while a cycle is running.
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Gets the running totals.
    pub fn history(&self) -> EngineHistory {
        self.history.read().clone()
    }

    /// Returns true if a remote is configured and answers its health check.
    pub async fn is_available(&self) -> bool {
        match &self.remote {
            Some(remote) => remote.health().await.is_ok(),
            None => false,
        }
    }

    /// Runs one sync cycle with the session of the configured provider.
    pub async fn sync(&self) -> SyncOutcome {
        let auth = AuthContext::from(self.sessions.current_session());
        self.sync_with(auth).await
    }

    /// Runs one sync cycle with an explicit authentication context.
    ///
    /// Without a user session the push phase does nothing and the cursor
    /// stays where it was.
    pub async fn sync_with(&self, auth: AuthContext) -> SyncOutcome {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("sync requested while a cycle is running");
            return SyncOutcome::failed(SyncError::AlreadySyncing.to_string(), None);
        }
        let _guard = SyncingGuard(&self.syncing);

        let Some(remote) = self.remote.clone() else {
            let outcome = SyncOutcome::failed(SyncError::NotConfigured.to_string(), None);
            self.finish(&outcome, None);
            return outcome;
        };

        self.set_state(SyncState::Syncing);
        let started = self.store.now_millis();
        let mut stats = SyncStats::default();

        let result = self
            .run_cycle(remote.as_ref(), &auth, started, &mut stats)
            .await;
        let outcome = match result {
            Ok(cursor_advanced) => SyncOutcome::completed(stats, cursor_advanced),
            Err(e) => {
                tracing::error!(error = %e, "sync cycle failed");
                let message = e.to_string();
                stats.last_error = Some(message.clone());
                SyncOutcome::failed(message, Some(stats))
            }
        };

        self.finish(&outcome, Some(started));
        outcome
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    fn finish(&self, outcome: &SyncOutcome, started: Option<Millis>) {
        {
            let mut history = self.history.write();
            if outcome.success {
                history.cycles_completed += 1;
                history.last_sync_at = started;
            } else {
                history.cycles_failed += 1;
                history.last_error = Some(outcome.message.clone());
            }
            if let Some(error) = outcome.stats.as_ref().and_then(|s| s.last_error.clone()) {
                history.last_error = Some(error);
            }
            history.last_outcome = Some(outcome.clone());
        }

        self.set_state(if outcome.success {
            SyncState::Synced
        } else {
            SyncState::Failed
        });
    }

    /// Returns whether the cursor advanced.
    async fn run_cycle(
        &self,
        remote: &dyn RemoteStore,
        auth: &AuthContext,
        started: Millis,
        stats: &mut SyncStats,
    ) -> SyncResult<bool> {
        let cursor = read_cursor(&self.store);
        tracing::info!(cursor, session = auth.has_session(), "sync cycle started");

        let normalized = normalize(&self.store, &self.config.normalize_kinds)?;
        if normalized.repaired > 0 || normalized.unparseable > 0 {
            tracing::info!(
                repaired = normalized.repaired,
                unparseable = normalized.unparseable,
                "local timestamps normalized"
            );
        }
        if !normalized.invalid_ids.is_empty() {
            tracing::warn!(
                count = normalized.invalid_ids.len(),
                "records with malformed ids will not be pushed"
            );
        }

        // Swept records stay out of push, or a create would bring them back.
        let mut retired = HashSet::new();
        if let Some(policy) = &self.config.retention {
            let sweeper = RetentionSweeper::new(policy.clone());
            sweeper.sweep(&self.store, remote, auth, started).await;
            retired.extend(
                sweeper
                    .candidates(&self.store, started)
                    .into_iter()
                    .map(|id| (policy.kind, id)),
            );
        }

        self.pull(remote, auth, cursor, stats).await?;
        let pushed = self.push(remote, auth, cursor, &retired, stats).await?;

        if !pushed {
            tracing::info!(cursor, "cursor kept: nothing was pushed");
            return Ok(false);
        }
        if stats.uploaded.errors > 0 {
            tracing::warn!(
                errors = stats.uploaded.errors,
                cursor,
                "cursor kept: push had errors"
            );
            return Ok(false);
        }

        commit_cursor(&self.store, started)?;
        Ok(true)
    }

    async fn pull(
        &self,
        remote: &dyn RemoteStore,
        auth: &AuthContext,
        cursor: Millis,
        stats: &mut SyncStats,
    ) -> SyncResult<()> {
        for &kind in &self.config.kinds {
            let rows = remote.list_modified_after(kind, cursor, auth).await?;
            let fetched = rows.len();

            for row in rows {
                let merged = unproject(kind, row)
                    .and_then(|record| self.store.merge_remote(kind, record));
                match merged {
                    Ok(MergeOutcome::Inserted | MergeOutcome::Updated) => {
                        stats.downloaded.increment(kind);
                    }
                    Ok(MergeOutcome::Unchanged) => {}
                    Err(StoreError::InvalidRecord { message }) => {
                        tracing::warn!(table = %kind, %message, "ignoring malformed remote row");
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            tracing::debug!(
                table = %kind,
                fetched,
                applied = stats.downloaded.get(kind),
                "pulled"
            );
        }

        tracing::info!(downloaded = stats.downloaded.total(), "pull finished");
        Ok(())
    }

    /// Returns false when there was no user session to push with.
    async fn push(
        &self,
        remote: &dyn RemoteStore,
        auth: &AuthContext,
        cursor: Millis,
        retired: &HashSet<(EntityKind, String)>,
        stats: &mut SyncStats,
    ) -> SyncResult<bool> {
        if !auth.has_session() {
            tracing::info!("no user session; push skipped");
            return Ok(false);
        }

        for &kind in &self.config.kinds {
            let pending: Vec<Record> = self
                .store
                .get_modified_after(kind, cursor)
                .into_iter()
                .filter(|record| match record.id.clone() {
                    Some(id) if retired.contains(&(kind, id.clone())) => {
                        tracing::debug!(table = %kind, %id, "retired by retention; not pushed");
                        false
                    }
                    _ => true,
                })
                .collect();
            if pending.is_empty() {
                continue;
            }

            let results = join_all(
                pending
                    .iter()
                    .map(|record| push_record(remote, auth, kind, record)),
            )
            .await;

            for result in results {
                match result {
                    Ok(PushAction::Skipped) => stats.uploaded.skipped += 1,
                    Ok(PushAction::Unchanged) => {}
                    Ok(PushAction::Created | PushAction::Updated | PushAction::Deleted) => {
                        stats.uploaded.counts.increment(kind);
                    }
                    Err(e) if e.is_transport() => {
                        stats.uploaded.errors += 1;
                        stats.last_error = Some(e.to_string());
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        tracing::info!(
            uploaded = stats.uploaded.counts.total(),
            errors = stats.uploaded.errors,
            skipped = stats.uploaded.skipped,
            "push finished"
        );
        Ok(true)
    }
}

async fn push_record(
    remote: &dyn RemoteStore,
    auth: &AuthContext,
    kind: EntityKind,
    record: &Record,
) -> SyncResult<PushAction> {
    let Some(id) = record.id().filter(|id| is_valid_uuid(id)) else {
        tracing::debug!(table = %kind, id = ?record.id(), "malformed id; not pushed");
        return Ok(PushAction::Skipped);
    };
    if let Some(customer_id) = record.customer_id().filter(|c| !is_valid_uuid(c)) {
        tracing::debug!(table = %kind, id, customer_id, "malformed customer_id; not pushed");
        return Ok(PushAction::Skipped);
    }

    let result = if record.is_deleted() {
        remote
            .delete(kind, id, auth)
            .await
            .map(|()| PushAction::Deleted)
    } else {
        upload(remote, auth, kind, id, record).await
    };

    match &result {
        Ok(action) => tracing::debug!(table = %kind, id, ?action, "pushed"),
        Err(e) => tracing::warn!(table = %kind, id, error = %e, "push failed"),
    }
    result
}

async fn upload(
    remote: &dyn RemoteStore,
    auth: &AuthContext,
    kind: EntityKind,
    id: &str,
    record: &Record,
) -> SyncResult<PushAction> {
    match remote.get(kind, id, auth).await? {
        None => {
            remote.create(kind, project(kind, record), auth).await?;
            Ok(PushAction::Created)
        }
        Some(existing)
            if local_is_newer(record.modified_millis(), existing.modified_millis()) =>
        {
            remote
                .update(kind, id, project_patch(kind, record), auth)
                .await?;
            Ok(PushAction::Updated)
        }
        Some(_) => Ok(PushAction::Unchanged),
    }
}
