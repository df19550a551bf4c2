//! Remote store abstraction.

use crate::auth::AuthContext;
use crate::error::SyncResult;
use async_trait::async_trait;
use repairsync_core::{EntityKind, Millis};
use repairsync_sync_protocol::{Filter, RemoteRow};

/// Typed access to the remote collections, one per entity kind.
///
/// Implementations never retry. Every failure is returned to the caller,
/// which decides whether to count it, skip the record or abort.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns every row of `kind` matching all `filters`.
    async fn select(
        &self,
        kind: EntityKind,
        filters: &[Filter],
        auth: &AuthContext,
    ) -> SyncResult<Vec<RemoteRow>>;

    /// Inserts a row, failing if the id already exists.
    async fn create(
        &self,
        kind: EntityKind,
        row: RemoteRow,
        auth: &AuthContext,
    ) -> SyncResult<RemoteRow>;

    /// Applies a partial patch to the row with `id`.
    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        patch: RemoteRow,
        auth: &AuthContext,
    ) -> SyncResult<()>;

    /// Inserts a row, replacing the existing row on an id conflict.
    async fn upsert(
        &self,
        kind: EntityKind,
        row: RemoteRow,
        auth: &AuthContext,
    ) -> SyncResult<RemoteRow>;

    /// Deletes the row with `id`.
    async fn delete(&self, kind: EntityKind, id: &str, auth: &AuthContext) -> SyncResult<()>;

    /// Checks that the remote is reachable.
    async fn health(&self) -> SyncResult<()>;

    /// Returns every row of `kind`.
    async fn list(&self, kind: EntityKind, auth: &AuthContext) -> SyncResult<Vec<RemoteRow>> {
        self.select(kind, &[], auth).await
    }

    /// Returns rows whose `modified_at` is greater than `cursor`.
    async fn list_modified_after(
        &self,
        kind: EntityKind,
        cursor: Millis,
        auth: &AuthContext,
    ) -> SyncResult<Vec<RemoteRow>> {
        self.select(kind, &[Filter::gt("modified_at", cursor)], auth)
            .await
    }

    /// Returns the row with `id`, if present.
    async fn get(
        &self,
        kind: EntityKind,
        id: &str,
        auth: &AuthContext,
    ) -> SyncResult<Option<RemoteRow>> {
        let rows = self.select(kind, &[Filter::eq("id", id)], auth).await?;
        Ok(rows.into_iter().next())
    }
}
