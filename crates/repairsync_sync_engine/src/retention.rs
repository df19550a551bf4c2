//! Remote retention sweep.

use crate::auth::AuthContext;
use crate::config::RetentionPolicy;
use crate::remote::RemoteStore;
use futures::future::join_all;
use repairsync_core::{is_valid_uuid, Millis, RecordStore};
use serde::Serialize;

/// Outcome of a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Records eligible for remote deletion.
    pub candidates: usize,
    /// Remote deletes that succeeded.
    pub deleted: usize,
    /// Remote deletes that failed.
    pub failed: usize,
}

/// Deletes aged, terminal-state records from the remote store.
///
/// Candidates are chosen from the local store, which is cheaper than
/// scanning the remote. Local copies are never touched.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    policy: RetentionPolicy,
}

impl RetentionSweeper {
    /// Creates a sweeper for `policy`.
    pub fn new(policy: RetentionPolicy) -> Self {
        Self { policy }
    }

    /// Returns the policy.
    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Returns the ids of records eligible for remote deletion at `now`.
    pub fn candidates(&self, store: &RecordStore, now: Millis) -> Vec<String> {
        let window = i64::try_from(self.policy.window.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now.saturating_sub(window);

        store
            .get_all(self.policy.kind)
            .into_iter()
            .filter(|r| {
                r.get_str(&self.policy.status_field) == Some(self.policy.terminal_status.as_str())
            })
            .filter(|r| r.created_millis().is_some_and(|created| created < cutoff))
            .filter_map(|r| r.id)
            .filter(|id| is_valid_uuid(id))
            .collect()
    }

    /// Issues remote deletes for every candidate, concurrently.
    ///
    /// Individual failures are counted and logged; they never fail the sweep.
    pub async fn sweep(
        &self,
        store: &RecordStore,
        remote: &dyn RemoteStore,
        auth: &AuthContext,
        now: Millis,
    ) -> SweepReport {
        let candidates = self.candidates(store, now);
        let kind = self.policy.kind;

        let results = join_all(
            candidates
                .iter()
                .map(|id| async move { (id, remote.delete(kind, id, auth).await) }),
        )
        .await;

        let mut report = SweepReport {
            candidates: candidates.len(),
            ..SweepReport::default()
        };
        for (id, result) in results {
            match result {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(table = %kind, %id, error = %e, "retention delete failed");
                }
            }
        }

        if report.candidates > 0 {
            tracing::info!(
                table = %kind,
                candidates = report.candidates,
                deleted = report.deleted,
                failed = report.failed,
                "retention sweep finished"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRemote;
    use repairsync_core::{EntityKind, ManualClock, Record, Timestamp};
    use repairsync_sync_protocol::RemoteRow;
    use std::sync::Arc;
    use std::time::Duration;

    const DAY: Millis = 24 * 60 * 60 * 1000;
    const NOW: Millis = 100 * DAY;

    fn order(store: &RecordStore, id: &str, status: &str, age_days: i64) {
        let mut record = Record::new().with_id(id).with("status", status);
        record.created_at = Some(Timestamp::Epoch(NOW - age_days * DAY));
        store.save(EntityKind::RepairOrder, record).unwrap();
    }

    fn setup() -> (RecordStore, MemoryRemote) {
        let store = RecordStore::builder()
            .clock(Arc::new(ManualClock::new(NOW)))
            .build()
            .unwrap();
        let remote = MemoryRemote::new();

        let orders = [
            ("123e4567-e89b-12d3-a456-426614174001", "delivered", 11),
            ("123e4567-e89b-12d3-a456-426614174002", "delivered", 3),
            ("123e4567-e89b-12d3-a456-426614174003", "ready", 30),
            ("123e4567-e89b-12d3-a456-426614174004", "delivered", 40),
        ];
        for (id, status, age) in orders {
            order(&store, id, status, age);
            let mut row = RemoteRow::new();
            row.set("id", id);
            remote.insert(EntityKind::RepairOrder, row);
        }
        order(&store, "legacy-order", "delivered", 90);
        (store, remote)
    }

    #[test]
    fn candidates_filter_by_status_age_and_id() {
        let (store, _remote) = setup();
        let sweeper = RetentionSweeper::new(RetentionPolicy::default());

        assert_eq!(
            sweeper.candidates(&store, NOW),
            vec![
                "123e4567-e89b-12d3-a456-426614174001".to_owned(),
                "123e4567-e89b-12d3-a456-426614174004".to_owned(),
            ]
        );
    }

    #[test]
    fn window_is_configurable() {
        let (store, _remote) = setup();
        let sweeper = RetentionSweeper::new(
            RetentionPolicy::default().with_window(Duration::from_secs(2 * 24 * 60 * 60)),
        );
        assert_eq!(sweeper.candidates(&store, NOW).len(), 3);

        let sweeper =
            RetentionSweeper::new(RetentionPolicy::default().with_terminal_status("ready"));
        assert_eq!(sweeper.candidates(&store, NOW).len(), 1);
    }

    #[tokio::test]
    async fn sweep_deletes_remote_only() {
        let (store, remote) = setup();
        let sweeper = RetentionSweeper::new(RetentionPolicy::default());

        let report = sweeper
            .sweep(&store, &remote, &AuthContext::service(), NOW)
            .await;
        assert_eq!(
            report,
            SweepReport {
                candidates: 2,
                deleted: 2,
                failed: 0
            }
        );
        assert_eq!(remote.len(EntityKind::RepairOrder), 2);
        assert!(remote
            .row(EntityKind::RepairOrder, "123e4567-e89b-12d3-a456-426614174001")
            .is_none());

        let local = store
            .get(EntityKind::RepairOrder, "123e4567-e89b-12d3-a456-426614174001")
            .unwrap();
        assert!(!local.is_deleted());
    }

    #[tokio::test]
    async fn sweep_tolerates_failures() {
        let (store, remote) = setup();
        remote.fail_deletes_for("123e4567-e89b-12d3-a456-426614174004");

        let report = RetentionSweeper::new(RetentionPolicy::default())
            .sweep(&store, &remote, &AuthContext::service(), NOW)
            .await;
        assert_eq!(report.deleted, 1);
        assert_eq!(report.failed, 1);
    }
}
