//! Sync outcome and statistics.

use repairsync_core::{EntityKind, Millis};
use serde::Serialize;

/// Record counts per entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    /// Customers.
    pub customers: usize,
    /// Repair orders.
    pub orders: usize,
    /// Invoices.
    pub invoices: usize,
    /// Products.
    pub products: usize,
    /// Appointments.
    pub appointments: usize,
    /// Cash movements.
    pub cash_movements: usize,
}

impl KindCounts {
    fn slot(&mut self, kind: EntityKind) -> &mut usize {
        match kind {
            EntityKind::Customer => &mut self.customers,
            EntityKind::RepairOrder => &mut self.orders,
            EntityKind::Invoice => &mut self.invoices,
            EntityKind::Product => &mut self.products,
            EntityKind::Appointment => &mut self.appointments,
            EntityKind::CashMovement => &mut self.cash_movements,
        }
    }

    /// Increments the counter for `kind`.
    pub fn increment(&mut self, kind: EntityKind) {
        *self.slot(kind) += 1;
    }

    /// Returns the counter for `kind`.
    pub fn get(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Customer => self.customers,
            EntityKind::RepairOrder => self.orders,
            EntityKind::Invoice => self.invoices,
            EntityKind::Product => self.products,
            EntityKind::Appointment => self.appointments,
            EntityKind::CashMovement => self.cash_movements,
        }
    }

    /// Sum over all kinds.
    pub fn total(&self) -> usize {
        EntityKind::ALL.iter().map(|&k| self.get(k)).sum()
    }
}

/// Push-phase counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadStats {
    /// Records created, updated or deleted remotely, per kind.
    #[serde(flatten)]
    pub counts: KindCounts,
    /// Per-record remote failures.
    pub errors: usize,
    /// Records withheld because of a malformed id.
    pub skipped: usize,
}

/// Counters of one sync cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Remote records inserted or applied locally.
    pub downloaded: KindCounts,
    /// Push results.
    pub uploaded: UploadStats,
    /// Message of the last per-record failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// The result of [`SyncEngine::sync`](crate::SyncEngine::sync).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// Whether the cycle ran to completion.
    pub success: bool,
    /// Human-readable summary or error message.
    pub message: String,
    /// Counters; absent when the cycle never started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SyncStats>,
}

impl SyncOutcome {
    pub(crate) fn completed(stats: SyncStats, cursor_advanced: bool) -> Self {
        let message = match stats.uploaded.errors {
            0 if cursor_advanced => "sync completed".to_owned(),
            0 => "sync completed; no user session, nothing pushed".to_owned(),
            n => format!("sync completed with {n} upload errors"),
        };
        Self {
            success: true,
            message,
            stats: Some(stats),
        }
    }

    pub(crate) fn failed(message: impl Into<String>, stats: Option<SyncStats>) -> Self {
        Self {
            success: false,
            message: message.into(),
            stats,
        }
    }
}

/// Running totals across cycles of one engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineHistory {
    /// Cycles that ran to completion.
    pub cycles_completed: u64,
    /// Cycles that failed or were refused for lack of configuration.
    pub cycles_failed: u64,
    /// Start time of the last completed cycle.
    pub last_sync_at: Option<Millis>,
    /// Last error message.
    pub last_error: Option<String>,
    /// Outcome of the last cycle.
    pub last_outcome: Option<SyncOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_counts() {
        let mut counts = KindCounts::default();
        counts.increment(EntityKind::RepairOrder);
        counts.increment(EntityKind::RepairOrder);
        counts.increment(EntityKind::CashMovement);

        assert_eq!(counts.get(EntityKind::RepairOrder), 2);
        assert_eq!(counts.orders, 2);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn outcome_serializes_flat_upload_counters() {
        let mut stats = SyncStats::default();
        stats.downloaded.increment(EntityKind::Customer);
        stats.uploaded.counts.increment(EntityKind::Invoice);
        stats.uploaded.skipped = 1;

        let value = serde_json::to_value(SyncOutcome::completed(stats, true)).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["message"], json!("sync completed"));
        assert_eq!(value["stats"]["downloaded"]["customers"], json!(1));
        assert_eq!(value["stats"]["uploaded"]["invoices"], json!(1));
        assert_eq!(value["stats"]["uploaded"]["skipped"], json!(1));
        assert_eq!(value["stats"]["uploaded"]["errors"], json!(0));
        assert!(value["stats"].get("last_error").is_none());
    }

    #[test]
    fn failed_outcome_without_stats() {
        let value =
            serde_json::to_value(SyncOutcome::failed("sync already in progress", None)).unwrap();
        assert_eq!(
            value,
            json!({ "success": false, "message": "sync already in progress" })
        );
    }

    #[test]
    fn completed_message_mentions_errors() {
        let mut stats = SyncStats::default();
        stats.uploaded.errors = 2;
        let outcome = SyncOutcome::completed(stats, false);
        assert!(outcome.success);
        assert_eq!(outcome.message, "sync completed with 2 upload errors");
    }
}
