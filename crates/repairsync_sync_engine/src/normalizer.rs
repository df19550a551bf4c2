//! Pre-sync repair of type drift in local records.
//!
//! Records imported from older data sets may carry `created_at` or
//! `modified_at` as a formatted date string. Those are converted to epoch
//! milliseconds before the push phase compares timestamps numerically.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use repairsync_core::{
    is_valid_uuid, EntityKind, Millis, Record, RecordStore, StoreResult, Timestamp,
};
use serde::Serialize;

/// Outcome of a normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// Records examined.
    pub scanned: usize,
    /// Records rewritten with numeric timestamps.
    pub repaired: usize,
    /// Timestamp strings that could not be parsed and were left alone.
    pub unparseable: usize,
    /// Ids that are not well-formed UUIDs. They are never corrected.
    pub invalid_ids: Vec<String>,
}

impl NormalizeReport {
    fn merge(&mut self, other: NormalizeReport) {
        self.scanned += other.scanned;
        self.repaired += other.repaired;
        self.unparseable += other.unparseable;
        self.invalid_ids.extend(other.invalid_ids);
    }
}

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parses a date string into epoch milliseconds.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
/// `YYYY-MM-DD` (UTC midnight) and plain numbers (already epoch
/// milliseconds). Zone-less values are read as UTC.
pub fn parse_date(text: &str) -> Option<Millis> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(ms) = text.parse::<i64>() {
        return Some(ms);
    }
    if let Ok(ms) = text.parse::<f64>() {
        return ms.is_finite().then(|| ms.trunc() as Millis);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Result of repairing one timestamp column.
enum Repair {
    Clean,
    Fixed(Millis),
    Unparseable,
}

fn repair(ts: Option<&Timestamp>) -> Repair {
    match ts {
        Some(Timestamp::Text(text)) => match parse_date(text) {
            Some(ms) => Repair::Fixed(ms),
            None => Repair::Unparseable,
        },
        _ => Repair::Clean,
    }
}

/// Normalizes every record of the given kinds.
pub fn normalize(store: &RecordStore, kinds: &[EntityKind]) -> StoreResult<NormalizeReport> {
    let mut report = NormalizeReport::default();
    for &kind in kinds {
        report.merge(normalize_kind(store, kind)?);
    }
    Ok(report)
}

fn normalize_kind(store: &RecordStore, kind: EntityKind) -> StoreResult<NormalizeReport> {
    let mut report = NormalizeReport::default();

    for record in store.get_all_with_tombstones(kind) {
        report.scanned += 1;
        let Some(id) = record.id.clone() else {
            continue;
        };
        if !is_valid_uuid(&id) {
            tracing::debug!(table = %kind, %id, "record id is not a UUID");
            report.invalid_ids.push(id.clone());
        }

        let created = repair(record.created_at.as_ref());
        let modified = repair(record.modified_at.as_ref());
        report.unparseable += [&created, &modified]
            .iter()
            .filter(|r| matches!(r, Repair::Unparseable))
            .count();

        if !needs_write(&created, &modified) {
            continue;
        }

        store.modify(kind, &id, |r: &mut Record| {
            if let Repair::Fixed(ms) = created {
                r.created_at = Some(Timestamp::Epoch(ms));
            }
            if let Repair::Fixed(ms) = modified {
                r.modified_at = Some(Timestamp::Epoch(ms));
            }
        })?;
        report.repaired += 1;
        tracing::debug!(table = %kind, %id, "timestamps normalized");
    }

    Ok(report)
}

fn needs_write(created: &Repair, modified: &Repair) -> bool {
    matches!(created, Repair::Fixed(_)) || matches!(modified, Repair::Fixed(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use repairsync_core::{InMemoryBackend, ManualClock, StoreBackend};
    use std::sync::Arc;

    const NOW: Millis = 1_760_000_000_000;

    fn drifted(id: &str, created: Timestamp, modified: Timestamp) -> Record {
        let mut record = Record::new().with_id(id).with("status", "received");
        record.created_at = Some(created);
        record.modified_at = Some(modified);
        record
    }

    fn store_with(records: &[Record]) -> RecordStore {
        let backend = Arc::new(InMemoryBackend::new());
        let refs: Vec<&Record> = records.iter().collect();
        backend
            .write_table(EntityKind::RepairOrder, &refs)
            .unwrap();
        RecordStore::open(backend, Arc::new(ManualClock::new(NOW))).unwrap()
    }

    #[test]
    fn parses_supported_formats() {
        assert_eq!(parse_date("2024-01-01"), Some(1_704_067_200_000));
        assert_eq!(parse_date("2024-01-01 10:30:00"), Some(1_704_105_000_000));
        assert_eq!(parse_date("2024-01-01T10:30:00"), Some(1_704_105_000_000));
        assert_eq!(
            parse_date("2024-01-01T10:30:00.250Z"),
            Some(1_704_105_000_250)
        );
        assert_eq!(
            parse_date("2024-01-01T12:30:00+02:00"),
            Some(1_704_105_000_000)
        );
        assert_eq!(parse_date(" 1704067200000 "), Some(1_704_067_200_000));
        assert_eq!(parse_date("1704067200000.7"), Some(1_704_067_200_000));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2024-13-45"), None);
    }

    #[test]
    fn repairs_text_modified_at_and_bumps() {
        let id = "123e4567-e89b-12d3-a456-426614174000";
        let store = store_with(&[drifted(
            id,
            Timestamp::Epoch(1_000),
            Timestamp::Text("2024-01-01".into()),
        )]);
        assert!(store.get_modified_after(EntityKind::RepairOrder, 0).is_empty());

        let report = normalize(&store, &[EntityKind::RepairOrder]).unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.repaired, 1);
        assert!(report.invalid_ids.is_empty());

        let record = store.get(EntityKind::RepairOrder, id).unwrap();
        assert_eq!(record.modified_millis(), Some(NOW));
        assert_eq!(record.created_millis(), Some(1_000));
        assert_eq!(store.get_modified_after(EntityKind::RepairOrder, 0).len(), 1);
    }

    #[test]
    fn repairs_text_created_at() {
        let id = "123e4567-e89b-12d3-a456-426614174000";
        let store = store_with(&[drifted(
            id,
            Timestamp::Text("2024-01-01 00:00:00".into()),
            Timestamp::Epoch(5),
        )]);

        normalize(&store, &[EntityKind::RepairOrder]).unwrap();
        let record = store.get(EntityKind::RepairOrder, id).unwrap();
        assert_eq!(record.created_millis(), Some(1_704_067_200_000));
        assert_eq!(record.modified_millis(), Some(NOW));
    }

    #[test]
    fn leaves_unparseable_and_reports_bad_ids() {
        let store = store_with(&[
            drifted(
                "order-7",
                Timestamp::Epoch(1),
                Timestamp::Text("last tuesday".into()),
            ),
            drifted(
                "223e4567-e89b-12d3-a456-426614174000",
                Timestamp::Epoch(1),
                Timestamp::Epoch(2),
            ),
        ]);

        let report = normalize(&store, &[EntityKind::RepairOrder]).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.repaired, 0);
        assert_eq!(report.unparseable, 1);
        assert_eq!(report.invalid_ids, vec!["order-7".to_owned()]);

        let record = store.get(EntityKind::RepairOrder, "order-7").unwrap();
        assert_eq!(
            record.modified_at,
            Some(Timestamp::Text("last tuesday".into()))
        );
    }

    #[test]
    fn clean_store_is_untouched() {
        let store = RecordStore::open_in_memory().unwrap();
        let saved = store
            .save(EntityKind::RepairOrder, Record::new())
            .unwrap();

        let report = normalize(&store, &[EntityKind::RepairOrder]).unwrap();
        assert_eq!(report.repaired, 0);
        assert_eq!(
            store.get(EntityKind::RepairOrder, saved.id().unwrap()),
            Some(saved)
        );
    }
}
