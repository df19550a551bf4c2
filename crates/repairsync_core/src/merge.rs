//! Record-level last-writer-wins.
//!
//! Conflicts are decided by comparing whole-record `modified_at` values.
//! There is no field-level merge: the newer record replaces the older one.

use crate::clock::Millis;
use crate::record::Record;
use serde_json::Value;

/// Result of merging a remote record into the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No local record existed; the remote one was inserted.
    Inserted,
    /// The remote record was strictly newer and replaced the local one.
    Updated,
    /// The local record was as new or newer; nothing changed.
    Unchanged,
}

/// Returns true if a remote version should overwrite the local one.
///
/// The remote wins only on a strictly greater timestamp. A local timestamp
/// that is not numeric (not yet normalized) loses to any numeric remote one.
pub fn remote_wins(local: Option<Millis>, remote: Option<Millis>) -> bool {
    match (local, remote) {
        (Some(l), Some(r)) => r > l,
        (None, Some(_)) => true,
        (_, None) => false,
    }
}

/// Returns true if a local version should overwrite the remote one.
pub fn local_is_newer(local: Option<Millis>, remote: Option<Millis>) -> bool {
    remote_wins(remote, local)
}

/// Overwrites `local` with the columns carried by `remote`.
///
/// Columns present in `remote` replace the local ones, and a `null` column
/// removes the local field. Columns the remote does not carry are kept.
pub(crate) fn overlay(local: &Record, remote: Record) -> Record {
    let mut merged = local.clone();

    for (key, value) in remote.fields {
        if value == Value::Null {
            merged.fields.remove(&key);
        } else {
            merged.fields.insert(key, value);
        }
    }

    if remote.created_at.is_some() {
        merged.created_at = remote.created_at;
    }
    merged.modified_at = remote.modified_at;
    merged.deleted = remote.deleted;
    merged
}
