//! Record identifiers.

use uuid::Uuid;

/// Generates a fresh random (v4) record identifier.
#[must_use]
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// Checks that `id` has the canonical UUID shape: 8-4-4-4-12 hex digits.
///
/// Only the textual shape is checked. Braced, URN and hyphen-less forms are
/// rejected even though they denote valid UUIDs.
pub fn is_valid_uuid(id: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

    if id.len() != 36 {
        return false;
    }

    let mut parts = id.split('-');
    for expected in GROUPS {
        match parts.next() {
            Some(part) if part.len() == expected => {
                if !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return false;
                }
            }
            _ => return false,
        }
    }
    parts.next().is_none()
}
