//! Normalize command implementation.

use super::open_store;
use repairsync_core::EntityKind;
use repairsync_sync_engine::normalize;
use std::path::Path;

/// Runs the normalize command over `kinds` (repair orders when empty).
pub fn run(path: &Path, kinds: &[EntityKind]) -> Result<(), Box<dyn std::error::Error>> {
    let kinds = if kinds.is_empty() {
        vec![EntityKind::RepairOrder]
    } else {
        kinds.to_vec()
    };

    let store = open_store(path)?;
    let report = normalize(&store, &kinds)?;

    println!("Normalization:");
    println!("  Scanned:     {}", report.scanned);
    println!("  Repaired:    {}", report.repaired);
    println!("  Unparseable: {}", report.unparseable);
    if !report.invalid_ids.is_empty() {
        println!();
        println!("Records with malformed ids (never synced):");
        for id in &report.invalid_ids {
            println!("  {id}");
        }
    }
    Ok(())
}
