//! Import command implementation.

use super::open_store;
use repairsync_core::{EntityKind, Record, RecordStore};
use serde_json::Value;
use std::path::Path;

/// Runs the import command.
pub fn run(path: &Path, kind: EntityKind, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(file)?;
    let store = open_store(path)?;
    let imported = import_json(&store, kind, &text)?;
    println!("Imported {imported} records into {kind}");
    Ok(())
}

/// Saves every object of a JSON array into `kind`.
///
/// Records are saved through the normal write path, so ids and timestamps
/// are assigned where missing. The whole input is validated before the
/// first write.
pub fn import_json(
    store: &RecordStore,
    kind: EntityKind,
    text: &str,
) -> Result<usize, Box<dyn std::error::Error>> {
    let Value::Array(items) = serde_json::from_str::<Value>(text)? else {
        return Err("expected a JSON array of objects".into());
    };

    let records = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| Record::from_json(item).map_err(|e| format!("item {i}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    for record in &records {
        store.save(kind, record.clone())?;
    }
    tracing::info!(table = %kind, count = records.len(), "import finished");
    Ok(records.len())
}
