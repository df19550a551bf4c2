//! Status command implementation.

use super::open_store;
use chrono::DateTime;
use repairsync_core::{EntityKind, RecordStore};
use repairsync_sync_engine::read_cursor;
use serde::Serialize;
use std::path::Path;

/// Store status.
#[derive(Debug, Serialize)]
pub struct StatusResult {
    /// Store path.
    pub path: String,
    /// Per-table counts, in sync order.
    pub tables: Vec<TableStatus>,
    /// The sync cursor (0 if the store never synced).
    pub last_sync: i64,
}

/// Counts for one table.
#[derive(Debug, Serialize)]
pub struct TableStatus {
    /// Table name.
    pub table: String,
    /// Live records.
    pub active: usize,
    /// Tombstones.
    pub tombstones: usize,
}

/// Runs the status command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {}", path.display()).into());
    }
    let store = open_store(path)?;
    let result = collect(path, &store);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }
    Ok(())
}

/// Collects counts and the cursor.
pub fn collect(path: &Path, store: &RecordStore) -> StatusResult {
    let tables = EntityKind::ALL
        .into_iter()
        .map(|kind| {
            let counts = store.counts(kind);
            TableStatus {
                table: kind.table_name().to_owned(),
                active: counts.active,
                tombstones: counts.tombstones,
            }
        })
        .collect();

    StatusResult {
        path: path.display().to_string(),
        tables,
        last_sync: read_cursor(store),
    }
}

fn print_text_output(result: &StatusResult) {
    println!("repairsync store");
    println!("================");
    println!();
    println!("Path: {}", result.path);
    println!("Last sync: {}", format_cursor(result.last_sync));
    println!();
    println!("{:<16} {:>8} {:>11}", "Table", "Active", "Tombstones");
    for table in &result.tables {
        println!(
            "{:<16} {:>8} {:>11}",
            table.table, table.active, table.tombstones
        );
    }
}

fn format_cursor(cursor: i64) -> String {
    if cursor == 0 {
        return "never".to_owned();
    }
    match DateTime::from_timestamp_millis(cursor) {
        Some(at) => format!("{} ({cursor})", at.to_rfc3339()),
        None => cursor.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repairsync_core::Record;
    use tempfile::TempDir;

    #[test]
    fn counts_active_and_deleted() {
        let dir = TempDir::new().unwrap();
        let store = open_store(dir.path()).unwrap();
        let kept = store
            .save(EntityKind::Product, Record::new().with("name", "Battery"))
            .unwrap();
        let gone = store
            .save(EntityKind::Product, Record::new().with("name", "Cable"))
            .unwrap();
        store.delete(EntityKind::Product, gone.id().unwrap()).unwrap();
        assert!(kept.id().is_some());

        let result = collect(dir.path(), &store);
        let products = result
            .tables
            .iter()
            .find(|t| t.table == "products")
            .unwrap();
        assert_eq!((products.active, products.tombstones), (1, 1));
        assert_eq!(result.tables.len(), EntityKind::ALL.len());
        assert_eq!(result.last_sync, 0);
    }

    #[test]
    fn cursor_formatting() {
        assert_eq!(format_cursor(0), "never");
        assert_eq!(
            format_cursor(1_704_067_200_000),
            "2024-01-01T00:00:00+00:00 (1704067200000)"
        );
    }

    #[test]
    fn missing_store_is_reported() {
        let dir = TempDir::new().unwrap();
        assert!(run(&dir.path().join("absent"), "text").is_err());
    }
}
