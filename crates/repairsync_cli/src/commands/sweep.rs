//! Sweep command implementation.

use super::{auth_context, open_store, remote_config};
use crate::RemoteArgs;
use repairsync_core::RecordStore;
use repairsync_sync_engine::{
    AuthContext, RemoteStore, RestRemote, RetentionPolicy, RetentionSweeper, SweepReport,
};
use std::path::Path;

/// Runs the sweep command.
pub async fn run(
    path: &Path,
    dry_run: bool,
    args: &RemoteArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let sweeper = RetentionSweeper::new(RetentionPolicy::default());
    let now = store.now_millis();

    if dry_run {
        let candidates = sweeper.candidates(&store, now);
        println!("Sweep candidates (dry run - no changes will be made):");
        for id in &candidates {
            println!("  {id}");
        }
        println!("{} record(s) would be deleted remotely", candidates.len());
        return Ok(());
    }

    let remote = RestRemote::from_config(remote_config(args, |name| std::env::var(name).ok())?)?;
    let report = execute(&sweeper, &store, &remote, &auth_context(args)).await;
    println!("Sweep:");
    println!("  Candidates: {}", report.candidates);
    println!("  Deleted:    {}", report.deleted);
    println!("  Failed:     {}", report.failed);
    Ok(())
}

/// Sweeps against `remote` at the store's current time.
pub async fn execute(
    sweeper: &RetentionSweeper,
    store: &RecordStore,
    remote: &dyn RemoteStore,
    auth: &AuthContext,
) -> SweepReport {
    sweeper.sweep(store, remote, auth, store.now_millis()).await
}
