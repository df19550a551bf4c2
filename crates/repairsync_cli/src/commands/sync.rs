//! Sync command implementation.

use super::{auth_context, open_store, remote_config};
use crate::RemoteArgs;
use repairsync_core::{EntityKind, RecordStore};
use repairsync_sync_engine::{
    AuthContext, RemoteStore, RestRemote, SyncConfig, SyncEngine, SyncOutcome,
};
use std::path::Path;
use std::sync::Arc;

/// Runs the sync command. Fails if the cycle fails.
pub async fn run(
    path: &Path,
    args: &RemoteArgs,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = remote_config(args, |name| std::env::var(name).ok())?;
    let remote = Arc::new(RestRemote::from_config(config)?);
    let store = open_store(path)?;

    let outcome = execute(store, remote, auth_context(args)).await;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&outcome)?),
        _ => print_text_output(&outcome),
    }

    if outcome.success {
        Ok(())
    } else {
        Err(outcome.message.into())
    }
}

/// Runs one cycle of a fresh engine over `store` and `remote`.
pub async fn execute(
    store: Arc<RecordStore>,
    remote: Arc<dyn RemoteStore>,
    auth: AuthContext,
) -> SyncOutcome {
    let engine = SyncEngine::new(store, SyncConfig::default()).with_remote(remote);
    engine.sync_with(auth).await
}

fn print_text_output(outcome: &SyncOutcome) {
    println!("{}", outcome.message);
    let Some(stats) = &outcome.stats else {
        return;
    };
    println!();
    println!("{:<16} {:>10} {:>8}", "Table", "Downloaded", "Uploaded");
    for kind in EntityKind::ALL {
        println!(
            "{:<16} {:>10} {:>8}",
            kind.table_name(),
            stats.downloaded.get(kind),
            stats.uploaded.counts.get(kind)
        );
    }
    println!();
    println!("Upload errors: {}", stats.uploaded.errors);
    println!("Skipped:       {}", stats.uploaded.skipped);
    if let Some(error) = &stats.last_error {
        println!("Last error:    {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repairsync_core::Record;
    use repairsync_sync_engine::{read_cursor, MemoryRemote, Session};
    use tempfile::TempDir;

    #[tokio::test]
    async fn pushes_local_records_and_commits_cursor() {
        let dir = TempDir::new().unwrap();
        let store = open_store(dir.path()).unwrap();
        let saved = store
            .save(EntityKind::Customer, Record::new().with("name", "Ana"))
            .unwrap();
        let remote = Arc::new(MemoryRemote::new());

        let outcome = execute(
            store.clone(),
            remote.clone(),
            AuthContext::user(Session::new("jwt")),
        )
        .await;

        assert!(outcome.success, "{}", outcome.message);
        assert!(remote
            .row(EntityKind::Customer, saved.id().unwrap())
            .is_some());
        assert!(read_cursor(&store) > 0);
    }

    #[tokio::test]
    async fn outcome_serializes_for_json_output() {
        let store = Arc::new(RecordStore::open_in_memory().unwrap());
        let outcome = execute(store, Arc::new(MemoryRemote::new()), AuthContext::service()).await;

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], true);
        assert!(json["stats"]["uploaded"].get("errors").is_some());
    }
}
