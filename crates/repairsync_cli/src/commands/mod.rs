//! CLI command implementations.

pub mod import;
pub mod normalize;
pub mod status;
pub mod sweep;
pub mod sync;

use crate::RemoteArgs;
use repairsync_core::{FileBackend, RecordStore, StoreResult, SystemClock};
use repairsync_sync_engine::{AuthContext, RemoteConfig, Session, ENV_REMOTE_URL, ENV_SERVICE_KEY};
use std::path::Path;
use std::sync::Arc;

/// Opens the file-backed store at `path` with the system clock.
pub fn open_store(path: &Path) -> StoreResult<Arc<RecordStore>> {
    let backend = FileBackend::open(path)?;
    let store = RecordStore::open(Arc::new(backend), Arc::new(SystemClock))?;
    Ok(Arc::new(store))
}

/// Resolves the remote configuration: flags first, then the environment.
pub fn remote_config<F>(args: &RemoteArgs, lookup: F) -> Result<RemoteConfig, String>
where
    F: Fn(&str) -> Option<String>,
{
    let url = args.url.clone().or_else(|| lookup(ENV_REMOTE_URL));
    let key = args.service_key.clone().or_else(|| lookup(ENV_SERVICE_KEY));
    RemoteConfig::from_lookup(|name| match name {
        ENV_REMOTE_URL => url.clone(),
        ENV_SERVICE_KEY => key.clone(),
        _ => None,
    })
    .ok_or_else(|| format!("Remote not configured: pass --url and --service-key or set {ENV_REMOTE_URL} and {ENV_SERVICE_KEY}"))
}

/// Auth context for the `--token` flag.
pub fn auth_context(args: &RemoteArgs) -> AuthContext {
    AuthContext::from(args.token.clone().map(Session::new))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> Option<String> {
        match name {
            ENV_REMOTE_URL => Some("https://env.example.co/".into()),
            ENV_SERVICE_KEY => Some("env-key".into()),
            _ => None,
        }
    }

    #[test]
    fn flags_override_environment() {
        let args = RemoteArgs {
            url: Some("https://flag.example.co".into()),
            ..Default::default()
        };
        let config = remote_config(&args, env).unwrap();
        assert_eq!(config.base_url, "https://flag.example.co");
        assert_eq!(config.service_key, "env-key");

        let config = remote_config(&RemoteArgs::default(), env).unwrap();
        assert_eq!(config.base_url, "https://env.example.co");
    }

    #[test]
    fn missing_remote_is_an_error() {
        let err = remote_config(&RemoteArgs::default(), |_| None).unwrap_err();
        assert!(err.contains("--url"));
    }

    #[test]
    fn token_becomes_user_session() {
        assert!(!auth_context(&RemoteArgs::default()).has_session());

        let args = RemoteArgs {
            token: Some("jwt".into()),
            ..Default::default()
        };
        assert_eq!(auth_context(&args).bearer("svc"), "jwt");
    }
}
