//! Configuration for the sync engine.

use repairsync_core::EntityKind;
use std::time::Duration;

/// Environment variable holding the remote base URL.
pub const ENV_REMOTE_URL: &str = "REPAIRSYNC_URL";
/// Environment variable holding the remote service key.
pub const ENV_SERVICE_KEY: &str = "REPAIRSYNC_SERVICE_KEY";

/// Configuration for sync cycles.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Kinds pulled and pushed, in order.
    pub kinds: Vec<EntityKind>,
    /// Kinds scanned by the normalizer before each cycle.
    pub normalize_kinds: Vec<EntityKind>,
    /// Retention policy applied before pulling; `None` disables the sweep.
    pub retention: Option<RetentionPolicy>,
}

impl SyncConfig {
    /// Creates the default configuration: every kind synced, repair orders
    /// normalized, the 10-day delivered-order retention policy.
    pub fn new() -> Self {
        Self {
            kinds: EntityKind::ALL.to_vec(),
            normalize_kinds: vec![EntityKind::RepairOrder],
            retention: Some(RetentionPolicy::default()),
        }
    }

    /// Sets the synced kinds.
    #[must_use]
    pub fn with_kinds(mut self, kinds: Vec<EntityKind>) -> Self {
        self.kinds = kinds;
        self
    }

    /// Sets the kinds scanned by the normalizer.
    #[must_use]
    pub fn with_normalize_kinds(mut self, kinds: Vec<EntityKind>) -> Self {
        self.normalize_kinds = kinds;
        self
    }

    /// Sets the retention policy.
    #[must_use]
    pub fn with_retention(mut self, policy: RetentionPolicy) -> Self {
        self.retention = Some(policy);
        self
    }

    /// Disables the retention sweep.
    #[must_use]
    pub fn without_retention(mut self) -> Self {
        self.retention = None;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection settings for a REST remote.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL (e.g. `https://xyz.example.co`).
    pub base_url: String,
    /// Static service key sent with every request.
    pub service_key: String,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

impl RemoteConfig {
    /// Creates a remote configuration.
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            service_key: service_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `REPAIRSYNC_URL` and `REPAIRSYNC_SERVICE_KEY`.
    ///
    /// Returns `None` unless both are set and non-empty.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(ENV_REMOTE_URL).filter(|v| !v.trim().is_empty())?;
        let key = lookup(ENV_SERVICE_KEY).filter(|v| !v.trim().is_empty())?;
        Some(Self::new(url.trim(), key.trim()))
    }
}

/// Remote data-lifetime policy.
///
/// Remote copies of records of `kind` whose `status_field` equals
/// `terminal_status` and whose creation date is older than `window` are
/// deleted from the remote. Local copies are kept.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Kind the policy applies to.
    pub kind: EntityKind,
    /// Field holding the record state.
    pub status_field: String,
    /// Terminal state value.
    pub terminal_status: String,
    /// Maximum remote age, measured from `created_at`.
    pub window: Duration,
}

impl RetentionPolicy {
    /// Ten days.
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10 * 24 * 60 * 60);

    /// Sets the retention window.
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Sets the terminal status value.
    #[must_use]
    pub fn with_terminal_status(mut self, status: impl Into<String>) -> Self {
        self.terminal_status = status.into();
        self
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            kind: EntityKind::RepairOrder,
            status_field: "status".into(),
            terminal_status: "delivered".into(),
            window: Self::DEFAULT_WINDOW,
        }
    }
}
