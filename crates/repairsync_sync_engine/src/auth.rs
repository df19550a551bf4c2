//! Authentication context for remote requests.
//!
//! Every remote request carries the static service key. When a user session
//! is active its bearer token replaces the service key in the
//! `Authorization` header, so the remote applies per-user scoping.

use parking_lot::RwLock;
use std::fmt;

/// An authenticated user session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer access token.
    pub access_token: String,
    /// Remote user id, if known.
    pub user_id: Option<String>,
}

impl Session {
    /// Creates a session from an access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            user_id: None,
        }
    }

    /// Sets the user id.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Authentication state passed to every remote call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    session: Option<Session>,
}

impl AuthContext {
    /// A context with no user session (service key only).
    pub fn service() -> Self {
        Self::default()
    }

    /// A context for an active user session.
    pub fn user(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Returns the user session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Returns true if a user session is active.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the token for the `Authorization: Bearer` header.
    pub fn bearer<'a>(&'a self, service_key: &'a str) -> &'a str {
        self.session
            .as_ref()
            .map(|s| s.access_token.as_str())
            .unwrap_or(service_key)
    }
}

impl From<Option<Session>> for AuthContext {
    fn from(session: Option<Session>) -> Self {
        Self { session }
    }
}

/// Source of the current user session.
pub trait SessionProvider: Send + Sync {
    /// Returns the active session, if a user is signed in.
    fn current_session(&self) -> Option<Session>;
}

/// A provider that never has a session.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSession;

impl SessionProvider for NoSession {
    fn current_session(&self) -> Option<Session> {
        None
    }
}

/// A provider holding a session set by the application.
#[derive(Debug, Default)]
pub struct StaticSession {
    session: RwLock<Option<Session>>,
}

impl StaticSession {
    /// Creates a provider with an active session.
    pub fn new(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }

    /// Replaces the session (sign in).
    pub fn set(&self, session: Session) {
        *self.session.write() = Some(session);
    }

    /// Clears the session (sign out).
    pub fn clear(&self) {
        *self.session.write() = None;
    }
}

impl SessionProvider for StaticSession {
    fn current_session(&self) -> Option<Session> {
        self.session.read().clone()
    }
}
