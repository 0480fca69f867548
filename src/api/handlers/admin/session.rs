//! Admin session lifecycle: issue, authorize (renew-on-use), revoke, sweep.
//!
//! Security boundaries:
//! - Tokens are 256-bit random values; only their SHA-256 hash reaches the store.
//! - A missing token and an expired token produce the same `None`.

use anyhow::Result;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

use super::{
    store::{AdminIdentity, SessionRecord, SessionStore},
    utils::{generate_session_token, hash_session_token},
};

pub const DEFAULT_SESSION_TTL: Duration = Duration::hours(1);

/// A freshly issued session. `token` goes to the client and nowhere else.
#[derive(Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl std::fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedSession")
            .field("token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A session that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveSession {
    pub identity: AdminIdentity,
    pub expires_at: OffsetDateTime,
}

impl From<SessionRecord> for ActiveSession {
    fn from(record: SessionRecord) -> Self {
        Self {
            identity: record.identity,
            expires_at: record.expires_at,
        }
    }
}

pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create a session for `identity` valid until `now + ttl`.
    ///
    /// # Errors
    /// Returns an error if the OS random source or the store fails.
    pub fn issue(&self, identity: AdminIdentity, now: OffsetDateTime) -> Result<IssuedSession> {
        let token = generate_session_token()?;
        let expires_at = now + self.ttl;
        self.store.insert(
            hash_session_token(&token),
            SessionRecord {
                identity,
                created_at: now,
                expires_at,
            },
        )?;
        Ok(IssuedSession { token, expires_at })
    }

    /// Validate `token` and slide its expiry to `now + ttl`.
    ///
    /// # Errors
    /// Returns an error only if the store fails.
    pub fn authorize(&self, token: &str, now: OffsetDateTime) -> Result<Option<ActiveSession>> {
        if token.is_empty() {
            return Ok(None);
        }
        let record = self
            .store
            .renew(&hash_session_token(token), now, self.ttl)?;
        Ok(record.map(ActiveSession::from))
    }

    /// Validate `token` without renewing it.
    ///
    /// # Errors
    /// Returns an error only if the store fails.
    pub fn peek(&self, token: &str, now: OffsetDateTime) -> Result<Option<ActiveSession>> {
        if token.is_empty() {
            return Ok(None);
        }
        let record = self.store.get(&hash_session_token(token), now)?;
        Ok(record.map(ActiveSession::from))
    }

    /// Delete the session for `token`. Calling it for an unknown token is fine.
    ///
    /// # Errors
    /// Returns an error only if the store fails.
    pub fn revoke(&self, token: &str) -> Result<()> {
        self.store.remove(&hash_session_token(token))
    }

    /// Purge every expired session.
    ///
    /// # Errors
    /// Returns an error only if the store fails.
    pub fn sweep(&self, now: OffsetDateTime) -> Result<usize> {
        self.store.purge_expired(now)
    }

    /// Number of sessions held by the store, including expired ones not yet swept.
    ///
    /// # Errors
    /// Returns an error only if the store fails.
    pub fn count(&self) -> Result<usize> {
        self.store.count()
    }
}
