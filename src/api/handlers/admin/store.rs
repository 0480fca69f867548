//! Session persistence behind a pluggable trait.
//!
//! Records are keyed by the SHA-256 hash of the session token; raw tokens only
//! exist in the client cookie. `MemorySessionStore` keeps them in a process-local
//! map. A shared key-value store with native TTLs can implement `SessionStore`
//! when the service runs as more than one instance.

use anyhow::Result;
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};
use time::{Duration, OffsetDateTime};

/// SHA-256 hash of a session token.
pub type SessionKey = [u8; 32];

/// Authenticated principal attached to a session. There is a single admin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminIdentity {
    pub username: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub identity: AdminIdentity,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl SessionRecord {
    #[must_use]
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

pub trait SessionStore: Send + Sync {
    /// Store a new record, replacing any record under the same key.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    fn insert(&self, key: SessionKey, record: SessionRecord) -> Result<()>;

    /// Fetch a live record without changing it. Expired records are reported as
    /// missing but left for the sweep.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    fn get(&self, key: &SessionKey, now: OffsetDateTime) -> Result<Option<SessionRecord>>;

    /// Extend a live record to at least `now + ttl` and return it. An expired
    /// record is deleted and reported as missing.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    fn renew(
        &self,
        key: &SessionKey,
        now: OffsetDateTime,
        ttl: Duration,
    ) -> Result<Option<SessionRecord>>;

    /// Delete a record. Missing keys are not an error.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    fn remove(&self, key: &SessionKey) -> Result<()>;

    /// Delete every record with `expires_at <= now`, returning how many went.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    fn purge_expired(&self, now: OffsetDateTime) -> Result<usize>;

    /// Number of records currently held, live or not.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    fn count(&self) -> Result<usize>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionKey, SessionRecord>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionKey, SessionRecord>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn insert(&self, key: SessionKey, record: SessionRecord) -> Result<()> {
        self.lock().insert(key, record);
        Ok(())
    }

    fn get(&self, key: &SessionKey, now: OffsetDateTime) -> Result<Option<SessionRecord>> {
        Ok(self
            .lock()
            .get(key)
            .filter(|record| record.is_live(now))
            .cloned())
    }

    fn renew(
        &self,
        key: &SessionKey,
        now: OffsetDateTime,
        ttl: Duration,
    ) -> Result<Option<SessionRecord>> {
        let mut sessions = self.lock();
        let Some(record) = sessions.get_mut(key) else {
            return Ok(None);
        };

        if !record.is_live(now) {
            sessions.remove(key);
            return Ok(None);
        }

        // Renewal never moves the expiry backwards.
        let renewed = now + ttl;
        if renewed > record.expires_at {
            record.expires_at = renewed;
        }
        Ok(Some(record.clone()))
    }

    fn remove(&self, key: &SessionKey) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn purge_expired(&self, now: OffsetDateTime) -> Result<usize> {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, record| record.is_live(now));
        Ok(before - sessions.len())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.lock().len())
    }
}
