//! In-memory login attempt limiter.
//!
//! Flow Overview:
//! 1) `try_begin` runs before credentials are looked at. Under one lock it resets
//!    an elapsed window, rejects the client if the threshold is reached, and
//!    otherwise counts the attempt as a failure up front.
//! 2) `record_success` forgets the client entirely, which also drops the attempt
//!    counted by `try_begin`.
//!
//! Counting before verification keeps concurrent attempts from the same client
//! from all slipping past the threshold while their password checks run.
//!
//! Scaling: counters are process-local and reset on restart. Multiple instances
//! do not share them.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};
use time::{Duration, OffsetDateTime};

pub const DEFAULT_MAX_FAILURES: u32 = 5;
pub const DEFAULT_WINDOW: Duration = Duration::minutes(15);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginDecision {
    Allowed,
    Blocked { retry_after: Duration },
}

impl LoginDecision {
    /// Whole seconds until the window closes, rounded up and never below one.
    #[must_use]
    pub fn retry_after_seconds(&self) -> u64 {
        match self {
            Self::Allowed => 0,
            Self::Blocked { retry_after } => {
                let millis = retry_after.whole_milliseconds().max(1);
                u64::try_from((millis + 999) / 1000).unwrap_or(u64::MAX)
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct AttemptWindow {
    count: u32,
    reset_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct LoginAttemptLimiter {
    max_failures: u32,
    window: Duration,
    attempts: Mutex<HashMap<String, AttemptWindow>>,
}

impl Default for LoginAttemptLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FAILURES, DEFAULT_WINDOW)
    }
}

impl LoginAttemptLimiter {
    #[must_use]
    pub fn new(max_failures: u32, window: Duration) -> Self {
        Self {
            max_failures: max_failures.max(1),
            window,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject a login attempt from `client_key` at `now`.
    ///
    /// An admitted attempt is counted immediately; it stays counted unless the
    /// login succeeds and `record_success` clears the client. Rejected attempts
    /// are not counted.
    pub fn try_begin(&self, client_key: &str, now: OffsetDateTime) -> LoginDecision {
        let mut attempts = self.lock();
        let entry = attempts
            .entry(client_key.to_string())
            .or_insert_with(|| AttemptWindow {
                count: 0,
                reset_at: now + self.window,
            });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }

        if entry.count >= self.max_failures {
            return LoginDecision::Blocked {
                retry_after: entry.reset_at - now,
            };
        }

        entry.count = entry.count.saturating_add(1);
        LoginDecision::Allowed
    }

    /// Attempts counted against `client_key` in its current window.
    #[must_use]
    pub fn attempts(&self, client_key: &str, now: OffsetDateTime) -> u32 {
        self.lock()
            .get(client_key)
            .filter(|window| now < window.reset_at)
            .map_or(0, |window| window.count)
    }

    /// Drop every trace of `client_key` after a successful login.
    pub fn record_success(&self, client_key: &str) {
        self.lock().remove(client_key);
    }

    /// Remove windows that have already elapsed.
    pub fn purge_expired(&self, now: OffsetDateTime) -> usize {
        let mut attempts = self.lock();
        let before = attempts.len();
        attempts.retain(|_, window| now < window.reset_at);
        before - attempts.len()
    }

    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, AttemptWindow>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
