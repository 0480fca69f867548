//! Admin auth configuration and shared state.

use std::sync::Arc;
use time::{Duration, OffsetDateTime};

use super::{
    audit::{AuditEvent, AuditLog, AuditOutcome},
    credentials::CredentialVerifier,
    limiter::{DEFAULT_MAX_FAILURES, DEFAULT_WINDOW, LoginAttemptLimiter},
    session::{DEFAULT_SESSION_TTL, SessionManager},
    store::SessionStore,
};

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::hours(1);
const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:5173";
const DEFAULT_LOGIN_PATH: &str = "/admin/login";

#[derive(Clone, Debug)]
pub struct AdminConfig {
    frontend_base_url: String,
    login_path: String,
    session_ttl: Duration,
    sweep_interval: Duration,
    max_login_failures: u32,
    login_window: Duration,
    trust_proxy_headers: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FRONTEND_BASE_URL.to_string())
    }
}

impl AdminConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            session_ttl: DEFAULT_SESSION_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_login_failures: DEFAULT_MAX_FAILURES,
            login_window: DEFAULT_WINDOW,
            trust_proxy_headers: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl = seconds_to_duration(seconds);
        self
    }

    #[must_use]
    pub fn with_sweep_interval_seconds(mut self, seconds: u64) -> Self {
        self.sweep_interval = seconds_to_duration(seconds);
        self
    }

    #[must_use]
    pub fn with_max_login_failures(mut self, failures: u32) -> Self {
        self.max_login_failures = failures;
        self
    }

    #[must_use]
    pub fn with_login_window_seconds(mut self, seconds: u64) -> Self {
        self.login_window = seconds_to_duration(seconds);
        self
    }

    #[must_use]
    pub fn with_trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: String) -> Self {
        self.login_path = path;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    #[must_use]
    pub fn max_login_failures(&self) -> u32 {
        self.max_login_failures
    }

    #[must_use]
    pub fn login_window(&self) -> Duration {
        self.login_window
    }

    #[must_use]
    pub fn trust_proxy_headers(&self) -> bool {
        self.trust_proxy_headers
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    pub(super) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

fn seconds_to_duration(seconds: u64) -> Duration {
    Duration::seconds(i64::try_from(seconds).unwrap_or(i64::MAX).max(1))
}

/// Source of "now" for session and limiter decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Everything the admin auth handlers and middleware share.
pub struct AdminState {
    config: AdminConfig,
    verifier: CredentialVerifier,
    limiter: LoginAttemptLimiter,
    sessions: SessionManager,
    audit: AuditLog,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AdminState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminState")
            .field("config", &self.config)
            .field("verifier", &self.verifier)
            .field("limiter", &self.limiter)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl AdminState {
    #[must_use]
    pub fn new(
        config: AdminConfig,
        verifier: CredentialVerifier,
        store: Arc<dyn SessionStore>,
        audit: AuditLog,
    ) -> Self {
        let limiter = LoginAttemptLimiter::new(config.max_login_failures(), config.login_window());
        let sessions = SessionManager::new(store, config.session_ttl());
        Self {
            config,
            verifier,
            limiter,
            sessions,
            audit,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    #[must_use]
    pub fn verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }

    #[must_use]
    pub fn limiter(&self) -> &LoginAttemptLimiter {
        &self.limiter
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    #[must_use]
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Emit an audit event stamped with the current time.
    pub fn audit(&self, outcome: AuditOutcome, client: &str) {
        self.audit.record(AuditEvent::new(outcome, client, self.now()));
    }
}
