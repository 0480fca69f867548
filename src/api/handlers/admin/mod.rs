//! Admin authentication: credential check, login throttling and sessions.
//!
//! A single administrator logs in with a configured username and password.
//! Success yields an opaque session token carried in an `HttpOnly` cookie (or a
//! bearer header for non-browser clients); every route behind `require_admin`
//! renews it.
//!
//! ## Login Rate Limiting
//!
//! Failed logins are counted per client address inside a fixed window
//! (5 failures per 15 minutes by default). While blocked, a client gets 429 with
//! `Retry-After` even if the credentials are right. A successful login clears
//! the client's entry.
//!
//! ## Sessions
//!
//! - TTL defaults to one hour and slides forward on every authorized request.
//! - Expired sessions are rejected on access and purged by a periodic sweep.
//! - Logout deletes the session immediately and is idempotent.
//!
//! Sessions and limiter counters live in process memory, so they reset on
//! restart and are not shared between instances.

pub(crate) mod audit;
mod cookies;
pub(crate) mod credentials;
mod error;
pub(crate) mod limiter;
pub(crate) mod login;
pub(crate) mod me;
mod middleware;
pub(crate) mod session;
mod state;
pub(crate) mod store;
mod sweep;
pub(crate) mod types;
mod utils;

pub use audit::{AuditLog, AuditSink, spawn_audit_worker};
pub use cookies::SESSION_COOKIE_NAME;
pub use credentials::{CredentialVerifier, KdfParams};
pub use error::AdminError;
pub use middleware::{AdminPrincipal, require_admin};
pub use state::{AdminConfig, AdminState, Clock, SystemClock};
pub use store::{MemorySessionStore, SessionStore};
pub use sweep::spawn_session_sweeper;

#[cfg(test)]
mod tests;
