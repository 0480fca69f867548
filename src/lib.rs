//! # Vidmarket (admin gateway)
//!
//! `vidmarket` serves the back-office authentication surface of the video
//! marketplace. Creators, content moderation, payouts and promo codes all sit
//! behind `/v1/admin/*`, and every one of those routes is guarded by the
//! mechanism in this crate.
//!
//! ## Admin Sessions
//!
//! A single admin identity is configured at startup. Logging in exchanges the
//! configured username and password for an opaque, random session token that
//! travels in an `HttpOnly; SameSite=Lax` cookie (or a `Bearer` header for
//! non-browser clients).
//!
//! - **Renew-on-use:** every authorized request pushes the session expiry a full
//!   TTL forward from now.
//! - **Indistinguishable misses:** absent and expired tokens both answer `401`
//!   with a redirect hint to the login surface.
//! - **Sweep:** a background task purges expired sessions so abandoned ones do
//!   not accumulate.
//!
//! ## Login Rate Limiting
//!
//! Failed logins are counted per client address inside a fixed window
//! (5 failures per 15 minutes by default). Once the threshold is reached every
//! attempt from that address is rejected with `429`, regardless of whether the
//! credentials would have matched. A successful login clears the counter.
//!
//! ## Scaling
//!
//! Session and attempt state is process-local. The session table sits behind the
//! `SessionStore` trait so it can move to a shared TTL-capable store when more
//! than one instance is deployed.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
