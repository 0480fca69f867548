//! Small helpers for session tokens and client addressing.

use anyhow::{Context, Result};
use axum::http::HeaderMap;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use super::store::SessionKey;

/// Key used when no client address can be determined.
pub(crate) const UNKNOWN_CLIENT: &str = "unknown";

/// Create a new session token for the admin cookie (256 bits of entropy).
/// The raw value is only returned to set the cookie; the store keeps a hash.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Hash a session token so raw values never sit in the session store.
pub(crate) fn hash_session_token(token: &str) -> SessionKey {
    Sha256::digest(token.as_bytes()).into()
}

/// Resolve the rate-limit key for a request.
///
/// Proxy headers are only honoured when the deployment sits behind a trusted
/// reverse proxy; otherwise they are client-controlled.
pub(crate) fn client_key(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        if let Some(ip) = extract_forwarded_ip(headers) {
            return ip;
        }
    }
    peer.map_or_else(|| UNKNOWN_CLIENT.to_string(), |addr| addr.ip().to_string())
}

/// Extract a client IP from common proxy headers.
fn extract_forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// RFC 3339 timestamp without fractional seconds.
pub(crate) fn format_timestamp(at: OffsetDateTime) -> Result<String> {
    at.replace_nanosecond(0)
        .context("strip timestamp nanoseconds")?
        .format(&Rfc3339)
        .context("format timestamp")
}
