//! Admin login, logout and status endpoints.
//!
//! Flow Overview:
//! 1) Reject bodies without both fields before touching any state.
//! 2) Reserve an attempt for the caller's address; blocked callers get 429
//!    whether or not their credentials are right. The reservation already
//!    counts as a failure.
//! 3) Verify credentials off the async runtime. A failure is logged and
//!    audited.
//! 4) On success the limiter entry is dropped, a session is issued, and the
//!    token goes out as an `HttpOnly` cookie.

use anyhow::Context;
use axum::{
    Json,
    extract::{ConnectInfo, Extension},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, info, warn};

use super::{
    audit::AuditOutcome,
    cookies::{clear_session_cookie, extract_session_token, session_cookie},
    error::AdminError,
    limiter::LoginDecision,
    state::AdminState,
    store::AdminIdentity,
    types::{
        AdminErrorResponse, AdminLoginRequest, AdminLoginResponse, AdminLogoutResponse,
        AdminStatusResponse,
    },
    utils::{client_key, format_timestamp},
};

#[utoipa::path(
    post,
    path = "/v1/admin/auth/login",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Admin session issued.", body = AdminLoginResponse),
        (status = 400, description = "Username or password missing.", body = AdminErrorResponse),
        (status = 401, description = "Invalid credentials.", body = AdminErrorResponse),
        (status = 429, description = "Too many failed attempts.", body = AdminErrorResponse),
    ),
    tag = "admin"
)]
pub async fn login(
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    admin_state: Extension<Arc<AdminState>>,
    payload: Option<Json<AdminLoginRequest>>,
) -> Result<Response, AdminError> {
    let Some(Json(request)) = payload else {
        return Err(AdminError::MissingCredentials);
    };
    let (Some(username), Some(password)) = (request.username, request.password) else {
        return Err(AdminError::MissingCredentials);
    };
    if username.is_empty() || password.is_empty() {
        return Err(AdminError::MissingCredentials);
    }
    let password = SecretString::from(password);

    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let client = client_key(&headers, peer, admin_state.config().trust_proxy_headers());
    let now = admin_state.now();

    if let decision @ LoginDecision::Blocked { .. } = admin_state.limiter().try_begin(&client, now)
    {
        let retry_after_seconds = decision.retry_after_seconds();
        warn!(client = %client, retry_after_seconds, "Admin login rate limited");
        admin_state.audit(AuditOutcome::LoginRateLimited, &client);
        return Err(AdminError::RateLimited {
            retry_after_seconds,
        });
    }

    let verifier_state = Arc::clone(&admin_state.0);
    let verified = tokio::task::spawn_blocking(move || {
        verifier_state
            .verifier()
            .verify(&username, password.expose_secret())
    })
    .await
    .context("credential check task failed")?;

    if !verified {
        let failures = admin_state.limiter().attempts(&client, now);
        warn!(client = %client, failures, "Admin login failed");
        admin_state.audit(AuditOutcome::LoginFailed, &client);
        return Err(AdminError::InvalidCredentials);
    }

    admin_state.limiter().record_success(&client);
    let identity = AdminIdentity {
        username: admin_state.verifier().username().to_string(),
    };
    let issued = admin_state.sessions().issue(identity, now)?;
    let expires_at = format_timestamp(issued.expires_at)?;
    let cookie = session_cookie(admin_state.config(), &issued.token)
        .context("failed to build session cookie")?;

    info!(client = %client, expires_at = %expires_at, "Admin login succeeded");
    admin_state.audit(AuditOutcome::LoginSucceeded, &client);

    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, cookie);
    let response = AdminLoginResponse {
        ok: true,
        expires_at,
    };
    Ok((StatusCode::OK, response_headers, Json(response)).into_response())
}

#[utoipa::path(
    post,
    path = "/v1/admin/auth/logout",
    responses(
        (status = 200, description = "Session cleared.", body = AdminLogoutResponse)
    ),
    tag = "admin"
)]
pub async fn logout(
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    admin_state: Extension<Arc<AdminState>>,
) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        if let Err(err) = admin_state.sessions().revoke(&token) {
            error!("Failed to revoke admin session: {err}");
        }

        let peer = connect_info.map(|ConnectInfo(addr)| addr);
        let client = client_key(&headers, peer, admin_state.config().trust_proxy_headers());
        admin_state.audit(AuditOutcome::Logout, &client);
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(admin_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (
        StatusCode::OK,
        response_headers,
        Json(AdminLogoutResponse { ok: true }),
    )
}

#[utoipa::path(
    get,
    path = "/v1/admin/auth/status",
    responses(
        (status = 200, description = "Current admin session state.", body = AdminStatusResponse)
    ),
    tag = "admin"
)]
pub async fn status(
    headers: HeaderMap,
    admin_state: Extension<Arc<AdminState>>,
) -> Result<Json<AdminStatusResponse>, AdminError> {
    let session = match extract_session_token(&headers) {
        Some(token) => admin_state.sessions().peek(&token, admin_state.now())?,
        None => None,
    };

    let response = match session {
        Some(session) => AdminStatusResponse {
            authenticated: true,
            expires_at: Some(format_timestamp(session.expires_at)?),
        },
        None => AdminStatusResponse {
            authenticated: false,
            expires_at: None,
        },
    };
    Ok(Json(response))
}
