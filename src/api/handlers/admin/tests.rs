//! Admin auth router tests.
//!
//! Every request goes through the real router with a manual clock, so window
//! and TTL boundaries are exercised without sleeping.

#![allow(clippy::unwrap_used)]

use super::{
    AdminConfig, AdminState, Clock, MemorySessionStore,
    audit::{AuditEvent, AuditLog, AuditOutcome},
    credentials::tests::verifier,
    sweep::sweep_once,
};
use crate::api::router;
use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{
        Request, Response, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, RETRY_AFTER, SET_COOKIE},
    },
};
use serde_json::{Value, json};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use time::{Duration, OffsetDateTime};
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

const USERNAME: &str = "admin";
const PASSWORD: &str = "correct horse battery staple";
const CLIENT: [u8; 4] = [203, 0, 113, 7];
const OTHER_CLIENT: [u8; 4] = [198, 51, 100, 9];

struct ManualClock(Mutex<OffsetDateTime>);

impl ManualClock {
    fn new() -> Self {
        Self(Mutex::new(
            OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        ))
    }

    fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.0.lock().unwrap()
    }
}

struct Harness {
    app: Router,
    clock: Arc<ManualClock>,
    state: Arc<AdminState>,
    audit_rx: UnboundedReceiver<AuditEvent>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(AdminConfig::default())
    }

    fn with_config(config: AdminConfig) -> Self {
        let clock = Arc::new(ManualClock::new());
        let (audit, audit_rx) = AuditLog::channel();
        let state = Arc::new(
            AdminState::new(
                config,
                verifier(USERNAME, PASSWORD),
                Arc::new(MemorySessionStore::new()),
                audit,
            )
            .with_clock(clock.clone()),
        );
        Self {
            app: router(state.clone()),
            clock,
            state,
            audit_rx,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn login(&self, username: &str, password: &str, client: [u8; 4]) -> Response<Body> {
        let body = json!({ "username": username, "password": password }).to_string();
        self.send(login_request(&body, client)).await
    }

    /// Log in with the right credentials and return the `Cookie` header value.
    async fn login_cookie(&self) -> String {
        let response = self.login(USERNAME, PASSWORD, CLIENT).await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie_pair(&response)
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn logout(&self, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/v1/admin/auth/logout");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((CLIENT, 40000))));
        self.send(request).await
    }

    fn drain_audit(&mut self) -> Vec<AuditOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(event) = self.audit_rx.try_recv() {
            outcomes.push(event.outcome);
        }
        outcomes
    }
}

fn login_request(body: &str, client: [u8; 4]) -> Request<Body> {
    let mut request = Request::builder()
        .method("POST")
        .uri("/v1/admin/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((client, 40000))));
    request
}

/// `name=value` part of the session `Set-Cookie` header.
fn session_cookie_pair(response: &Response<Body>) -> String {
    let header = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    header.split(';').next().unwrap().trim().to_string()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn login_success_sets_session_cookie() {
    let harness = Harness::new();
    let response = harness.login(USERNAME, PASSWORD, CLIENT).await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("vidmarket_admin_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Max-Age=3600"));
    assert!(!set_cookie.contains("Secure"));

    let body = json_body(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["expires_at"], "2023-11-14T23:13:20Z");
}

#[tokio::test]
async fn login_requires_both_fields_without_side_effects() {
    let mut harness = Harness::new();
    for body in [
        json!({ "username": USERNAME }).to_string(),
        json!({ "password": PASSWORD }).to_string(),
        json!({ "username": "", "password": PASSWORD }).to_string(),
        "{not json".to_string(),
        String::new(),
    ] {
        let response = harness.send(login_request(&body, CLIENT)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let json = json_body(response).await;
        assert_eq!(json["error"], "Username and password are required");
    }
    assert_eq!(harness.state.limiter().tracked_clients(), 0);
    assert!(harness.drain_audit().is_empty());
}

#[tokio::test]
async fn invalid_credentials_are_generic() {
    let mut harness = Harness::new();

    let wrong_password = harness.login(USERNAME, "wrong", CLIENT).await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert!(wrong_password.headers().get(SET_COOKIE).is_none());
    let wrong_password = json_body(wrong_password).await;

    let unknown_user = harness.login("root", PASSWORD, CLIENT).await;
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let unknown_user = json_body(unknown_user).await;

    assert_eq!(wrong_password, unknown_user);
    assert_eq!(wrong_password, json!({ "error": "Invalid credentials" }));
    assert_eq!(
        harness.drain_audit(),
        vec![AuditOutcome::LoginFailed, AuditOutcome::LoginFailed]
    );
}

#[tokio::test]
async fn five_failures_block_even_correct_password() {
    let mut harness = Harness::new();
    for _ in 0..5 {
        harness.clock.advance(Duration::seconds(10));
        let response = harness.login(USERNAME, "wrong", CLIENT).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let blocked = harness.login(USERNAME, PASSWORD, CLIENT).await;
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(blocked.headers().get(SET_COOKIE).is_none());
    // Window opened on the first attempt, 40 seconds ago.
    assert_eq!(
        blocked.headers().get(RETRY_AFTER).unwrap().to_str().unwrap(),
        "860"
    );
    let body = json_body(blocked).await;
    assert_eq!(body["retry_after_seconds"], 860);
    assert_eq!(
        body["error"],
        "Too many login attempts. Try again in 15 minutes."
    );

    let outcomes = harness.drain_audit();
    assert_eq!(outcomes.len(), 6);
    assert_eq!(outcomes.last(), Some(&AuditOutcome::LoginRateLimited));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_cannot_outrun_the_limit() {
    let mut harness = Harness::new();
    let body = json!({ "username": USERNAME, "password": "wrong" }).to_string();

    let attempts: Vec<_> = (0..20)
        .map(|_| {
            let app = harness.app.clone();
            let request = login_request(&body, CLIENT);
            tokio::spawn(async move { app.oneshot(request).await.unwrap().status() })
        })
        .collect();

    let mut unauthorized = 0;
    let mut rate_limited = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            StatusCode::UNAUTHORIZED => unauthorized += 1,
            StatusCode::TOO_MANY_REQUESTS => rate_limited += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(unauthorized, 5);
    assert_eq!(rate_limited, 15);

    let outcomes = harness.drain_audit();
    assert_eq!(
        outcomes
            .iter()
            .filter(|outcome| **outcome == AuditOutcome::LoginFailed)
            .count(),
        5
    );
}

#[tokio::test]
async fn blocked_client_recovers_after_window() {
    let harness = Harness::new();
    for _ in 0..5 {
        harness.login(USERNAME, "wrong", CLIENT).await;
    }
    assert_eq!(
        harness.login(USERNAME, PASSWORD, CLIENT).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    harness.clock.advance(Duration::minutes(15));
    let response = harness.login(USERNAME, PASSWORD, CLIENT).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_some());
}

#[tokio::test]
async fn blocking_is_per_client_address() {
    let harness = Harness::new();
    for _ in 0..5 {
        harness.login(USERNAME, "wrong", CLIENT).await;
    }
    assert_eq!(
        harness.login(USERNAME, PASSWORD, CLIENT).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(
        harness.login(USERNAME, PASSWORD, OTHER_CLIENT).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn success_clears_failure_history() {
    let harness = Harness::new();
    for _ in 0..4 {
        harness.login(USERNAME, "wrong", CLIENT).await;
    }
    assert_eq!(
        harness.login(USERNAME, PASSWORD, CLIENT).await.status(),
        StatusCode::OK
    );
    assert_eq!(harness.state.limiter().tracked_clients(), 0);

    // A fresh budget of five failures.
    for _ in 0..5 {
        assert_eq!(
            harness.login(USERNAME, "wrong", CLIENT).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }
    assert_eq!(
        harness.login(USERNAME, PASSWORD, CLIENT).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn forwarded_address_only_used_when_trusted() {
    let harness = Harness::with_config(AdminConfig::default().with_trust_proxy_headers(true));
    let body = json!({ "username": USERNAME, "password": "wrong" }).to_string();
    for _ in 0..5 {
        let mut request = login_request(&body, CLIENT);
        request
            .headers_mut()
            .insert("x-forwarded-for", "192.0.2.44".parse().unwrap());
        harness.send(request).await;
    }

    // Same peer, no forwarded header: a different key.
    assert_eq!(
        harness.login(USERNAME, PASSWORD, CLIENT).await.status(),
        StatusCode::OK
    );

    let body = json!({ "username": USERNAME, "password": PASSWORD }).to_string();
    let mut request = login_request(&body, OTHER_CLIENT);
    request
        .headers_mut()
        .insert("x-forwarded-for", "192.0.2.44".parse().unwrap());
    assert_eq!(
        harness.send(request).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn protected_route_requires_session() {
    let harness = Harness::new();
    let response = harness.get("/v1/admin/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await,
        json!({ "error": "Authentication required", "redirect": "/admin/login" })
    );

    let cookie = harness.login_cookie().await;
    let response = harness.get("/v1/admin/me", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["username"], USERNAME);
}

#[tokio::test]
async fn bearer_token_authorizes_non_browser_clients() {
    let harness = Harness::new();
    let cookie = harness.login_cookie().await;
    let token = cookie.split_once('=').unwrap().1;

    let request = Request::builder()
        .method("GET")
        .uri("/v1/admin/me")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(harness.send(request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn expired_and_unknown_sessions_look_identical() {
    let harness = Harness::new();
    let cookie = harness.login_cookie().await;

    harness.clock.advance(Duration::hours(1));
    let expired = harness.get("/v1/admin/me", Some(&cookie)).await;
    assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
    let expired = json_body(expired).await;

    let unknown = harness
        .get("/v1/admin/me", Some("vidmarket_admin_session=forged"))
        .await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let absent = harness.get("/v1/admin/me", None).await;

    assert_eq!(expired, json_body(unknown).await);
    assert_eq!(expired, json_body(absent).await);
    // The expired record was dropped on access.
    assert_eq!(harness.state.sessions().count().unwrap(), 0);
}

#[tokio::test]
async fn authorized_requests_renew_the_session() {
    let harness = Harness::new();
    let cookie = harness.login_cookie().await;

    harness.clock.advance(Duration::minutes(40));
    let response = harness.get("/v1/admin/me", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["expires_at"], "2023-11-14T23:53:20Z");

    // 80 minutes after login, past the original expiry.
    harness.clock.advance(Duration::minutes(40));
    assert_eq!(
        harness.get("/v1/admin/me", Some(&cookie)).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn logout_revokes_and_clears_cookie() {
    let mut harness = Harness::new();
    let cookie = harness.login_cookie().await;

    let response = harness.logout(Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cleared.starts_with("vidmarket_admin_session=;"));
    assert!(cleared.contains("Max-Age=0"));
    assert_eq!(json_body(response).await, json!({ "ok": true }));

    assert_eq!(
        harness.get("/v1/admin/me", Some(&cookie)).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        harness.drain_audit(),
        vec![AuditOutcome::LoginSucceeded, AuditOutcome::Logout]
    );
}

#[tokio::test]
async fn logout_is_idempotent() {
    let harness = Harness::new();
    let cookie = harness.login_cookie().await;
    assert_eq!(harness.logout(Some(&cookie)).await.status(), StatusCode::OK);
    assert_eq!(harness.logout(Some(&cookie)).await.status(), StatusCode::OK);
    assert_eq!(harness.logout(None).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_without_token_is_not_audited() {
    let mut harness = Harness::new();
    let response = harness.logout(None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_some());
    assert!(harness.drain_audit().is_empty());
}

#[tokio::test]
async fn status_reports_without_renewing() {
    let harness = Harness::new();
    let response = harness.get("/v1/admin/auth/status", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "authenticated": false }));

    let cookie = harness.login_cookie().await;
    harness.clock.advance(Duration::minutes(40));
    let response = harness.get("/v1/admin/auth/status", Some(&cookie)).await;
    let body = json_body(response).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["expires_at"], "2023-11-14T23:13:20Z");

    harness.clock.advance(Duration::minutes(20));
    let response = harness.get("/v1/admin/auth/status", Some(&cookie)).await;
    assert_eq!(json_body(response).await, json!({ "authenticated": false }));
}

#[tokio::test]
async fn status_does_not_touch_rate_limiter() {
    let harness = Harness::new();
    for _ in 0..5 {
        harness.login(USERNAME, "wrong", CLIENT).await;
    }
    let before = harness.state.limiter().tracked_clients();
    let response = harness.get("/v1/admin/auth/status", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(harness.state.limiter().tracked_clients(), before);
    assert_eq!(
        harness.login(USERNAME, PASSWORD, CLIENT).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn sweep_purges_abandoned_sessions_and_windows() {
    let harness = Harness::new();
    let _cookie = harness.login_cookie().await;
    harness.login(USERNAME, "wrong", OTHER_CLIENT).await;
    assert_eq!(harness.state.sessions().count().unwrap(), 1);
    assert_eq!(harness.state.limiter().tracked_clients(), 1);

    harness.clock.advance(Duration::hours(1));
    let (sessions, windows) = sweep_once(&harness.state).unwrap();
    assert_eq!((sessions, windows), (1, 1));
    assert_eq!(harness.state.sessions().count().unwrap(), 0);
    assert_eq!(harness.state.limiter().tracked_clients(), 0);
}

#[tokio::test]
async fn secure_cookie_behind_https_frontend() {
    let harness = Harness::with_config(
        AdminConfig::new("https://admin.vidmarket.dev".to_string()).with_session_ttl_seconds(900),
    );
    let response = harness.login(USERNAME, PASSWORD, CLIENT).await;
    let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("Max-Age=900"));
    assert!(set_cookie.ends_with("; Secure"));
}

#[tokio::test]
async fn health_reports_session_count() {
    let harness = Harness::new();
    let _cookie = harness.login_cookie().await;
    let response = harness.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("X-App").is_some());
    let body = json_body(response).await;
    assert_eq!(body["admin_sessions"], 1);
    assert_eq!(body["database"], "disabled");
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
}
