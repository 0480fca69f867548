use crate::api::handlers::{
    admin::{
        self, AdminConfig, AdminState, AuditLog, AuditSink, CredentialVerifier, MemorySessionStore,
    },
    health,
};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{get, post},
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
// OpenAPI document and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

/// Build the application router around a shared admin state.
///
/// Protected admin routes go through `require_admin`; login, logout, status and
/// health stay public.
#[must_use]
pub fn router(admin_state: Arc<AdminState>) -> Router {
    let protected = Router::new()
        .route("/v1/admin/me", get(admin::me::me))
        .route_layer(middleware::from_fn_with_state(
            admin_state.clone(),
            admin::require_admin,
        ));

    Router::new()
        .route("/health", get(health::health).options(health::health))
        .route("/v1/admin/auth/login", post(admin::login::login))
        .route("/v1/admin/auth/logout", post(admin::login::logout))
        .route("/v1/admin/auth/status", get(admin::login::status))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(Extension(admin_state))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: Option<String>,
    admin_config: AdminConfig,
    verifier: CredentialVerifier,
) -> Result<()> {
    // Audit rows go to Postgres when a DSN is configured, otherwise to the log.
    let pool = match dsn {
        Some(dsn) => Some(
            PgPoolOptions::new()
                .min_connections(1)
                .max_connections(5)
                .max_lifetime(Duration::from_secs(60 * 2))
                .test_before_acquire(true)
                .connect_lazy(&dsn)
                .context("Invalid database connection string")?,
        ),
        None => None,
    };
    let sink = pool.clone().map_or(AuditSink::Log, AuditSink::Postgres);

    let (audit, audit_rx) = AuditLog::channel();
    let audit_worker = admin::spawn_audit_worker(audit_rx, sink);

    let frontend_origin = frontend_origin(admin_config.frontend_base_url())?;
    let admin_state = Arc::new(AdminState::new(
        admin_config,
        verifier,
        Arc::new(MemorySessionStore::new()),
        audit,
    ));

    let sweeper = admin::spawn_session_sweeper(admin_state.clone());

    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    let mut app = router(admin_state).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors),
    );
    if let Some(pool) = pool {
        app = app.layer(Extension(pool));
    }

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Stopping the sweeper drops the last state handle, which closes the audit
    // channel and lets the worker drain what is left.
    sweeper.abort();
    let _ = sweeper.await;
    if tokio::time::timeout(Duration::from_secs(5), audit_worker)
        .await
        .is_err()
    {
        info!("Audit worker did not drain before shutdown");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
