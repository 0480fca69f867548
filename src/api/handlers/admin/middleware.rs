use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::debug;

use super::{
    cookies::extract_session_token, error::AdminError, session::ActiveSession, state::AdminState,
};

/// Identity attached to requests that passed `require_admin`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminPrincipal {
    pub username: String,
    pub expires_at: OffsetDateTime,
}

impl From<ActiveSession> for AdminPrincipal {
    fn from(session: ActiveSession) -> Self {
        Self {
            username: session.identity.username,
            expires_at: session.expires_at,
        }
    }
}

/// Gate for every protected admin route.
///
/// A valid session is renewed and its principal inserted into the request
/// extensions. Missing, unknown and expired tokens all get the same 401.
pub async fn require_admin(
    State(admin_state): State<Arc<AdminState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AdminError> {
    let unauthenticated = || AdminError::Unauthenticated {
        redirect: admin_state.config().login_path().to_string(),
    };

    let Some(token) = extract_session_token(request.headers()) else {
        debug!("Admin request without session token");
        return Err(unauthenticated());
    };

    let Some(session) = admin_state.sessions().authorize(&token, admin_state.now())? else {
        debug!("Admin request with unknown or expired session");
        return Err(unauthenticated());
    };

    request
        .extensions_mut()
        .insert(AdminPrincipal::from(session));
    Ok(next.run(request).await)
}
