use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Errors surfaced by the admin auth endpoints and middleware.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Username and password are required")]
    MissingCredentials,

    #[error("{}", rate_limit_message(*retry_after_seconds))]
    RateLimited { retry_after_seconds: u64 },

    /// Wrong username or wrong password; the message never says which.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated { redirect: String },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn rate_limit_message(retry_after_seconds: u64) -> String {
    let minutes = retry_after_seconds.div_ceil(60).max(1);
    let unit = if minutes == 1 { "minute" } else { "minutes" };
    format!("Too many login attempts. Try again in {minutes} {unit}.")
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingCredentials | Self::InvalidCredentials => {
                let status = if matches!(self, Self::MissingCredentials) {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::UNAUTHORIZED
                };
                (status, Json(json!({ "error": self.to_string() }))).into_response()
            }
            Self::RateLimited {
                retry_after_seconds,
            } => {
                let body = json!({
                    "error": self.to_string(),
                    "retry_after_seconds": retry_after_seconds,
                });
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(retry_after_seconds));
                response
            }
            Self::Unauthenticated { ref redirect } => {
                let body = json!({ "error": self.to_string(), "redirect": redirect });
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            }
            Self::Internal(ref err) => {
                tracing::error!(error = %err, "Admin auth internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal error" })),
                )
                    .into_response()
            }
        }
    }
}
