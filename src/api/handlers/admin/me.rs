use axum::{Json, extract::Extension};

use super::{
    error::AdminError, middleware::AdminPrincipal, types::AdminMeResponse,
    utils::format_timestamp,
};

#[utoipa::path(
    get,
    path = "/v1/admin/me",
    responses(
        (status = 200, description = "Authenticated admin.", body = AdminMeResponse),
        (status = 401, description = "Missing or expired admin session.", body = super::types::AdminErrorResponse),
    ),
    tag = "admin"
)]
pub async fn me(
    Extension(principal): Extension<AdminPrincipal>,
) -> Result<Json<AdminMeResponse>, AdminError> {
    Ok(Json(AdminMeResponse {
        username: principal.username,
        expires_at: format_timestamp(principal.expires_at)?,
    }))
}
