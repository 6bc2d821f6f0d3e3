use crate::{api::AppState, status::UnifiedStatus};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::{instrument, warn};

#[utoipa::path(
    get,
    path = "/status",
    params(
        ("X-Remote-User" = String, Header, description = "Authenticated username, set by the fronting auth layer"),
    ),
    responses(
        (status = 200, description = "Unified MFA status of the user", body = UnifiedStatus),
        (status = 401, description = "No authenticated user on the request", body = String),
        (status = 404, description = "No user data found", body = String),
    ),
    tag = "status",
)]
/// Unified MFA and directory status of the requesting user.
#[instrument(skip_all)]
pub async fn status(headers: HeaderMap, state: Extension<AppState>) -> Response {
    let Some(username) = headers
        .get(&state.remote_user_header)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
    else {
        warn!("Request without {} header", state.remote_user_header);
        return (StatusCode::UNAUTHORIZED, "Missing authenticated user").into_response();
    };

    match state.service.status(username).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => {
            warn!("Status lookup for {} failed: {}", username, e);
            (
                StatusCode::NOT_FOUND,
                format!("No user data found for {username}"),
            )
                .into_response()
        }
    }
}
