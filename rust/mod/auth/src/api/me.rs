use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use amc_core::{ApiJson, CurrentUser, ServiceError};

use crate::api::AppState;
use crate::model::{ChangePasswordRequest, Claims, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/auth/change-password", post(change_password))
}

/// GET /auth/me: the signed-in account.
async fn me(
    State(svc): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<User>, ServiceError> {
    Ok(Json(svc.get_user(user.id)?))
}

/// POST /auth/logout: revoke the session behind this token.
async fn logout(
    State(svc): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ServiceError> {
    svc.logout(&claims.sid)?;
    tracing::info!(sub = %claims.sub, "logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/change-password
async fn change_password(
    State(svc): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(input): ApiJson<ChangePasswordRequest>,
) -> Result<StatusCode, ServiceError> {
    svc.change_password(user.id, input)?;
    Ok(StatusCode::NO_CONTENT)
}
