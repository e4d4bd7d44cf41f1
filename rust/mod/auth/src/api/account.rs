use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use amc_core::{ApiJson, ServiceError};

use crate::api::AppState;
use crate::model::{
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, TokenResponse,
};
use crate::service::account::RESET_REQUESTED_MESSAGE;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

/// POST /auth/register
async fn register(
    State(svc): State<AppState>,
    ApiJson(input): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ServiceError> {
    let token = svc.register(input)?;
    Ok((StatusCode::CREATED, Json(token)))
}

/// POST /auth/login
async fn login(
    State(svc): State<AppState>,
    ApiJson(input): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ServiceError> {
    Ok(Json(svc.login(input)?))
}

/// POST /auth/forgot-password
async fn forgot_password(
    State(svc): State<AppState>,
    ApiJson(input): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    svc.forgot_password(&input.email)?;
    Ok(Json(serde_json::json!({ "message": RESET_REQUESTED_MESSAGE })))
}

/// POST /auth/reset-password
async fn reset_password(
    State(svc): State<AppState>,
    ApiJson(input): ApiJson<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    svc.reset_password(input)?;
    Ok(Json(serde_json::json!({ "message": "password has been reset" })))
}
