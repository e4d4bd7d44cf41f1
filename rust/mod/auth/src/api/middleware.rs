use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use amc_core::ServiceError;

use crate::api::AppState;

/// Bearer token middleware.
///
/// Validates the token and its session, then stores [`crate::model::Claims`]
/// and [`amc_core::CurrentUser`] as request extensions for handlers.
pub async fn require_auth(
    State(svc): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = extract_bearer(req.headers())
        .ok_or_else(|| ServiceError::Unauthorized("missing authorization header".into()))?
        .to_string();

    let (claims, user) = svc.authenticate(&token).map_err(|e| {
        tracing::debug!("rejected bearer token: {}", e);
        match e {
            ServiceError::Storage(_) | ServiceError::Internal(_) => e,
            _ => ServiceError::Unauthorized("invalid or expired token".into()),
        }
    })?;

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Extract the Bearer token from the Authorization header.
fn extract_bearer(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
