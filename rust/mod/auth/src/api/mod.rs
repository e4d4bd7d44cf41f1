mod account;
mod me;
mod middleware;
mod users;

use std::sync::Arc;

use axum::Router;

use crate::service::AuthService;

pub use middleware::require_auth;

/// Shared application state.
pub type AppState = Arc<AuthService>;

/// Routes reachable without a token: register, login, password reset.
///
/// All routes are relative; the caller nests them under `/api`.
pub fn public_router(svc: Arc<AuthService>) -> Router {
    Router::new().merge(account::routes()).with_state(svc)
}

/// Routes that expect [`require_auth`] to have run.
pub fn router(svc: Arc<AuthService>) -> Router {
    Router::new()
        .merge(me::routes())
        .merge(users::routes())
        .with_state(svc)
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    /// Send one request through the router and decode the JSON reply.
    pub async fn api(
        router: &axum::Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&b).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }
}
