//! Route registration: collects all module routes + system endpoints.

use std::sync::Arc;

use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tracing::info;

use amc_core::{Module, ServiceError};
use auth::service::AuthService;

/// Build the complete router.
///
/// Module routes are nested under `/api`. Each module's `routes()` sit
/// behind the bearer middleware; `public_routes()` do not.
pub fn build_router(auth_service: Arc<AuthService>, modules: &[&dyn Module]) -> Router {
    let mut public = Router::new();
    let mut protected = Router::new();
    for module in modules {
        info!("mounting module {}", module.name());
        public = public.merge(module.public_routes());
        protected = protected.merge(module.routes());
    }

    // route_layer: unmatched paths fall through to 404 instead of 401.
    let protected = protected.route_layer(middleware::from_fn_with_state(
        auth_service,
        auth::api::require_auth,
    ));

    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .nest("/api", public.merge(protected))
        .fallback(not_found)
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "amcd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found() -> ServiceError {
    ServiceError::NotFound("no such endpoint".into())
}
