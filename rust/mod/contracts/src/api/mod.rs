mod contracts;
mod dashboard;
mod export;
mod purchase_orders;

use std::sync::Arc;

use axum::Router;

use crate::service::ContractsService;

/// Shared application state.
pub type AppState = Arc<ContractsService>;

/// Build the contracts API router.
///
/// Every handler reads `Extension<CurrentUser>`, so the caller must put
/// the bearer middleware in front of it.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(contracts::routes())
        .merge(purchase_orders::routes())
        .merge(dashboard::routes())
        .merge(export::routes())
        .with_state(state)
}
