use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use amc_core::{ApiQuery, ServiceError};

use crate::api::AppState;
use crate::model::{DashboardQuery, DashboardSummary};

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard/summary", get(summary))
}

/// GET /dashboard/summary
async fn summary(
    State(svc): State<AppState>,
    ApiQuery(query): ApiQuery<DashboardQuery>,
) -> Result<Json<DashboardSummary>, ServiceError> {
    Ok(Json(svc.dashboard_summary(&query)?))
}
