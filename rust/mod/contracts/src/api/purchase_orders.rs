use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use amc_core::{ApiJson, ApiPath, ApiQuery, CurrentUser, ListResult, ServiceError};

use crate::api::AppState;
use crate::model::{PurchaseOrder, PurchaseOrderInput, PurchaseOrderQuery, PurchaseOrderSummary};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/purchase-orders", get(list_purchase_orders).post(create_purchase_order))
        .route(
            "/purchase-orders/{id}",
            get(get_purchase_order)
                .put(update_purchase_order)
                .delete(delete_purchase_order),
        )
}

async fn list_purchase_orders(
    State(svc): State<AppState>,
    ApiQuery(query): ApiQuery<PurchaseOrderQuery>,
) -> Result<Json<ListResult<PurchaseOrderSummary>>, ServiceError> {
    Ok(Json(svc.list_purchase_orders(&query)?))
}

async fn create_purchase_order(
    State(svc): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiJson(input): ApiJson<PurchaseOrderInput>,
) -> Result<(StatusCode, Json<PurchaseOrder>), ServiceError> {
    let po = svc.create_purchase_order(&actor, input)?;
    Ok((StatusCode::CREATED, Json(po)))
}

async fn get_purchase_order(
    State(svc): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<PurchaseOrder>, ServiceError> {
    Ok(Json(svc.get_purchase_order(id)?))
}

async fn update_purchase_order(
    State(svc): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<PurchaseOrderInput>,
) -> Result<Json<PurchaseOrder>, ServiceError> {
    Ok(Json(svc.update_purchase_order(id, input)?))
}

async fn delete_purchase_order(
    State(svc): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ServiceError> {
    actor.require_admin()?;
    svc.delete_purchase_order(id)?;
    Ok(StatusCode::NO_CONTENT)
}
