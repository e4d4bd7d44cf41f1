use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use amc_core::{ApiQuery, ServiceError};

use crate::api::AppState;
use crate::model::{ContractQuery, PurchaseOrderQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/contracts/export", get(export_contracts))
        .route("/purchase-orders/export", get(export_purchase_orders))
}

fn csv_attachment(filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET /contracts/export: all matching contracts, unpaged.
async fn export_contracts(
    State(svc): State<AppState>,
    ApiQuery(query): ApiQuery<ContractQuery>,
) -> Result<Response, ServiceError> {
    let body = svc.export_contracts_csv(&query)?;
    Ok(csv_attachment("contracts.csv", body))
}

/// GET /purchase-orders/export
async fn export_purchase_orders(
    State(svc): State<AppState>,
    ApiQuery(query): ApiQuery<PurchaseOrderQuery>,
) -> Result<Response, ServiceError> {
    let body = svc.export_purchase_orders_csv(&query)?;
    Ok(csv_attachment("purchase-orders.csv", body))
}
