use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use amc_core::{ApiJson, ApiPath, ApiQuery, CurrentUser, ListResult, ServiceError};

use crate::api::AppState;
use crate::model::{Contract, ContractInput, ContractQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/contracts", get(list_contracts).post(create_contract))
        .route(
            "/contracts/{id}",
            get(get_contract).put(update_contract).delete(delete_contract),
        )
}

async fn list_contracts(
    State(svc): State<AppState>,
    ApiQuery(query): ApiQuery<ContractQuery>,
) -> Result<Json<ListResult<Contract>>, ServiceError> {
    Ok(Json(svc.list_contracts(&query)?))
}

async fn create_contract(
    State(svc): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiJson(input): ApiJson<ContractInput>,
) -> Result<(StatusCode, Json<Contract>), ServiceError> {
    let contract = svc.create_contract(&actor, input)?;
    Ok((StatusCode::CREATED, Json(contract)))
}

async fn get_contract(
    State(svc): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Contract>, ServiceError> {
    Ok(Json(svc.get_contract(id)?))
}

async fn update_contract(
    State(svc): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<ContractInput>,
) -> Result<Json<Contract>, ServiceError> {
    Ok(Json(svc.update_contract(id, input)?))
}

async fn delete_contract(
    State(svc): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ServiceError> {
    actor.require_admin()?;
    svc.delete_contract(id)?;
    Ok(StatusCode::NO_CONTENT)
}
