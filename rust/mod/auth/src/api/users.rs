use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use amc_core::{ApiJson, ApiPath, ApiQuery, CurrentUser, ListResult, ServiceError};

use crate::api::AppState;
use crate::model::{UpdateUser, User, UserQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
}

async fn list_users(
    State(svc): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<ListResult<User>>, ServiceError> {
    actor.require_admin()?;
    Ok(Json(svc.list_users(&query)?))
}

async fn get_user(
    State(svc): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<User>, ServiceError> {
    actor.require_self_or_admin(id)?;
    Ok(Json(svc.get_user(id)?))
}

async fn update_user(
    State(svc): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UpdateUser>,
) -> Result<Json<User>, ServiceError> {
    actor.require_admin()?;
    Ok(Json(svc.update_user(&actor, id, patch)?))
}

async fn delete_user(
    State(svc): State<AppState>,
    Extension(actor): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ServiceError> {
    actor.require_admin()?;
    svc.delete_user(&actor, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use amc_core::Role;

    use crate::api::testing::api;
    use crate::service::testing;

    fn protected(svc: std::sync::Arc<crate::service::AuthService>) -> axum::Router {
        crate::api::router(svc.clone()).route_layer(axum::middleware::from_fn_with_state(
            svc,
            crate::api::require_auth,
        ))
    }

    #[tokio::test]
    async fn test_admin_manages_users() {
        let (svc, _) = testing::service();
        let admin = testing::user(&svc, "Root", Role::Admin);
        let user = testing::user(&svc, "Frank", Role::User);
        let token = svc.issue_token(&admin).unwrap().access_token;
        let app = protected(svc);

        let (status, body) = api(&app, "GET", "/users?limit=1", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["total_pages"], 2);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let (status, body) = api(&app, "GET", "/users?role=user", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["email"], "frank@example.com");

        let uri = format!("/users/{}", user.id);
        let (status, body) =
            api(&app, "PUT", &uri, Some(&token), Some(json!({"name": "Franklin", "active": false}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Franklin");
        assert_eq!(body["active"], false);

        let (status, _) = api(&app, "DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = api(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_regular_user_is_forbidden() {
        let (svc, _) = testing::service();
        let admin = testing::user(&svc, "Root", Role::Admin);
        let user = testing::user(&svc, "Gina", Role::User);
        let token = svc.issue_token(&user).unwrap().access_token;
        let app = protected(svc);

        let (status, body) = api(&app, "GET", "/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "PERMISSION_DENIED");

        let (status, _) = api(&app, "GET", &format!("/users/{}", admin.id), Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = api(&app, "GET", &format!("/users/{}", user.id), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_path_and_query_are_400() {
        let (svc, _) = testing::service();
        let admin = testing::user(&svc, "Root", Role::Admin);
        let token = svc.issue_token(&admin).unwrap().access_token;
        let app = protected(svc);

        let (status, _) = api(&app, "GET", "/users/abc", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = api(&app, "GET", "/users?page=0", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let (svc, _) = testing::service();
        let admin = testing::user(&svc, "Root", Role::Admin);
        let token = svc.issue_token(&admin).unwrap().access_token;
        let app = protected(svc);

        let (status, _) = api(&app, "DELETE", &format!("/users/{}", admin.id), Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
