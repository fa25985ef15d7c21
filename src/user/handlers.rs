use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument, warn};

use super::types::{CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::auth::Principal;
use crate::pagination::{Page, PageQuery, DEFAULT_PAGE_SIZE};
use crate::shared::{AppError, AppState};

/// POST /api/users
#[instrument(name = "create_user", skip(state, request))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = state.user_service().create_user(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users?page=&size=
#[instrument(name = "list_users", skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<UserResponse>>, AppError> {
    let users = state
        .user_service()
        .list_users(page.resolve(DEFAULT_PAGE_SIZE))
        .await?;
    Ok(Json(users))
}

/// GET /api/users/me
#[instrument(name = "get_current_user", skip(state, principal), fields(username = %principal.username))]
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.user_service().get_user(principal.user_id).await?;
    Ok(Json(user))
}

/// GET /api/users/{id}
#[instrument(name = "get_user", skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(state.user_service().get_user(id).await?))
}

/// PUT /api/users/{id}
///
/// Users editing themselves cannot touch roles, balance or the active flag.
#[instrument(name = "update_user", skip(state, principal, request))]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let privileged =
        request.roles.is_some() || request.balance.is_some() || request.is_active.is_some();
    if privileged && !principal.is_admin() {
        warn!(user_id = id, "Non-admin tried to change privileged user fields");
        return Err(AppError::AccessDenied(
            "Only administrators can change roles, balance or activation".to_string(),
        ));
    }

    let user = state.user_service().update_user(id, request).await?;
    info!(user_id = id, "User updated via API");
    Ok(Json(user))
}

/// DELETE /api/users/{id}
#[instrument(name = "delete_user", skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.user_service().delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::routes::app;
    use crate::shared::test_utils::{bearer_for, insert_user, AppStateBuilder};
    use crate::user::models::Role;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt; // for `oneshot`

    fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(bearer) = bearer {
            builder = builder.header("authorization", bearer);
        }
        builder
            .body(Body::from(body.unwrap_or("").to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_admin_creates_user() {
        let state = AppStateBuilder::new().build();
        let admin = insert_user(&state, "01000000001", vec![Role::Admin]).await;
        let bearer = bearer_for(&state, &admin);

        let response = app(state)
            .oneshot(request(
                "POST",
                "/api/users",
                Some(&bearer),
                Some(r#"{"username":"01055556666","password":"pw","roles":["ROLE_TRANSLATOR"]}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["username"], "01055556666");
        assert_eq!(body["roles"][0], "ROLE_TRANSLATOR");
        assert!(body.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_non_admin_cannot_create_users() {
        let state = AppStateBuilder::new().build();
        let user = insert_user(&state, "01000000002", vec![Role::User]).await;
        let bearer = bearer_for(&state, &user);

        let response = app(state)
            .oneshot(request(
                "POST",
                "/api/users",
                Some(&bearer),
                Some(r#"{"username":"01055556666","password":"pw"}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let state = AppStateBuilder::new().build();

        let response = app(state)
            .oneshot(request("GET", "/api/users/me", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_returns_current_user() {
        let state = AppStateBuilder::new().build();
        let user = insert_user(&state, "01000000003", vec![Role::User]).await;
        let bearer = bearer_for(&state, &user);

        let response = app(state)
            .oneshot(request("GET", "/api/users/me", Some(&bearer), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], user.id);
    }

    #[tokio::test]
    async fn test_user_reads_self_but_not_others() {
        let state = AppStateBuilder::new().build();
        let me = insert_user(&state, "01000000004", vec![Role::User]).await;
        let other = insert_user(&state, "01000000005", vec![Role::User]).await;
        let bearer = bearer_for(&state, &me);
        let app = app(state);

        let own = app
            .clone()
            .oneshot(request("GET", &format!("/api/users/{}", me.id), Some(&bearer), None))
            .await
            .unwrap();
        assert_eq!(own.status(), StatusCode::OK);

        let foreign = app
            .oneshot(request("GET", &format!("/api/users/{}", other.id), Some(&bearer), None))
            .await
            .unwrap();
        assert_eq!(foreign.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_self_update_cannot_grant_roles() {
        let state = AppStateBuilder::new().build();
        let me = insert_user(&state, "01000000006", vec![Role::User]).await;
        let bearer = bearer_for(&state, &me);
        let app = app(state);

        let escalate = app
            .clone()
            .oneshot(request(
                "PUT",
                &format!("/api/users/{}", me.id),
                Some(&bearer),
                Some(r#"{"roles":["ROLE_ADMIN"]}"#),
            ))
            .await
            .unwrap();
        assert_eq!(escalate.status(), StatusCode::FORBIDDEN);

        let rename = app
            .oneshot(request(
                "PUT",
                &format!("/api/users/{}", me.id),
                Some(&bearer),
                Some(r#"{"firstName":"Yuna"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(rename.status(), StatusCode::OK);
        assert_eq!(json_body(rename).await["firstName"], "Yuna");
    }

    #[tokio::test]
    async fn test_admin_deletes_user() {
        let state = AppStateBuilder::new().build();
        let admin = insert_user(&state, "01000000007", vec![Role::Admin]).await;
        let victim = insert_user(&state, "01000000008", vec![Role::User]).await;
        let bearer = bearer_for(&state, &admin);
        let app = app(state);

        let response = app
            .clone()
            .oneshot(request("DELETE", &format!("/api/users/{}", victim.id), Some(&bearer), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let again = app
            .oneshot(request("GET", &format!("/api/users/{}", victim.id), Some(&bearer), None))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_body_returns_field_errors() {
        let state = AppStateBuilder::new().build();
        let admin = insert_user(&state, "01000000009", vec![Role::Admin]).await;
        let bearer = bearer_for(&state, &admin);

        let response = app(state)
            .oneshot(request(
                "POST",
                "/api/users",
                Some(&bearer),
                Some(r#"{"username":"not-a-phone"}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"username"));
        assert!(fields.contains(&"password"));
    }
}
