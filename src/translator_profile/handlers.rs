use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument};

use super::service::AVAILABLE_BY_THEME_PAGE_SIZE;
use super::types::{
    AvailabilityQuery, CreateTranslatorProfileRequest, OnlineStatusQuery,
    TranslatorProfileResponse, TranslatorSearchQuery, UpdateTranslatorProfileRequest,
};
use crate::auth::{policy, Principal};
use crate::pagination::{Page, PageQuery, DEFAULT_PAGE_SIZE};
use crate::shared::{AppError, AppState};

/// POST /api/translator-profiles
///
/// Translators may only create the profile of their own account.
#[instrument(name = "create_translator_profile", skip(state, principal, request), fields(caller = principal.user_id))]
pub async fn create_translator_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(mut request): Json<CreateTranslatorProfileRequest>,
) -> Result<(StatusCode, Json<TranslatorProfileResponse>), AppError> {
    if !principal.is_admin() {
        request.user_id = Some(policy::acting_user(&principal, request.user_id)?);
    }

    let profile = state
        .translator_profile_service()
        .create_profile(request)
        .await?;
    info!(profile_id = profile.id, "Translator profile created via API");
    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /api/translator-profiles
#[instrument(name = "search_translator_profiles", skip(state))]
pub async fn search_translator_profiles(
    State(state): State<AppState>,
    Query(query): Query<TranslatorSearchQuery>,
) -> Result<Json<Page<TranslatorProfileResponse>>, AppError> {
    let (filter, page) = query.into_parts(DEFAULT_PAGE_SIZE);
    Ok(Json(
        state.translator_profile_service().search(filter, page).await?,
    ))
}

/// GET /api/translator-profiles/{id}
#[instrument(name = "get_translator_profile", skip(state))]
pub async fn get_translator_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TranslatorProfileResponse>, AppError> {
    Ok(Json(state.translator_profile_service().get_profile(id).await?))
}

/// GET /api/translator-profiles/available/theme/{theme_id}
#[instrument(name = "available_translators_by_theme", skip(state))]
pub async fn available_by_theme(
    State(state): State<AppState>,
    Path(theme_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<TranslatorProfileResponse>>, AppError> {
    let page = page.resolve(AVAILABLE_BY_THEME_PAGE_SIZE);
    Ok(Json(
        state
            .translator_profile_service()
            .available_by_theme(theme_id, page)
            .await?,
    ))
}

/// PUT /api/translator-profiles/{id}
#[instrument(name = "update_translator_profile", skip(state, request))]
pub async fn update_translator_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTranslatorProfileRequest>,
) -> Result<Json<TranslatorProfileResponse>, AppError> {
    Ok(Json(
        state
            .translator_profile_service()
            .update_profile(id, request)
            .await?,
    ))
}

/// PATCH /api/translator-profiles/{id}/availability?isAvailable=
#[instrument(name = "update_translator_availability", skip(state))]
pub async fn update_availability(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<TranslatorProfileResponse>, AppError> {
    Ok(Json(
        state
            .translator_profile_service()
            .set_availability(id, query.is_available)
            .await?,
    ))
}

/// PATCH /api/translator-profiles/{id}/online-status?isOnline=
#[instrument(name = "update_translator_online_status", skip(state))]
pub async fn update_online_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<OnlineStatusQuery>,
) -> Result<Json<TranslatorProfileResponse>, AppError> {
    Ok(Json(
        state
            .translator_profile_service()
            .set_online_status(id, query.is_online)
            .await?,
    ))
}

/// DELETE /api/translator-profiles/{id}
#[instrument(name = "delete_translator_profile", skip(state))]
pub async fn delete_translator_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.translator_profile_service().delete_profile(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::routes::app;
    use crate::shared::test_utils::{bearer_for, insert_user, AppStateBuilder};
    use crate::translator_profile::models::NewTranslatorProfile;
    use crate::user::models::Role;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt; // for `oneshot`

    fn request(method: &str, uri: &str, bearer: &str, body: Option<&str>) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("authorization", bearer)
            .body(Body::from(body.unwrap_or("").to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_translator_creates_own_profile_without_user_id() {
        let state = AppStateBuilder::new().build();
        let translator = insert_user(&state, "01030000001", vec![Role::Translator]).await;
        let bearer = bearer_for(&state, &translator);

        let response = app(state)
            .oneshot(request(
                "POST",
                "/api/translator-profiles",
                &bearer,
                Some(r#"{"email":"me@example.com"}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["userId"], translator.id);
    }

    #[tokio::test]
    async fn test_translator_cannot_create_for_someone_else() {
        let state = AppStateBuilder::new().build();
        let translator = insert_user(&state, "01030000002", vec![Role::Translator]).await;
        let other = insert_user(&state, "01030000003", vec![Role::Translator]).await;
        let bearer = bearer_for(&state, &translator);

        let response = app(state)
            .oneshot(request(
                "POST",
                "/api/translator-profiles",
                &bearer,
                Some(&format!(r#"{{"userId":{},"email":"x@example.com"}}"#, other.id)),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_only_owner_toggles_availability() {
        let state = AppStateBuilder::new().build();
        let owner = insert_user(&state, "01030000004", vec![Role::Translator]).await;
        let stranger = insert_user(&state, "01030000005", vec![Role::Translator]).await;
        let profile = state
            .repositories
            .translator_profiles
            .create_profile(&NewTranslatorProfile::placeholder(owner.id))
            .await
            .unwrap();
        let uri = format!(
            "/api/translator-profiles/{}/availability?isAvailable=true",
            profile.id
        );
        let app = app(state.clone());

        let denied = app
            .clone()
            .oneshot(request("PATCH", &uri, &bearer_for(&state, &stranger), None))
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let allowed = app
            .oneshot(request("PATCH", &uri, &bearer_for(&state, &owner), None))
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_gets_404_for_missing_profile() {
        let state = AppStateBuilder::new().build();
        let admin = insert_user(&state, "01030000006", vec![Role::Admin]).await;

        let response = app(state.clone())
            .oneshot(request(
                "PUT",
                "/api/translator-profiles/999",
                &bearer_for(&state, &admin),
                Some("{}"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
