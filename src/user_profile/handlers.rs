use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;

use super::models::{UserProfileRequest, UserProfileResponse};
use crate::auth::Principal;
use crate::pagination::{Page, PageQuery, DEFAULT_PAGE_SIZE};
use crate::shared::{AppError, AppState};

/// POST /api/user-profiles
#[instrument(name = "create_user_profile", skip(state, request))]
pub async fn create_user_profile(
    State(state): State<AppState>,
    Json(request): Json<UserProfileRequest>,
) -> Result<(StatusCode, Json<UserProfileResponse>), AppError> {
    let profile = state.user_profile_service().create_profile(request).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /api/user-profiles
#[instrument(name = "list_user_profiles", skip(state))]
pub async fn list_user_profiles(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<UserProfileResponse>>, AppError> {
    Ok(Json(
        state
            .user_profile_service()
            .list_profiles(page.resolve(DEFAULT_PAGE_SIZE))
            .await?,
    ))
}

/// GET /api/user-profiles/{id}
#[instrument(name = "get_user_profile", skip(state))]
pub async fn get_user_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserProfileResponse>, AppError> {
    Ok(Json(state.user_profile_service().get_profile(id).await?))
}

/// PUT /api/user-profiles/{id}
///
/// Owners can only change the free-call flag; reassigning the profile is admin-only.
#[instrument(name = "update_user_profile", skip(state, principal, request))]
pub async fn update_user_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    Json(mut request): Json<UserProfileRequest>,
) -> Result<Json<UserProfileResponse>, AppError> {
    if !principal.is_admin() {
        request.user_id = None;
    }
    Ok(Json(
        state.user_profile_service().update_profile(id, request).await?,
    ))
}

/// DELETE /api/user-profiles/{id}
#[instrument(name = "delete_user_profile", skip(state))]
pub async fn delete_user_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.user_profile_service().delete_profile(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
