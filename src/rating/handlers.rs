use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;

use super::models::{RatingRequest, RatingResponse};
use crate::auth::{policy, Principal};
use crate::pagination::{Page, PageQuery, DEFAULT_PAGE_SIZE};
use crate::shared::{AppError, AppState};

/// POST /api/ratings
///
/// Ratings are always authored by the caller unless an admin names another user.
#[instrument(name = "create_rating", skip(state, principal, request), fields(caller = principal.user_id))]
pub async fn create_rating(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<RatingRequest>,
) -> Result<(StatusCode, Json<RatingResponse>), AppError> {
    let user_id = policy::acting_user(&principal, request.user_id)?;
    let rating = state.rating_service().create_rating(user_id, request).await?;
    Ok((StatusCode::CREATED, Json(rating)))
}

/// GET /api/ratings
#[instrument(name = "list_ratings", skip(state))]
pub async fn list_ratings(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<RatingResponse>>, AppError> {
    Ok(Json(
        state
            .rating_service()
            .list_ratings(page.resolve(DEFAULT_PAGE_SIZE))
            .await?,
    ))
}

/// GET /api/ratings/{id}
pub async fn get_rating(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RatingResponse>, AppError> {
    Ok(Json(state.rating_service().get_rating(id).await?))
}

/// PUT /api/ratings/{id}
#[instrument(name = "update_rating", skip(state, request))]
pub async fn update_rating(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<RatingRequest>,
) -> Result<Json<RatingResponse>, AppError> {
    Ok(Json(state.rating_service().update_rating(id, request).await?))
}

/// DELETE /api/ratings/{id}
#[instrument(name = "delete_rating", skip(state))]
pub async fn delete_rating(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.rating_service().delete_rating(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
