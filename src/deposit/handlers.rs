use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;

use super::models::{DepositRequest, DepositResponse};
use crate::auth::{policy, Principal};
use crate::pagination::{Page, PageQuery, DEFAULT_PAGE_SIZE};
use crate::shared::{AppError, AppState};

/// POST /api/deposits
///
/// Non-admin callers deposit for themselves and always start out pending.
#[instrument(name = "create_deposit", skip(state, principal, request), fields(caller = principal.user_id))]
pub async fn create_deposit(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(mut request): Json<DepositRequest>,
) -> Result<(StatusCode, Json<DepositResponse>), AppError> {
    let user_id = policy::acting_user(&principal, request.user_id)?;
    if !principal.is_admin() {
        request.status = None;
    }
    let deposit = state.deposit_service().create_deposit(user_id, request).await?;
    Ok((StatusCode::CREATED, Json(deposit)))
}

/// GET /api/deposits
#[instrument(name = "list_deposits", skip(state))]
pub async fn list_deposits(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<DepositResponse>>, AppError> {
    Ok(Json(
        state
            .deposit_service()
            .list_deposits(page.resolve(DEFAULT_PAGE_SIZE))
            .await?,
    ))
}

/// GET /api/deposits/{id}
#[instrument(name = "get_deposit", skip(state))]
pub async fn get_deposit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DepositResponse>, AppError> {
    Ok(Json(state.deposit_service().get_deposit(id).await?))
}

/// PUT /api/deposits/{id}
#[instrument(name = "update_deposit", skip(state, request))]
pub async fn update_deposit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<DepositResponse>, AppError> {
    Ok(Json(state.deposit_service().update_deposit(id, request).await?))
}

/// DELETE /api/deposits/{id}
#[instrument(name = "delete_deposit", skip(state))]
pub async fn delete_deposit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.deposit_service().delete_deposit(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
