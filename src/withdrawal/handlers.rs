use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;

use super::models::{WithdrawalRequest, WithdrawalResponse};
use crate::auth::{policy, Principal};
use crate::pagination::{Page, PageQuery, DEFAULT_PAGE_SIZE};
use crate::shared::{AppError, AppState};

/// POST /api/withdrawals
#[instrument(name = "create_withdrawal", skip(state, principal, request), fields(caller = principal.user_id))]
pub async fn create_withdrawal(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(mut request): Json<WithdrawalRequest>,
) -> Result<(StatusCode, Json<WithdrawalResponse>), AppError> {
    let user_id = policy::acting_user(&principal, request.user_id)?;
    if !principal.is_admin() {
        request.status = None;
    }
    let withdrawal = state
        .withdrawal_service()
        .create_withdrawal(user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(withdrawal)))
}

/// GET /api/withdrawals
#[instrument(name = "list_withdrawals", skip(state))]
pub async fn list_withdrawals(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<WithdrawalResponse>>, AppError> {
    let page = page.resolve(DEFAULT_PAGE_SIZE);
    Ok(Json(state.withdrawal_service().list_withdrawals(page).await?))
}

/// GET /api/withdrawals/{id}
#[instrument(name = "get_withdrawal", skip(state))]
pub async fn get_withdrawal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<WithdrawalResponse>, AppError> {
    Ok(Json(state.withdrawal_service().get_withdrawal(id).await?))
}

/// PUT /api/withdrawals/{id}
#[instrument(name = "update_withdrawal", skip(state, request))]
pub async fn update_withdrawal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<WithdrawalRequest>,
) -> Result<Json<WithdrawalResponse>, AppError> {
    Ok(Json(
        state
            .withdrawal_service()
            .update_withdrawal(id, request)
            .await?,
    ))
}

/// DELETE /api/withdrawals/{id}
#[instrument(name = "delete_withdrawal", skip(state))]
pub async fn delete_withdrawal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.withdrawal_service().delete_withdrawal(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
