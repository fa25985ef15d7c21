use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;

use super::models::{CallRequest, CallResponse};
use crate::auth::{policy, Principal};
use crate::pagination::{Page, PageQuery, DEFAULT_PAGE_SIZE};
use crate::shared::{AppError, AppState};

/// POST /api/calls
///
/// The caller is the authenticated user; admins may open a call for anyone.
#[instrument(name = "create_call", skip(state, principal, request), fields(caller = principal.user_id))]
pub async fn create_call(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CallRequest>,
) -> Result<(StatusCode, Json<CallResponse>), AppError> {
    let caller_id = policy::acting_user(&principal, request.caller_id)?;
    let call = state.call_service().create_call(caller_id, request).await?;
    Ok((StatusCode::CREATED, Json(call)))
}

/// GET /api/calls
#[instrument(name = "list_calls", skip(state))]
pub async fn list_calls(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Page<CallResponse>>, AppError> {
    Ok(Json(
        state
            .call_service()
            .list_calls(page.resolve(DEFAULT_PAGE_SIZE))
            .await?,
    ))
}

/// GET /api/calls/{id}
#[instrument(name = "get_call", skip(state))]
pub async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CallResponse>, AppError> {
    Ok(Json(state.call_service().get_call(id).await?))
}

/// PUT /api/calls/{id}
///
/// Participants can update call progress but not who took part in it.
#[instrument(name = "update_call", skip(state, principal, request))]
pub async fn update_call(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    Json(mut request): Json<CallRequest>,
) -> Result<Json<CallResponse>, AppError> {
    if !principal.is_admin() {
        request.caller_id = None;
        request.recipient_id = None;
    }
    Ok(Json(state.call_service().update_call(id, request).await?))
}

/// DELETE /api/calls/{id}
#[instrument(name = "delete_call", skip(state))]
pub async fn delete_call(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.call_service().delete_call(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
