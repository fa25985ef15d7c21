use axum::{extract::State, Extension, Json};
use tracing::{info, instrument, warn};

use super::types::{LoginRequest, MessageResponse, Principal, RefreshTokenRequest, TokenPair};
use crate::shared::{AppError, AppState};

/// POST /auth/login
#[instrument(name = "login", skip(state, request), fields(username = %request.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let pair = state
        .auth_service()
        .authenticate(request.username.trim(), &request.password)
        .await?;
    Ok(Json(pair))
}

/// POST /auth/refresh_token
///
/// Every failure is reported as 401 so clients fall back to a fresh login.
#[instrument(name = "refresh_token", skip(state, request))]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, AppError> {
    match state.auth_service().refresh(&request.refresh_token).await {
        Ok(pair) => Ok(Json(pair)),
        Err(e @ (AppError::DatabaseError(_) | AppError::Internal(_))) => Err(e),
        Err(e) if e.status_code() == axum::http::StatusCode::UNAUTHORIZED => Err(e),
        Err(e) => {
            warn!(error = %e, "Refresh failed");
            Err(AppError::Unauthorized(e.to_string()))
        }
    }
}

/// POST /auth/logout
#[instrument(name = "logout", skip(state, principal, request), fields(user_id = principal.user_id))]
pub async fn logout(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .auth_service()
        .logout(&request.refresh_token)
        .await
        .map_err(|e| AppError::BadRequest(format!("Logout failed: {}", e)))?;

    info!("Logout completed");
    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}
