use axum::{extract::State, http::StatusCode, Json};
use tracing::instrument;

use super::models::{CatalogItem, CatalogKind, CreateCatalogItemRequest};
use crate::shared::{AppError, AppState};

/// GET /api/languages
#[instrument(name = "list_languages", skip(state))]
pub async fn list_languages(
    State(state): State<AppState>,
) -> Result<Json<Vec<CatalogItem>>, AppError> {
    Ok(Json(
        state.catalog_service().list_items(CatalogKind::Language).await?,
    ))
}

/// POST /api/languages
#[instrument(name = "create_language", skip(state, request))]
pub async fn create_language(
    State(state): State<AppState>,
    Json(request): Json<CreateCatalogItemRequest>,
) -> Result<(StatusCode, Json<CatalogItem>), AppError> {
    let item = state
        .catalog_service()
        .create_item(CatalogKind::Language, request)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /api/themes
#[instrument(name = "list_themes", skip(state))]
pub async fn list_themes(
    State(state): State<AppState>,
) -> Result<Json<Vec<CatalogItem>>, AppError> {
    Ok(Json(
        state.catalog_service().list_items(CatalogKind::Theme).await?,
    ))
}

/// POST /api/themes
#[instrument(name = "create_theme", skip(state, request))]
pub async fn create_theme(
    State(state): State<AppState>,
    Json(request): Json<CreateCatalogItemRequest>,
) -> Result<(StatusCode, Json<CatalogItem>), AppError> {
    let item = state
        .catalog_service()
        .create_item(CatalogKind::Theme, request)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}
