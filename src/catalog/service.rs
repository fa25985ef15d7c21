use std::sync::Arc;
use tracing::{info, instrument};

use super::models::{CatalogItem, CatalogKind, CreateCatalogItemRequest};
use super::repository::CatalogRepository;
use crate::shared::AppError;
use crate::validation::ensure_valid;

pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository + Send + Sync>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogRepository + Send + Sync>) -> Self {
        Self { catalog }
    }

    #[instrument(skip(self, request))]
    pub async fn create_item(
        &self,
        kind: CatalogKind,
        request: CreateCatalogItemRequest,
    ) -> Result<CatalogItem, AppError> {
        ensure_valid(&request)?;
        let name = request.name.unwrap_or_default();
        let item = self.catalog.create_item(kind, name.trim()).await?;
        info!(item_id = item.id, "Catalog item created");
        Ok(item)
    }

    pub async fn list_items(&self, kind: CatalogKind) -> Result<Vec<CatalogItem>, AppError> {
        self.catalog.list_items(kind).await
    }
}

/// Fails with NotFound on the first id that is not in the list
pub async fn require_all(
    catalog: &(dyn CatalogRepository + Send + Sync),
    kind: CatalogKind,
    ids: &[i64],
) -> Result<(), AppError> {
    for id in ids {
        if !catalog.exists(kind, *id).await? {
            return Err(AppError::NotFound(format!("{} not found: {}", kind.label(), id)));
        }
    }
    Ok(())
}
