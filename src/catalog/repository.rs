use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{CatalogItem, CatalogKind};
use crate::shared::AppError;

/// Trait for the language and theme lists
#[async_trait]
pub trait CatalogRepository {
    async fn create_item(&self, kind: CatalogKind, name: &str) -> Result<CatalogItem, AppError>;
    async fn list_items(&self, kind: CatalogKind) -> Result<Vec<CatalogItem>, AppError>;
    async fn exists(&self, kind: CatalogKind, id: i64) -> Result<bool, AppError>;
}

fn duplicate_name(kind: CatalogKind, name: &str) -> AppError {
    AppError::Conflict(format!("{} '{}' already exists", kind.label(), name))
}

/// In-memory implementation of CatalogRepository for development and testing
pub struct InMemoryCatalogRepository {
    languages: RwLock<BTreeMap<i64, CatalogItem>>,
    themes: RwLock<BTreeMap<i64, CatalogItem>>,
    next_id: AtomicI64,
}

impl Default for InMemoryCatalogRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self {
            languages: RwLock::new(BTreeMap::new()),
            themes: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn items(&self, kind: CatalogKind) -> &RwLock<BTreeMap<i64, CatalogItem>> {
        match kind {
            CatalogKind::Language => &self.languages,
            CatalogKind::Theme => &self.themes,
        }
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    #[instrument(skip(self))]
    async fn create_item(&self, kind: CatalogKind, name: &str) -> Result<CatalogItem, AppError> {
        let mut items = self.items(kind).write().await;
        if items.values().any(|item| item.name == name) {
            warn!("Catalog name already exists in memory");
            return Err(duplicate_name(kind, name));
        }

        let item = CatalogItem {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: name.to_string(),
        };
        items.insert(item.id, item.clone());

        debug!(item_id = item.id, "Catalog item created in memory");
        Ok(item)
    }

    async fn list_items(&self, kind: CatalogKind) -> Result<Vec<CatalogItem>, AppError> {
        Ok(self.items(kind).read().await.values().cloned().collect())
    }

    async fn exists(&self, kind: CatalogKind, id: i64) -> Result<bool, AppError> {
        Ok(self.items(kind).read().await.contains_key(&id))
    }
}

/// PostgreSQL implementation of the language and theme lists
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    #[instrument(skip(self))]
    async fn create_item(&self, kind: CatalogKind, name: &str) -> Result<CatalogItem, AppError> {
        let row = sqlx::query(&format!(
            "INSERT INTO {} (name) VALUES ($1) RETURNING id, name",
            kind.table()
        ))
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => duplicate_name(kind, name),
            _ => AppError::from(e),
        })?;

        let item = CatalogItem {
            id: row.get("id"),
            name: row.get("name"),
        };
        debug!(item_id = item.id, "Catalog item created in database");
        Ok(item)
    }

    async fn list_items(&self, kind: CatalogKind) -> Result<Vec<CatalogItem>, AppError> {
        let rows = sqlx::query(&format!("SELECT id, name FROM {} ORDER BY id", kind.table()))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| CatalogItem {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }

    async fn exists(&self, kind: CatalogKind, id: i64) -> Result<bool, AppError> {
        let present: bool = sqlx::query(&format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1) AS present",
            kind.table()
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?
        .get("present");
        Ok(present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_kinds_are_separate_lists() {
        let repo = InMemoryCatalogRepository::new();
        let english = repo
            .create_item(CatalogKind::Language, "English")
            .await
            .unwrap();
        repo.create_item(CatalogKind::Theme, "English").await.unwrap();

        assert!(repo.exists(CatalogKind::Language, english.id).await.unwrap());
        assert!(!repo.exists(CatalogKind::Theme, english.id).await.unwrap());
        assert_eq!(repo.list_items(CatalogKind::Theme).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_conflict() {
        let repo = InMemoryCatalogRepository::new();
        repo.create_item(CatalogKind::Theme, "Medical").await.unwrap();

        let result = repo.create_item(CatalogKind::Theme, "Medical").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
