use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::RefreshTokenModel;
use crate::shared::AppError;

/// Trait for the refresh-token ledger
#[async_trait]
pub trait RefreshTokenRepository {
    async fn create_token(&self, token: &RefreshTokenModel) -> Result<RefreshTokenModel, AppError>;
    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenModel>, AppError>;
    /// Removes the row and reports whether this call was the one that removed it
    async fn delete_by_token(&self, token: &str) -> Result<bool, AppError>;
    async fn delete_by_user_id(&self, user_id: i64) -> Result<u64, AppError>;
    async fn delete_expired(&self) -> Result<u64, AppError>;
    async fn count_for_user(&self, user_id: i64) -> Result<u64, AppError>;
}

/// In-memory implementation of RefreshTokenRepository for development and testing
///
/// Data is stored in memory keyed by the token string and is lost on restart.
pub struct InMemoryRefreshTokenRepository {
    tokens: RwLock<HashMap<String, RefreshTokenModel>>,
    next_id: AtomicI64,
}

impl Default for InMemoryRefreshTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub async fn token_count(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    #[instrument(skip(self, token), fields(user_id = token.user_id))]
    async fn create_token(&self, token: &RefreshTokenModel) -> Result<RefreshTokenModel, AppError> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&token.token) {
            warn!("Refresh token already exists in memory");
            return Err(AppError::Conflict("Refresh token already exists".to_string()));
        }

        let mut stored = token.clone();
        stored.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        tokens.insert(stored.token.clone(), stored.clone());

        debug!(token_id = stored.id, "Refresh token stored in memory");
        Ok(stored)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenModel>, AppError> {
        Ok(self.tokens.read().await.get(token).cloned())
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.tokens.write().await.remove(token).is_some())
    }

    #[instrument(skip(self))]
    async fn delete_by_user_id(&self, user_id: i64) -> Result<u64, AppError> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.user_id != user_id);

        let removed = (before - tokens.len()) as u64;
        debug!(removed, "Refresh tokens deleted for user in memory");
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn delete_expired(&self) -> Result<u64, AppError> {
        let mut tokens = self.tokens.write().await;
        let now = Utc::now();
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at > now);

        let removed = (before - tokens.len()) as u64;
        debug!(removed, "Expired refresh tokens purged from memory");
        Ok(removed)
    }

    async fn count_for_user(&self, user_id: i64) -> Result<u64, AppError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.values().filter(|t| t.user_id == user_id).count() as u64)
    }
}

fn token_from_row(row: &PgRow) -> RefreshTokenModel {
    RefreshTokenModel {
        id: row.get("id"),
        token: row.get("token"),
        user_id: row.get("user_id"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    }
}

/// PostgreSQL implementation of the refresh-token ledger
pub struct PostgresRefreshTokenRepository {
    pool: PgPool,
}

impl PostgresRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    #[instrument(skip(self, token), fields(user_id = token.user_id))]
    async fn create_token(&self, token: &RefreshTokenModel) -> Result<RefreshTokenModel, AppError> {
        let row = sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, created_at, expires_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, token, user_id, created_at, expires_at",
        )
        .bind(&token.token)
        .bind(token.user_id)
        .bind(token.created_at)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to store refresh token");
            AppError::from(e)
        })?;

        let stored = token_from_row(&row);
        debug!(token_id = stored.id, "Refresh token stored in database");
        Ok(stored)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenModel>, AppError> {
        let row = sqlx::query(
            "SELECT id, token, user_id, created_at, expires_at FROM refresh_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(token_from_row))
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, AppError> {
        // RETURNING makes concurrent deletes of the same row observe exactly one winner
        let row = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1 RETURNING id")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    #[instrument(skip(self))]
    async fn delete_by_user_id(&self, user_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        debug!(removed = result.rows_affected(), "Refresh tokens deleted for user");
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?;
        debug!(removed = result.rows_affected(), "Expired refresh tokens purged");
        Ok(result.rows_affected())
    }

    async fn count_for_user(&self, user_id: i64) -> Result<u64, AppError> {
        let count: i64 =
            sqlx::query("SELECT COUNT(*) AS total FROM refresh_tokens WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?
                .get("total");
        Ok(count as u64)
    }
}
