use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{NewUserProfile, UserProfileModel};
use crate::pagination::{Page, PageRequest};
use crate::shared::AppError;

/// Trait for client profile storage
#[async_trait]
pub trait UserProfileRepository {
    async fn create_profile(&self, profile: &NewUserProfile) -> Result<UserProfileModel, AppError>;
    async fn get_profile(&self, id: i64) -> Result<Option<UserProfileModel>, AppError>;
    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<UserProfileModel>, AppError>;
    async fn list_profiles(&self, page: PageRequest) -> Result<Page<UserProfileModel>, AppError>;
    async fn update_profile(&self, profile: &UserProfileModel)
        -> Result<UserProfileModel, AppError>;
    async fn delete_profile(&self, id: i64) -> Result<(), AppError>;
    async fn delete_by_user_id(&self, user_id: i64) -> Result<u64, AppError>;
}

fn duplicate_profile(user_id: i64) -> AppError {
    AppError::Conflict(format!("User profile already exists for user ID: {}", user_id))
}

fn profile_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("UserProfile not found with id {}", id))
}

/// In-memory implementation of UserProfileRepository for development and testing
pub struct InMemoryUserProfileRepository {
    profiles: RwLock<HashMap<i64, UserProfileModel>>,
    next_id: AtomicI64,
}

impl Default for InMemoryUserProfileRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserProfileRepository {
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl UserProfileRepository for InMemoryUserProfileRepository {
    #[instrument(skip(self, profile), fields(user_id = profile.user_id))]
    async fn create_profile(&self, profile: &NewUserProfile) -> Result<UserProfileModel, AppError> {
        let mut profiles = self.profiles.write().await;
        if profiles.values().any(|p| p.user_id == profile.user_id) {
            warn!("User profile already exists in memory");
            return Err(duplicate_profile(profile.user_id));
        }

        let now = Utc::now();
        let model = UserProfileModel {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: profile.user_id,
            is_free_call_made: profile.is_free_call_made,
            created_at: now,
            updated_at: now,
        };
        profiles.insert(model.id, model.clone());
        debug!(profile_id = model.id, "User profile created in memory");
        Ok(model)
    }

    async fn get_profile(&self, id: i64) -> Result<Option<UserProfileModel>, AppError> {
        Ok(self.profiles.read().await.get(&id).cloned())
    }

    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<UserProfileModel>, AppError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn list_profiles(&self, page: PageRequest) -> Result<Page<UserProfileModel>, AppError> {
        let mut profiles: Vec<UserProfileModel> =
            self.profiles.read().await.values().cloned().collect();
        profiles.sort_by_key(|p| p.id);
        Ok(page.slice(profiles))
    }

    async fn update_profile(
        &self,
        profile: &UserProfileModel,
    ) -> Result<UserProfileModel, AppError> {
        let mut profiles = self.profiles.write().await;
        if !profiles.contains_key(&profile.id) {
            return Err(profile_not_found(profile.id));
        }
        if profiles
            .values()
            .any(|p| p.id != profile.id && p.user_id == profile.user_id)
        {
            return Err(duplicate_profile(profile.user_id));
        }

        let mut updated = profile.clone();
        updated.updated_at = Utc::now();
        profiles.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete_profile(&self, id: i64) -> Result<(), AppError> {
        match self.profiles.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(profile_not_found(id)),
        }
    }

    async fn delete_by_user_id(&self, user_id: i64) -> Result<u64, AppError> {
        let mut profiles = self.profiles.write().await;
        let before = profiles.len();
        profiles.retain(|_, p| p.user_id != user_id);
        Ok((before - profiles.len()) as u64)
    }
}

const PROFILE_COLUMNS: &str =
    "SELECT id, user_id, is_free_call_made, created_at, updated_at FROM user_profiles";

fn profile_from_row(row: &PgRow) -> UserProfileModel {
    UserProfileModel {
        id: row.get("id"),
        user_id: row.get("user_id"),
        is_free_call_made: row.get("is_free_call_made"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn map_write_error(e: sqlx::Error, user_id: i64) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => duplicate_profile(user_id),
        _ => AppError::from(e),
    }
}

/// PostgreSQL implementation of client profile storage
pub struct PostgresUserProfileRepository {
    pool: PgPool,
}

impl PostgresUserProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserProfileRepository for PostgresUserProfileRepository {
    #[instrument(skip(self, profile), fields(user_id = profile.user_id))]
    async fn create_profile(&self, profile: &NewUserProfile) -> Result<UserProfileModel, AppError> {
        let row = sqlx::query(
            "INSERT INTO user_profiles (user_id, is_free_call_made) VALUES ($1, $2) \
             RETURNING id, user_id, is_free_call_made, created_at, updated_at",
        )
        .bind(profile.user_id)
        .bind(profile.is_free_call_made)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, profile.user_id))?;

        let created = profile_from_row(&row);
        debug!(profile_id = created.id, "User profile created in database");
        Ok(created)
    }

    async fn get_profile(&self, id: i64) -> Result<Option<UserProfileModel>, AppError> {
        let row = sqlx::query(&format!("{} WHERE id = $1", PROFILE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(profile_from_row))
    }

    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<UserProfileModel>, AppError> {
        let row = sqlx::query(&format!("{} WHERE user_id = $1", PROFILE_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(profile_from_row))
    }

    async fn list_profiles(&self, page: PageRequest) -> Result<Page<UserProfileModel>, AppError> {
        let rows = sqlx::query(&format!("{} ORDER BY id LIMIT $1 OFFSET $2", PROFILE_COLUMNS))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM user_profiles")
            .fetch_one(&self.pool)
            .await?
            .get("total");
        Ok(Page::new(
            rows.iter().map(profile_from_row).collect(),
            page,
            total as u64,
        ))
    }

    #[instrument(skip(self, profile), fields(profile_id = profile.id))]
    async fn update_profile(
        &self,
        profile: &UserProfileModel,
    ) -> Result<UserProfileModel, AppError> {
        let row = sqlx::query(
            "UPDATE user_profiles SET user_id = $2, is_free_call_made = $3, updated_at = now() \
             WHERE id = $1 RETURNING id, user_id, is_free_call_made, created_at, updated_at",
        )
        .bind(profile.id)
        .bind(profile.user_id)
        .bind(profile.is_free_call_made)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, profile.user_id))?;

        row.as_ref()
            .map(profile_from_row)
            .ok_or_else(|| profile_not_found(profile.id))
    }

    #[instrument(skip(self))]
    async fn delete_profile(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM user_profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            warn!("User profile not found for deletion");
            return Err(profile_not_found(id));
        }
        Ok(())
    }

    async fn delete_by_user_id(&self, user_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_one_profile_per_user() {
        let repo = InMemoryUserProfileRepository::new();
        let new = NewUserProfile {
            user_id: 4,
            is_free_call_made: false,
        };
        repo.create_profile(&new).await.unwrap();

        assert!(matches!(
            repo.create_profile(&new).await,
            Err(AppError::Conflict(_))
        ));
        assert!(repo.get_by_user_id(4).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_cannot_steal_another_users_profile() {
        let repo = InMemoryUserProfileRepository::new();
        repo.create_profile(&NewUserProfile {
            user_id: 1,
            is_free_call_made: false,
        })
        .await
        .unwrap();
        let mut second = repo
            .create_profile(&NewUserProfile {
                user_id: 2,
                is_free_call_made: false,
            })
            .await
            .unwrap();

        second.user_id = 1;
        assert!(matches!(
            repo.update_profile(&second).await,
            Err(AppError::Conflict(_))
        ));
    }
}
