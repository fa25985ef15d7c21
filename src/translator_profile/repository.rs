use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{NewTranslatorProfile, TranslatorFilter, TranslatorProfileModel};
use crate::pagination::{Page, PageRequest};
use crate::shared::AppError;

/// Trait for translator profile storage
#[async_trait]
pub trait TranslatorProfileRepository {
    async fn create_profile(
        &self,
        profile: &NewTranslatorProfile,
    ) -> Result<TranslatorProfileModel, AppError>;
    async fn get_profile(&self, id: i64) -> Result<Option<TranslatorProfileModel>, AppError>;
    async fn get_by_user_id(&self, user_id: i64)
        -> Result<Option<TranslatorProfileModel>, AppError>;
    async fn exists_by_user_id(&self, user_id: i64) -> Result<bool, AppError>;
    async fn find_profiles(
        &self,
        filter: &TranslatorFilter,
        page: PageRequest,
    ) -> Result<Page<TranslatorProfileModel>, AppError>;
    async fn update_profile(
        &self,
        profile: &TranslatorProfileModel,
    ) -> Result<TranslatorProfileModel, AppError>;
    async fn delete_profile(&self, id: i64) -> Result<(), AppError>;
    /// Removes the user's profile if any; returns the number of rows removed
    async fn delete_by_user_id(&self, user_id: i64) -> Result<u64, AppError>;
}

fn duplicate_profile(user_id: i64) -> AppError {
    AppError::Conflict(format!(
        "Translator profile already exists for user ID: {}",
        user_id
    ))
}

fn profile_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Translator profile not found with id: {}", id))
}

fn sorted_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// In-memory implementation of TranslatorProfileRepository for development and testing
pub struct InMemoryTranslatorProfileRepository {
    profiles: RwLock<HashMap<i64, TranslatorProfileModel>>,
    next_id: AtomicI64,
}

impl Default for InMemoryTranslatorProfileRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTranslatorProfileRepository {
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl TranslatorProfileRepository for InMemoryTranslatorProfileRepository {
    #[instrument(skip(self, profile), fields(user_id = profile.user_id))]
    async fn create_profile(
        &self,
        profile: &NewTranslatorProfile,
    ) -> Result<TranslatorProfileModel, AppError> {
        let mut profiles = self.profiles.write().await;
        if profiles.values().any(|p| p.user_id == profile.user_id) {
            warn!("Translator profile already exists in memory");
            return Err(duplicate_profile(profile.user_id));
        }

        let now = Utc::now();
        let model = TranslatorProfileModel {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: profile.user_id,
            email: profile.email.clone(),
            date_of_birth: profile.date_of_birth,
            is_available: profile.is_available,
            is_online: profile.is_online,
            level_of_korean: profile.level_of_korean.clone(),
            language_ids: sorted_ids(&profile.language_ids),
            theme_ids: sorted_ids(&profile.theme_ids),
            created_at: now,
            updated_at: now,
        };
        profiles.insert(model.id, model.clone());

        debug!(profile_id = model.id, "Translator profile created in memory");
        Ok(model)
    }

    async fn get_profile(&self, id: i64) -> Result<Option<TranslatorProfileModel>, AppError> {
        Ok(self.profiles.read().await.get(&id).cloned())
    }

    async fn get_by_user_id(
        &self,
        user_id: i64,
    ) -> Result<Option<TranslatorProfileModel>, AppError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn exists_by_user_id(&self, user_id: i64) -> Result<bool, AppError> {
        Ok(self
            .profiles
            .read()
            .await
            .values()
            .any(|p| p.user_id == user_id))
    }

    async fn find_profiles(
        &self,
        filter: &TranslatorFilter,
        page: PageRequest,
    ) -> Result<Page<TranslatorProfileModel>, AppError> {
        let mut matching: Vec<TranslatorProfileModel> = self
            .profiles
            .read()
            .await
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matching.sort_by_key(|p| (p.created_at, p.id));
        Ok(page.slice(matching))
    }

    #[instrument(skip(self, profile), fields(profile_id = profile.id))]
    async fn update_profile(
        &self,
        profile: &TranslatorProfileModel,
    ) -> Result<TranslatorProfileModel, AppError> {
        let mut profiles = self.profiles.write().await;
        let Some(existing) = profiles.get(&profile.id) else {
            warn!("Translator profile not found for update in memory");
            return Err(profile_not_found(profile.id));
        };

        let mut updated = profile.clone();
        updated.user_id = existing.user_id;
        updated.created_at = existing.created_at;
        updated.language_ids = sorted_ids(&profile.language_ids);
        updated.theme_ids = sorted_ids(&profile.theme_ids);
        updated.updated_at = Utc::now();
        profiles.insert(updated.id, updated.clone());

        debug!("Translator profile updated in memory");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_profile(&self, id: i64) -> Result<(), AppError> {
        if self.profiles.write().await.remove(&id).is_none() {
            warn!("Translator profile not found for deletion in memory");
            return Err(profile_not_found(id));
        }
        debug!("Translator profile deleted from memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_by_user_id(&self, user_id: i64) -> Result<u64, AppError> {
        let mut profiles = self.profiles.write().await;
        let before = profiles.len();
        profiles.retain(|_, p| p.user_id != user_id);
        Ok((before - profiles.len()) as u64)
    }
}

const PROFILE_COLUMNS: &str = "SELECT tp.id, tp.user_id, tp.email, tp.date_of_birth, \
     tp.is_available, tp.is_online, tp.level_of_korean, tp.created_at, tp.updated_at, \
     ARRAY(SELECT l.language_id FROM translator_profile_languages l \
           WHERE l.profile_id = tp.id ORDER BY l.language_id) AS language_ids, \
     ARRAY(SELECT t.theme_id FROM translator_profile_themes t \
           WHERE t.profile_id = tp.id ORDER BY t.theme_id) AS theme_ids \
     FROM translator_profiles tp";

const FILTER_CLAUSE: &str = " WHERE ($1::boolean IS NULL OR tp.is_available = $1) \
     AND ($2::boolean IS NULL OR tp.is_online = $2) \
     AND ($3::bigint IS NULL OR EXISTS (SELECT 1 FROM translator_profile_languages l \
          WHERE l.profile_id = tp.id AND l.language_id = $3)) \
     AND ($4::bigint IS NULL OR EXISTS (SELECT 1 FROM translator_profile_themes t \
          WHERE t.profile_id = tp.id AND t.theme_id = $4)) \
     AND ($5::text IS NULL OR tp.level_of_korean = $5) \
     AND ($6::text IS NULL OR LOWER(tp.email) LIKE '%' || LOWER($6) || '%' \
          OR LOWER(tp.level_of_korean) LIKE '%' || LOWER($6) || '%')";

fn profile_from_row(row: &PgRow) -> TranslatorProfileModel {
    TranslatorProfileModel {
        id: row.get("id"),
        user_id: row.get("user_id"),
        email: row.get("email"),
        date_of_birth: row.get("date_of_birth"),
        is_available: row.get("is_available"),
        is_online: row.get("is_online"),
        level_of_korean: row.get("level_of_korean"),
        language_ids: row.get("language_ids"),
        theme_ids: row.get("theme_ids"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// PostgreSQL implementation of translator profile storage
pub struct PostgresTranslatorProfileRepository {
    pool: PgPool,
}

impl PostgresTranslatorProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write_links(
        tx: &mut Transaction<'_, Postgres>,
        profile_id: i64,
        language_ids: &[i64],
        theme_ids: &[i64],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM translator_profile_languages WHERE profile_id = $1")
            .bind(profile_id)
            .execute(&mut **tx)
            .await?;
        sqlx::query("DELETE FROM translator_profile_themes WHERE profile_id = $1")
            .bind(profile_id)
            .execute(&mut **tx)
            .await?;
        sqlx::query(
            "INSERT INTO translator_profile_languages (profile_id, language_id) \
             SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING",
        )
        .bind(profile_id)
        .bind(language_ids)
        .execute(&mut **tx)
        .await?;
        sqlx::query(
            "INSERT INTO translator_profile_themes (profile_id, theme_id) \
             SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING",
        )
        .bind(profile_id)
        .bind(theme_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn fetch_where(
        &self,
        clause: &str,
        value: i64,
    ) -> Result<Option<TranslatorProfileModel>, AppError> {
        let row = sqlx::query(&format!("{} WHERE {} = $1", PROFILE_COLUMNS, clause))
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(profile_from_row))
    }
}

#[async_trait]
impl TranslatorProfileRepository for PostgresTranslatorProfileRepository {
    #[instrument(skip(self, profile), fields(user_id = profile.user_id))]
    async fn create_profile(
        &self,
        profile: &NewTranslatorProfile,
    ) -> Result<TranslatorProfileModel, AppError> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query(
            "INSERT INTO translator_profiles \
             (user_id, email, date_of_birth, is_available, is_online, level_of_korean) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(profile.user_id)
        .bind(&profile.email)
        .bind(profile.date_of_birth)
        .bind(profile.is_available)
        .bind(profile.is_online)
        .bind(&profile.level_of_korean)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                duplicate_profile(profile.user_id)
            }
            _ => AppError::from(e),
        })?
        .get("id");

        Self::write_links(&mut tx, id, &profile.language_ids, &profile.theme_ids).await?;
        tx.commit().await?;
        debug!(profile_id = id, "Translator profile created in database");

        self.fetch_where("tp.id", id)
            .await?
            .ok_or_else(|| profile_not_found(id))
    }

    async fn get_profile(&self, id: i64) -> Result<Option<TranslatorProfileModel>, AppError> {
        self.fetch_where("tp.id", id).await
    }

    async fn get_by_user_id(
        &self,
        user_id: i64,
    ) -> Result<Option<TranslatorProfileModel>, AppError> {
        self.fetch_where("tp.user_id", user_id).await
    }

    async fn exists_by_user_id(&self, user_id: i64) -> Result<bool, AppError> {
        let exists: bool = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM translator_profiles WHERE user_id = $1) AS present",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?
        .get("present");
        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn find_profiles(
        &self,
        filter: &TranslatorFilter,
        page: PageRequest,
    ) -> Result<Page<TranslatorProfileModel>, AppError> {
        let rows = sqlx::query(&format!(
            "{}{} ORDER BY tp.created_at, tp.id LIMIT $7 OFFSET $8",
            PROFILE_COLUMNS, FILTER_CLAUSE
        ))
        .bind(filter.is_available)
        .bind(filter.is_online)
        .bind(filter.language_id)
        .bind(filter.theme_id)
        .bind(&filter.level_of_korean)
        .bind(&filter.search)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query(&format!(
            "SELECT COUNT(*) AS total FROM translator_profiles tp{}",
            FILTER_CLAUSE
        ))
        .bind(filter.is_available)
        .bind(filter.is_online)
        .bind(filter.language_id)
        .bind(filter.theme_id)
        .bind(&filter.level_of_korean)
        .bind(&filter.search)
        .fetch_one(&self.pool)
        .await?
        .get("total");

        debug!(total, "Translator profiles searched");
        Ok(Page::new(
            rows.iter().map(profile_from_row).collect(),
            page,
            total as u64,
        ))
    }

    #[instrument(skip(self, profile), fields(profile_id = profile.id))]
    async fn update_profile(
        &self,
        profile: &TranslatorProfileModel,
    ) -> Result<TranslatorProfileModel, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE translator_profiles SET email = $2, date_of_birth = $3, is_available = $4, \
             is_online = $5, level_of_korean = $6, updated_at = now() WHERE id = $1",
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(profile.date_of_birth)
        .bind(profile.is_available)
        .bind(profile.is_online)
        .bind(&profile.level_of_korean)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            warn!("Translator profile not found for update");
            return Err(profile_not_found(profile.id));
        }

        Self::write_links(&mut tx, profile.id, &profile.language_ids, &profile.theme_ids).await?;
        tx.commit().await?;
        debug!("Translator profile updated in database");

        self.fetch_where("tp.id", profile.id)
            .await?
            .ok_or_else(|| profile_not_found(profile.id))
    }

    #[instrument(skip(self))]
    async fn delete_profile(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        Self::write_links(&mut tx, id, &[], &[]).await?;

        let result = sqlx::query("DELETE FROM translator_profiles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            warn!("Translator profile not found for deletion");
            return Err(profile_not_found(id));
        }

        tx.commit().await?;
        debug!("Translator profile deleted from database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_by_user_id(&self, user_id: i64) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM translator_profile_languages WHERE profile_id IN \
             (SELECT id FROM translator_profiles WHERE user_id = $1)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "DELETE FROM translator_profile_themes WHERE profile_id IN \
             (SELECT id FROM translator_profiles WHERE user_id = $1)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        let result = sqlx::query("DELETE FROM translator_profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
