use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::models::{NewUser, Role, UserModel};
use super::repository::{fetch_user_by_id, insert_user_rows, UserRepository};
use crate::shared::AppError;
use crate::translator_profile::models::NewTranslatorProfile;
use crate::translator_profile::repository::TranslatorProfileRepository;
use crate::user_profile::models::NewUserProfile;
use crate::user_profile::repository::UserProfileRepository;

/// Creates a user together with the profile rows every account starts with:
/// a user profile for everyone and an empty translator profile for translators.
/// Either all rows exist afterwards or none do.
#[async_trait]
pub trait AccountRepository {
    async fn create_account(&self, user: &NewUser) -> Result<UserModel, AppError>;
}

fn wants_translator_profile(user: &NewUser) -> bool {
    user.roles.contains(&Role::Translator)
}

/// Composes the in-memory stores; a failed profile write removes what was already written
pub struct InMemoryAccountRepository {
    users: Arc<dyn UserRepository + Send + Sync>,
    user_profiles: Arc<dyn UserProfileRepository + Send + Sync>,
    translator_profiles: Arc<dyn TranslatorProfileRepository + Send + Sync>,
}

impl InMemoryAccountRepository {
    pub fn new(
        users: Arc<dyn UserRepository + Send + Sync>,
        user_profiles: Arc<dyn UserProfileRepository + Send + Sync>,
        translator_profiles: Arc<dyn TranslatorProfileRepository + Send + Sync>,
    ) -> Self {
        Self {
            users,
            user_profiles,
            translator_profiles,
        }
    }

    async fn write_profiles(&self, user: &UserModel, translator: bool) -> Result<(), AppError> {
        self.user_profiles
            .create_profile(&NewUserProfile {
                user_id: user.id,
                is_free_call_made: false,
            })
            .await?;
        if translator {
            self.translator_profiles
                .create_profile(&NewTranslatorProfile::placeholder(user.id))
                .await?;
        }
        Ok(())
    }

    async fn roll_back(&self, user_id: i64) {
        if let Err(e) = self.user_profiles.delete_by_user_id(user_id).await {
            warn!(user_id, error = %e, "Failed to remove user profile during rollback");
        }
        if let Err(e) = self.users.delete_user(user_id).await {
            warn!(user_id, error = %e, "Failed to remove user during rollback");
        }
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_account(&self, user: &NewUser) -> Result<UserModel, AppError> {
        let model = self.users.create_user(user).await?;

        if let Err(e) = self
            .write_profiles(&model, wants_translator_profile(user))
            .await
        {
            warn!(user_id = model.id, error = %e, "Profile write failed, rolling back account");
            self.roll_back(model.id).await;
            return Err(e);
        }

        debug!(user_id = model.id, "Account created in memory");
        Ok(model)
    }
}

/// PostgreSQL implementation; all inserts share one transaction
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_account(&self, user: &NewUser) -> Result<UserModel, AppError> {
        let mut tx = self.pool.begin().await?;
        let id = insert_user_rows(&mut *tx, user).await?;

        sqlx::query("INSERT INTO user_profiles (user_id, is_free_call_made) VALUES ($1, FALSE)")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if wants_translator_profile(user) {
            sqlx::query(
                "INSERT INTO translator_profiles (user_id, is_available, is_online) \
                 VALUES ($1, FALSE, FALSE)",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(user_id = id, "Account created in database");

        fetch_user_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::Internal("Created user vanished".to_string()))
    }
}
