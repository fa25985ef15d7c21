use std::sync::Arc;
use tracing::{info, instrument};

use super::models::{NewUserProfile, UserProfileRequest, UserProfileResponse};
use super::repository::UserProfileRepository;
use crate::pagination::{Page, PageRequest};
use crate::shared::AppError;
use crate::user::repository::UserRepository;
use crate::validation::ensure_valid;

pub struct UserProfileService {
    profiles: Arc<dyn UserProfileRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
}

impl UserProfileService {
    pub fn new(
        profiles: Arc<dyn UserProfileRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        Self { profiles, users }
    }

    async fn require_user(&self, user_id: i64) -> Result<(), AppError> {
        match self.users.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("User not found with id {}", user_id))),
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create_profile(
        &self,
        request: UserProfileRequest,
    ) -> Result<UserProfileResponse, AppError> {
        ensure_valid(&request)?;
        let user_id = request.user_id.unwrap_or_default();
        self.require_user(user_id).await?;

        let profile = self
            .profiles
            .create_profile(&NewUserProfile {
                user_id,
                is_free_call_made: request.is_free_call_made.unwrap_or(false),
            })
            .await?;
        info!(profile_id = profile.id, user_id, "User profile created");
        Ok(profile.into())
    }

    pub async fn get_profile(&self, id: i64) -> Result<UserProfileResponse, AppError> {
        self.profiles
            .get_profile(id)
            .await?
            .map(UserProfileResponse::from)
            .ok_or_else(|| AppError::NotFound(format!("UserProfile not found with id {}", id)))
    }

    pub async fn list_profiles(
        &self,
        page: PageRequest,
    ) -> Result<Page<UserProfileResponse>, AppError> {
        Ok(self
            .profiles
            .list_profiles(page)
            .await?
            .map(UserProfileResponse::from))
    }

    /// Updates the free-call flag; an admin may also move the profile to another user
    #[instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        id: i64,
        request: UserProfileRequest,
    ) -> Result<UserProfileResponse, AppError> {
        let mut profile = self
            .profiles
            .get_profile(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("UserProfile not found with id {}", id)))?;

        if let Some(flag) = request.is_free_call_made {
            profile.is_free_call_made = flag;
        }
        if let Some(user_id) = request.user_id {
            self.require_user(user_id).await?;
            profile.user_id = user_id;
        }

        let updated = self.profiles.update_profile(&profile).await?;
        info!(profile_id = id, "User profile updated");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_profile(&self, id: i64) -> Result<(), AppError> {
        self.profiles.delete_profile(id).await?;
        info!(profile_id = id, "User profile deleted");
        Ok(())
    }
}
