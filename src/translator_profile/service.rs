use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    models::{NewTranslatorProfile, TranslatorFilter, TranslatorProfileModel},
    repository::TranslatorProfileRepository,
    types::{
        CreateTranslatorProfileRequest, TranslatorProfileResponse, TranslatorStats,
        UpdateTranslatorProfileRequest,
    },
};
use crate::call::repository::CallRepository;
use crate::catalog::models::CatalogKind;
use crate::catalog::repository::CatalogRepository;
use crate::catalog::service::require_all;
use crate::pagination::{Page, PageRequest};
use crate::rating::repository::RatingRepository;
use crate::shared::AppError;
use crate::user::models::Role;
use crate::user::repository::UserRepository;
use crate::validation::ensure_valid;

/// Page size of the "available for theme" listing
pub const AVAILABLE_BY_THEME_PAGE_SIZE: u32 = 10;

pub struct TranslatorProfileService {
    profiles: Arc<dyn TranslatorProfileRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
    catalog: Arc<dyn CatalogRepository + Send + Sync>,
    ratings: Arc<dyn RatingRepository + Send + Sync>,
    calls: Arc<dyn CallRepository + Send + Sync>,
}

impl TranslatorProfileService {
    pub fn new(
        profiles: Arc<dyn TranslatorProfileRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
        catalog: Arc<dyn CatalogRepository + Send + Sync>,
        ratings: Arc<dyn RatingRepository + Send + Sync>,
        calls: Arc<dyn CallRepository + Send + Sync>,
    ) -> Self {
        Self {
            profiles,
            users,
            catalog,
            ratings,
            calls,
        }
    }

    /// Creates the single profile a translator may own
    #[instrument(skip(self, request), fields(user_id = ?request.user_id))]
    pub async fn create_profile(
        &self,
        request: CreateTranslatorProfileRequest,
    ) -> Result<TranslatorProfileResponse, AppError> {
        ensure_valid(&request)?;
        let user_id = request.user_id.unwrap_or_default();

        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with id: {}", user_id)))?;

        if !user.has_role(Role::Translator) {
            warn!("User lacks the translator role");
            return Err(AppError::InvalidRole(Role::Translator.to_string()));
        }

        if self.profiles.exists_by_user_id(user_id).await? {
            warn!("Translator profile already exists");
            return Err(AppError::Conflict(format!(
                "Translator profile already exists for user ID: {}",
                user_id
            )));
        }

        let language_ids = request.language_ids.unwrap_or_default();
        let theme_ids = request.theme_ids.unwrap_or_default();
        require_all(self.catalog.as_ref(), CatalogKind::Language, &language_ids).await?;
        require_all(self.catalog.as_ref(), CatalogKind::Theme, &theme_ids).await?;

        let profile = self
            .profiles
            .create_profile(&NewTranslatorProfile {
                user_id,
                email: request.email.map(|e| e.trim().to_string()),
                date_of_birth: request.date_of_birth,
                is_available: request.is_available.unwrap_or(false),
                is_online: request.is_online.unwrap_or(false),
                level_of_korean: request.level_of_korean,
                language_ids,
                theme_ids,
            })
            .await?;

        info!(profile_id = profile.id, "Translator profile created");
        Ok(TranslatorProfileResponse::new(profile, Some(&user)))
    }

    /// Single profile with its rating average and call counts
    #[instrument(skip(self))]
    pub async fn get_profile(&self, id: i64) -> Result<TranslatorProfileResponse, AppError> {
        let profile = self.find(id).await?;
        let stats = self.stats(&profile).await?;
        let owner = self.users.get_user(profile.user_id).await?;
        Ok(TranslatorProfileResponse::new(profile, owner.as_ref()).with_stats(stats))
    }

    #[instrument(skip(self))]
    pub async fn search(
        &self,
        filter: TranslatorFilter,
        page: PageRequest,
    ) -> Result<Page<TranslatorProfileResponse>, AppError> {
        let profiles = self.profiles.find_profiles(&filter, page).await?;
        debug!(
            returned = profiles.content.len(),
            total = profiles.total_elements,
            "Translator search completed"
        );
        self.with_owners(profiles).await
    }

    /// Translators for a theme who are both available and online
    #[instrument(skip(self))]
    pub async fn available_by_theme(
        &self,
        theme_id: i64,
        page: PageRequest,
    ) -> Result<Page<TranslatorProfileResponse>, AppError> {
        let filter = TranslatorFilter {
            is_available: Some(true),
            is_online: Some(true),
            theme_id: Some(theme_id),
            ..Default::default()
        };
        self.search(filter, page).await
    }

    #[instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        id: i64,
        request: UpdateTranslatorProfileRequest,
    ) -> Result<TranslatorProfileResponse, AppError> {
        ensure_valid(&request)?;
        let mut profile = self.find(id).await?;

        if let Some(date_of_birth) = request.date_of_birth {
            profile.date_of_birth = Some(date_of_birth);
        }
        if let Some(email) = request.email {
            profile.email = Some(email.trim().to_string());
        }
        if let Some(level) = request.level_of_korean {
            profile.level_of_korean = Some(level);
        }
        if let Some(available) = request.is_available {
            profile.is_available = available;
        }
        if let Some(online) = request.is_online {
            profile.is_online = online;
        }
        if let Some(language_ids) = request.language_ids {
            require_all(self.catalog.as_ref(), CatalogKind::Language, &language_ids).await?;
            profile.language_ids = language_ids;
        }
        if let Some(theme_ids) = request.theme_ids {
            require_all(self.catalog.as_ref(), CatalogKind::Theme, &theme_ids).await?;
            profile.theme_ids = theme_ids;
        }

        let updated = self.profiles.update_profile(&profile).await?;
        info!(profile_id = id, "Translator profile updated");
        self.respond(updated).await
    }

    #[instrument(skip(self))]
    pub async fn set_availability(
        &self,
        id: i64,
        is_available: bool,
    ) -> Result<TranslatorProfileResponse, AppError> {
        let mut profile = self.find(id).await?;
        profile.is_available = is_available;
        let updated = self.profiles.update_profile(&profile).await?;
        info!(profile_id = id, is_available, "Translator availability changed");
        self.respond(updated).await
    }

    #[instrument(skip(self))]
    pub async fn set_online_status(
        &self,
        id: i64,
        is_online: bool,
    ) -> Result<TranslatorProfileResponse, AppError> {
        let mut profile = self.find(id).await?;
        profile.is_online = is_online;
        let updated = self.profiles.update_profile(&profile).await?;
        info!(profile_id = id, is_online, "Translator online status changed");
        self.respond(updated).await
    }

    #[instrument(skip(self))]
    pub async fn delete_profile(&self, id: i64) -> Result<(), AppError> {
        self.profiles.delete_profile(id).await?;
        info!(profile_id = id, "Translator profile deleted");
        Ok(())
    }

    async fn find(&self, id: i64) -> Result<TranslatorProfileModel, AppError> {
        self.profiles.get_profile(id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Translator profile not found with id: {}", id))
        })
    }

    async fn stats(&self, profile: &TranslatorProfileModel) -> Result<TranslatorStats, AppError> {
        let summary = self.ratings.summary_for_translator(profile.id).await?;
        Ok(TranslatorStats {
            average_rating: summary.average,
            total_ratings: summary.count,
            total_calls: self
                .calls
                .count_completed_for_recipient(profile.user_id)
                .await?,
            in_call: self.calls.exists_active_for_recipient(profile.user_id).await?,
        })
    }

    async fn respond(
        &self,
        profile: TranslatorProfileModel,
    ) -> Result<TranslatorProfileResponse, AppError> {
        let owner = self.users.get_user(profile.user_id).await?;
        Ok(TranslatorProfileResponse::new(profile, owner.as_ref()))
    }

    async fn with_owners(
        &self,
        page: Page<TranslatorProfileModel>,
    ) -> Result<Page<TranslatorProfileResponse>, AppError> {
        let mut content = Vec::with_capacity(page.content.len());
        for profile in &page.content {
            let owner = self.users.get_user(profile.user_id).await?;
            content.push(TranslatorProfileResponse::new(profile.clone(), owner.as_ref()));
        }
        Ok(Page {
            content,
            page: page.page,
            size: page.size,
            total_elements: page.total_elements,
            total_pages: page.total_pages,
        })
    }
}
