use std::sync::Arc;
use tracing::{info, instrument};

use super::models::{CreateRating, NewRating, RatingModel, RatingRequest, RatingResponse};
use super::repository::RatingRepository;
use crate::pagination::{Page, PageRequest};
use crate::shared::AppError;
use crate::translator_profile::repository::TranslatorProfileRepository;
use crate::user::repository::UserRepository;
use crate::validation::ensure_valid;

pub struct RatingService {
    ratings: Arc<dyn RatingRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
    translator_profiles: Arc<dyn TranslatorProfileRepository + Send + Sync>,
}

impl RatingService {
    pub fn new(
        ratings: Arc<dyn RatingRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
        translator_profiles: Arc<dyn TranslatorProfileRepository + Send + Sync>,
    ) -> Self {
        Self {
            ratings,
            users,
            translator_profiles,
        }
    }

    async fn find(&self, id: i64) -> Result<RatingModel, AppError> {
        self.ratings
            .get_rating(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rating not found with id: {}", id)))
    }

    /// Stores `user_id`'s score for a translator profile
    #[instrument(skip(self, request))]
    pub async fn create_rating(
        &self,
        user_id: i64,
        request: RatingRequest,
    ) -> Result<RatingResponse, AppError> {
        ensure_valid(&CreateRating(&request))?;
        if self.users.get_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User not found with id {}", user_id)));
        }

        let profile_id = request.translator_profile_id.unwrap_or_default();
        if self.translator_profiles.get_profile(profile_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Translator profile not found with id: {}",
                profile_id
            )));
        }

        let rating = self
            .ratings
            .create_rating(&NewRating {
                user_id,
                translator_profile_id: profile_id,
                score: request.score.unwrap_or_default(),
                comment: request.comment,
            })
            .await?;
        info!(rating_id = rating.id, profile_id, score = rating.score, "Translator rated");
        Ok(rating.into())
    }

    pub async fn get_rating(&self, id: i64) -> Result<RatingResponse, AppError> {
        Ok(self.find(id).await?.into())
    }

    pub async fn list_ratings(&self, page: PageRequest) -> Result<Page<RatingResponse>, AppError> {
        Ok(self.ratings.list_ratings(page).await?.map(RatingResponse::from))
    }

    /// Only the score and comment of a rating can change
    #[instrument(skip(self, request))]
    pub async fn update_rating(
        &self,
        id: i64,
        request: RatingRequest,
    ) -> Result<RatingResponse, AppError> {
        ensure_valid(&request)?;
        let mut rating = self.find(id).await?;
        if let Some(score) = request.score {
            rating.score = score;
        }
        if request.comment.is_some() {
            rating.comment = request.comment;
        }
        Ok(self.ratings.update_rating(&rating).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_rating(&self, id: i64) -> Result<(), AppError> {
        self.ratings.delete_rating(id).await?;
        info!(rating_id = id, "Rating deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::{insert_user, AppStateBuilder};
    use crate::shared::AppState;
    use crate::translator_profile::models::NewTranslatorProfile;
    use crate::user::models::Role;

    async fn rated_profile(state: &AppState) -> (i64, i64) {
        let translator = insert_user(state, "01070000001", vec![Role::Translator]).await;
        let client = insert_user(state, "01070000002", vec![Role::User]).await;
        let profile = state
            .repositories
            .translator_profiles
            .create_profile(&NewTranslatorProfile::placeholder(translator.id))
            .await
            .unwrap();
        (client.id, profile.id)
    }

    #[tokio::test]
    async fn test_create_and_update_rating() {
        let state = AppStateBuilder::new().build();
        let (client_id, profile_id) = rated_profile(&state).await;
        let service = state.rating_service();

        let created = service
            .create_rating(
                client_id,
                RatingRequest {
                    translator_profile_id: Some(profile_id),
                    score: Some(3),
                    comment: Some("Fine".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.user_id, client_id);

        let updated = service
            .update_rating(
                created.id,
                RatingRequest {
                    score: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.score, 5);
        assert_eq!(updated.comment.as_deref(), Some("Fine"));
    }

    #[tokio::test]
    async fn test_rating_unknown_profile_is_not_found() {
        let state = AppStateBuilder::new().build();
        let (client_id, _) = rated_profile(&state).await;

        let result = state
            .rating_service()
            .create_rating(
                client_id,
                RatingRequest {
                    translator_profile_id: Some(404),
                    score: Some(4),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_rejected() {
        let state = AppStateBuilder::new().build();
        let (client_id, profile_id) = rated_profile(&state).await;

        let result = state
            .rating_service()
            .create_rating(
                client_id,
                RatingRequest {
                    translator_profile_id: Some(profile_id),
                    score: Some(9),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    }
}
