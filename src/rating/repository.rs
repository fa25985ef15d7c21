use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::models::{NewRating, RatingModel, RatingSummary};
use crate::pagination::{Page, PageRequest};
use crate::shared::AppError;

#[async_trait]
pub trait RatingRepository {
    async fn create_rating(&self, rating: &NewRating) -> Result<RatingModel, AppError>;
    async fn get_rating(&self, id: i64) -> Result<Option<RatingModel>, AppError>;
    async fn list_ratings(&self, page: PageRequest) -> Result<Page<RatingModel>, AppError>;
    async fn update_rating(&self, rating: &RatingModel) -> Result<RatingModel, AppError>;
    async fn delete_rating(&self, id: i64) -> Result<(), AppError>;
    async fn summary_for_translator(&self, profile_id: i64) -> Result<RatingSummary, AppError>;
}

fn rating_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Rating not found with id: {}", id))
}

pub struct InMemoryRatingRepository {
    ratings: RwLock<HashMap<i64, RatingModel>>,
    next_id: AtomicI64,
}

impl Default for InMemoryRatingRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRatingRepository {
    pub fn new() -> Self {
        Self {
            ratings: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl RatingRepository for InMemoryRatingRepository {
    async fn create_rating(&self, rating: &NewRating) -> Result<RatingModel, AppError> {
        let now = Utc::now();
        let model = RatingModel {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: rating.user_id,
            translator_profile_id: rating.translator_profile_id,
            score: rating.score,
            comment: rating.comment.clone(),
            created_at: now,
            updated_at: now,
        };
        self.ratings.write().await.insert(model.id, model.clone());
        Ok(model)
    }

    async fn get_rating(&self, id: i64) -> Result<Option<RatingModel>, AppError> {
        Ok(self.ratings.read().await.get(&id).cloned())
    }

    async fn list_ratings(&self, page: PageRequest) -> Result<Page<RatingModel>, AppError> {
        let mut ratings: Vec<RatingModel> = self.ratings.read().await.values().cloned().collect();
        ratings.sort_by_key(|r| r.id);
        Ok(page.slice(ratings))
    }

    async fn update_rating(&self, rating: &RatingModel) -> Result<RatingModel, AppError> {
        let mut ratings = self.ratings.write().await;
        let stored = ratings
            .get_mut(&rating.id)
            .ok_or_else(|| rating_not_found(rating.id))?;
        stored.score = rating.score;
        stored.comment = rating.comment.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_rating(&self, id: i64) -> Result<(), AppError> {
        self.ratings
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| rating_not_found(id))
    }

    async fn summary_for_translator(&self, profile_id: i64) -> Result<RatingSummary, AppError> {
        let ratings = self.ratings.read().await;
        let scores: Vec<i32> = ratings
            .values()
            .filter(|r| r.translator_profile_id == profile_id)
            .map(|r| r.score)
            .collect();
        if scores.is_empty() {
            return Ok(RatingSummary::default());
        }
        let total: i64 = scores.iter().map(|&s| i64::from(s)).sum();
        Ok(RatingSummary {
            average: Some(total as f64 / scores.len() as f64),
            count: scores.len() as u64,
        })
    }
}

const RATING_COLUMNS: &str =
    "id, user_id, translator_profile_id, score, comment, created_at, updated_at";

fn rating_from_row(row: &PgRow) -> RatingModel {
    RatingModel {
        id: row.get("id"),
        user_id: row.get("user_id"),
        translator_profile_id: row.get("translator_profile_id"),
        score: row.get("score"),
        comment: row.get("comment"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub struct PostgresRatingRepository {
    pool: PgPool,
}

impl PostgresRatingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RatingRepository for PostgresRatingRepository {
    #[instrument(skip(self, rating), fields(profile_id = rating.translator_profile_id))]
    async fn create_rating(&self, rating: &NewRating) -> Result<RatingModel, AppError> {
        let row = sqlx::query(&format!(
            "INSERT INTO ratings (user_id, translator_profile_id, score, comment) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            RATING_COLUMNS
        ))
        .bind(rating.user_id)
        .bind(rating.translator_profile_id)
        .bind(rating.score)
        .bind(&rating.comment)
        .fetch_one(&self.pool)
        .await?;
        let created = rating_from_row(&row);
        debug!(rating_id = created.id, "Rating stored");
        Ok(created)
    }

    async fn get_rating(&self, id: i64) -> Result<Option<RatingModel>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM ratings WHERE id = $1", RATING_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(rating_from_row))
    }

    async fn list_ratings(&self, page: PageRequest) -> Result<Page<RatingModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ratings ORDER BY id LIMIT $1 OFFSET $2",
            RATING_COLUMNS
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM ratings")
            .fetch_one(&self.pool)
            .await?
            .get("total");
        Ok(Page::new(
            rows.iter().map(rating_from_row).collect(),
            page,
            total as u64,
        ))
    }

    async fn update_rating(&self, rating: &RatingModel) -> Result<RatingModel, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE ratings SET score = $2, comment = $3, updated_at = now() \
             WHERE id = $1 RETURNING {}",
            RATING_COLUMNS
        ))
        .bind(rating.id)
        .bind(rating.score)
        .bind(&rating.comment)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref()
            .map(rating_from_row)
            .ok_or_else(|| rating_not_found(rating.id))
    }

    #[instrument(skip(self))]
    async fn delete_rating(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM ratings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(rating_not_found(id));
        }
        Ok(())
    }

    async fn summary_for_translator(&self, profile_id: i64) -> Result<RatingSummary, AppError> {
        let row = sqlx::query(
            "SELECT AVG(score)::float8 AS average, COUNT(*) AS total \
             FROM ratings WHERE translator_profile_id = $1",
        )
        .bind(profile_id)
        .fetch_one(&self.pool)
        .await?;
        let total: i64 = row.get("total");
        Ok(RatingSummary {
            average: row.get("average"),
            count: total as u64,
        })
    }
}
