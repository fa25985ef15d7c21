use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{FieldError, Validate, Violations};

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 5;
const MAX_COMMENT_LEN: usize = 1000;

/// A client's score for a translator profile
#[derive(Debug, Clone, PartialEq)]
pub struct RatingModel {
    pub id: i64,
    pub user_id: i64,
    pub translator_profile_id: i64,
    pub score: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRating {
    pub user_id: i64,
    pub translator_profile_id: i64,
    pub score: i32,
    pub comment: Option<String>,
}

/// Average score and number of ratings of one translator profile
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRequest {
    pub user_id: Option<i64>,
    pub translator_profile_id: Option<i64>,
    pub score: Option<i32>,
    pub comment: Option<String>,
}

impl Validate for RatingRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut v = Violations::new();
        v.range(
            "score",
            self.score.map(i64::from),
            MIN_SCORE.into(),
            MAX_SCORE.into(),
        );
        v.max_len("comment", self.comment.as_deref(), MAX_COMMENT_LEN);
        v.into_errors()
    }
}

/// Creation additionally needs the rated profile and a score
pub struct CreateRating<'a>(pub &'a RatingRequest);

impl Validate for CreateRating<'_> {
    fn validate(&self) -> Vec<FieldError> {
        let mut v = Violations::new();
        v.required("translatorProfileId", self.0.translator_profile_id.as_ref());
        v.required("score", self.0.score.as_ref());
        let mut errors = v.into_errors();
        errors.extend(self.0.validate());
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub id: i64,
    pub user_id: i64,
    pub translator_profile_id: i64,
    pub score: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RatingModel> for RatingResponse {
    fn from(r: RatingModel) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            translator_profile_id: r.translator_profile_id,
            score: r.score,
            comment: r.comment,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
