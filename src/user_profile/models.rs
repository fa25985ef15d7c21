use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{FieldError, Validate, Violations};

/// Database model for the per-user client profile
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfileModel {
    pub id: i64,
    pub user_id: i64,
    pub is_free_call_made: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUserProfile {
    pub user_id: i64,
    pub is_free_call_made: bool,
}

/// Body of `POST /api/user-profiles` and `PUT /api/user-profiles/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileRequest {
    pub user_id: Option<i64>,
    pub is_free_call_made: Option<bool>,
}

impl Validate for UserProfileRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut v = Violations::new();
        v.required("userId", self.user_id.as_ref());
        v.into_errors()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileResponse {
    pub id: i64,
    pub user_id: i64,
    pub is_free_call_made: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserProfileModel> for UserProfileResponse {
    fn from(profile: UserProfileModel) -> Self {
        Self {
            id: profile.id,
            user_id: profile.user_id,
            is_free_call_made: profile.is_free_call_made,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}
