use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::models::{TranslatorFilter, TranslatorProfileModel};
use crate::pagination::{PageQuery, PageRequest};
use crate::user::models::UserModel;
use crate::validation::{FieldError, Validate, Violations};

const MAX_EMAIL_LEN: usize = 320;
const MAX_LEVEL_LEN: usize = 200;

/// Body of `POST /api/translator-profiles`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTranslatorProfileRequest {
    pub user_id: Option<i64>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub level_of_korean: Option<String>,
    pub is_available: Option<bool>,
    pub is_online: Option<bool>,
    pub language_ids: Option<Vec<i64>>,
    pub theme_ids: Option<Vec<i64>>,
}

impl Validate for CreateTranslatorProfileRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut v = Violations::new();
        v.required("userId", self.user_id.as_ref());
        v.not_blank("email", self.email.as_deref());
        v.email("email", self.email.as_deref());
        v.max_len("email", self.email.as_deref(), MAX_EMAIL_LEN);
        v.max_len("levelOfKorean", self.level_of_korean.as_deref(), MAX_LEVEL_LEN);
        v.past("dateOfBirth", self.date_of_birth);
        v.into_errors()
    }
}

/// Body of `PUT /api/translator-profiles/{id}`; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTranslatorProfileRequest {
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub level_of_korean: Option<String>,
    pub is_available: Option<bool>,
    pub is_online: Option<bool>,
    pub language_ids: Option<Vec<i64>>,
    pub theme_ids: Option<Vec<i64>>,
}

impl Validate for UpdateTranslatorProfileRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut v = Violations::new();
        v.email("email", self.email.as_deref());
        v.max_len("email", self.email.as_deref(), MAX_EMAIL_LEN);
        v.max_len("levelOfKorean", self.level_of_korean.as_deref(), MAX_LEVEL_LEN);
        v.past("dateOfBirth", self.date_of_birth);
        v.into_errors()
    }
}

/// `GET /api/translator-profiles` query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatorSearchQuery {
    pub is_available: Option<bool>,
    pub is_online: Option<bool>,
    pub language_id: Option<i64>,
    pub theme_id: Option<i64>,
    pub level_of_korean: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl TranslatorSearchQuery {
    pub fn into_parts(self, default_size: u32) -> (TranslatorFilter, PageRequest) {
        let page = PageQuery {
            page: self.page,
            size: self.size,
        }
        .resolve(default_size);
        let non_blank = |s: Option<String>| s.filter(|s| !s.trim().is_empty());

        let filter = TranslatorFilter {
            is_available: self.is_available,
            is_online: self.is_online,
            language_id: self.language_id,
            theme_id: self.theme_id,
            level_of_korean: non_blank(self.level_of_korean),
            search: non_blank(self.search),
        };
        (filter, page)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub is_available: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineStatusQuery {
    pub is_online: bool,
}

/// Rating and call figures shown on a single profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslatorStats {
    pub average_rating: Option<f64>,
    pub total_ratings: u64,
    pub total_calls: u64,
    pub in_call: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranslatorProfileResponse {
    pub id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
    pub level_of_korean: Option<String>,
    pub is_available: bool,
    pub is_online: bool,
    pub language_ids: Vec<i64>,
    pub theme_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ratings: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_calls: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_call: Option<bool>,
}

impl TranslatorProfileResponse {
    pub fn new(profile: TranslatorProfileModel, owner: Option<&UserModel>) -> Self {
        Self {
            id: profile.id,
            user_id: profile.user_id,
            username: owner.map(|u| u.username.clone()),
            first_name: owner.and_then(|u| u.first_name.clone()),
            last_name: owner.and_then(|u| u.last_name.clone()),
            date_of_birth: profile.date_of_birth,
            email: profile.email,
            level_of_korean: profile.level_of_korean,
            is_available: profile.is_available,
            is_online: profile.is_online,
            language_ids: profile.language_ids,
            theme_ids: profile.theme_ids,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
            average_rating: None,
            total_ratings: None,
            total_calls: None,
            in_call: None,
        }
    }

    pub fn with_stats(mut self, stats: TranslatorStats) -> Self {
        self.average_rating = Some(stats.average_rating.unwrap_or(0.0));
        self.total_ratings = Some(stats.total_ratings);
        self.total_calls = Some(stats.total_calls);
        self.in_call = Some(stats.in_call);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_requires_user_and_email() {
        let errors = CreateTranslatorProfileRequest::default().validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();

        assert!(fields.contains(&"userId"));
        assert!(fields.contains(&"email"));
    }

    #[test]
    fn test_update_request_checks_email_only_when_present() {
        assert!(UpdateTranslatorProfileRequest::default().validate().is_empty());

        let bad = UpdateTranslatorProfileRequest {
            email: Some("nope".to_string()),
            ..Default::default()
        };
        assert_eq!(bad.validate()[0].field, "email");
    }

    #[test]
    fn test_search_query_drops_blank_text_filters() {
        let query: TranslatorSearchQuery =
            serde_json::from_str(r#"{"isOnline":true,"search":"  ","size":5}"#).unwrap();
        let (filter, page) = query.into_parts(20);

        assert_eq!(filter.is_online, Some(true));
        assert!(filter.search.is_none());
        assert_eq!(page, PageRequest::new(0, 5));
    }
}
