use chrono::{DateTime, NaiveDate, Utc};

/// Database model for translator profiles with their language and theme links
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatorProfileModel {
    pub id: i64,
    pub user_id: i64,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub is_available: bool,
    pub is_online: bool,
    pub level_of_korean: Option<String>,
    pub language_ids: Vec<i64>,
    pub theme_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable translator profile row
#[derive(Debug, Clone, PartialEq)]
pub struct NewTranslatorProfile {
    pub user_id: i64,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub is_available: bool,
    pub is_online: bool,
    pub level_of_korean: Option<String>,
    pub language_ids: Vec<i64>,
    pub theme_ids: Vec<i64>,
}

impl NewTranslatorProfile {
    /// Empty, offline profile created alongside a new translator account
    pub fn placeholder(user_id: i64) -> Self {
        Self {
            user_id,
            email: None,
            date_of_birth: None,
            is_available: false,
            is_online: false,
            level_of_korean: None,
            language_ids: Vec::new(),
            theme_ids: Vec::new(),
        }
    }
}

/// Optional criteria for translator search; `None` means "any"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslatorFilter {
    pub is_available: Option<bool>,
    pub is_online: Option<bool>,
    pub language_id: Option<i64>,
    pub theme_id: Option<i64>,
    pub level_of_korean: Option<String>,
    /// Case-insensitive substring of email or Korean level
    pub search: Option<String>,
}

impl TranslatorFilter {
    /// Same predicate the SQL query applies
    pub fn matches(&self, profile: &TranslatorProfileModel) -> bool {
        if self.is_available.is_some_and(|v| v != profile.is_available) {
            return false;
        }
        if self.is_online.is_some_and(|v| v != profile.is_online) {
            return false;
        }
        if let Some(id) = self.language_id {
            if !profile.language_ids.contains(&id) {
                return false;
            }
        }
        if let Some(id) = self.theme_id {
            if !profile.theme_ids.contains(&id) {
                return false;
            }
        }
        if let Some(level) = &self.level_of_korean {
            if profile.level_of_korean.as_deref() != Some(level.as_str()) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = |field: &Option<String>| {
                field
                    .as_deref()
                    .is_some_and(|value| value.to_lowercase().contains(&needle))
            };
            if !hit(&profile.email) && !hit(&profile.level_of_korean) {
                return false;
            }
        }
        true
    }
}
