use chrono::{DateTime, Duration, Utc};

/// Database model for the refresh_tokens ledger
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTokenModel {
    pub id: i64, // assigned by the repository on insert
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenModel {
    pub fn new(token: String, user_id: i64, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            token,
            user_id,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_expires_after_ttl() {
        let token = RefreshTokenModel::new("t".to_string(), 1, Duration::hours(2));

        assert!(!token.is_expired());
        assert_eq!(token.expires_at - token.created_at, Duration::hours(2));
    }

    #[test]
    fn test_negative_ttl_is_already_expired() {
        let token = RefreshTokenModel::new("t".to_string(), 1, Duration::seconds(-1));
        assert!(token.is_expired());
    }
}
