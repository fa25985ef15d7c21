use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::RefreshTokenModel,
    password::PasswordService,
    repository::RefreshTokenRepository,
    token::TokenCodec,
    types::{TokenKind, TokenPair},
};
use crate::shared::AppError;
use crate::user::models::UserModel;
use crate::user::repository::UserRepository;

/// Login, refresh-token rotation and logout
pub struct AuthService {
    users: Arc<dyn UserRepository + Send + Sync>,
    refresh_tokens: Arc<dyn RefreshTokenRepository + Send + Sync>,
    token_codec: Arc<TokenCodec>,
    password_service: Arc<PasswordService>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository + Send + Sync>,
        refresh_tokens: Arc<dyn RefreshTokenRepository + Send + Sync>,
        token_codec: Arc<TokenCodec>,
        password_service: Arc<PasswordService>,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            token_codec,
            password_service,
        }
    }

    /// Verifies credentials and issues an access token plus a ledger-backed refresh token
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = match self.users.get_user_by_username(username).await? {
            Some(user) => user,
            None => {
                warn!("Login attempt for unknown username");
                return Err(AppError::BadCredentials);
            }
        };

        if !self.password_service.verify(password, &user.password_hash)? {
            warn!(user_id = user.id, "Login attempt with wrong password");
            return Err(AppError::BadCredentials);
        }

        let pair = self.issue_pair(&user).await?;
        info!(user_id = user.id, "User authenticated");
        Ok(pair)
    }

    /// Rotates a refresh token: the presented one is consumed, a new pair is returned
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let stored = self
            .refresh_tokens
            .find_by_token(refresh_token)
            .await?
            .ok_or_else(|| {
                warn!("Refresh token not found in ledger");
                AppError::RefreshTokenNotFound
            })?;

        if stored.is_expired() {
            self.refresh_tokens.delete_by_token(refresh_token).await?;
            warn!(user_id = stored.user_id, "Refresh token expired and was removed");
            return Err(AppError::ExpiredToken(
                "Refresh token has expired, please sign in again".to_string(),
            ));
        }

        // Only the caller that actually removes the row may mint the next pair
        if !self.refresh_tokens.delete_by_token(refresh_token).await? {
            warn!(user_id = stored.user_id, "Refresh token consumed concurrently");
            return Err(AppError::RefreshTokenNotFound);
        }

        let user = self.users.get_user(stored.user_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("User not found with id: {}", stored.user_id))
        })?;

        let pair = self.issue_pair(&user).await?;
        info!(user_id = user.id, "Refresh token rotated");
        Ok(pair)
    }

    /// Deletes every refresh token of the presented token's owner
    #[instrument(skip(self, refresh_token))]
    pub async fn logout(&self, refresh_token: &str) -> Result<u64, AppError> {
        let stored = self
            .refresh_tokens
            .find_by_token(refresh_token)
            .await?
            .ok_or(AppError::RefreshTokenNotFound)?;

        let removed = self.refresh_tokens.delete_by_user_id(stored.user_id).await?;
        info!(user_id = stored.user_id, removed, "User logged out everywhere");
        Ok(removed)
    }

    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        self.refresh_tokens.delete_expired().await
    }

    async fn issue_pair(&self, user: &UserModel) -> Result<TokenPair, AppError> {
        let access_token =
            self.token_codec
                .sign(TokenKind::Access, user.id, &user.username, &user.roles)?;
        let refresh_token =
            self.token_codec
                .sign(TokenKind::Refresh, user.id, &user.username, &user.roles)?;

        self.refresh_tokens
            .create_token(&RefreshTokenModel::new(
                refresh_token.clone(),
                user.id,
                self.token_codec.ttl(TokenKind::Refresh),
            ))
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::{insert_user, AppStateBuilder, TEST_PASSWORD};
    use crate::shared::AppState;
    use crate::user::models::Role;
    use chrono::Duration;

    async fn setup() -> (AppState, AuthService, UserModel) {
        let state = AppStateBuilder::new().build();
        let user = insert_user(&state, "01012345673", vec![Role::Admin]).await;
        let service = state.auth_service();
        (state, service, user)
    }

    #[tokio::test]
    async fn test_authenticate_returns_distinct_tokens_and_one_ledger_row() {
        let (state, service, user) = setup().await;

        let pair = service.authenticate("01012345673", TEST_PASSWORD).await.unwrap();

        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
        assert_ne!(pair.access_token, pair.refresh_token);
        assert_eq!(
            state.repositories.refresh_tokens.count_for_user(user.id).await.unwrap(),
            1
        );

        let claims = state
            .token_codec
            .verify(&pair.access_token, TokenKind::Access)
            .unwrap();
        assert_eq!(claims.sub, "01012345673");
        assert_eq!(claims.roles, vec!["ROLE_ADMIN"]);
    }

    #[tokio::test]
    async fn test_wrong_password_creates_no_ledger_row() {
        let (state, service, user) = setup().await;

        let result = service.authenticate("01012345673", "wrong").await;

        assert!(matches!(result, Err(AppError::BadCredentials)));
        assert_eq!(
            state.repositories.refresh_tokens.count_for_user(user.id).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_unknown_user_is_bad_credentials() {
        let (_state, service, _user) = setup().await;
        let result = service.authenticate("01099999999", TEST_PASSWORD).await;
        assert!(matches!(result, Err(AppError::BadCredentials)));
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let (state, service, user) = setup().await;
        let first = service.authenticate("01012345673", TEST_PASSWORD).await.unwrap();

        let second = service.refresh(&first.refresh_token).await.unwrap();

        assert_ne!(second.refresh_token, first.refresh_token);
        assert!(matches!(
            service.refresh(&first.refresh_token).await,
            Err(AppError::RefreshTokenNotFound)
        ));
        assert_eq!(
            state.repositories.refresh_tokens.count_for_user(user.id).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_refresh_expired_token_deletes_row() {
        let (state, service, user) = setup().await;
        state
            .repositories
            .refresh_tokens
            .create_token(&RefreshTokenModel::new(
                "stale-token".to_string(),
                user.id,
                Duration::seconds(-5),
            ))
            .await
            .unwrap();

        let result = service.refresh("stale-token").await;

        assert!(matches!(result, Err(AppError::ExpiredToken(_))));
        assert!(state
            .repositories
            .refresh_tokens
            .find_by_token("stale-token")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_has_one_winner() {
        let (_state, service, _user) = setup().await;
        let pair = service.authenticate("01012345673", TEST_PASSWORD).await.unwrap();

        let (a, b) = tokio::join!(
            service.refresh(&pair.refresh_token),
            service.refresh(&pair.refresh_token)
        );

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    }

    #[tokio::test]
    async fn test_logout_removes_all_tokens_of_user() {
        let (state, service, user) = setup().await;
        let first = service.authenticate("01012345673", TEST_PASSWORD).await.unwrap();
        let second = service.authenticate("01012345673", TEST_PASSWORD).await.unwrap();

        let removed = service.logout(&first.refresh_token).await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(
            state.repositories.refresh_tokens.count_for_user(user.id).await.unwrap(),
            0
        );
        assert!(service.refresh(&second.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_logout_with_unknown_token() {
        let (_state, service, _user) = setup().await;
        assert!(matches!(
            service.logout("never-issued").await,
            Err(AppError::RefreshTokenNotFound)
        ));
    }
}
