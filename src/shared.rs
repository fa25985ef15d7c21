use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use crate::auth::password::PasswordService;
use crate::auth::repository::{
    InMemoryRefreshTokenRepository, PostgresRefreshTokenRepository, RefreshTokenRepository,
};
use crate::auth::service::AuthService;
use crate::auth::token::TokenCodec;
use crate::call::repository::{CallRepository, InMemoryCallRepository, PostgresCallRepository};
use crate::call::service::CallService;
use crate::catalog::repository::{
    CatalogRepository, InMemoryCatalogRepository, PostgresCatalogRepository,
};
use crate::catalog::service::CatalogService;
use crate::config::AppConfig;
use crate::deposit::repository::{
    DepositRepository, InMemoryDepositRepository, PostgresDepositRepository,
};
use crate::deposit::service::DepositService;
use crate::rating::repository::{
    InMemoryRatingRepository, PostgresRatingRepository, RatingRepository,
};
use crate::rating::service::RatingService;
use crate::translator_profile::repository::{
    InMemoryTranslatorProfileRepository, PostgresTranslatorProfileRepository,
    TranslatorProfileRepository,
};
use crate::translator_profile::service::TranslatorProfileService;
use crate::user::account::{
    AccountRepository, InMemoryAccountRepository, PostgresAccountRepository,
};
use crate::user::repository::{InMemoryUserRepository, PostgresUserRepository, UserRepository};
use crate::user::service::UserService;
use crate::user_profile::repository::{
    InMemoryUserProfileRepository, PostgresUserProfileRepository, UserProfileRepository,
};
use crate::user_profile::service::UserProfileService;
use crate::validation::FieldError;
use crate::websockets::{
    CallSignalingRelay, ConnectionManager, InMemoryConnectionManager, NotificationRelay,
};
use crate::withdrawal::repository::{
    InMemoryWithdrawalRepository, PostgresWithdrawalRepository, WithdrawalRepository,
};
use crate::withdrawal::service::WithdrawalService;

/// Every storage backend the application talks to
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository + Send + Sync>,
    pub accounts: Arc<dyn AccountRepository + Send + Sync>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository + Send + Sync>,
    pub translator_profiles: Arc<dyn TranslatorProfileRepository + Send + Sync>,
    pub user_profiles: Arc<dyn UserProfileRepository + Send + Sync>,
    pub deposits: Arc<dyn DepositRepository + Send + Sync>,
    pub withdrawals: Arc<dyn WithdrawalRepository + Send + Sync>,
    pub ratings: Arc<dyn RatingRepository + Send + Sync>,
    pub calls: Arc<dyn CallRepository + Send + Sync>,
    pub catalog: Arc<dyn CatalogRepository + Send + Sync>,
}

impl Repositories {
    /// In-memory repositories, used when no DATABASE_URL is configured and in tests
    pub fn in_memory() -> Self {
        let users: Arc<dyn UserRepository + Send + Sync> = Arc::new(InMemoryUserRepository::new());
        let translator_profiles: Arc<dyn TranslatorProfileRepository + Send + Sync> =
            Arc::new(InMemoryTranslatorProfileRepository::new());
        let user_profiles: Arc<dyn UserProfileRepository + Send + Sync> =
            Arc::new(InMemoryUserProfileRepository::new());

        Self {
            accounts: Arc::new(InMemoryAccountRepository::new(
                Arc::clone(&users),
                Arc::clone(&user_profiles),
                Arc::clone(&translator_profiles),
            )),
            users,
            refresh_tokens: Arc::new(InMemoryRefreshTokenRepository::new()),
            translator_profiles,
            user_profiles,
            deposits: Arc::new(InMemoryDepositRepository::new()),
            withdrawals: Arc::new(InMemoryWithdrawalRepository::new()),
            ratings: Arc::new(InMemoryRatingRepository::new()),
            calls: Arc::new(InMemoryCallRepository::new()),
            catalog: Arc::new(InMemoryCatalogRepository::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            accounts: Arc::new(PostgresAccountRepository::new(pool.clone())),
            refresh_tokens: Arc::new(PostgresRefreshTokenRepository::new(pool.clone())),
            translator_profiles: Arc::new(PostgresTranslatorProfileRepository::new(pool.clone())),
            user_profiles: Arc::new(PostgresUserProfileRepository::new(pool.clone())),
            deposits: Arc::new(PostgresDepositRepository::new(pool.clone())),
            withdrawals: Arc::new(PostgresWithdrawalRepository::new(pool.clone())),
            ratings: Arc::new(PostgresRatingRepository::new(pool.clone())),
            calls: Arc::new(PostgresCallRepository::new(pool.clone())),
            catalog: Arc::new(PostgresCatalogRepository::new(pool)),
        }
    }
}

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub repositories: Repositories,
    pub token_codec: Arc<TokenCodec>,
    pub password_service: Arc<PasswordService>,
    pub connection_manager: Arc<dyn ConnectionManager>,
}

impl AppState {
    pub fn new(
        repositories: Repositories,
        token_codec: Arc<TokenCodec>,
        password_service: Arc<PasswordService>,
        connection_manager: Arc<dyn ConnectionManager>,
    ) -> Self {
        Self {
            repositories,
            token_codec,
            password_service,
            connection_manager,
        }
    }

    /// Builds the state from configuration with a fresh in-process connection manager
    pub fn from_config(repositories: Repositories, config: &AppConfig) -> Self {
        Self::new(
            repositories,
            Arc::new(TokenCodec::new(&config.jwt)),
            Arc::new(PasswordService::default()),
            Arc::new(InMemoryConnectionManager::new()),
        )
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(
            Arc::clone(&self.repositories.users),
            Arc::clone(&self.repositories.refresh_tokens),
            Arc::clone(&self.token_codec),
            Arc::clone(&self.password_service),
        )
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(
            Arc::clone(&self.repositories.users),
            Arc::clone(&self.repositories.accounts),
            Arc::clone(&self.repositories.refresh_tokens),
            Arc::clone(&self.repositories.user_profiles),
            Arc::clone(&self.repositories.translator_profiles),
            Arc::clone(&self.password_service),
        )
    }

    pub fn translator_profile_service(&self) -> TranslatorProfileService {
        TranslatorProfileService::new(
            Arc::clone(&self.repositories.translator_profiles),
            Arc::clone(&self.repositories.users),
            Arc::clone(&self.repositories.catalog),
            Arc::clone(&self.repositories.ratings),
            Arc::clone(&self.repositories.calls),
        )
    }

    pub fn user_profile_service(&self) -> UserProfileService {
        UserProfileService::new(
            Arc::clone(&self.repositories.user_profiles),
            Arc::clone(&self.repositories.users),
        )
    }

    pub fn deposit_service(&self) -> DepositService {
        DepositService::new(
            Arc::clone(&self.repositories.deposits),
            Arc::clone(&self.repositories.users),
        )
    }

    pub fn withdrawal_service(&self) -> WithdrawalService {
        WithdrawalService::new(
            Arc::clone(&self.repositories.withdrawals),
            Arc::clone(&self.repositories.users),
        )
    }

    pub fn rating_service(&self) -> RatingService {
        RatingService::new(
            Arc::clone(&self.repositories.ratings),
            Arc::clone(&self.repositories.users),
            Arc::clone(&self.repositories.translator_profiles),
        )
    }

    pub fn call_service(&self) -> CallService {
        CallService::new(
            Arc::clone(&self.repositories.calls),
            Arc::clone(&self.repositories.users),
            Arc::clone(&self.repositories.catalog),
        )
    }

    pub fn catalog_service(&self) -> CatalogService {
        CatalogService::new(Arc::clone(&self.repositories.catalog))
    }

    pub fn call_signaling_relay(&self) -> CallSignalingRelay {
        CallSignalingRelay::new(Arc::clone(&self.connection_manager))
    }

    pub fn notification_relay(&self) -> NotificationRelay {
        NotificationRelay::new(Arc::clone(&self.connection_manager))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid username or password")]
    BadCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    ExpiredToken(String),

    #[error("{0}")]
    InvalidToken(String),

    #[error("Refresh Token not found or invalid")]
    RefreshTokenNotFound,

    #[error("Validation failed")]
    ValidationFailed(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid or insufficient role: {0}")]
    InvalidRole(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadCredentials
            | AppError::Unauthorized(_)
            | AppError::ExpiredToken(_)
            | AppError::InvalidToken(_)
            | AppError::RefreshTokenNotFound => StatusCode::UNAUTHORIZED,
            AppError::ValidationFailed(_) | AppError::BadRequest(_) | AppError::InvalidRole(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::DatabaseError(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Storage and internal failures are logged but never echoed to the client
        let message = match &self {
            AppError::DatabaseError(detail) | AppError::Internal(detail) => {
                error!(error = %detail, "Request failed with internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "status": status.as_u16(),
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": message,
            "timestamp": Utc::now().to_rfc3339(),
        });

        if let AppError::ValidationFailed(errors) = &self {
            body["errors"] = json!(errors);
        }

        (status, Json(body)).into_response()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_body_has_message_and_timestamp() {
        let (status, body) = body_json(AppError::NotFound("User 'bob' not found".into())).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);
        assert_eq!(body["message"], "User 'bob' not found");
        assert!(body["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_validation_failure_lists_field_errors() {
        let errors = vec![FieldError::new("email", "must be a well-formed email address")];
        let (status, body) = body_json(AppError::ValidationFailed(errors)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_database_error_detail_is_hidden() {
        let (status, body) = body_json(AppError::DatabaseError("relation missing".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::BadCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::RefreshTokenNotFound.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidRole("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::AccessDenied("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
    }
}
