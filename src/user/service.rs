use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    account::AccountRepository,
    models::{normalize_roles, NewUser, Role},
    repository::UserRepository,
    types::{CreateUserRequest, UpdateUserRequest, UserResponse},
};
use crate::auth::password::PasswordService;
use crate::auth::repository::RefreshTokenRepository;
use crate::pagination::{Page, PageRequest};
use crate::shared::AppError;
use crate::translator_profile::repository::TranslatorProfileRepository;
use crate::user_profile::repository::UserProfileRepository;
use crate::validation::ensure_valid;

/// Parses `ROLE_*` names, failing on the first unknown one
pub fn parse_roles(names: &[String]) -> Result<Vec<Role>, AppError> {
    names
        .iter()
        .map(|name| {
            let name = name.trim();
            Role::from_str(name).map_err(|_| AppError::InvalidRole(name.to_string()))
        })
        .collect()
}

/// Service for account management; owns the cascade on user deletion
pub struct UserService {
    users: Arc<dyn UserRepository + Send + Sync>,
    accounts: Arc<dyn AccountRepository + Send + Sync>,
    refresh_tokens: Arc<dyn RefreshTokenRepository + Send + Sync>,
    user_profiles: Arc<dyn UserProfileRepository + Send + Sync>,
    translator_profiles: Arc<dyn TranslatorProfileRepository + Send + Sync>,
    password_service: Arc<PasswordService>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository + Send + Sync>,
        accounts: Arc<dyn AccountRepository + Send + Sync>,
        refresh_tokens: Arc<dyn RefreshTokenRepository + Send + Sync>,
        user_profiles: Arc<dyn UserProfileRepository + Send + Sync>,
        translator_profiles: Arc<dyn TranslatorProfileRepository + Send + Sync>,
        password_service: Arc<PasswordService>,
    ) -> Self {
        Self {
            users,
            accounts,
            refresh_tokens,
            user_profiles,
            translator_profiles,
            password_service,
        }
    }

    /// Creates a user with a user profile, plus a translator profile for translators
    #[instrument(skip(self, request), fields(username = ?request.username))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserResponse, AppError> {
        ensure_valid(&request)?;

        let username = request.username.unwrap_or_default().trim().to_string();
        let password = request.password.unwrap_or_default();

        if self.users.get_user_by_username(&username).await?.is_some() {
            warn!("Username already exists");
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let roles = match request.roles {
            Some(names) if !names.is_empty() => parse_roles(&names)?,
            _ => vec![Role::User],
        };

        let user = self
            .accounts
            .create_account(&NewUser {
                username,
                password_hash: self.password_service.hash(&password)?,
                first_name: request.first_name,
                last_name: request.last_name,
                balance: request.balance.unwrap_or(Decimal::ZERO),
                is_active: request.is_active.unwrap_or(true),
                on_boarding_status: request.on_boarding_status.unwrap_or(0),
                roles: normalize_roles(roles),
            })
            .await?;

        info!(user_id = user.id, "User created");
        Ok(user.into())
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: i64) -> Result<UserResponse, AppError> {
        self.users
            .get_user(id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| AppError::NotFound(format!("User not found with id: {}", id)))
    }

    #[instrument(skip(self))]
    pub async fn get_by_username(&self, username: &str) -> Result<UserResponse, AppError> {
        self.users
            .get_user_by_username(username)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", username)))
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self, page: PageRequest) -> Result<Page<UserResponse>, AppError> {
        Ok(self.users.list_users(page).await?.map(UserResponse::from))
    }

    /// Applies present fields; a blank password and absent roles leave the stored values alone
    #[instrument(skip(self, request))]
    pub async fn update_user(
        &self,
        id: i64,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, AppError> {
        ensure_valid(&request)?;

        let mut user = self
            .users
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with id: {}", id)))?;

        if let Some(username) = request.username {
            user.username = username.trim().to_string();
        }
        if request.first_name.is_some() {
            user.first_name = request.first_name;
        }
        if request.last_name.is_some() {
            user.last_name = request.last_name;
        }
        if let Some(balance) = request.balance {
            user.balance = balance;
        }
        if let Some(is_active) = request.is_active {
            user.is_active = is_active;
        }
        if let Some(status) = request.on_boarding_status {
            user.on_boarding_status = status;
        }
        if let Some(password) = request.password.filter(|p| !p.trim().is_empty()) {
            user.password_hash = self.password_service.hash(&password)?;
        }
        if let Some(names) = request.roles {
            user.roles = normalize_roles(parse_roles(&names)?);
        }

        let updated = self.users.update_user(&user).await?;
        info!(user_id = id, "User updated");
        Ok(updated.into())
    }

    /// Removes refresh tokens and profiles before the user row
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        if self.users.get_user(id).await?.is_none() {
            return Err(AppError::NotFound(format!("User not found with id: {}", id)));
        }

        let tokens = self.refresh_tokens.delete_by_user_id(id).await?;
        self.user_profiles.delete_by_user_id(id).await?;
        self.translator_profiles.delete_by_user_id(id).await?;
        self.users.delete_user(id).await?;

        info!(user_id = id, refresh_tokens_removed = tokens, "User deleted");
        Ok(())
    }
}
