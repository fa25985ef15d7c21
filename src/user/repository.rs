use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgConnection, PgPool, Row};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{normalize_roles, NewUser, Role, UserModel};
use crate::pagination::{Page, PageRequest};
use crate::shared::AppError;

/// Trait for the credential store
#[async_trait]
pub trait UserRepository {
    async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError>;
    async fn get_user(&self, id: i64) -> Result<Option<UserModel>, AppError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError>;
    async fn list_users(&self, page: PageRequest) -> Result<Page<UserModel>, AppError>;
    async fn update_user(&self, user: &UserModel) -> Result<UserModel, AppError>;
    /// Deletes the user together with its role links; callers remove dependent rows first
    async fn delete_user(&self, id: i64) -> Result<(), AppError>;
}

fn duplicate_username() -> AppError {
    AppError::Conflict("Username already exists".to_string())
}

/// In-memory implementation of UserRepository for development and testing
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<i64, UserModel>>,
    next_id: AtomicI64,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            warn!("Username already taken in memory");
            return Err(duplicate_username());
        }

        let now = Utc::now();
        let model = UserModel {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            balance: user.balance,
            is_active: user.is_active,
            on_boarding_status: user.on_boarding_status,
            roles: normalize_roles(user.roles.clone()),
            created_at: now,
            updated_at: now,
        };
        users.insert(model.id, model.clone());

        debug!(user_id = model.id, "User created in memory");
        Ok(model)
    }

    async fn get_user(&self, id: i64) -> Result<Option<UserModel>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<UserModel>, AppError> {
        let mut users: Vec<UserModel> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| (u.created_at, u.id));
        Ok(page.slice(users))
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    async fn update_user(&self, user: &UserModel) -> Result<UserModel, AppError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            warn!("User not found for update in memory");
            return Err(AppError::NotFound(format!("User not found with id: {}", user.id)));
        }
        if users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(duplicate_username());
        }

        let mut updated = user.clone();
        updated.roles = normalize_roles(updated.roles);
        updated.updated_at = Utc::now();
        users.insert(updated.id, updated.clone());

        debug!("User updated in memory");
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        if self.users.write().await.remove(&id).is_none() {
            warn!("User not found for deletion in memory");
            return Err(AppError::NotFound(format!("User not found with id: {}", id)));
        }
        debug!("User deleted from memory");
        Ok(())
    }
}

const USER_COLUMNS: &str = "SELECT u.id, u.username, u.password_hash, u.first_name, u.last_name, \
     u.balance, u.is_active, u.on_boarding_status, u.created_at, u.updated_at, \
     ARRAY(SELECT r.name FROM user_roles ur JOIN roles r ON r.id = ur.role_id \
           WHERE ur.user_id = u.id ORDER BY r.name) AS roles \
     FROM users u";

fn user_from_row(row: &PgRow) -> UserModel {
    let role_names: Vec<String> = row.get("roles");
    let roles = role_names
        .iter()
        .filter_map(|name| Role::from_str(name).ok())
        .collect();

    UserModel {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        balance: row.get("balance"),
        is_active: row.get("is_active"),
        on_boarding_status: row.get("on_boarding_status"),
        roles: normalize_roles(roles),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn role_names(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|r| r.to_string()).collect()
}

fn map_write_error(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => duplicate_username(),
        _ => {
            warn!(error = %e, "User write failed in database");
            AppError::from(e)
        }
    }
}

/// Inserts the user row and its role links on an open connection; the caller owns the transaction
pub(crate) async fn insert_user_rows(
    conn: &mut PgConnection,
    user: &NewUser,
) -> Result<i64, AppError> {
    let id: i64 = sqlx::query(
        "INSERT INTO users (username, password_hash, first_name, last_name, balance, is_active, on_boarding_status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(user.balance)
    .bind(user.is_active)
    .bind(user.on_boarding_status)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_write_error)?
    .get("id");

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id) SELECT $1, id FROM roles WHERE name = ANY($2)",
    )
    .bind(id)
    .bind(role_names(&user.roles))
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

pub(crate) async fn fetch_user_by_id(
    pool: &PgPool,
    id: i64,
) -> Result<Option<UserModel>, AppError> {
    let row = sqlx::query(&format!("{} WHERE u.id = $1", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(user_from_row))
}

/// PostgreSQL implementation of the credential store
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by_id(&self, id: i64) -> Result<Option<UserModel>, AppError> {
        fetch_user_by_id(&self.pool, id).await
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError> {
        let mut tx = self.pool.begin().await?;
        let id = insert_user_rows(&mut *tx, user).await?;
        tx.commit().await?;
        debug!(user_id = id, "User created in database");

        self.fetch_one_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal("Created user vanished".to_string()))
    }

    async fn get_user(&self, id: i64) -> Result<Option<UserModel>, AppError> {
        self.fetch_one_by_id(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError> {
        let row = sqlx::query(&format!("{} WHERE u.username = $1", USER_COLUMNS))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<UserModel>, AppError> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY u.created_at, u.id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM users")
            .fetch_one(&self.pool)
            .await?
            .get("total");

        Ok(Page::new(
            rows.iter().map(user_from_row).collect(),
            page,
            total as u64,
        ))
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    async fn update_user(&self, user: &UserModel) -> Result<UserModel, AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE users SET username = $2, password_hash = $3, first_name = $4, last_name = $5, \
             balance = $6, is_active = $7, on_boarding_status = $8, updated_at = now() WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.balance)
        .bind(user.is_active)
        .bind(user.on_boarding_status)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            warn!("User not found for update");
            return Err(AppError::NotFound(format!("User not found with id: {}", user.id)));
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) SELECT $1, id FROM roles WHERE name = ANY($2)",
        )
        .bind(user.id)
        .bind(role_names(&user.roles))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("User updated in database");

        self.fetch_one_by_id(user.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with id: {}", user.id)))
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            warn!("User not found for deletion");
            return Err(AppError::NotFound(format!("User not found with id: {}", id)));
        }

        tx.commit().await?;
        debug!("User deleted from database");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_user(username: &str, roles: Vec<Role>) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            first_name: Some("Min".to_string()),
            last_name: Some("Kim".to_string()),
            balance: Decimal::ZERO,
            is_active: true,
            on_boarding_status: 0,
            roles,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_normalizes_roles() {
        let repo = InMemoryUserRepository::new();

        let first = repo
            .create_user(&new_user("01011112222", vec![Role::Admin, Role::User, Role::Admin]))
            .await
            .unwrap();
        let second = repo
            .create_user(&new_user("01033334444", vec![]))
            .await
            .unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.roles, vec![Role::User, Role::Admin]);
        assert_eq!(repo.user_count().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let repo = InMemoryUserRepository::new();
        repo.create_user(&new_user("01011112222", vec![])).await.unwrap();

        let result = repo.create_user(&new_user("01011112222", vec![])).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_lookup_by_username() {
        let repo = InMemoryUserRepository::new();
        let created = repo
            .create_user(&new_user("01011112222", vec![Role::Translator]))
            .await
            .unwrap();

        let found = repo.get_user_by_username("01011112222").await.unwrap();
        assert_eq!(found, Some(created));
        assert!(repo.get_user_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_rejects_taken_username() {
        let repo = InMemoryUserRepository::new();
        repo.create_user(&new_user("01011112222", vec![])).await.unwrap();
        let mut other = repo
            .create_user(&new_user("01033334444", vec![]))
            .await
            .unwrap();

        other.username = "01011112222".to_string();
        let result = repo.update_user(&other).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let repo = InMemoryUserRepository::new();
        let mut ghost = repo
            .create_user(&new_user("01011112222", vec![]))
            .await
            .unwrap();
        repo.delete_user(ghost.id).await.unwrap();

        ghost.first_name = Some("Ghost".to_string());
        assert!(matches!(
            repo.update_user(&ghost).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete_user(ghost.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_users_pages_in_creation_order() {
        let repo = InMemoryUserRepository::new();
        for i in 0..5 {
            repo.create_user(&new_user(&format!("0101111000{}", i), vec![]))
                .await
                .unwrap();
        }

        let page = repo.list_users(PageRequest::new(1, 2)).await.unwrap();
        let names: Vec<&str> = page.content.iter().map(|u| u.username.as_str()).collect();

        assert_eq!(names, vec!["01011110002", "01011110003"]);
        assert_eq!(page.total_elements, 5);
    }
}
