use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{DepositModel, NewDeposit};
use crate::pagination::{Page, PageRequest};
use crate::shared::AppError;
use crate::transfer::TransferStatus;

#[async_trait]
pub trait DepositRepository {
    async fn create_deposit(&self, deposit: &NewDeposit) -> Result<DepositModel, AppError>;
    async fn get_deposit(&self, id: i64) -> Result<Option<DepositModel>, AppError>;
    async fn list_deposits(&self, page: PageRequest) -> Result<Page<DepositModel>, AppError>;
    async fn update_deposit(&self, deposit: &DepositModel) -> Result<DepositModel, AppError>;
    async fn delete_deposit(&self, id: i64) -> Result<(), AppError>;
}

fn deposit_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Deposit not found with id {}", id))
}

/// In-memory implementation of DepositRepository for development and testing
pub struct InMemoryDepositRepository {
    deposits: RwLock<HashMap<i64, DepositModel>>,
    next_id: AtomicI64,
}

impl Default for InMemoryDepositRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDepositRepository {
    pub fn new() -> Self {
        Self {
            deposits: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl DepositRepository for InMemoryDepositRepository {
    #[instrument(skip(self, deposit), fields(user_id = deposit.user_id))]
    async fn create_deposit(&self, deposit: &NewDeposit) -> Result<DepositModel, AppError> {
        let now = Utc::now();
        let model = DepositModel {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: deposit.user_id,
            account_holder: deposit.account_holder.clone(),
            name_of_bank: deposit.name_of_bank.clone(),
            coin_decimal: deposit.coin_decimal,
            won_decimal: deposit.won_decimal,
            status: deposit.status,
            created_at: now,
            updated_at: now,
        };
        self.deposits.write().await.insert(model.id, model.clone());
        debug!(deposit_id = model.id, "Deposit created in memory");
        Ok(model)
    }

    async fn get_deposit(&self, id: i64) -> Result<Option<DepositModel>, AppError> {
        Ok(self.deposits.read().await.get(&id).cloned())
    }

    async fn list_deposits(&self, page: PageRequest) -> Result<Page<DepositModel>, AppError> {
        let mut deposits: Vec<DepositModel> =
            self.deposits.read().await.values().cloned().collect();
        deposits.sort_by_key(|d| d.id);
        Ok(page.slice(deposits))
    }

    async fn update_deposit(&self, deposit: &DepositModel) -> Result<DepositModel, AppError> {
        let mut deposits = self.deposits.write().await;
        if !deposits.contains_key(&deposit.id) {
            return Err(deposit_not_found(deposit.id));
        }
        let mut updated = deposit.clone();
        updated.updated_at = Utc::now();
        deposits.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete_deposit(&self, id: i64) -> Result<(), AppError> {
        match self.deposits.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(deposit_not_found(id)),
        }
    }
}

const DEPOSIT_COLUMNS: &str = "id, user_id, account_holder, name_of_bank, coin_decimal, \
     won_decimal, status, created_at, updated_at";

fn deposit_from_row(row: &PgRow) -> DepositModel {
    let status: String = row.get("status");
    DepositModel {
        id: row.get("id"),
        user_id: row.get("user_id"),
        account_holder: row.get("account_holder"),
        name_of_bank: row.get("name_of_bank"),
        coin_decimal: row.get("coin_decimal"),
        won_decimal: row.get("won_decimal"),
        status: TransferStatus::from_column(&status),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub struct PostgresDepositRepository {
    pool: PgPool,
}

impl PostgresDepositRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DepositRepository for PostgresDepositRepository {
    #[instrument(skip(self, deposit), fields(user_id = deposit.user_id))]
    async fn create_deposit(&self, deposit: &NewDeposit) -> Result<DepositModel, AppError> {
        let row = sqlx::query(&format!(
            "INSERT INTO deposits (user_id, account_holder, name_of_bank, coin_decimal, won_decimal, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            DEPOSIT_COLUMNS
        ))
        .bind(deposit.user_id)
        .bind(&deposit.account_holder)
        .bind(&deposit.name_of_bank)
        .bind(deposit.coin_decimal)
        .bind(deposit.won_decimal)
        .bind(deposit.status.as_ref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to insert deposit");
            AppError::from(e)
        })?;

        let created = deposit_from_row(&row);
        debug!(deposit_id = created.id, "Deposit created in database");
        Ok(created)
    }

    async fn get_deposit(&self, id: i64) -> Result<Option<DepositModel>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM deposits WHERE id = $1", DEPOSIT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(deposit_from_row))
    }

    async fn list_deposits(&self, page: PageRequest) -> Result<Page<DepositModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM deposits ORDER BY id LIMIT $1 OFFSET $2",
            DEPOSIT_COLUMNS
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM deposits")
            .fetch_one(&self.pool)
            .await?
            .get("total");
        Ok(Page::new(
            rows.iter().map(deposit_from_row).collect(),
            page,
            total as u64,
        ))
    }

    #[instrument(skip(self, deposit), fields(deposit_id = deposit.id))]
    async fn update_deposit(&self, deposit: &DepositModel) -> Result<DepositModel, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE deposits SET user_id = $2, account_holder = $3, name_of_bank = $4, \
             coin_decimal = $5, won_decimal = $6, status = $7, updated_at = now() \
             WHERE id = $1 RETURNING {}",
            DEPOSIT_COLUMNS
        ))
        .bind(deposit.id)
        .bind(deposit.user_id)
        .bind(&deposit.account_holder)
        .bind(&deposit.name_of_bank)
        .bind(deposit.coin_decimal)
        .bind(deposit.won_decimal)
        .bind(deposit.status.as_ref())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(deposit_from_row)
            .ok_or_else(|| deposit_not_found(deposit.id))
    }

    #[instrument(skip(self))]
    async fn delete_deposit(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM deposits WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(deposit_not_found(id));
        }
        Ok(())
    }
}
