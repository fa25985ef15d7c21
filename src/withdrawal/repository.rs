use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{NewWithdrawal, WithdrawalModel};
use crate::pagination::{Page, PageRequest};
use crate::shared::AppError;
use crate::transfer::TransferStatus;

#[async_trait]
pub trait WithdrawalRepository {
    async fn create_withdrawal(&self, withdrawal: &NewWithdrawal)
        -> Result<WithdrawalModel, AppError>;
    async fn get_withdrawal(&self, id: i64) -> Result<Option<WithdrawalModel>, AppError>;
    async fn list_withdrawals(&self, page: PageRequest)
        -> Result<Page<WithdrawalModel>, AppError>;
    async fn update_withdrawal(
        &self,
        withdrawal: &WithdrawalModel,
    ) -> Result<WithdrawalModel, AppError>;
    async fn delete_withdrawal(&self, id: i64) -> Result<(), AppError>;
}

fn withdrawal_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Withdrawal not found with id {}", id))
}

pub struct InMemoryWithdrawalRepository {
    withdrawals: RwLock<HashMap<i64, WithdrawalModel>>,
    next_id: AtomicI64,
}

impl Default for InMemoryWithdrawalRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWithdrawalRepository {
    pub fn new() -> Self {
        Self {
            withdrawals: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl WithdrawalRepository for InMemoryWithdrawalRepository {
    async fn create_withdrawal(
        &self,
        withdrawal: &NewWithdrawal,
    ) -> Result<WithdrawalModel, AppError> {
        let now = Utc::now();
        let model = WithdrawalModel {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: withdrawal.user_id,
            account_number: withdrawal.account_number.clone(),
            account_holder: withdrawal.account_holder.clone(),
            name_of_bank: withdrawal.name_of_bank.clone(),
            sum_decimal: withdrawal.sum_decimal,
            status: withdrawal.status,
            created_at: now,
            updated_at: now,
        };
        self.withdrawals
            .write()
            .await
            .insert(model.id, model.clone());
        Ok(model)
    }

    async fn get_withdrawal(&self, id: i64) -> Result<Option<WithdrawalModel>, AppError> {
        Ok(self.withdrawals.read().await.get(&id).cloned())
    }

    async fn list_withdrawals(
        &self,
        page: PageRequest,
    ) -> Result<Page<WithdrawalModel>, AppError> {
        let mut all: Vec<WithdrawalModel> =
            self.withdrawals.read().await.values().cloned().collect();
        all.sort_by_key(|w| w.id);
        Ok(page.slice(all))
    }

    async fn update_withdrawal(
        &self,
        withdrawal: &WithdrawalModel,
    ) -> Result<WithdrawalModel, AppError> {
        let mut withdrawals = self.withdrawals.write().await;
        let slot = withdrawals
            .get_mut(&withdrawal.id)
            .ok_or_else(|| withdrawal_not_found(withdrawal.id))?;
        *slot = WithdrawalModel {
            created_at: slot.created_at,
            updated_at: Utc::now(),
            ..withdrawal.clone()
        };
        Ok(slot.clone())
    }

    async fn delete_withdrawal(&self, id: i64) -> Result<(), AppError> {
        self.withdrawals
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| withdrawal_not_found(id))
    }
}

const WITHDRAWAL_COLUMNS: &str = "id, user_id, account_number, account_holder, name_of_bank, \
     sum_decimal, status, created_at, updated_at";

fn withdrawal_from_row(row: &PgRow) -> WithdrawalModel {
    let status: String = row.get("status");
    WithdrawalModel {
        id: row.get("id"),
        user_id: row.get("user_id"),
        account_number: row.get("account_number"),
        account_holder: row.get("account_holder"),
        name_of_bank: row.get("name_of_bank"),
        sum_decimal: row.get("sum_decimal"),
        status: TransferStatus::from_column(&status),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub struct PostgresWithdrawalRepository {
    pool: PgPool,
}

impl PostgresWithdrawalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WithdrawalRepository for PostgresWithdrawalRepository {
    #[instrument(skip(self, withdrawal), fields(user_id = withdrawal.user_id))]
    async fn create_withdrawal(
        &self,
        withdrawal: &NewWithdrawal,
    ) -> Result<WithdrawalModel, AppError> {
        let row = sqlx::query(&format!(
            "INSERT INTO withdrawals (user_id, account_number, account_holder, name_of_bank, sum_decimal, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            WITHDRAWAL_COLUMNS
        ))
        .bind(withdrawal.user_id)
        .bind(&withdrawal.account_number)
        .bind(&withdrawal.account_holder)
        .bind(&withdrawal.name_of_bank)
        .bind(withdrawal.sum_decimal)
        .bind(withdrawal.status.as_ref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to insert withdrawal");
            AppError::from(e)
        })?;

        let created = withdrawal_from_row(&row);
        debug!(withdrawal_id = created.id, "Withdrawal created in database");
        Ok(created)
    }

    async fn get_withdrawal(&self, id: i64) -> Result<Option<WithdrawalModel>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM withdrawals WHERE id = $1",
            WITHDRAWAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(withdrawal_from_row))
    }

    async fn list_withdrawals(
        &self,
        page: PageRequest,
    ) -> Result<Page<WithdrawalModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM withdrawals ORDER BY id LIMIT $1 OFFSET $2",
            WITHDRAWAL_COLUMNS
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM withdrawals")
            .fetch_one(&self.pool)
            .await?
            .get("total");
        Ok(Page::new(
            rows.iter().map(withdrawal_from_row).collect(),
            page,
            total as u64,
        ))
    }

    #[instrument(skip(self, withdrawal), fields(withdrawal_id = withdrawal.id))]
    async fn update_withdrawal(
        &self,
        withdrawal: &WithdrawalModel,
    ) -> Result<WithdrawalModel, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE withdrawals SET user_id = $2, account_number = $3, account_holder = $4, \
             name_of_bank = $5, sum_decimal = $6, status = $7, updated_at = now() \
             WHERE id = $1 RETURNING {}",
            WITHDRAWAL_COLUMNS
        ))
        .bind(withdrawal.id)
        .bind(withdrawal.user_id)
        .bind(&withdrawal.account_number)
        .bind(&withdrawal.account_holder)
        .bind(&withdrawal.name_of_bank)
        .bind(withdrawal.sum_decimal)
        .bind(withdrawal.status.as_ref())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(withdrawal_from_row)
            .ok_or_else(|| withdrawal_not_found(withdrawal.id))
    }

    #[instrument(skip(self))]
    async fn delete_withdrawal(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM withdrawals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(withdrawal_not_found(id));
        }
        Ok(())
    }
}
