use std::sync::Arc;
use tracing::{info, instrument};

use super::models::{
    CreateWithdrawal, NewWithdrawal, WithdrawalModel, WithdrawalRequest, WithdrawalResponse,
};
use super::repository::WithdrawalRepository;
use crate::pagination::{Page, PageRequest};
use crate::shared::AppError;
use crate::user::repository::UserRepository;
use crate::validation::ensure_valid;

pub struct WithdrawalService {
    withdrawals: Arc<dyn WithdrawalRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
}

impl WithdrawalService {
    pub fn new(
        withdrawals: Arc<dyn WithdrawalRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        Self { withdrawals, users }
    }

    async fn require_user(&self, user_id: i64) -> Result<(), AppError> {
        if self.users.get_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "User not found with id {}",
                user_id
            )));
        }
        Ok(())
    }

    async fn find(&self, id: i64) -> Result<WithdrawalModel, AppError> {
        self.withdrawals
            .get_withdrawal(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Withdrawal not found with id {}", id)))
    }

    #[instrument(skip(self, request))]
    pub async fn create_withdrawal(
        &self,
        user_id: i64,
        request: WithdrawalRequest,
    ) -> Result<WithdrawalResponse, AppError> {
        ensure_valid(&CreateWithdrawal(&request))?;
        self.require_user(user_id).await?;

        let withdrawal = self
            .withdrawals
            .create_withdrawal(&NewWithdrawal {
                user_id,
                account_number: request.account_number.unwrap_or_default(),
                account_holder: request.account_holder.unwrap_or_default(),
                name_of_bank: request.name_of_bank.unwrap_or_default(),
                sum_decimal: request.sum_decimal.unwrap_or_default(),
                status: request.status.unwrap_or_default(),
            })
            .await?;
        info!(withdrawal_id = withdrawal.id, user_id, sum = %withdrawal.sum_decimal, "Withdrawal requested");
        Ok(withdrawal.into())
    }

    pub async fn get_withdrawal(&self, id: i64) -> Result<WithdrawalResponse, AppError> {
        Ok(self.find(id).await?.into())
    }

    pub async fn list_withdrawals(
        &self,
        page: PageRequest,
    ) -> Result<Page<WithdrawalResponse>, AppError> {
        Ok(self
            .withdrawals
            .list_withdrawals(page)
            .await?
            .map(WithdrawalResponse::from))
    }

    /// Applies the fields present in `request`; blank text keeps the stored value
    #[instrument(skip(self, request))]
    pub async fn update_withdrawal(
        &self,
        id: i64,
        request: WithdrawalRequest,
    ) -> Result<WithdrawalResponse, AppError> {
        ensure_valid(&request)?;
        let mut withdrawal = self.find(id).await?;

        if let Some(user_id) = request.user_id {
            self.require_user(user_id).await?;
            withdrawal.user_id = user_id;
        }
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        if let Some(number) = non_blank(request.account_number) {
            withdrawal.account_number = number;
        }
        if let Some(holder) = non_blank(request.account_holder) {
            withdrawal.account_holder = holder;
        }
        if let Some(bank) = non_blank(request.name_of_bank) {
            withdrawal.name_of_bank = bank;
        }
        if let Some(sum) = request.sum_decimal {
            withdrawal.sum_decimal = sum;
        }
        if let Some(status) = request.status {
            withdrawal.status = status;
        }

        let updated = self.withdrawals.update_withdrawal(&withdrawal).await?;
        info!(withdrawal_id = id, status = %updated.status, "Withdrawal updated");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_withdrawal(&self, id: i64) -> Result<(), AppError> {
        self.withdrawals.delete_withdrawal(id).await?;
        info!(withdrawal_id = id, "Withdrawal deleted");
        Ok(())
    }
}
