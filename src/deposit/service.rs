use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};

use super::models::{DepositRequest, DepositResponse, NewDeposit};
use super::repository::DepositRepository;
use crate::pagination::{Page, PageRequest};
use crate::shared::AppError;
use crate::user::repository::UserRepository;
use crate::validation::ensure_valid;

pub struct DepositService {
    deposits: Arc<dyn DepositRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
}

impl DepositService {
    pub fn new(
        deposits: Arc<dyn DepositRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        Self { deposits, users }
    }

    async fn require_user(&self, user_id: i64) -> Result<(), AppError> {
        match self.users.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("User not found with id {}", user_id))),
        }
    }

    /// Records a deposit for `user_id`; the caller decides who that may be
    #[instrument(skip(self, request))]
    pub async fn create_deposit(
        &self,
        user_id: i64,
        request: DepositRequest,
    ) -> Result<DepositResponse, AppError> {
        ensure_valid(&request)?;
        self.require_user(user_id).await?;

        let deposit = self
            .deposits
            .create_deposit(&NewDeposit {
                user_id,
                account_holder: request.account_holder,
                name_of_bank: request.name_of_bank,
                coin_decimal: request.coin_decimal.unwrap_or(Decimal::ZERO),
                won_decimal: request.won_decimal.unwrap_or(Decimal::ZERO),
                status: request.status.unwrap_or_default(),
            })
            .await?;
        info!(deposit_id = deposit.id, user_id, "Deposit recorded");
        Ok(deposit.into())
    }

    pub async fn get_deposit(&self, id: i64) -> Result<DepositResponse, AppError> {
        self.deposits
            .get_deposit(id)
            .await?
            .map(DepositResponse::from)
            .ok_or_else(|| AppError::NotFound(format!("Deposit not found with id {}", id)))
    }

    pub async fn list_deposits(&self, page: PageRequest) -> Result<Page<DepositResponse>, AppError> {
        Ok(self
            .deposits
            .list_deposits(page)
            .await?
            .map(DepositResponse::from))
    }

    #[instrument(skip(self, request))]
    pub async fn update_deposit(
        &self,
        id: i64,
        request: DepositRequest,
    ) -> Result<DepositResponse, AppError> {
        ensure_valid(&request)?;
        let mut deposit = self
            .deposits
            .get_deposit(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Deposit not found with id {}", id)))?;

        if let Some(user_id) = request.user_id {
            self.require_user(user_id).await?;
            deposit.user_id = user_id;
        }
        if request.account_holder.is_some() {
            deposit.account_holder = request.account_holder;
        }
        if request.name_of_bank.is_some() {
            deposit.name_of_bank = request.name_of_bank;
        }
        if let Some(coin) = request.coin_decimal {
            deposit.coin_decimal = coin;
        }
        if let Some(won) = request.won_decimal {
            deposit.won_decimal = won;
        }
        if let Some(status) = request.status {
            deposit.status = status;
        }

        let updated = self.deposits.update_deposit(&deposit).await?;
        info!(deposit_id = id, status = %updated.status, "Deposit updated");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_deposit(&self, id: i64) -> Result<(), AppError> {
        self.deposits.delete_deposit(id).await?;
        info!(deposit_id = id, "Deposit deleted");
        Ok(())
    }
}
