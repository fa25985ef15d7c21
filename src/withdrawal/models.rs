use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::transfer::TransferStatus;
use crate::validation::{FieldError, Validate, Violations};

const MAX_TEXT_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalModel {
    pub id: i64,
    pub user_id: i64,
    pub account_number: String,
    pub account_holder: String,
    pub name_of_bank: String,
    pub sum_decimal: Decimal,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWithdrawal {
    pub user_id: i64,
    pub account_number: String,
    pub account_holder: String,
    pub name_of_bank: String,
    pub sum_decimal: Decimal,
    pub status: TransferStatus,
}

/// Body of `POST /api/withdrawals` and `PUT /api/withdrawals/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub user_id: Option<i64>,
    pub account_number: Option<String>,
    pub account_holder: Option<String>,
    pub name_of_bank: Option<String>,
    pub sum_decimal: Option<Decimal>,
    pub status: Option<TransferStatus>,
}

impl Validate for WithdrawalRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut v = Violations::new();
        v.max_len("accountNumber", self.account_number.as_deref(), MAX_TEXT_LEN);
        v.max_len("accountHolder", self.account_holder.as_deref(), MAX_TEXT_LEN);
        v.max_len("nameOfBank", self.name_of_bank.as_deref(), MAX_TEXT_LEN);
        v.non_negative("sumDecimal", self.sum_decimal);
        v.into_errors()
    }
}

/// A new withdrawal must name the account it pays out to
pub struct CreateWithdrawal<'a>(pub &'a WithdrawalRequest);

impl Validate for CreateWithdrawal<'_> {
    fn validate(&self) -> Vec<FieldError> {
        let request = self.0;
        let mut v = Violations::new();
        v.not_blank("accountNumber", request.account_number.as_deref());
        v.not_blank("accountHolder", request.account_holder.as_deref());
        v.not_blank("nameOfBank", request.name_of_bank.as_deref());
        v.required("sumDecimal", request.sum_decimal.as_ref());
        let mut errors = v.into_errors();
        errors.extend(request.validate());
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalResponse {
    pub id: i64,
    pub user_id: i64,
    pub account_number: String,
    pub account_holder: String,
    pub name_of_bank: String,
    pub sum_decimal: Decimal,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WithdrawalModel> for WithdrawalResponse {
    fn from(w: WithdrawalModel) -> Self {
        Self {
            id: w.id,
            user_id: w.user_id,
            account_number: w.account_number,
            account_holder: w.account_holder,
            name_of_bank: w.name_of_bank,
            sum_decimal: w.sum_decimal,
            status: w.status,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_account_details() {
        let request = WithdrawalRequest {
            account_number: Some("  ".to_string()),
            ..Default::default()
        };
        let fields: Vec<String> = CreateWithdrawal(&request)
            .validate()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec!["accountNumber", "accountHolder", "nameOfBank", "sumDecimal"]
        );
    }

    #[test]
    fn test_partial_update_only_checks_present_fields() {
        let request = WithdrawalRequest {
            sum_decimal: Some(Decimal::new(-5, 0)),
            ..Default::default()
        };
        let errors = request.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "sumDecimal");
    }
}
