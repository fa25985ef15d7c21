use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::transfer::TransferStatus;
use crate::validation::{FieldError, Validate, Violations};

const MAX_TEXT_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct DepositModel {
    pub id: i64,
    pub user_id: i64,
    pub account_holder: Option<String>,
    pub name_of_bank: Option<String>,
    pub coin_decimal: Decimal,
    pub won_decimal: Decimal,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDeposit {
    pub user_id: i64,
    pub account_holder: Option<String>,
    pub name_of_bank: Option<String>,
    pub coin_decimal: Decimal,
    pub won_decimal: Decimal,
    pub status: TransferStatus,
}

/// Body of `POST /api/deposits` and `PUT /api/deposits/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub user_id: Option<i64>,
    pub account_holder: Option<String>,
    pub name_of_bank: Option<String>,
    pub coin_decimal: Option<Decimal>,
    pub won_decimal: Option<Decimal>,
    pub status: Option<TransferStatus>,
}

impl Validate for DepositRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut v = Violations::new();
        v.max_len("accountHolder", self.account_holder.as_deref(), MAX_TEXT_LEN);
        v.max_len("nameOfBank", self.name_of_bank.as_deref(), MAX_TEXT_LEN);
        v.non_negative("coinDecimal", self.coin_decimal);
        v.non_negative("wonDecimal", self.won_decimal);
        v.into_errors()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepositResponse {
    pub id: i64,
    pub user_id: i64,
    pub account_holder: Option<String>,
    pub name_of_bank: Option<String>,
    pub coin_decimal: Decimal,
    pub won_decimal: Decimal,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DepositModel> for DepositResponse {
    fn from(d: DepositModel) -> Self {
        Self {
            id: d.id,
            user_id: d.user_id,
            account_holder: d.account_holder,
            name_of_bank: d.name_of_bank,
            coin_decimal: d.coin_decimal,
            won_decimal: d.won_decimal,
            status: d.status,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_negative_amounts_are_rejected() {
        let request = DepositRequest {
            coin_decimal: Some(Decimal::from_str("-1.00").unwrap()),
            won_decimal: Some(Decimal::from_str("1000.00").unwrap()),
            ..Default::default()
        };
        let errors = request.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "coinDecimal");
    }

    #[test]
    fn test_amounts_parse_from_json_numbers_and_strings() {
        let request: DepositRequest =
            serde_json::from_str(r#"{"coinDecimal":"10.50","wonDecimal":15000,"status":"APPROVED"}"#)
                .unwrap();
        assert_eq!(request.coin_decimal, Some(Decimal::from_str("10.50").unwrap()));
        assert_eq!(request.won_decimal, Some(Decimal::from(15000)));
        assert_eq!(request.status, Some(TransferStatus::Approved));
    }
}
