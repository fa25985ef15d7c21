use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::models::{Role, UserModel};
use crate::validation::{FieldError, Validate, Violations};

const MAX_USERNAME_LEN: usize = 20;
const MAX_NAME_LEN: usize = 200;

/// Body of `POST /api/users`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub balance: Option<Decimal>,
    pub is_active: Option<bool>,
    pub on_boarding_status: Option<i16>,
    pub roles: Option<Vec<String>>,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut v = Violations::new();
        v.not_blank("username", self.username.as_deref());
        v.max_len("username", self.username.as_deref(), MAX_USERNAME_LEN);
        v.phone("username", self.username.as_deref());
        v.not_blank("password", self.password.as_deref());
        v.max_len("firstName", self.first_name.as_deref(), MAX_NAME_LEN);
        v.max_len("lastName", self.last_name.as_deref(), MAX_NAME_LEN);
        v.range(
            "onBoardingStatus",
            self.on_boarding_status.map(i64::from),
            0,
            i64::from(i8::MAX),
        );
        v.into_errors()
    }
}

/// Body of `PUT /api/users/{id}`; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub balance: Option<Decimal>,
    pub is_active: Option<bool>,
    pub on_boarding_status: Option<i16>,
    pub roles: Option<Vec<String>>,
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut v = Violations::new();
        if self.username.is_some() {
            v.not_blank("username", self.username.as_deref());
            v.max_len("username", self.username.as_deref(), MAX_USERNAME_LEN);
            v.phone("username", self.username.as_deref());
        }
        v.max_len("firstName", self.first_name.as_deref(), MAX_NAME_LEN);
        v.max_len("lastName", self.last_name.as_deref(), MAX_NAME_LEN);
        v.range(
            "onBoardingStatus",
            self.on_boarding_status.map(i64::from),
            0,
            i64::from(i8::MAX),
        );
        v.into_errors()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub balance: Decimal,
    pub is_active: bool,
    pub on_boarding_status: i16,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserModel> for UserResponse {
    fn from(user: UserModel) -> Self {
        Self {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            balance: user.balance,
            is_active: user.is_active,
            on_boarding_status: user.on_boarding_status,
            roles: user.roles,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
