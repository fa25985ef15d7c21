use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Authorities a user can hold; stored and transmitted as `ROLE_*` names
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
pub enum Role {
    #[serde(rename = "ROLE_TRANSLATOR")]
    #[strum(serialize = "ROLE_TRANSLATOR")]
    Translator,
    #[serde(rename = "ROLE_USER")]
    #[strum(serialize = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    #[strum(serialize = "ROLE_ADMIN")]
    Admin,
}

/// Database model for users joined with their role names
#[derive(Debug, Clone, PartialEq)]
pub struct UserModel {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub balance: Decimal,
    pub is_active: bool,
    pub on_boarding_status: i16,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserModel {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Insertable user row; the repository assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub balance: Decimal,
    pub is_active: bool,
    pub on_boarding_status: i16,
    pub roles: Vec<Role>,
}

/// Sorts and de-duplicates a role list so stored sets compare equal
pub fn normalize_roles(mut roles: Vec<Role>) -> Vec<Role> {
    roles.sort();
    roles.dedup();
    roles
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_role_names_round_trip_through_strings() {
        for role in Role::iter() {
            assert_eq!(Role::from_str(role.as_ref()).unwrap(), role);
            assert!(role.to_string().starts_with("ROLE_"));
        }
    }

    #[test]
    fn test_role_serde_uses_authority_names() {
        let json = serde_json::to_string(&vec![Role::Admin, Role::Translator]).unwrap();
        assert_eq!(json, r#"["ROLE_ADMIN","ROLE_TRANSLATOR"]"#);
    }

    #[test]
    fn test_unknown_role_name_is_rejected() {
        assert!(Role::from_str("ROLE_SUPERUSER").is_err());
        assert!(Role::from_str("ADMIN").is_err());
    }

    #[test]
    fn test_normalize_roles() {
        let roles = normalize_roles(vec![Role::Admin, Role::User, Role::Admin]);
        assert_eq!(roles, vec![Role::User, Role::Admin]);
    }
}
