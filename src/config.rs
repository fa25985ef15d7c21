use std::fmt;
use std::str::FromStr;

use strum_macros::{Display, EnumString};
use thiserror::Error;

const DEV_ACCESS_SECRET: &str = "dev-access-secret-change-me";
const DEV_REFRESH_SECRET: &str = "dev-refresh-secret-change-me";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Deployment environment, selected with APP_ENV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Environment {
    Dev,
    Test,
    Prod,
}

/// Signing secrets and lifetimes for the two token kinds
#[derive(Clone)]
pub struct JwtSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_expiration_secs: i64,
    pub refresh_expiration_secs: i64,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("access_secret", &"***")
            .field("refresh_secret", &"***")
            .field("access_expiration_secs", &self.access_expiration_secs)
            .field("refresh_expiration_secs", &self.refresh_expiration_secs)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub jwt: JwtSettings,
    pub seed_test_user: bool,
    pub cors_allowed_origins: Vec<String>,
    /// 0 disables the purge task
    pub refresh_token_purge_interval_secs: u64,
}

impl AppConfig {
    /// Reads configuration from the process environment (after .env is loaded)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let environment = match get("APP_ENV") {
            Some(value) => Environment::from_str(&value).map_err(|_| ConfigError::Invalid {
                key: "APP_ENV",
                value,
            })?,
            None => Environment::Dev,
        };
        let is_prod = environment == Environment::Prod;

        let secret = |key: &'static str, dev_default: &str| match get(key) {
            Some(value) => Ok(value),
            None if is_prod => Err(ConfigError::Missing(key)),
            None => Ok(dev_default.to_string()),
        };

        let jwt = JwtSettings {
            access_secret: secret("JWT_ACCESS_SECRET", DEV_ACCESS_SECRET)?,
            refresh_secret: secret("JWT_REFRESH_SECRET", DEV_REFRESH_SECRET)?,
            access_expiration_secs: parse_or(&get, "JWT_ACCESS_EXPIRATION_SECS", 15 * 60)?,
            refresh_expiration_secs: parse_or(
                &get,
                "JWT_REFRESH_EXPIRATION_SECS",
                7 * 24 * 60 * 60,
            )?,
        };

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            environment,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            database_url: get("DATABASE_URL"),
            jwt,
            seed_test_user: parse_or(&get, "SEED_TEST_USER", !is_prod)?,
            cors_allowed_origins,
            refresh_token_purge_interval_secs: parse_or(
                &get,
                "REFRESH_TOKEN_PURGE_INTERVAL_SECS",
                60 * 60,
            )?,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
