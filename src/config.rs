use std::env;

use chrono::Duration;
use thiserror::Error;
use tracing::warn;

const DEFAULT_SECRET: &str = "secret";
const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("BCRYPT_COST must be between 4 and 31, got {0}")]
    BcryptCostOutOfRange(i64),
}

#[derive(Clone)]
pub struct Config {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub admin_username: String,
    pub admin_password: String,
    pub bcrypt_cost: u32,
}

impl Config {
    /// Reads the process environment. Call `dotenv::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("PORT").unwrap_or_else(|| "8000".to_string());

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET is not set, falling back to an insecure default");
            DEFAULT_SECRET.to_string()
        });

        let ttl_minutes = parse_positive(&lookup, "ACCESS_TOKEN_EXPIRE_MINUTES", 30)?;

        let bcrypt_cost = parse_positive(&lookup, "BCRYPT_COST", i64::from(bcrypt::DEFAULT_COST))?;
        let bcrypt_cost = u32::try_from(bcrypt_cost)
            .ok()
            .filter(|cost| (MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(cost))
            .ok_or(ConfigError::BcryptCostOutOfRange(bcrypt_cost))?;

        Ok(Config {
            bind_addr: format!("{host}:{port}"),
            jwt_secret,
            access_token_ttl: Duration::minutes(ttl_minutes),
            admin_username: lookup("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            admin_password: lookup("ADMIN_PASSWORD").unwrap_or_else(|| DEFAULT_SECRET.to_string()),
            bcrypt_cost,
        })
    }
}

fn parse_positive<F>(lookup: &F, name: &'static str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<i64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidNumber { name, value }),
        },
    }
}
