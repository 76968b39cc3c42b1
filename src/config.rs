use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

/// Where documents are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    MySql,
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub store_backend: StoreBackend,
    /// Required for the MySQL backend only.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub weekly_empty_day_default: i64,
    pub store_write_retries: u32,
    pub meeting_api_base: String,
    pub log_dir: String,
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} must be set"))
}

fn or_default<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value `{raw}`")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Err(_) | Ok("mysql") => StoreBackend::MySql,
            Ok("memory") => StoreBackend::Memory,
            Ok(other) => bail!("STORE_BACKEND must be `mysql` or `memory`, got `{other}`"),
        };

        let database_url = match store_backend {
            StoreBackend::MySql => Some(required("DATABASE_URL")?),
            StoreBackend::Memory => env::var("DATABASE_URL").ok(),
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            store_backend,
            database_url,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: or_default("ACCESS_TOKEN_TTL", 3600)?, // 1 hour

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", 60)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
            weekly_empty_day_default: or_default("WEEKLY_EMPTY_DAY_DEFAULT", 5)?,
            store_write_retries: or_default("STORE_WRITE_RETRIES", 3)?,
            meeting_api_base: env::var("MEETING_API_BASE")
                .unwrap_or_else(|_| "https://api.zoom.us/v2".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }
}

#[cfg(test)]
impl Config {
    /// In-memory settings for handler tests.
    pub fn for_tests() -> Self {
        Self {
            server_addr: "127.0.0.1:0".into(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            jwt_secret: "test-secret".into(),
            access_token_ttl: 3600,
            rate_login_per_min: 1000,
            rate_protected_per_min: 10_000,
            api_prefix: "/api/v1".into(),
            weekly_empty_day_default: 5,
            store_write_retries: 3,
            meeting_api_base: "http://127.0.0.1:9".into(),
            log_dir: "logs".into(),
        }
    }
}
