//! Runtime configuration read from environment variables (and `.env`).

use std::time::Duration;

use thiserror::Error;

use crate::db::PoolSettings;
use crate::domain::status::TransitionPolicy;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pool: PoolSettings,
    pub product_cache_ttl: Duration,
    pub product_cache_max_entries: Option<usize>,
    pub active_carts_interval: Duration,
    pub transition_policy: TransitionPolicy,
    pub service_name: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unset or blank keys
    /// take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let statement_timeout_ms: Option<u64> = parse_optional(&get, "DB_STATEMENT_TIMEOUT_MS")?;

        Ok(Self {
            database_url,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 8080)?,
            pool: PoolSettings {
                max_size: parse_or(&get, "DB_POOL_MAX_SIZE", 10)?,
                statement_timeout: statement_timeout_ms.map(Duration::from_millis),
            },
            product_cache_ttl: Duration::from_secs(parse_or(&get, "PRODUCT_CACHE_TTL_SECS", 300)?),
            product_cache_max_entries: parse_optional(&get, "PRODUCT_CACHE_MAX_ENTRIES")?,
            active_carts_interval: Duration::from_secs(
                parse_or(&get, "ACTIVE_CARTS_INTERVAL_SECS", 30u64)?.max(1),
            ),
            transition_policy: if parse_or(&get, "STRICT_STATUS_TRANSITIONS", false)? {
                TransitionPolicy::ForwardOnly
            } else {
                TransitionPolicy::Permissive
            },
            service_name: get("SERVICE_NAME").unwrap_or_else(|| "commerce-service".to_string()),
        })
    }
}

fn parse_optional<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(get, key)?.unwrap_or(default))
}
