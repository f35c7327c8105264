//! Connection pool settings.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Development database used when `DATABASE_URL` is unset
pub const DEVELOPMENT_DATABASE_URL: &str = "postgres://postgres@localhost/event_brackets";

/// Pool sizing and connection lifetimes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a request may wait for a free connection
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    /// Connections are recycled after this age
    pub max_lifetime: Duration,
}

impl DatabaseConfig {
    /// Read settings from the environment
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `DATABASE_URL` | [`DEVELOPMENT_DATABASE_URL`] |
    /// | `DB_MAX_CONNECTIONS` | 20 |
    /// | `DB_MIN_CONNECTIONS` | 2 |
    /// | `DB_ACQUIRE_TIMEOUT_SECS` | 10 |
    /// | `DB_IDLE_TIMEOUT_SECS` | 600 |
    /// | `DB_MAX_LIFETIME_SECS` | 1800 |
    ///
    /// Values that fail to parse keep their default.
    pub fn from_env() -> Self {
        let base = Self::development();
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(base.database_url),
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", base.max_connections),
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", base.min_connections),
            acquire_timeout: secs_env_or("DB_ACQUIRE_TIMEOUT_SECS", base.acquire_timeout),
            idle_timeout: secs_env_or("DB_IDLE_TIMEOUT_SECS", base.idle_timeout),
            max_lifetime: secs_env_or("DB_MAX_LIFETIME_SECS", base.max_lifetime),
        }
    }

    /// Local database with a small pool
    pub fn development() -> Self {
        Self {
            database_url: DEVELOPMENT_DATABASE_URL.to_string(),
            max_connections: 20,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

/// Parse an environment variable, falling back to `default`
pub fn parse_env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Whole seconds from an environment variable
pub fn secs_env_or(key: &str, default: Duration) -> Duration {
    Duration::from_secs(parse_env_or(key, default.as_secs()))
}
