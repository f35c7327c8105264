//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use event_bracket::{BracketConfig, DatabaseConfig};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Bind address used when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 8080);

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Bracket engine configuration
    pub bracket: BracketConfig,
    /// Prometheus exporter address; metrics are off when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Bind address from the command line
    /// * `database_url_override` - Database URL from the command line
    ///
    /// # Errors
    ///
    /// Returns error if `SERVER_BIND` or `METRICS_BIND` is set but not a socket address
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(addr) => addr,
            None => parse_addr_env("SERVER_BIND")?.unwrap_or(DEFAULT_BIND),
        };

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        Ok(ServerConfig {
            bind,
            database,
            bracket: BracketConfig::from_env(),
            metrics_bind: parse_addr_env("METRICS_BIND")?,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.database_url.is_empty() {
            return Err(ConfigError::Invalid {
                var: "DATABASE_URL".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.bracket.query_timeout == Duration::ZERO {
            return Err(ConfigError::Invalid {
                var: "BRACKET_QUERY_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn parse_addr_env(var: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value.parse().map(Some).map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            reason: format!("'{value}' is not an IP:PORT address"),
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn valid_config() -> ServerConfig {
        ServerConfig {
            bind: DEFAULT_BIND,
            database: DatabaseConfig::development(),
            bracket: BracketConfig::default(),
            metrics_bind: None,
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "SERVER_BIND".to_string(),
            reason: "bad".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("SERVER_BIND"));
        assert!(msg.contains("bad"));
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_min_connections_above_max() {
        let mut config = valid_config();
        config.database.min_connections = config.database.max_connections + 1;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "DB_MIN_CONNECTIONS"));
    }

    #[test]
    fn test_zero_query_timeout() {
        let mut config = valid_config();
        config.bracket.query_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_metrics_bind_collides_with_server() {
        let mut config = valid_config();
        config.metrics_bind = Some(config.bind);
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_overrides_take_precedence() {
        // SAFETY: serialized with the other env-mutating tests
        unsafe { std::env::set_var("SERVER_BIND", "0.0.0.0:9000") };

        let bind: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let config =
            ServerConfig::from_env(Some(bind), Some("postgres://override/db".to_string()))
                .unwrap();

        unsafe { std::env::remove_var("SERVER_BIND") };

        assert_eq!(config.bind, bind);
        assert_eq!(config.database.database_url, "postgres://override/db");
    }

    #[test]
    #[serial]
    fn test_invalid_server_bind_env() {
        unsafe { std::env::set_var("SERVER_BIND", "not-an-address") };
        let result = ServerConfig::from_env(None, None);
        unsafe { std::env::remove_var("SERVER_BIND") };

        assert!(matches!(result, Err(ConfigError::Invalid { ref var, .. }) if var == "SERVER_BIND"));
    }
}
