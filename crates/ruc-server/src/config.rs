//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default location of the store built by `ruc-ingest`.
pub const DEFAULT_STORE_PATH: &str = "./data/ruc.sqlite";

/// Default maximum store connections in the pool.
pub const DEFAULT_STORE_MAX_CONNECTIONS: u32 = 5;

/// Default store connection timeout in seconds.
pub const DEFAULT_STORE_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Most rows a name search fetches, and the largest `limit` accepted.
pub const DEFAULT_SEARCH_LIMIT_MAX: i64 = 100;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub cors: CorsConfig,
    pub search: SearchConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Read-only store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchConfig {
    pub limit_max: i64,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("RUC_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_or("RUC_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or("RUC_SHUTDOWN_TIMEOUT", DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            store: StoreConfig {
                path: std::env::var("RUC_STORE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORE_PATH)),
                max_connections: env_or("RUC_STORE_MAX_CONNECTIONS", DEFAULT_STORE_MAX_CONNECTIONS),
                connect_timeout_secs: env_or(
                    "RUC_STORE_CONNECT_TIMEOUT",
                    DEFAULT_STORE_CONNECT_TIMEOUT_SECS,
                ),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            search: SearchConfig {
                limit_max: env_or("RUC_SEARCH_LIMIT_MAX", DEFAULT_SEARCH_LIMIT_MAX),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.store.path.as_os_str().is_empty() {
            anyhow::bail!("Store path cannot be empty");
        }

        if self.store.max_connections == 0 {
            anyhow::bail!("Store max_connections must be greater than 0");
        }

        if self.search.limit_max < 1 {
            anyhow::bail!(
                "Search limit_max must be at least 1, got {}",
                self.search.limit_max
            );
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            store: StoreConfig {
                path: PathBuf::from(DEFAULT_STORE_PATH),
                max_connections: DEFAULT_STORE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_STORE_CONNECT_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
            },
            search: SearchConfig {
                limit_max: DEFAULT_SEARCH_LIMIT_MAX,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.limit_max, 100);
        assert_eq!(config.store.path, PathBuf::from("./data/ruc.sqlite"));
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_search_limit_must_be_positive() {
        let mut config = Config::default();
        config.search.limit_max = 0;
        assert!(config.validate().is_err());
    }
}
