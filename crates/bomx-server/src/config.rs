//! Configuration management

use serde::{Deserialize, Serialize};

use crate::storage::config::StorageConfig;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default relational-source connect timeout in seconds.
pub const DEFAULT_SOURCE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default relational-source statement timeout in seconds.
///
/// This is the per-query bound for one invocation; an artifact type whose
/// query exceeds it fails through the normal query-error path.
pub const DEFAULT_SOURCE_QUERY_TIMEOUT_SECS: u64 = 120;

/// Default number of connection attempts against the relational source.
pub const DEFAULT_SOURCE_MAX_ATTEMPTS: u32 = 3;

/// Default linear backoff step between connection attempts, in seconds
/// (attempt 1 waits one step, attempt 2 two steps, and so on).
pub const DEFAULT_SOURCE_RETRY_STEP_SECS: u64 = 2;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub source: SourceDbConfig,
    pub storage: StorageConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Relational-source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDbConfig {
    pub url: String,
    pub connect_timeout_secs: u64,
    pub query_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_step_secs: u64,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("BOMX_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: std::env::var("BOMX_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
            },
            source: SourceDbConfig {
                url: std::env::var("SOURCE_DATABASE_URL").unwrap_or_default(),
                connect_timeout_secs: std::env::var("SOURCE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SOURCE_CONNECT_TIMEOUT_SECS),
                query_timeout_secs: std::env::var("SOURCE_QUERY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SOURCE_QUERY_TIMEOUT_SECS),
                max_attempts: std::env::var("SOURCE_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SOURCE_MAX_ATTEMPTS),
                retry_step_secs: std::env::var("SOURCE_RETRY_STEP")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SOURCE_RETRY_STEP_SECS),
            },
            storage: StorageConfig::from_env()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.source.url.is_empty() {
            anyhow::bail!("SOURCE_DATABASE_URL must be set");
        }

        if self.source.max_attempts == 0 {
            anyhow::bail!("Source max_attempts must be greater than 0");
        }

        if self.storage.bucket.is_empty() {
            anyhow::bail!("Storage bucket cannot be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
            },
            source: SourceDbConfig {
                url: "postgresql://localhost/planning".to_string(),
                connect_timeout_secs: DEFAULT_SOURCE_CONNECT_TIMEOUT_SECS,
                query_timeout_secs: DEFAULT_SOURCE_QUERY_TIMEOUT_SECS,
                max_attempts: DEFAULT_SOURCE_MAX_ATTEMPTS,
                retry_step_secs: DEFAULT_SOURCE_RETRY_STEP_SECS,
            },
            storage: StorageConfig::for_minio("http://localhost:9000", "bomx-artifacts"),
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_source_url() {
        let mut config = test_config();
        config.source.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = test_config();
        config.source.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
