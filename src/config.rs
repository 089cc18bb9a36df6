//! Centralized gateway configuration.
//!
//! Single source of truth for runtime settings, loaded from environment
//! variables with validated defaults. The server binary layers clap flags
//! on top of these.

use std::path::PathBuf;

use crate::s3::DEFAULT_S3_PORT;

/// Network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Address the S3 listener binds to.
    pub s3_addr: String,
}

impl NetworkConfig {
    /// Load from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let s3_addr = std::env::var("MADRONE_S3_ADDR")
            .unwrap_or_else(|_| format!("127.0.0.1:{}", DEFAULT_S3_PORT));
        if s3_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidValue {
                key: "MADRONE_S3_ADDR".to_string(),
                value: s3_addr,
                reason: "must be a socket address like 127.0.0.1:9000".to_string(),
            });
        }
        Ok(Self { s3_addr })
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            s3_addr: format!("127.0.0.1:{}", DEFAULT_S3_PORT),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Path of the embedded index database.
    pub index_path: PathBuf,
}

impl StorageConfig {
    /// Load from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let index_path = std::env::var("MADRONE_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index.redb".to_string())
            .into();
        Ok(Self { index_path })
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_path: "./data/index.redb".into(),
        }
    }
}

/// Remote DAG node configuration.
#[derive(Debug, Clone, Default)]
pub struct DagConfig {
    /// Public key of the remote DAG node; `None` runs with the in-memory
    /// block store.
    pub node_key: Option<String>,
}

impl DagConfig {
    /// Load from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            node_key: std::env::var("MADRONE_DAG_NODE").ok(),
        })
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// DAG node settings.
    pub dag: DagConfig,
}

impl GatewayConfig {
    /// Load and validate the complete configuration.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            network: NetworkConfig::load()?,
            storage: StorageConfig::load()?,
            dag: DagConfig::load()?,
        })
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// A configuration value failed validation.
    InvalidValue {
        /// Environment variable name.
        key: String,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { key, value, reason } => {
                write!(f, "invalid configuration for {}: '{}' ({})", key, value, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = GatewayConfig::default();
        assert_eq!(config.network.s3_addr, "127.0.0.1:9000");
        assert_eq!(config.storage.index_path, PathBuf::from("./data/index.redb"));
        assert!(config.dag.node_key.is_none());
    }
}
