//! Configuration loading from TOML files

use anyhow::{Context, Result};

use super::types::{Config, ServerConfig, ServiceConfig};
use crate::types::ServerName;

/// Load and validate a configuration file
pub fn load_config(config_path: &str) -> Result<Config> {
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file '{}'", config_path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file '{}'", config_path))?;

    config
        .validate()
        .with_context(|| format!("Invalid configuration in '{}'", config_path))?;

    Ok(config)
}

/// A minimal one-master-two-slaves configuration for examples and tests
#[must_use]
pub fn create_default_config() -> Config {
    Config {
        service: ServiceConfig {
            name: "Read-Write-Service".to_string(),
            router: Default::default(),
        },
        servers: vec![
            ServerConfig {
                name: ServerName::new("server1".to_string()).unwrap(),
                address: "127.0.0.1".to_string(),
                port: 3306,
            },
            ServerConfig {
                name: ServerName::new("server2".to_string()).unwrap(),
                address: "127.0.0.1".to_string(),
                port: 3307,
            },
            ServerConfig {
                name: ServerName::new("server3".to_string()).unwrap(),
                address: "127.0.0.1".to_string(),
                port: 3308,
            },
        ],
        filters: Vec::new(),
    }
}
