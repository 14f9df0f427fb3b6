//! Configuration management
//!
//! Settings are layered from defaults embedded in the structs, a YAML
//! configuration file, and `DOWNHAUL__<section>__<key>` environment
//! variables (highest priority). The default file location is
//! `config/downhaul.yaml`, overridable via `DOWNHAUL_CONFIG`.

mod models;
mod sources;

pub use models::{
    AuthConfig, CacheConfig, CacheType, Config, DatabaseConfig, DownloadConfig, DownloadMode,
    HashConfig, HttpConfig, MqConfig, TokenConfig,
};

use thiserror::Error;

// bcrypt's supported work-factor range
const MIN_HASH_COST: u32 = 4;
const MAX_HASH_COST: u32 = 31;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&config.auth.hash.cost) {
        return Err(ConfigError::ValidationError(format!(
            "auth.hash.cost must be between {} and {}, got {}",
            MIN_HASH_COST, MAX_HASH_COST, config.auth.hash.cost
        )));
    }
    if config.auth.token.expires_in.as_std().is_zero() {
        return Err(ConfigError::ValidationError(
            "auth.token.expires_in must be greater than zero".to_string(),
        ));
    }
    if config.mq.addresses.is_empty() {
        return Err(ConfigError::ValidationError(
            "mq.addresses must not be empty".to_string(),
        ));
    }
    if config.mq.client_id.is_empty() {
        return Err(ConfigError::ValidationError(
            "mq.client_id must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.yaml");

        let yaml_content = r#"
http:
  address: "127.0.0.1:8081"
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.http.address.to_string(), "127.0.0.1:8081");
        assert_eq!(config.database.database, "downhaul");
    }

    #[test]
    fn test_validation_catches_bad_hash_cost() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.yaml");

        let yaml_content = r#"
auth:
  hash:
    cost: 99
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validation_catches_empty_broker_list() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.yaml");

        let yaml_content = r#"
mq:
  addresses: []
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validation_catches_zero_token_ttl() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.yaml");

        let yaml_content = r#"
auth:
  token:
    expires_in: "0s"
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
