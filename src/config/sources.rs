use super::models::Config;
use config::{ConfigError, Environment, File, FileFormat};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "DOWNHAUL_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/downhaul.yaml";
const ENV_PREFIX: &str = "DOWNHAUL";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. YAML file (if it exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(
            File::from(config_path)
                .format(FileFormat::Yaml)
                .required(false),
        );
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // Environment variable overrides
    // DOWNHAUL__DATABASE__HOST -> database.host
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.http.address.to_string(), "0.0.0.0:8080");
        assert_eq!(config.mq.client_id, "downhaul");
    }

    #[test]
    fn test_load_from_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.yaml");

        let yaml_content = r#"
http:
  address: "127.0.0.1:9000"

database:
  host: "db.internal"
  port: 5433
  username: "svc"
  password: "secret"
  database: "tasks"

auth:
  hash:
    cost: 8
  token:
    expires_in: "12h"

mq:
  addresses:
    - "broker-a:8090"
    - "broker-b:8090"
  client_id: "downhaul-test"

download:
  mode: "local"
  download_directory: "/tmp/downloads"
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.http.address.to_string(), "127.0.0.1:9000");
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 5433);
        assert_eq!(config.auth.hash.cost, 8);
        assert_eq!(config.auth.token.expires_in.as_secs(), 12 * 3600);
        assert_eq!(config.mq.addresses.len(), 2);
        assert_eq!(config.mq.client_id, "downhaul-test");
        assert_eq!(
            config.download.download_directory.to_str().unwrap(),
            "/tmp/downloads"
        );
    }

    #[test]
    fn test_unknown_download_mode_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.yaml");

        let yaml_content = r#"
download:
  mode: "ftp"
"#;

        fs::write(&config_path, yaml_content).unwrap();
        assert!(load_from_sources(config_path).is_err());
    }

    #[test]
    fn test_cache_type_values() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.yaml");

        let yaml_content = r#"
cache:
  type: "redis"
  address: "127.0.0.1:6379"
"#;

        fs::write(&config_path, yaml_content).unwrap();
        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.cache.cache_type, crate::config::CacheType::Redis);
        assert_eq!(config.cache.address.as_deref(), Some("127.0.0.1:6379"));
    }
}
