use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub mq: MqConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_address")]
    pub address: SocketAddr,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: default_http_address(),
        }
    }
}

fn default_http_address() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

/// Relational store connection parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_host")]
    pub host: String,
    #[serde(default = "default_database_port")]
    pub port: u16,
    #[serde(default = "default_database_user")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_database_name")]
    pub database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_database_host(),
            port: default_database_port(),
            username: default_database_user(),
            password: String::new(),
            database: default_database_name(),
        }
    }
}

fn default_database_host() -> String {
    "127.0.0.1".to_string()
}

fn default_database_port() -> u16 {
    5432
}

fn default_database_user() -> String {
    "downhaul".to_string()
}

fn default_database_name() -> String {
    "downhaul".to_string()
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub hash: HashConfig,
    #[serde(default)]
    pub token: TokenConfig,
}

/// Credential-hash work factor
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HashConfig {
    #[serde(default = "default_hash_cost")]
    pub cost: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            cost: default_hash_cost(),
        }
    }
}

fn default_hash_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

/// Session token configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    #[serde(default = "default_token_expires_in")]
    pub expires_in: HumanDuration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            expires_in: default_token_expires_in(),
        }
    }
}

fn default_token_expires_in() -> HumanDuration {
    HumanDuration::from_secs(24 * 3600)
}

/// Cache backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheType {
    Redis,
    InMemory,
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(rename = "type", default = "default_cache_type")]
    pub cache_type: CacheType,
    pub address: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: default_cache_type(),
            address: None,
            username: None,
            password: None,
        }
    }
}

fn default_cache_type() -> CacheType {
    CacheType::InMemory
}

/// Message broker bootstrap
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MqConfig {
    #[serde(default = "default_mq_addresses")]
    pub addresses: Vec<String>,
    #[serde(default = "default_mq_client_id")]
    pub client_id: String,
}

impl Default for MqConfig {
    fn default() -> Self {
        Self {
            addresses: default_mq_addresses(),
            client_id: default_mq_client_id(),
        }
    }
}

fn default_mq_addresses() -> Vec<String> {
    vec!["127.0.0.1:8090".to_string()]
}

fn default_mq_client_id() -> String {
    "downhaul".to_string()
}

/// Download payload destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMode {
    Local,
}

/// Download sink configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    #[serde(default = "default_download_mode")]
    pub mode: DownloadMode,
    #[serde(default = "default_download_directory")]
    pub download_directory: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            mode: default_download_mode(),
            download_directory: default_download_directory(),
        }
    }
}

fn default_download_mode() -> DownloadMode {
    DownloadMode::Local
}

fn default_download_directory() -> PathBuf {
    PathBuf::from("data/downloads")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config {
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            cache: CacheConfig::default(),
            mq: MqConfig::default(),
            download: DownloadConfig::default(),
        };

        assert_eq!(config.http.address.to_string(), "0.0.0.0:8080");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.auth.token.expires_in.as_secs(), 24 * 3600);
        assert_eq!(config.cache.cache_type, CacheType::InMemory);
        assert_eq!(config.download.mode, DownloadMode::Local);
    }
}
