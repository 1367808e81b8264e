use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::converter::ConverterConfig;
use crate::placer::PlacerConfig;
use crate::queue::RetryBudgets;
use crate::torrent_client::{DirectProviderSession, PathMapping};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    pub jackett: JackettConfig,
    pub qbittorrent: QBittorrentConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub placer: PlacerConfig,
}

/// SQLite database location for the queue store and audit trail.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("bookwright.db")
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    // Future: Oidc, Address, Cert, Plugin
}

/// Jackett indexer-proxy connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JackettConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_jackett_timeout")]
    pub timeout_secs: u64,
}

fn default_jackett_timeout() -> u64 {
    30
}

/// qBittorrent Web API connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QBittorrentConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_qbittorrent_timeout")]
    pub timeout_secs: u64,
}

fn default_qbittorrent_timeout() -> u64 {
    30
}

/// Orchestrator monitor-loop and pipeline settings, per the queue-domain task model.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorSettings {
    #[serde(default = "default_polling_interval")]
    pub polling_interval_seconds: u64,
    #[serde(default = "default_max_active_searches")]
    pub max_active_searches: usize,
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,
    #[serde(default = "default_catalog_concurrency")]
    pub catalog_concurrency: usize,
    #[serde(default)]
    pub retry_budgets: RetryBudgets,
    #[serde(default)]
    pub seeding_enabled: bool,
    #[serde(default)]
    pub seed_ratio_limit: Option<f64>,
    #[serde(default)]
    pub seed_time_limit_seconds: Option<i64>,
    #[serde(default = "default_true")]
    pub delete_source_after_import: bool,
    #[serde(default)]
    pub keep_torrent_active: bool,
    #[serde(default)]
    pub wait_for_seeding_completion: bool,
    #[serde(default = "default_temp_download_path")]
    pub temp_download_path: PathBuf,
    #[serde(default = "default_temp_conversion_path")]
    pub temp_conversion_path: PathBuf,
    #[serde(default)]
    pub torrent_client_path_mappings: Vec<PathMapping>,
    #[serde(default)]
    pub external_base_url_override: Option<String>,
    #[serde(default)]
    pub direct_provider_sessions: HashMap<String, DirectProviderSession>,
    #[serde(default = "default_min_search_confidence")]
    pub min_search_confidence: u8,
    #[serde(default = "default_naming_template")]
    pub naming_template: String,
    /// Base directory the naming template is resolved relative to.
    #[serde(default = "default_library_root")]
    pub library_root: PathBuf,
}

fn default_polling_interval() -> u64 {
    2
}

fn default_max_active_searches() -> usize {
    2
}

fn default_max_concurrent_downloads() -> usize {
    2
}

fn default_catalog_concurrency() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_temp_download_path() -> PathBuf {
    std::env::temp_dir().join("bookwright-downloads")
}

fn default_temp_conversion_path() -> PathBuf {
    std::env::temp_dir().join("bookwright-conversions")
}

fn default_min_search_confidence() -> u8 {
    85
}

fn default_naming_template() -> String {
    "{title} ({year})".to_string()
}

fn default_library_root() -> PathBuf {
    PathBuf::from("./library")
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            polling_interval_seconds: default_polling_interval(),
            max_active_searches: default_max_active_searches(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            catalog_concurrency: default_catalog_concurrency(),
            retry_budgets: RetryBudgets::default(),
            seeding_enabled: false,
            seed_ratio_limit: None,
            seed_time_limit_seconds: None,
            delete_source_after_import: true,
            keep_torrent_active: false,
            wait_for_seeding_completion: false,
            temp_download_path: default_temp_download_path(),
            temp_conversion_path: default_temp_conversion_path(),
            torrent_client_path_mappings: Vec::new(),
            external_base_url_override: None,
            direct_provider_sessions: HashMap::new(),
            min_search_confidence: default_min_search_confidence(),
            naming_template: default_naming_template(),
            library_root: default_library_root(),
        }
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub orchestrator: OrchestratorSettings,
    pub jackett: SanitizedJackettConfig,
    pub qbittorrent: SanitizedQBittorrentConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedJackettConfig {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedQBittorrentConfig {
    pub url: String,
    pub username: String,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                },
            },
            server: config.server.clone(),
            database: config.database.clone(),
            orchestrator: config.orchestrator.clone(),
            jackett: SanitizedJackettConfig {
                url: config.jackett.url.clone(),
                timeout_secs: config.jackett.timeout_secs,
            },
            qbittorrent: SanitizedQBittorrentConfig {
                url: config.qbittorrent.url.clone(),
                username: config.qbittorrent.username.clone(),
                timeout_secs: config.qbittorrent.timeout_secs,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            auth: AuthConfig {
                method: AuthMethod::None,
            },
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            orchestrator: OrchestratorSettings::default(),
            jackett: JackettConfig {
                url: "http://localhost:9117".to_string(),
                api_key: "secret".to_string(),
                timeout_secs: 30,
            },
            qbittorrent: QBittorrentConfig {
                url: "http://localhost:8081".to_string(),
                username: "admin".to_string(),
                password: "secret".to_string(),
                timeout_secs: 30,
            },
            converter: ConverterConfig::default(),
            placer: PlacerConfig::default(),
        }
    }

    #[test]
    fn test_deserialize_valid_config_with_none_auth() {
        let toml = r#"
[auth]
method = "none"

[server]
host = "127.0.0.1"
port = 9000

[jackett]
url = "http://localhost:9117"
api_key = "secret"

[qbittorrent]
url = "http://localhost:8081"
username = "admin"
password = "secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(matches!(config.auth.method, AuthMethod::None));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.jackett.timeout_secs, 30);
    }

    #[test]
    fn test_deserialize_with_default_server_and_orchestrator() {
        let toml = r#"
[auth]
method = "none"

[jackett]
url = "http://localhost:9117"
api_key = "secret"

[qbittorrent]
url = "http://localhost:8081"
username = "admin"
password = "secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.orchestrator.polling_interval_seconds, 2);
        assert_eq!(config.orchestrator.max_concurrent_downloads, 2);
        assert!(config.orchestrator.delete_source_after_import);
    }

    #[test]
    fn test_deserialize_missing_auth_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_sanitized_config_redacts_secrets() {
        let config = sample_config();
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.auth.method, "none");
        assert_eq!(sanitized.server.port, 8080);
        assert_eq!(sanitized.jackett.url, "http://localhost:9117");
        assert_eq!(sanitized.qbittorrent.username, "admin");
    }
}
