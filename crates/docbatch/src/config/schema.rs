use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    /// SQLite file. Falls back to `~/.docbatch/data/docbatch.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            database_path: None,
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            batch: BatchConfig::default(),
            extraction: ExtractionConfig::default(),
            notifications: NotificationConfig::default(),
            classification: ClassificationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(crate::db::default_database_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            cors_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub api_keys: Vec<ApiKeyEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyEntry {
    pub key: String,
    pub user_id: String,
}

/// Hard ceiling on documents per batch; `max_documents` may only lower it.
pub const MAX_BATCH_DOCUMENTS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_max_concurrent")]
    pub default_max_concurrent: usize,
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
    #[serde(default = "default_seconds_per_document")]
    pub seconds_per_document: u64,
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: u32,
    #[serde(default = "default_overlap_size")]
    pub default_overlap_size: u32,
    #[serde(default = "default_output_format")]
    pub default_output_format: String,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_max_documents() -> usize {
    MAX_BATCH_DOCUMENTS
}

fn default_seconds_per_document() -> u64 {
    30
}

fn default_chunk_size() -> u32 {
    1000
}

fn default_overlap_size() -> u32 {
    200
}

fn default_output_format() -> String {
    "json".to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            default_max_concurrent: default_max_concurrent(),
            max_documents: default_max_documents(),
            seconds_per_document: default_seconds_per_document(),
            default_chunk_size: default_chunk_size(),
            default_overlap_size: default_overlap_size(),
            default_output_format: default_output_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_extraction_url")]
    pub base_url: String,
    #[serde(default = "default_extraction_timeout")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding the service's bearer token.
    #[serde(default)]
    pub api_token_env: Option<String>,
}

fn default_extraction_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_extraction_timeout() -> u64 {
    300
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: default_extraction_url(),
            timeout_secs: default_extraction_timeout(),
            api_token_env: None,
        }
    }
}

impl ExtractionConfig {
    pub fn api_token(&self) -> Option<String> {
        self.api_token_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_timeout")]
    pub timeout_secs: u64,
}

fn default_notification_timeout() -> u64 {
    10
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_notification_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default = "default_group_size")]
    pub group_size: usize,
    #[serde(default = "default_group_delay_ms")]
    pub group_delay_ms: u64,
}

fn default_group_size() -> usize {
    10
}

fn default_group_delay_ms() -> u64 {
    100
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            group_size: default_group_size(),
            group_delay_ms: default_group_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
