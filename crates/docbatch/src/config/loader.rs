use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

use crate::config::schema::{Config, MAX_BATCH_DOCUMENTS};
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    config
        .server
        .listen_addr
        .parse::<SocketAddr>()
        .map_err(|e| invalid(format!("Invalid server.listen_addr: {}", e)))?;

    let batch = &config.batch;
    if !(1..=10).contains(&batch.default_max_concurrent) {
        return Err(invalid("batch.default_max_concurrent must be between 1 and 10"));
    }
    if !(1..=MAX_BATCH_DOCUMENTS).contains(&batch.max_documents) {
        return Err(invalid(format!(
            "batch.max_documents must be between 1 and {}",
            MAX_BATCH_DOCUMENTS
        )));
    }
    if !(100..=10_000).contains(&batch.default_chunk_size) {
        return Err(invalid("batch.default_chunk_size must be between 100 and 10000"));
    }
    if batch.default_overlap_size >= batch.default_chunk_size {
        return Err(invalid(
            "batch.default_overlap_size must be smaller than batch.default_chunk_size",
        ));
    }

    let base_url = &config.extraction.base_url;
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(invalid(format!(
            "extraction.base_url must be an http(s) URL, got '{}'",
            base_url
        )));
    }
    if config.extraction.timeout_secs == 0 || config.notifications.timeout_secs == 0 {
        return Err(invalid("timeouts must be positive"));
    }

    if config.classification.group_size == 0 {
        return Err(invalid("classification.group_size must be positive"));
    }

    let mut keys = HashSet::new();
    for entry in &config.auth.api_keys {
        if entry.key.trim().is_empty() || entry.user_id.trim().is_empty() {
            return Err(invalid("auth.api_keys entries need a key and a user_id"));
        }
        if !keys.insert(entry.key.as_str()) {
            return Err(invalid(format!(
                "Duplicate API key for user '{}'",
                entry.user_id
            )));
        }
    }

    Ok(())
}
