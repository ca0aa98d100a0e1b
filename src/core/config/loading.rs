//! Handles loading configuration from files and applying it to the Config struct.

use super::{Config, ConfigFile};
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Loads configuration settings from a TOML file.
/// Returns the parsed `ConfigFile` content.
pub(crate) fn load_config_file(file_path: &str) -> anyhow::Result<ConfigFile> {
    let path = Path::new(file_path);
    if !path.exists() || !path.is_file() {
        return Err(anyhow::anyhow!(
            "File not found or is not a file: {}",
            file_path
        ));
    }
    tracing::debug!("Attempting to read config file: {}", file_path);
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", file_path))?;

    parse_config_str(&content)
        .with_context(|| format!("Failed to parse TOML configuration from {}", file_path))
}

pub(crate) fn parse_config_str(content: &str) -> anyhow::Result<ConfigFile> {
    let config_file_content: ConfigFile = toml::from_str(content)?;
    Ok(config_file_content)
}

/// Applies settings from a parsed `ConfigFile` onto a mutable `Config` instance.
/// Later calls win, so file settings are applied before CLI overrides.
pub(crate) fn apply_file_config(config: &mut Config, file_config: &ConfigFile) {
    // DNS
    if let Some(timeout) = file_config.dns.dns_timeout {
        config.dns_timeout = Duration::from_secs(timeout);
    }
    if let Some(ref servers) = file_config.dns.dns_servers {
        config.dns_servers = servers
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    // SMTP
    if let Some(timeout) = file_config.smtp.smtp_timeout {
        config.smtp_timeout = Duration::from_secs(timeout);
    }
    if let Some(port) = file_config.smtp.smtp_port {
        config.smtp_port = port;
    }
    if let Some(retries) = file_config.smtp.smtp_retries {
        config.smtp_retries = retries;
    }
    if let Some(ref helo) = file_config.smtp.helo_name {
        config.helo_name = helo.trim().to_string();
    }
    if let Some(ref local) = file_config.smtp.sender_local_part {
        config.sender_local_part = local.trim().to_string();
    }
    if let Some(min_delay) = file_config.smtp.min_retry_delay {
        config.retry_delay.0 = min_delay;
    }
    if let Some(max_delay) = file_config.smtp.max_retry_delay {
        config.retry_delay.1 = max_delay;
    }

    // Cache
    if let Some(ttl) = file_config.cache.cache_ttl {
        config.cache_ttl = Duration::from_secs(ttl);
    }

    // Processing
    if let Some(workers) = file_config.processing.max_workers {
        config.max_workers = workers;
    }
    if let Some(batch) = file_config.processing.batch_size {
        config.batch_size = batch;
    }

    // Heuristics
    if let Some(ref prefixes) = file_config.heuristics.role_prefixes {
        config.role_prefixes = prefixes.iter().cloned().collect();
    }
    if let Some(ref path) = file_config.heuristics.disposable_domains_path {
        if !path.trim().is_empty() {
            config.disposable_domains_path = Some(path.trim().to_string());
        } else {
            config.disposable_domains_path = None;
        }
    }
    if let Some(invalidates) = file_config.heuristics.catch_all_invalidates {
        config.catch_all_invalidates = invalidates;
    }
}
