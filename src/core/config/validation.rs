//! Contains validation logic for the final Config struct.

use super::{Config, Result};
use crate::core::error::AppError;
use std::net::IpAddr;

/// Validates the configuration settings after loading and potential overrides.
/// Mutates the config to clamp values where a sane fallback exists.
pub(crate) fn validate_config(config: &mut Config) -> Result<()> {
    if !config.retry_delay.0.is_finite() || !config.retry_delay.1.is_finite() {
        return Err(AppError::Config(format!(
            "Retry delays must be finite numbers of seconds (got {} and {}).",
            config.retry_delay.0, config.retry_delay.1
        )));
    }
    if config.retry_delay.0 < 0.0 || config.retry_delay.1 < 0.0 {
        return Err(AppError::Config(
            "Retry delays cannot be negative.".to_string(),
        ));
    }
    if config.retry_delay.0 > config.retry_delay.1 {
        tracing::warn!(
            "Min retry delay ({:.2}s) > max retry delay ({:.2}s). Setting max = min.",
            config.retry_delay.0,
            config.retry_delay.1
        );
        config.retry_delay.1 = config.retry_delay.0;
    }
    if config.dns_servers.is_empty() {
        tracing::warn!("DNS servers list is empty. The system resolver configuration will be used.");
    }
    for server in &config.dns_servers {
        if server.parse::<IpAddr>().is_err() {
            return Err(AppError::Config(format!(
                "DNS server '{}' is not a valid IP address",
                server
            )));
        }
    }
    if config.max_workers == 0 {
        tracing::warn!("Max workers was set to 0. Setting to 1.");
        config.max_workers = 1;
    }
    if config.batch_size == 0 {
        tracing::warn!("Batch size was set to 0. Setting to 1.");
        config.batch_size = 1;
    }
    if config.smtp_retries == 0 {
        tracing::warn!("SMTP retries was set to 0. At least one scan is always made; setting to 1.");
        config.smtp_retries = 1;
    }
    if config.sender_local_part.is_empty() || config.sender_local_part.contains('@') {
        return Err(AppError::Config(format!(
            "Invalid sender local part: '{}'",
            config.sender_local_part
        )));
    }
    if config.helo_name.is_empty() {
        return Err(AppError::Config("HELO name cannot be empty.".to_string()));
    }
    config.role_prefixes = config
        .role_prefixes
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect();
    Ok(())
}
