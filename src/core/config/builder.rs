//! Provides the `ConfigBuilder` for fluent configuration construction.

use super::loading::{apply_file_config, load_config_file};
use super::validation::validate_config;
use super::{Config, ConfigFile, Result};
use crate::AppError;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["./email-probe.toml", "./config.toml"];

/// Builder pattern for creating `Config` instances fluently.
///
/// This is the primary way callers should create a `Config` object.
/// It handles loading from files, applying overrides, and validation.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
    config_file_path: Option<String>,
    skip_default_locations: bool,
    overrides: ConfigFile,
}

impl ConfigBuilder {
    /// Creates a new builder with default configuration values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify an optional configuration file path to load.
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file_path = Some(path.into());
        self
    }

    /// Do not probe `./email-probe.toml` / `./config.toml` when no file is given.
    pub fn skip_default_locations(mut self) -> Self {
        self.skip_default_locations = true;
        self
    }

    pub fn max_workers(mut self, value: usize) -> Self {
        self.overrides.processing.max_workers = Some(value);
        self
    }
    pub fn batch_size(mut self, value: usize) -> Self {
        self.overrides.processing.batch_size = Some(value);
        self
    }
    pub fn smtp_retries(mut self, value: u32) -> Self {
        self.overrides.smtp.smtp_retries = Some(value);
        self
    }
    pub fn smtp_timeout(mut self, duration: Duration) -> Self {
        self.overrides.smtp.smtp_timeout = Some(duration.as_secs());
        self
    }
    pub fn smtp_port(mut self, port: u16) -> Self {
        self.overrides.smtp.smtp_port = Some(port);
        self
    }
    pub fn helo_name(mut self, value: impl Into<String>) -> Self {
        self.overrides.smtp.helo_name = Some(value.into());
        self
    }
    pub fn sender_local_part(mut self, value: impl Into<String>) -> Self {
        self.overrides.smtp.sender_local_part = Some(value.into());
        self
    }
    pub fn retry_delay(mut self, min: f32, max: f32) -> Self {
        self.overrides.smtp.min_retry_delay = Some(min);
        self.overrides.smtp.max_retry_delay = Some(max);
        self
    }
    pub fn dns_timeout(mut self, duration: Duration) -> Self {
        self.overrides.dns.dns_timeout = Some(duration.as_secs());
        self
    }
    pub fn dns_servers(mut self, servers: Vec<String>) -> Self {
        self.overrides.dns.dns_servers = Some(servers);
        self
    }
    pub fn cache_ttl(mut self, duration: Duration) -> Self {
        self.overrides.cache.cache_ttl = Some(duration.as_secs());
        self
    }
    pub fn role_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.overrides.heuristics.role_prefixes = Some(prefixes);
        self
    }
    pub fn disposable_domains_path(mut self, path: impl Into<String>) -> Self {
        self.overrides.heuristics.disposable_domains_path = Some(path.into());
        self
    }
    pub fn catch_all_invalidates(mut self, value: bool) -> Self {
        self.overrides.heuristics.catch_all_invalidates = Some(value);
        self
    }

    /// Builds the final `Config` object, applying defaults, file settings, overrides, and validation.
    pub fn build(mut self) -> Result<Config> {
        let mut loaded_path: Option<String> = None;

        if let Some(ref path) = self.config_file_path {
            match load_config_file(path) {
                Ok(file_config) => {
                    apply_file_config(&mut self.config, &file_config);
                    loaded_path = Some(path.clone());
                    tracing::info!("Loaded base configuration from specified file: {}", path);
                }
                Err(e) => {
                    tracing::error!("Failed to load specified config file '{}': {:#}", path, e);
                    return Err(AppError::Generic(e.context(format!(
                        "Failed to load specified configuration file '{}'",
                        path
                    ))));
                }
            }
        } else if !self.skip_default_locations {
            tracing::debug!("No config file specified, checking default locations.");
            for path_str in DEFAULT_CONFIG_LOCATIONS {
                if Path::new(path_str).exists() {
                    match load_config_file(path_str) {
                        Ok(file_config) => {
                            apply_file_config(&mut self.config, &file_config);
                            loaded_path = Some(path_str.to_string());
                            tracing::info!(
                                "Loaded base configuration from default location: {}",
                                path_str
                            );
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Failed to load or parse default config '{}': {:#}",
                                path_str,
                                e
                            );
                        }
                    }
                }
            }
            if loaded_path.is_none() {
                tracing::info!("No configuration file found. Using default values and overrides.");
            }
        }

        apply_file_config(&mut self.config, &self.overrides);
        self.config.loaded_config_path = loaded_path;
        validate_config(&mut self.config)?;

        tracing::debug!("Final configuration built successfully.");
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_defaults() {
        let config = ConfigBuilder::new()
            .skip_default_locations()
            .max_workers(3)
            .batch_size(7)
            .smtp_retries(2)
            .cache_ttl(Duration::from_secs(10))
            .catch_all_invalidates(false)
            .build()
            .unwrap();

        assert_eq!(config.max_workers, 3);
        assert_eq!(config.batch_size, 7);
        assert_eq!(config.smtp_retries, 2);
        assert_eq!(config.cache_ttl, Duration::from_secs(10));
        assert!(!config.catch_all_invalidates);
        assert!(config.loaded_config_path.is_none());
    }

    #[test]
    fn missing_explicit_file_fails() {
        let err = ConfigBuilder::new()
            .config_file("./no-such-config.toml")
            .build()
            .unwrap_err();
        assert!(matches!(err, AppError::Generic(_)));
        assert!(err.to_string().contains("no-such-config.toml"));
    }

    #[test]
    fn malformed_file_keeps_parse_cause() {
        let path = std::env::temp_dir().join(format!(
            "email-probe-config-{:016x}.toml",
            rand::random::<u64>()
        ));
        std::fs::write(&path, "[processing]\nmax_workers = \"many\"\n").unwrap();

        let err = ConfigBuilder::new()
            .config_file(path.display().to_string())
            .build()
            .unwrap_err();
        std::fs::remove_file(&path).unwrap();

        match err {
            AppError::Generic(e) => assert!(format!("{:#}", e).contains("parse TOML")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
