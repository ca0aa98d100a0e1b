//! Defines the core runtime `Config` struct, its defaults, and related utilities.
//! Submodules handle loading, building, and validation.

pub(crate) mod builder;
pub(crate) mod file;
pub(crate) mod loading;
pub(crate) mod validation;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::core::error::Result;
use std::collections::HashSet;
use std::time::Duration;

/// Runtime configuration settings used by the verification engine.
#[derive(Clone)]
pub struct Config {
    pub dns_timeout: Duration,
    pub dns_servers: Vec<String>,

    pub smtp_timeout: Duration,
    pub smtp_port: u16,
    pub smtp_retries: u32,
    pub helo_name: String,
    pub sender_local_part: String,
    pub retry_delay: (f32, f32),

    pub cache_ttl: Duration,

    pub max_workers: usize,
    pub batch_size: usize,

    pub role_prefixes: HashSet<String>,
    pub disposable_domains_path: Option<String>,
    /// Whether a catch-all verdict forces `is_valid` to false.
    pub catch_all_invalidates: bool,

    pub loaded_config_path: Option<String>,
}

impl Config {
    fn build_default() -> Self {
        let role_prefixes: HashSet<String> = [
            "admin", "support", "info", "sales", "contact", "noreply", "team", "help",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let dns_servers = vec!["8.8.8.8".to_string(), "8.8.4.4".to_string()];

        Config {
            dns_timeout: Duration::from_secs(5),
            dns_servers,
            smtp_timeout: Duration::from_secs(15),
            smtp_port: 25,
            smtp_retries: 3,
            helo_name: "localhost".to_string(),
            sender_local_part: "verify".to_string(),
            retry_delay: (0.1, 0.5),
            cache_ttl: Duration::from_secs(3600),
            max_workers: 10,
            batch_size: 100,
            role_prefixes,
            disposable_domains_path: Some("disposable_domains.txt".to_string()),
            catch_all_invalidates: true,
            loaded_config_path: None,
        }
    }

    /// The envelope sender used for probes against `domain`.
    pub fn sender_for(&self, domain: &str) -> String {
        format!("{}@{}", self.sender_local_part, domain)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::build_default()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("dns_timeout", &self.dns_timeout)
            .field("dns_servers", &self.dns_servers)
            .field("smtp_timeout", &self.smtp_timeout)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_retries", &self.smtp_retries)
            .field("helo_name", &self.helo_name)
            .field("sender_local_part", &self.sender_local_part)
            .field("retry_delay", &self.retry_delay)
            .field("cache_ttl", &self.cache_ttl)
            .field("max_workers", &self.max_workers)
            .field("batch_size", &self.batch_size)
            .field("role_prefixes_count", &self.role_prefixes.len())
            .field("disposable_domains_path", &self.disposable_domains_path)
            .field("catch_all_invalidates", &self.catch_all_invalidates)
            .field("loaded_config_path", &self.loaded_config_path)
            .finish()
    }
}

/// Utility function to get a random pause between SMTP scan attempts.
///
/// Uses the `retry_delay` setting from the provided configuration.
pub fn get_random_retry_delay(config: &Config) -> Duration {
    use rand::Rng;
    let (min, max) = config.retry_delay;
    if !min.is_finite() || !max.is_finite() {
        return Duration::ZERO;
    }
    if min >= max {
        return Duration::from_secs_f32(min.max(0.0));
    }
    let duration_secs = rand::thread_rng().gen_range(min..max);
    Duration::from_secs_f32(duration_secs)
}

/// Builds a `Config` from defaults, optional file and validation in one call.
pub fn load_config(path: Option<&str>) -> Result<Config> {
    let mut builder = ConfigBuilder::new();
    if let Some(p) = path {
        builder = builder.config_file(p);
    }
    builder.build()
}
