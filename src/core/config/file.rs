//! Defines the structure mirroring the TOML configuration file format.

use serde::Deserialize;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub(crate) dns: DnsConfig,
    #[serde(default)]
    pub(crate) smtp: SmtpConfig,
    #[serde(default)]
    pub(crate) cache: CacheConfig,
    #[serde(default)]
    pub(crate) processing: ProcessingConfig,
    #[serde(default)]
    pub(crate) heuristics: HeuristicsConfig,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct DnsConfig {
    pub(crate) dns_timeout: Option<u64>,
    pub(crate) dns_servers: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct SmtpConfig {
    pub(crate) smtp_timeout: Option<u64>,
    pub(crate) smtp_port: Option<u16>,
    pub(crate) smtp_retries: Option<u32>,
    pub(crate) helo_name: Option<String>,
    pub(crate) sender_local_part: Option<String>,
    pub(crate) min_retry_delay: Option<f32>,
    pub(crate) max_retry_delay: Option<f32>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct CacheConfig {
    pub(crate) cache_ttl: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ProcessingConfig {
    pub(crate) max_workers: Option<usize>,
    pub(crate) batch_size: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct HeuristicsConfig {
    pub(crate) role_prefixes: Option<Vec<String>>,
    pub(crate) disposable_domains_path: Option<String>,
    pub(crate) catch_all_invalidates: Option<bool>,
}
