//! MX resolution. The engine only talks to the `MxResolver` trait so the
//! resolver can be swapped out in tests.

use crate::core::config::Config;
use crate::core::error::{AppError, Result};

use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::TokioAsyncResolver;

/// One MX record. Lower preference means higher priority.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MailExchanger {
    pub preference: u16,
    pub exchange: String,
}

impl MailExchanger {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: normalize_exchange(&exchange.into()),
        }
    }
}

/// Strips the root label and lowercases a host name from DNS.
pub(crate) fn normalize_exchange(exchange: &str) -> String {
    exchange.trim_end_matches('.').to_ascii_lowercase()
}

/// Sorts MX records by ascending preference, dropping duplicates and
/// null-MX entries (RFC 7505 `.`).
pub fn sort_by_priority(mut records: Vec<MailExchanger>) -> Vec<MailExchanger> {
    records.retain(|mx| !mx.exchange.is_empty());
    records.sort();
    records.dedup();
    records
}

#[async_trait]
pub trait MxResolver: Send + Sync {
    /// Resolves the MX records of `domain`. An empty answer is an error.
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MailExchanger>>;
}

/// `MxResolver` backed by trust-dns, with a hard deadline per lookup.
pub struct TrustDnsResolver {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl TrustDnsResolver {
    /// Builds a resolver against the configured nameservers, or the system
    /// configuration when the list is empty.
    pub fn new(config: &Config) -> Result<Self> {
        let mut opts = ResolverOpts::default();
        opts.timeout = config.dns_timeout;
        opts.attempts = 2;
        opts.use_hosts_file = false;

        let resolver = if config.dns_servers.is_empty() {
            tracing::debug!(target: "dns_task", "Using system DNS configuration.");
            TokioAsyncResolver::tokio_from_system_conf().map_err(|e| {
                AppError::Initialization(format!("Failed to read system DNS config: {}", e))
            })?
        } else {
            let ips = config
                .dns_servers
                .iter()
                .map(|s| s.parse::<IpAddr>())
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let group = NameServerConfigGroup::from_ips_clear(&ips, 53, true);
            tracing::debug!(target: "dns_task", "Using nameservers: {:?}", ips);
            TokioAsyncResolver::tokio(ResolverConfig::from_parts(None, vec![], group), opts)
        };

        Ok(Self {
            resolver,
            timeout: config.dns_timeout,
        })
    }
}

#[async_trait]
impl MxResolver for TrustDnsResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MailExchanger>> {
        tracing::debug!(target: "dns_task", "Resolving MX for {}", domain);
        let lookup = match tokio::time::timeout(self.timeout, self.resolver.mx_lookup(domain)).await
        {
            Ok(Ok(lookup)) => lookup,
            Ok(Err(e)) => {
                return Err(match e.kind() {
                    ResolveErrorKind::NoRecordsFound { response_code, .. }
                        if *response_code == ResponseCode::NXDomain =>
                    {
                        AppError::NxDomain(domain.to_string())
                    }
                    ResolveErrorKind::NoRecordsFound { .. } => {
                        AppError::NoDnsRecords(domain.to_string())
                    }
                    ResolveErrorKind::Timeout => AppError::DnsTimeout(domain.to_string()),
                    _ => AppError::Dns(e),
                });
            }
            Err(_) => return Err(AppError::DnsTimeout(domain.to_string())),
        };

        let records: Vec<MailExchanger> = lookup
            .iter()
            .map(|mx| MailExchanger::new(mx.preference(), mx.exchange().to_utf8()))
            .collect();
        if records.is_empty() {
            return Err(AppError::NoDnsRecords(domain.to_string()));
        }
        tracing::debug!(target: "dns_task", "{} has {} MX record(s)", domain, records.len());
        Ok(records)
    }
}
