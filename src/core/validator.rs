//! The per-address decision pipeline.
//!
//! Stages run in order: syntax, disposable shortcut, role heuristic, domain,
//! SMTP, catch-all. Each failing stage stops the pipeline and records its
//! reason in the result's `errors`.

use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::models::ValidationResult;
use crate::utils::cache::TtlCache;
use crate::utils::disposable::DisposableDomains;
use crate::utils::dns::{MxResolver, TrustDnsResolver};
use crate::utils::smtp::{CatchAllDetector, LettreTransport, RcptTransport, SmtpProber};
use crate::utils::syntax;

use std::sync::Arc;
use thiserror::Error;

/// Why an address stopped short of a full check.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Invalid email syntax")]
    InvalidSyntax,
    #[error("Disposable email domain")]
    Disposable,
    #[error("Domain validation failed")]
    DomainInvalid,
    #[error("SMTP verification failed")]
    SmtpRejected,
    #[error("Validation aborted: {0}")]
    Aborted(String),
}

pub struct EmailValidator {
    config: Arc<Config>,
    resolver: Arc<dyn MxResolver>,
    prober: SmtpProber,
    catch_all: CatchAllDetector,
    domain_cache: Arc<TtlCache>,
    disposable: Arc<DisposableDomains>,
}

impl EmailValidator {
    /// Builds a validator with fresh caches sized by `config.cache_ttl`.
    pub fn new(
        config: Arc<Config>,
        resolver: Arc<dyn MxResolver>,
        transport: Arc<dyn RcptTransport>,
        disposable: Arc<DisposableDomains>,
    ) -> Self {
        let domain_cache = Arc::new(TtlCache::new(config.cache_ttl));
        let catch_all_cache = Arc::new(TtlCache::new(config.cache_ttl));
        Self::with_caches(
            config,
            resolver,
            transport,
            disposable,
            domain_cache,
            catch_all_cache,
        )
    }

    /// Builds a validator over caches owned by the caller, so several
    /// validators can share what they learn.
    pub fn with_caches(
        config: Arc<Config>,
        resolver: Arc<dyn MxResolver>,
        transport: Arc<dyn RcptTransport>,
        disposable: Arc<DisposableDomains>,
        domain_cache: Arc<TtlCache>,
        catch_all_cache: Arc<TtlCache>,
    ) -> Self {
        let prober = SmtpProber::new(Arc::clone(&config), Arc::clone(&resolver), transport);
        let catch_all = CatchAllDetector::new(prober.clone(), catch_all_cache);
        Self {
            config,
            resolver,
            prober,
            catch_all,
            domain_cache,
            disposable,
        }
    }

    /// Wires up the real DNS resolver, SMTP transport and disposable list.
    pub async fn from_config(config: Arc<Config>) -> Result<Self> {
        tracing::debug!("Initializing EmailValidator components...");
        let resolver: Arc<dyn MxResolver> = Arc::new(TrustDnsResolver::new(&config)?);
        tracing::debug!("DNS resolver initialized.");
        let transport: Arc<dyn RcptTransport> = Arc::new(LettreTransport::new(&config));
        let disposable = Arc::new(DisposableDomains::load_or_empty(
            config.disposable_domains_path.as_deref(),
        ));
        tracing::info!(
            "EmailValidator initialized ({} disposable domains, cache TTL {:?}).",
            disposable.len(),
            config.cache_ttl
        );
        Ok(Self::new(config, resolver, transport, disposable))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn domain_cache(&self) -> &TtlCache {
        &self.domain_cache
    }

    /// Drops stale entries from both caches. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.domain_cache.purge_expired() + self.catch_all.cache().purge_expired()
    }

    pub fn is_disposable(&self, domain: &str) -> bool {
        self.disposable.contains(domain)
    }

    /// Case-insensitive prefix match of the local part against the role list.
    pub fn is_role_account(&self, local_part: &str) -> bool {
        let local = local_part.to_lowercase();
        self.config
            .role_prefixes
            .iter()
            .any(|prefix| local.starts_with(prefix.as_str()))
    }

    /// True when `domain` has at least one MX record.
    ///
    /// Both outcomes are cached for the TTL. The DNS error itself is only logged.
    pub async fn check_domain(&self, domain: &str) -> bool {
        if let Some((valid, age)) = self.domain_cache.get(domain) {
            tracing::trace!(target: "validation_task", "Domain cache hit for {} ({:?} old)", domain, age);
            return valid;
        }

        let valid = match self.resolver.lookup_mx(domain).await {
            Ok(records) => !records.is_empty(),
            Err(e) => {
                tracing::debug!(target: "validation_task", "MX lookup for {} failed: {}", domain, e);
                false
            }
        };
        self.domain_cache.put(domain, valid);
        valid
    }

    pub async fn check_smtp(&self, email: &str, domain: &str) -> bool {
        self.prober.check_with_retries(email, domain).await
    }

    pub async fn is_catch_all(&self, domain: &str) -> bool {
        self.catch_all.is_catch_all(domain).await
    }

    /// Runs the full pipeline for one address. Never fails: problems end up
    /// in `errors`.
    pub async fn validate(&self, email: &str) -> ValidationResult {
        let mut result = ValidationResult::new(email);
        if let Err(reason) = self.run_stages(email, &mut result).await {
            tracing::debug!(target: "validation_task", "<{}> stopped: {}", email, reason);
            result.errors.push(reason.to_string());
        }
        result.finalize(self.config.catch_all_invalidates)
    }

    /// Result for an address whose validation could not run to completion.
    pub(crate) fn aborted(&self, email: &str, reason: impl Into<String>) -> ValidationResult {
        let mut result = ValidationResult::new(email);
        result.errors.push(PipelineError::Aborted(reason.into()).to_string());
        result.finalize(self.config.catch_all_invalidates)
    }

    async fn run_stages(
        &self,
        email: &str,
        result: &mut ValidationResult,
    ) -> std::result::Result<(), PipelineError> {
        let (local_part, domain) =
            syntax::split_address(email).ok_or(PipelineError::InvalidSyntax)?;
        result.syntax_valid = true;
        let domain = domain.to_ascii_lowercase();

        if self.is_disposable(&domain) {
            result.is_disposable = true;
            return Err(PipelineError::Disposable);
        }

        result.is_role = self.is_role_account(local_part);

        result.domain_valid = self.check_domain(&domain).await;
        if !result.domain_valid {
            return Err(PipelineError::DomainInvalid);
        }

        result.smtp_valid = self.check_smtp(email, &domain).await;
        if !result.smtp_valid {
            return Err(PipelineError::SmtpRejected);
        }

        result.is_catch_all = self.is_catch_all(&domain).await;
        Ok(())
    }
}
