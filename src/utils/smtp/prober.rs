//! Non-delivering RCPT probes across a domain's MX hosts.

use super::result::{HostAttempt, ScanOutcome};
use super::transport::RcptTransport;
use crate::core::config::{get_random_retry_delay, Config};
use crate::core::error::{AppError, Result};
use crate::utils::dns::{sort_by_priority, MxResolver};

use std::sync::Arc;

/// Asks a domain's mail exchangers whether they would accept a recipient.
#[derive(Clone)]
pub struct SmtpProber {
    config: Arc<Config>,
    resolver: Arc<dyn MxResolver>,
    transport: Arc<dyn RcptTransport>,
}

impl SmtpProber {
    pub fn new(
        config: Arc<Config>,
        resolver: Arc<dyn MxResolver>,
        transport: Arc<dyn RcptTransport>,
    ) -> Self {
        Self {
            config,
            resolver,
            transport,
        }
    }

    /// Runs full MX scans until one is conclusive, at most `smtp_retries` times.
    ///
    /// Returns true only when some host answered 250 to `RCPT TO:<email>`.
    /// A scan in which every host answered is final. Resolver failures and
    /// scans where some host could not be reached are retried.
    pub async fn check_with_retries(&self, email: &str, domain: &str) -> bool {
        let attempts = self.config.smtp_retries.max(1);

        for attempt in 1..=attempts {
            tracing::debug!(target: "smtp_task",
                "Scan {}/{} for <{}> on {}", attempt, attempts, email, domain);

            match self.scan(email, domain).await {
                Ok(ScanOutcome::Accepted { host }) => {
                    tracing::debug!(target: "smtp_task", "<{}> accepted by {}", email, host);
                    return true;
                }
                Ok(outcome) if !outcome.is_retryable() => {
                    tracing::debug!(target: "smtp_task", "<{}> not accepted: {:?}", email, outcome);
                    return false;
                }
                Ok(outcome) => {
                    tracing::debug!(target: "smtp_task",
                        "Scan {} for <{}> reached no verdict: {:?}", attempt, email, outcome);
                }
                Err(e) => {
                    tracing::debug!(target: "smtp_task",
                        "Scan {} for <{}> failed before reaching any host: {}", attempt, email, e);
                }
            }

            if attempt < attempts {
                let pause = get_random_retry_delay(&self.config);
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
            }
        }

        tracing::debug!(target: "smtp_task", "Giving up on <{}> after {} scan(s)", email, attempts);
        false
    }

    /// One pass over the MX hosts of `domain`, most preferred first.
    pub async fn scan(&self, email: &str, domain: &str) -> Result<ScanOutcome> {
        let hosts = sort_by_priority(self.resolver.lookup_mx(domain).await?);
        if hosts.is_empty() {
            return Ok(ScanOutcome::NoMailExchangers);
        }

        let sender = self.config.sender_for(domain);
        let mut attempts = Vec::with_capacity(hosts.len());

        for mx in hosts {
            match self.transport.rcpt_probe(&mx.exchange, &sender, email).await {
                Ok(reply) if reply.is_accepted() => {
                    return Ok(ScanOutcome::Accepted { host: mx.exchange });
                }
                Ok(reply) => attempts.push(HostAttempt {
                    host: mx.exchange,
                    code: Some(reply.code),
                    note: format!("reply {}", reply),
                }),
                Err(AppError::SmtpCommand { code, message }) => attempts.push(HostAttempt {
                    host: mx.exchange,
                    code: Some(code),
                    note: format!("command refused: {} {}", code, message),
                }),
                Err(e) => attempts.push(HostAttempt {
                    host: mx.exchange,
                    code: None,
                    note: e.to_string(),
                }),
            }
        }

        Ok(ScanOutcome::from_attempts(attempts))
    }
}
