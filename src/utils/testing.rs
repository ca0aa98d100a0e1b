//! Fakes for the resolver and transport seams.

use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::utils::dns::{MailExchanger, MxResolver};
use crate::utils::smtp::{RcptReply, RcptTransport};

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Default config with no pauses between retries.
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.retry_delay = (0.0, 0.0);
    config.disposable_domains_path = None;
    config
}

#[derive(Default)]
pub(crate) struct FakeResolver {
    records: HashMap<String, Vec<MailExchanger>>,
    fail_all: bool,
    accept_any_domain: bool,
    delay: Option<Duration>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_mx(mut self, domain: &str, records: &[(u16, &str)]) -> Self {
        self.records.insert(
            domain.to_string(),
            records
                .iter()
                .map(|(pref, host)| MailExchanger::new(*pref, *host))
                .collect(),
        );
        self
    }

    /// Every lookup errors.
    pub(crate) fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Unknown domains answer with a single `mx.<domain>` record.
    pub(crate) fn any_domain(mut self) -> Self {
        self.accept_any_domain = true;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self, domain: &str) -> usize {
        self.calls.lock().get(domain).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MxResolver for FakeResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MailExchanger>> {
        *self.calls.lock().entry(domain.to_string()).or_default() += 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_all {
            return Err(AppError::DnsTimeout(domain.to_string()));
        }
        match self.records.get(domain) {
            Some(records) => Ok(records.clone()),
            None if self.accept_any_domain => Ok(vec![MailExchanger::new(10, format!("mx.{}", domain))]),
            None => Err(AppError::NxDomain(domain.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum HostBehaviour {
    Unreachable,
    /// 451 to every recipient.
    Transient,
    /// 553 to MAIL FROM.
    SenderRefused,
    AcceptAll,
    /// 250 for the listed recipients, 550 otherwise.
    AcceptOnly(Vec<String>),
    /// 250 when the recipient's local part starts with the prefix, 550 otherwise.
    AcceptPrefix(String),
}

#[derive(Default)]
pub(crate) struct FakeTransport {
    hosts: HashMap<String, HostBehaviour>,
    default: Option<HostBehaviour>,
    log: Mutex<Vec<(String, String, String)>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn host(mut self, host: &str, behaviour: HostBehaviour) -> Self {
        self.hosts.insert(host.to_string(), behaviour);
        self
    }

    /// Behaviour for hosts not configured explicitly.
    pub(crate) fn otherwise(mut self, behaviour: HostBehaviour) -> Self {
        self.default = Some(behaviour);
        self
    }

    pub(crate) fn attempted_hosts(&self) -> Vec<String> {
        self.log.lock().iter().map(|(h, _, _)| h.clone()).collect()
    }

    pub(crate) fn senders(&self) -> Vec<String> {
        self.log.lock().iter().map(|(_, s, _)| s.clone()).collect()
    }

    pub(crate) fn recipients(&self) -> Vec<String> {
        self.log.lock().iter().map(|(_, _, r)| r.clone()).collect()
    }
}

#[async_trait]
impl RcptTransport for FakeTransport {
    async fn rcpt_probe(&self, host: &str, sender: &str, recipient: &str) -> Result<RcptReply> {
        self.log
            .lock()
            .push((host.to_string(), sender.to_string(), recipient.to_string()));

        let behaviour = self
            .hosts
            .get(host)
            .or(self.default.as_ref())
            .cloned()
            .unwrap_or(HostBehaviour::Unreachable);

        let accepted = RcptReply::new(250, "2.1.5 OK");
        let refused = RcptReply::new(550, "5.1.1 user unknown");
        match behaviour {
            HostBehaviour::Unreachable => Err(AppError::SmtpTimeout(host.to_string())),
            HostBehaviour::Transient => Ok(RcptReply::new(451, "4.7.1 greylisted")),
            HostBehaviour::SenderRefused => Err(AppError::SmtpCommand {
                code: 553,
                message: "5.7.1 sender rejected".to_string(),
            }),
            HostBehaviour::AcceptAll => Ok(accepted),
            HostBehaviour::AcceptOnly(allowed) => {
                Ok(if allowed.iter().any(|a| a == recipient) { accepted } else { refused })
            }
            HostBehaviour::AcceptPrefix(prefix) => {
                Ok(if recipient.starts_with(&prefix) { accepted } else { refused })
            }
        }
    }
}
