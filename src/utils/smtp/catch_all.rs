//! Catch-all detection: does the domain accept mail for mailboxes that
//! cannot exist?

use super::prober::SmtpProber;
use crate::utils::cache::TtlCache;

use rand::Rng;
use std::sync::Arc;

pub struct CatchAllDetector {
    prober: SmtpProber,
    cache: Arc<TtlCache>,
}

impl CatchAllDetector {
    pub fn new(prober: SmtpProber, cache: Arc<TtlCache>) -> Self {
        Self { prober, cache }
    }

    /// True when every synthetic address at `domain` is accepted.
    ///
    /// The verdict is cached per domain, independently of MX validity.
    pub async fn is_catch_all(&self, domain: &str) -> bool {
        if let Some((verdict, age)) = self.cache.get(domain) {
            tracing::trace!(target: "smtp_task", "Catch-all cache hit for {} ({:?} old)", domain, age);
            return verdict;
        }

        let mut verdict = true;
        for probe in synthetic_addresses(domain) {
            if !self.prober.check_with_retries(&probe, domain).await {
                tracing::debug!(target: "smtp_task", "{} refused synthetic <{}>; not catch-all", domain, probe);
                verdict = false;
                break;
            }
        }
        if verdict {
            tracing::info!(target: "smtp_task", "Domain {} appears to be a catch-all", domain);
        }

        self.cache.put(domain, verdict);
        verdict
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }
}

/// Local parts nobody would register: one timestamped, one random.
fn synthetic_addresses(domain: &str) -> [String; 2] {
    let stamp = chrono::Utc::now().timestamp_micros();
    let noise: u64 = rand::thread_rng().gen();
    [
        format!("test-{}@{}", stamp, domain),
        format!("invalid-{:016x}@{}", noise, domain),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::{test_config, FakeResolver, FakeTransport, HostBehaviour};
    use std::time::Duration;

    fn detector(transport: Arc<FakeTransport>, ttl: Duration) -> (CatchAllDetector, Arc<FakeResolver>) {
        let resolver = Arc::new(FakeResolver::new().with_mx("example.com", &[(10, "mx.example.com")]));
        let prober = SmtpProber::new(Arc::new(test_config()), resolver.clone(), transport);
        (
            CatchAllDetector::new(prober, Arc::new(TtlCache::new(ttl))),
            resolver,
        )
    }

    #[test]
    fn synthetic_addresses_differ_and_target_domain() {
        let [a, b] = synthetic_addresses("example.com");
        assert_ne!(a, b);
        assert!(a.ends_with("@example.com") && b.ends_with("@example.com"));
        assert!(crate::utils::syntax::check(&a));
        assert!(crate::utils::syntax::check(&b));
    }

    #[tokio::test]
    async fn accepting_everything_is_catch_all() {
        let transport = Arc::new(FakeTransport::new().host("mx.example.com", HostBehaviour::AcceptAll));
        let (d, _) = detector(transport.clone(), Duration::from_secs(60));
        assert!(d.is_catch_all("example.com").await);
        assert_eq!(transport.attempted_hosts().len(), 2);
    }

    #[tokio::test]
    async fn any_refused_probe_means_not_catch_all() {
        let transport = Arc::new(
            FakeTransport::new().host("mx.example.com", HostBehaviour::AcceptPrefix("test-".into())),
        );
        let (d, _) = detector(transport, Duration::from_secs(60));
        assert!(!d.is_catch_all("example.com").await);
    }

    #[tokio::test]
    async fn first_refusal_short_circuits() {
        let transport = Arc::new(FakeTransport::new().host("mx.example.com", HostBehaviour::AcceptOnly(vec![])));
        let (d, _) = detector(transport.clone(), Duration::from_secs(60));
        assert!(!d.is_catch_all("example.com").await);
        assert_eq!(transport.attempted_hosts().len(), 1);
    }

    #[tokio::test]
    async fn verdict_is_cached_until_ttl() {
        let transport = Arc::new(FakeTransport::new().host("mx.example.com", HostBehaviour::AcceptAll));
        let (d, resolver) = detector(transport.clone(), Duration::from_secs(60));
        assert!(d.is_catch_all("example.com").await);
        assert!(d.is_catch_all("example.com").await);
        assert_eq!(resolver.calls("example.com"), 2);

        let (expiring, resolver) = detector(transport, Duration::ZERO);
        expiring.is_catch_all("example.com").await;
        expiring.is_catch_all("example.com").await;
        assert_eq!(resolver.calls("example.com"), 4);
    }
}
