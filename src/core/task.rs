//! Batch orchestration for one submitted task.

use crate::core::error::{AppError, Result};
use crate::core::models::{TaskReport, TaskStatus, ValidationResult};
use crate::core::source::AddressSource;
use crate::core::validator::EmailValidator;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

/// Counters and output of a task.
///
/// Only the driving [`ValidationTask`] writes; pollers read the atomics at any time.
#[derive(Debug, Default)]
pub struct TaskState {
    status: AtomicU8,
    progress: AtomicU8,
    total_rows: AtomicUsize,
    processed_rows: AtomicUsize,
    error: Mutex<Option<String>>,
    results: Mutex<Option<Vec<ValidationResult>>>,
}

impl TaskState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::Acquire)
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows.load(Ordering::Acquire)
    }

    pub fn processed_rows(&self) -> usize {
        self.processed_rows.load(Ordering::Acquire)
    }

    pub fn error(&self) -> Option<String> {
        self.error.lock().clone()
    }

    pub fn report(&self, task_id: &str) -> TaskReport {
        TaskReport {
            task_id: task_id.to_string(),
            status: self.status(),
            progress: self.progress(),
            total_rows: self.total_rows(),
            processed_rows: self.processed_rows(),
            error: self.error(),
        }
    }

    /// Hands over the results of a completed task. Subsequent calls return `None`.
    pub(crate) fn take_results(&self) -> Option<Vec<ValidationResult>> {
        self.results.lock().take()
    }

    fn set_status(&self, status: TaskStatus) {
        self.status.store(status.as_u8(), Ordering::Release);
    }

    fn advance(&self, processed: usize, total: usize) {
        self.processed_rows.store(processed, Ordering::Release);
        self.progress.store(percent(processed, total), Ordering::Release);
    }

    fn complete(&self, results: Vec<ValidationResult>) {
        *self.results.lock() = Some(results);
        self.set_status(TaskStatus::Completed);
    }

    pub(crate) fn fail(&self, message: impl Into<String>) {
        *self.error.lock() = Some(message.into());
        self.results.lock().take();
        self.set_status(TaskStatus::Failed);
    }
}

fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (processed.saturating_mul(100) / total).min(100) as u8
}

/// Runs the validation pipeline over every address of one input.
///
/// Addresses are split into batches of `batch_size`. Within a batch at most
/// `concurrency` validations run at once; progress is published after each
/// batch finishes. Results keep input order.
pub struct ValidationTask {
    id: String,
    validator: Arc<EmailValidator>,
    concurrency: usize,
    batch_size: usize,
    state: Arc<TaskState>,
}

impl ValidationTask {
    pub fn new(id: impl Into<String>, validator: Arc<EmailValidator>, concurrency: Option<usize>) -> Self {
        let config = validator.config();
        let concurrency = concurrency.unwrap_or(config.max_workers).max(1);
        let batch_size = config.batch_size.max(1);
        Self {
            id: id.into(),
            validator,
            concurrency,
            batch_size,
            state: Arc::new(TaskState::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> Arc<TaskState> {
        Arc::clone(&self.state)
    }

    /// Drives the task to a terminal status. The source is released before
    /// this returns, whatever the outcome.
    pub async fn run<S: AddressSource>(self, source: S) -> Result<()> {
        self.state.set_status(TaskStatus::Processing);
        let label = source.describe();
        tracing::info!(target: "batch_task", "[{}] Started on {}", self.id, label);

        let outcome = self.execute(source).await;

        let purged = self.validator.purge_expired();
        if purged > 0 {
            tracing::debug!(target: "batch_task", "[{}] Purged {} expired cache entries", self.id, purged);
        }

        match outcome {
            Ok(results) => {
                tracing::info!(target: "batch_task",
                    "[{}] Completed: {} addresses validated", self.id, results.len());
                self.state.complete(results);
                Ok(())
            }
            Err(e) => {
                tracing::error!(target: "batch_task", "[{}] Failed: {}", self.id, e);
                self.state.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn execute<S: AddressSource>(&self, source: S) -> Result<Vec<ValidationResult>> {
        let addresses = read_source(source).await?;
        if addresses.is_empty() {
            return Err(AppError::EmptyInput);
        }

        let total = addresses.len();
        self.state.total_rows.store(total, Ordering::Release);
        tracing::debug!(target: "batch_task",
            "[{}] {} addresses, batch size {}, concurrency {}",
            self.id, total, self.batch_size, self.concurrency);

        let mut results = Vec::with_capacity(total);
        for (index, batch) in addresses.chunks(self.batch_size).enumerate() {
            let outcomes = self.validate_batch(batch).await;
            results.extend(outcomes);
            self.state.advance(results.len(), total);
            tracing::debug!(target: "batch_task",
                "[{}] Batch {} done: {}/{} ({}%)",
                self.id, index + 1, results.len(), total, self.state.progress());
        }

        Ok(results)
    }

    async fn validate_batch(&self, batch: &[String]) -> Vec<ValidationResult> {
        stream::iter(batch.iter().cloned())
            .map(|email| {
                let validator = Arc::clone(&self.validator);
                async move {
                    let worker = {
                        let validator = Arc::clone(&validator);
                        let email = email.clone();
                        tokio::spawn(async move { validator.validate(&email).await })
                    };
                    match worker.await {
                        Ok(result) => result,
                        Err(e) => {
                            tracing::error!(target: "batch_task",
                                "Validation worker for <{}> failed to join: {}", email, e);
                            validator.aborted(&email, e.to_string())
                        }
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// Reads the source on the blocking pool and drops it there.
async fn read_source<S: AddressSource>(source: S) -> Result<Vec<String>> {
    let read = tokio::task::spawn_blocking(move || {
        let mut source = source;
        let read = source.read_addresses();
        drop(source);
        read
    })
    .await
    .map_err(|e| AppError::Task(format!("Reading input failed: {}", e)))??;

    Ok(read
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::utils::disposable::DisposableDomains;
    use crate::utils::testing::{test_config, FakeResolver, FakeTransport, HostBehaviour};
    use std::time::Duration;

    fn validator(config: Config, resolver: Arc<FakeResolver>) -> Arc<EmailValidator> {
        let transport = FakeTransport::new().otherwise(HostBehaviour::AcceptPrefix("user".into()));
        let disposable: DisposableDomains = ["mailinator.com"].into_iter().collect();
        Arc::new(EmailValidator::new(
            Arc::new(config),
            resolver,
            Arc::new(transport),
            Arc::new(disposable),
        ))
    }

    struct CountedSource {
        addresses: Option<Vec<String>>,
        released: Arc<AtomicUsize>,
    }

    impl AddressSource for CountedSource {
        fn read_addresses(&mut self) -> Result<Vec<String>> {
            self.addresses.take().ok_or_else(|| {
                AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, "unreadable input"))
            })
        }
    }

    impl Drop for CountedSource {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn percent_is_floored_and_capped() {
        assert_eq!(percent(0, 250), 0);
        assert_eq!(percent(100, 250), 40);
        assert_eq!(percent(249, 250), 99);
        assert_eq!(percent(250, 250), 100);
        assert_eq!(percent(300, 250), 100);
        assert_eq!(percent(1, 0), 0);
    }

    #[tokio::test]
    async fn large_batch_reaches_full_progress_in_order() {
        let mut config = test_config();
        config.batch_size = 100;
        config.max_workers = 10;
        let resolver = Arc::new(FakeResolver::new().any_domain().with_delay(Duration::from_millis(1)));
        let validator = validator(config, resolver.clone());

        let addresses: Vec<String> = (0..250)
            .map(|i| format!("user{}@domain{}.com", i, i % 7))
            .collect();
        let task = ValidationTask::new("batch-250", validator, None);
        let state = task.state();
        task.run(addresses.clone()).await.unwrap();

        assert_eq!(state.status(), TaskStatus::Completed);
        assert_eq!(state.total_rows(), 250);
        assert_eq!(state.processed_rows(), 250);
        assert_eq!(state.progress(), 100);
        assert!(resolver.peak_in_flight() <= 10, "peak {}", resolver.peak_in_flight());

        let results = state.take_results().unwrap();
        let emails: Vec<&str> = results.iter().map(|r| r.email.as_str()).collect();
        assert_eq!(emails, addresses.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(results.iter().all(|r| r.smtp_valid && !r.is_catch_all));
    }

    #[tokio::test]
    async fn finished_task_purges_expired_cache_entries() {
        let mut config = test_config();
        config.cache_ttl = Duration::ZERO;
        let validator = validator(config, Arc::new(FakeResolver::new().any_domain()));
        let addresses: Vec<String> = (0..5).map(|i| format!("user@d{}.com", i)).collect();

        ValidationTask::new("purge", Arc::clone(&validator), None)
            .run(addresses)
            .await
            .unwrap();
        assert!(validator.domain_cache().is_empty());
    }

    #[tokio::test]
    async fn explicit_concurrency_overrides_config() {
        let resolver = Arc::new(FakeResolver::new().any_domain().with_delay(Duration::from_millis(2)));
        let validator = validator(test_config(), resolver.clone());
        let addresses: Vec<String> = (0..20).map(|i| format!("user@d{}.com", i)).collect();

        let task = ValidationTask::new("narrow", validator, Some(2));
        task.run(addresses).await.unwrap();
        assert!(resolver.peak_in_flight() <= 2);
    }

    #[tokio::test]
    async fn short_circuited_addresses_still_count() {
        let resolver = Arc::new(FakeResolver::new().any_domain());
        let validator = validator(test_config(), resolver);
        let addresses = vec![
            "not-an-email".to_string(),
            "user@mailinator.com".to_string(),
            "  ".to_string(),
            "admin@example.com".to_string(),
        ];

        let task = ValidationTask::new("mixed", validator, None);
        let state = task.state();
        task.run(addresses).await.unwrap();

        assert_eq!(state.total_rows(), 3);
        assert_eq!(state.processed_rows(), 3);
        assert_eq!(state.progress(), 100);
        let results = state.take_results().unwrap();
        assert_eq!(results[0].errors, vec!["Invalid email syntax".to_string()]);
        assert!(results[1].is_disposable);
        assert!(results[2].is_role);
        assert!(state.take_results().is_none());
    }

    #[tokio::test]
    async fn unreadable_source_fails_and_is_released_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let source = CountedSource {
            addresses: None,
            released: released.clone(),
        };
        let validator = validator(test_config(), Arc::new(FakeResolver::new()));
        let task = ValidationTask::new("broken", validator, None);
        let state = task.state();

        assert!(task.run(source).await.is_err());
        assert_eq!(state.status(), TaskStatus::Failed);
        assert!(state.error().unwrap().contains("unreadable input"));
        assert!(state.take_results().is_none());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_input_fails() {
        let released = Arc::new(AtomicUsize::new(0));
        let source = CountedSource {
            addresses: Some(vec!["".to_string(), "   ".to_string()]),
            released: released.clone(),
        };
        let validator = validator(test_config(), Arc::new(FakeResolver::new()));
        let task = ValidationTask::new("empty", validator, None);
        let state = task.state();

        let err = task.run(source).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyInput));
        assert_eq!(state.status(), TaskStatus::Failed);
        assert_eq!(state.error().as_deref(), Some("No email addresses found in input"));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successful_run_releases_source_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let source = CountedSource {
            addresses: Some(vec!["user@example.com".to_string()]),
            released: released.clone(),
        };
        let validator = validator(test_config(), Arc::new(FakeResolver::new().any_domain()));
        ValidationTask::new("ok", validator, None).run(source).await.unwrap();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
