//! Job table: submit batches, poll them, collect their results.

use crate::core::error::{AppError, Result};
use crate::core::models::{TaskReport, TaskStatus, ValidationResult};
use crate::core::source::AddressSource;
use crate::core::task::{TaskState, ValidationTask};
use crate::core::validator::EmailValidator;

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Opaque identifier of a submitted task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskHandle(String);

impl TaskHandle {
    fn generate() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tracks every task until its results are consumed or it is discarded.
///
/// Caches live in the shared [`EmailValidator`], so lookups made for one task
/// benefit the next.
pub struct TaskRegistry {
    validator: Arc<EmailValidator>,
    tasks: RwLock<HashMap<TaskHandle, Arc<TaskState>>>,
}

impl TaskRegistry {
    pub fn new(validator: Arc<EmailValidator>) -> Self {
        Self {
            validator,
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Starts validating `addresses` in the background and returns at once.
    ///
    /// `concurrency` overrides the configured worker count for this task.
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, addresses: Vec<String>, concurrency: Option<usize>) -> TaskHandle {
        self.submit_source(addresses, concurrency)
    }

    pub fn submit_source<S: AddressSource>(&self, source: S, concurrency: Option<usize>) -> TaskHandle {
        let handle = TaskHandle::generate();
        let task = ValidationTask::new(handle.as_str(), Arc::clone(&self.validator), concurrency);
        let state = task.state();
        self.tasks.write().insert(handle.clone(), Arc::clone(&state));
        tracing::info!(target: "task_registry", "Submitted task {}", handle);

        let id = handle.clone();
        tokio::spawn(async move {
            // Errors are already recorded in the task state; only a panic needs handling here.
            if let Err(e) = tokio::spawn(task.run(source)).await {
                tracing::error!(target: "task_registry", "Task {} aborted: {}", id, e);
                state.fail(format!("Task aborted: {}", e));
            }
        });

        handle
    }

    pub fn poll(&self, handle: &TaskHandle) -> Result<TaskReport> {
        Ok(self.state_of(handle)?.report(handle.as_str()))
    }

    /// Returns the results of a completed task and forgets the task.
    pub fn results(&self, handle: &TaskHandle) -> Result<Vec<ValidationResult>> {
        let state = self.state_of(handle)?;
        match state.status() {
            TaskStatus::Completed => {
                self.tasks.write().remove(handle);
                tracing::debug!(target: "task_registry", "Task {} results collected and evicted", handle);
                Ok(state.take_results().unwrap_or_default())
            }
            TaskStatus::Failed => Err(AppError::Task(format!(
                "Task {} failed: {}",
                handle,
                state.error().unwrap_or_default()
            ))),
            TaskStatus::Pending | TaskStatus::Processing => {
                Err(AppError::TaskNotReady(handle.to_string()))
            }
        }
    }

    /// Forgets a task regardless of its status. A running task keeps running
    /// but its results are dropped.
    pub fn discard(&self, handle: &TaskHandle) -> bool {
        let removed = self.tasks.write().remove(handle).is_some();
        if removed {
            tracing::debug!(target: "task_registry", "Task {} discarded", handle);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }

    fn state_of(&self, handle: &TaskHandle) -> Result<Arc<TaskState>> {
        self.tasks
            .read()
            .get(handle)
            .cloned()
            .ok_or_else(|| AppError::UnknownTask(handle.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::disposable::DisposableDomains;
    use crate::utils::testing::{test_config, FakeResolver, FakeTransport, HostBehaviour};
    use std::time::Duration;

    fn registry(resolver: FakeResolver) -> TaskRegistry {
        let validator = EmailValidator::new(
            Arc::new(test_config()),
            Arc::new(resolver),
            Arc::new(FakeTransport::new().otherwise(HostBehaviour::AcceptPrefix("user".into()))),
            Arc::new(DisposableDomains::default()),
        );
        TaskRegistry::new(Arc::new(validator))
    }

    async fn wait_until_terminal(registry: &TaskRegistry, handle: &TaskHandle) -> TaskReport {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let report = registry.poll(handle).unwrap();
                if report.status.is_terminal() {
                    return report;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("task did not finish in time")
    }

    #[tokio::test]
    async fn completed_results_are_consumed_once() {
        let registry = registry(FakeResolver::new().any_domain());
        let handle = registry.submit(
            vec!["user@a.com".into(), "bad".into(), "user@b.com".into()],
            None,
        );
        assert_eq!(registry.len(), 1);

        let report = wait_until_terminal(&registry, &handle).await;
        assert_eq!(report.status, TaskStatus::Completed);
        assert_eq!(report.progress, 100);
        assert_eq!(report.processed_rows, 3);
        assert!(report.error.is_none());

        let results = registry.results(&handle).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_valid);
        assert!(!results[1].syntax_valid);
        assert!(registry.is_empty());
        assert!(matches!(registry.results(&handle), Err(AppError::UnknownTask(_))));
    }

    #[tokio::test]
    async fn results_before_completion_are_refused() {
        let registry = registry(FakeResolver::new().any_domain().with_delay(Duration::from_millis(300)));
        let handle = registry.submit(vec!["user@slow.com".into()], Some(1));

        assert!(matches!(registry.results(&handle), Err(AppError::TaskNotReady(_))));
        assert!(!registry.poll(&handle).unwrap().status.is_terminal());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn failed_task_reports_error_until_discarded() {
        let registry = registry(FakeResolver::new());
        let handle = registry.submit(Vec::new(), None);

        let report = wait_until_terminal(&registry, &handle).await;
        assert_eq!(report.status, TaskStatus::Failed);
        assert_eq!(report.error.as_deref(), Some("No email addresses found in input"));
        assert!(matches!(registry.results(&handle), Err(AppError::Task(_))));

        assert!(registry.discard(&handle));
        assert!(!registry.discard(&handle));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn unknown_handles_are_rejected() {
        let registry = registry(FakeResolver::new());
        let handle = TaskHandle::from("nope".to_string());
        assert!(matches!(registry.poll(&handle), Err(AppError::UnknownTask(_))));
    }

    #[tokio::test]
    async fn handles_are_unique() {
        let registry = registry(FakeResolver::new().any_domain());
        let a = registry.submit(vec!["user@a.com".into()], None);
        let b = registry.submit(vec!["user@a.com".into()], None);
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert_eq!(registry.len(), 2);
    }
}
