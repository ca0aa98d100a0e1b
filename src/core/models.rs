//! Data records produced by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of validating one address.
///
/// Every flag starts `false`; stages fill them in order and stop at the first
/// failure. `is_valid` is only ever set by [`ValidationResult::finalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub email: String,
    pub syntax_valid: bool,
    pub domain_valid: bool,
    pub smtp_valid: bool,
    pub is_disposable: bool,
    pub is_role: bool,
    pub is_catch_all: bool,
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            syntax_valid: false,
            domain_valid: false,
            smtp_valid: false,
            is_disposable: false,
            is_role: false,
            is_catch_all: false,
            is_valid: false,
            errors: Vec::new(),
        }
    }

    pub fn flags(&self) -> ValidityFlags {
        ValidityFlags {
            syntax_valid: self.syntax_valid,
            domain_valid: self.domain_valid,
            smtp_valid: self.smtp_valid,
            is_disposable: self.is_disposable,
            is_role: self.is_role,
            is_catch_all: self.is_catch_all,
        }
    }

    /// Derives `is_valid` from the other flags.
    pub(crate) fn finalize(mut self, catch_all_invalidates: bool) -> Self {
        self.is_valid = self.flags().is_valid(catch_all_invalidates);
        self
    }

    pub fn to_record(&self) -> ResultRecord {
        ResultRecord::from(self)
    }
}

/// The six inputs to the overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidityFlags {
    pub syntax_valid: bool,
    pub domain_valid: bool,
    pub smtp_valid: bool,
    pub is_disposable: bool,
    pub is_role: bool,
    pub is_catch_all: bool,
}

impl ValidityFlags {
    /// An address is valid when it is well formed, its domain has MX records,
    /// a server accepted it, and it is neither disposable nor a role account.
    /// Catch-all domains count as invalid unless `catch_all_invalidates` is off.
    pub fn is_valid(&self, catch_all_invalidates: bool) -> bool {
        self.syntax_valid
            && self.domain_valid
            && self.smtp_valid
            && !self.is_disposable
            && !self.is_role
            && !(catch_all_invalidates && self.is_catch_all)
    }
}

/// Flat output row, with errors joined by `"; "`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    pub email: String,
    pub syntax_valid: bool,
    pub domain_valid: bool,
    pub smtp_valid: bool,
    pub is_disposable: bool,
    pub is_role: bool,
    pub is_catch_all: bool,
    pub is_valid: bool,
    pub errors: String,
}

impl From<&ValidationResult> for ResultRecord {
    fn from(r: &ValidationResult) -> Self {
        Self {
            email: r.email.clone(),
            syntax_valid: r.syntax_valid,
            domain_valid: r.domain_valid,
            smtp_valid: r.smtp_valid,
            is_disposable: r.is_disposable,
            is_role: r.is_role,
            is_catch_all: r.is_catch_all,
            is_valid: r.is_valid,
            errors: r.errors.join("; "),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Processing => 1,
            TaskStatus::Completed => 2,
            TaskStatus::Failed => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => TaskStatus::Processing,
            2 => TaskStatus::Completed,
            3 => TaskStatus::Failed,
            _ => TaskStatus::Pending,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of a task, as returned by `poll`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub error: Option<String>,
}
