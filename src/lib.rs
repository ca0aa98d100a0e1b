//! # Email Probe Core Library
//!
//! This crate checks whether email addresses are likely deliverable without
//! sending any mail: syntax, MX records, a non-delivering SMTP `RCPT TO`
//! probe with MX fallback and retries, catch-all detection, and disposable
//! and role-account heuristics.
//!
//! It is designed to be used either directly as a library or via the
//! `email-probe` command-line tool (which uses this library).

mod core;
mod utils;

pub use crate::core::config::{load_config, Config, ConfigBuilder, ConfigFile};
pub use crate::core::error::{AppError, Result};
pub use crate::core::models::{
    ResultRecord, TaskReport, TaskStatus, ValidationResult, ValidityFlags,
};
pub use crate::core::registry::{TaskHandle, TaskRegistry};
pub use crate::core::source::{AddressSource, FileAddressSource};
pub use crate::core::task::{TaskState, ValidationTask};
pub use crate::core::validator::{EmailValidator, PipelineError};
pub use crate::utils::cache::TtlCache;
pub use crate::utils::disposable::DisposableDomains;
pub use crate::utils::dns::{MailExchanger, MxResolver, TrustDnsResolver};
pub use crate::utils::smtp::{LettreTransport, RcptReply, RcptTransport};

use crate::utils::smtp::test_smtp_connectivity;
use std::sync::Arc;

/// Builds a validator wired to the real DNS resolver and SMTP transport.
pub async fn initialize_validator(config: Arc<Config>) -> Result<EmailValidator> {
    EmailValidator::from_config(config).await
}

/// Performs an early check for outbound SMTP connectivity.
pub async fn check_smtp_connectivity(config: &Config) -> Result<()> {
    test_smtp_connectivity(config).await
}

/// Validates a single address.
pub async fn validate_single_email(validator: &EmailValidator, email: &str) -> ValidationResult {
    tracing::info!(target: "validation_task", "Validating <{}>", email);
    let result = validator.validate(email).await;
    tracing::info!(target: "validation_task",
        "<{}> is {} ({})",
        email,
        if result.is_valid { "valid" } else { "not valid" },
        if result.errors.is_empty() { "no errors".to_string() } else { result.errors.join("; ") }
    );
    result
}
