//! Defines the custom error types for the email-probe engine.

use std::{io, net::AddrParseError};
use thiserror::Error;

/// The primary error type for the verification engine.
#[derive(Error, Debug)]
pub enum AppError {
    /// Error occurring during configuration loading or validation.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error initializing necessary components (e.g., resolvers, transports).
    #[error("Initialization Error: {0}")]
    Initialization(String),

    /// Error related to file input/output operations.
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    /// Error during JSON serialization or deserialization.
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error during DNS resolution.
    #[error("DNS Resolution Error: {0}")]
    Dns(#[from] trust_dns_resolver::error::ResolveError),

    /// Specific DNS error indicating the domain does not exist.
    #[error("Domain Not Found (NXDOMAIN): {0}")]
    NxDomain(String),

    /// Specific DNS error indicating no MX records were found.
    #[error("No MX Records Found: {0}")]
    NoDnsRecords(String),

    /// DNS operation timed out.
    #[error("DNS Timeout for domain: {0}")]
    DnsTimeout(String),

    /// Error during SMTP communication setup or command execution.
    #[error("SMTP Error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// A command before RCPT TO was refused by the server.
    #[error("SMTP Command Error: Code={code}, Message='{message}'")]
    SmtpCommand {
        /// The SMTP status code.
        code: u16,
        /// The message returned by the server.
        message: String,
    },

    /// The whole SMTP exchange with one host exceeded its deadline.
    #[error("SMTP Timeout for host: {0}")]
    SmtpTimeout(String),

    /// SMTP verification was inconclusive (e.g., host could not be resolved).
    #[error("SMTP Inconclusive: {0}")]
    SmtpInconclusive(String),

    /// An envelope address could not be parsed.
    #[error("Address Error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// Error parsing an IP address or socket address.
    #[error("Address Parsing Error: {0}")]
    AddrParse(#[from] AddrParseError),

    /// Error related to concurrency or task execution.
    #[error("Task Execution Error: {0}")]
    Task(String),

    /// The input yielded nothing to validate.
    #[error("No email addresses found in input")]
    EmptyInput,

    /// No task is registered under the given handle.
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// Results were requested before the task completed.
    #[error("Task {0} has not completed")]
    TaskNotReady(String),

    /// An underlying error that doesn't fit other categories, using anyhow.
    #[error("Generic Error: {0}")]
    Generic(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
