//! Outcome types for SMTP probes.

use std::fmt;

/// The server's reply to `RCPT TO`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcptReply {
    pub code: u16,
    pub message: String,
}

impl RcptReply {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Only an exact 250 counts as acceptance.
    pub fn is_accepted(&self) -> bool {
        self.code == 250
    }
}

impl fmt::Display for RcptReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// What happened when one MX host was tried.
#[derive(Debug, Clone)]
pub struct HostAttempt {
    pub host: String,
    /// Reply code when the server answered; `None` when it could not be reached
    /// or the exchange broke down before a reply.
    pub code: Option<u16>,
    pub note: String,
}

impl HostAttempt {
    pub fn answered(&self) -> bool {
        self.code.is_some()
    }
}

/// Result of one full pass over a domain's MX hosts.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// A host answered 250 to RCPT TO.
    Accepted { host: String },
    /// Every host answered, none with 250.
    Rejected { attempts: Vec<HostAttempt> },
    /// No host accepted and at least one could not be reached.
    Exhausted { attempts: Vec<HostAttempt> },
    /// The domain resolved but lists no usable mail exchangers.
    NoMailExchangers,
}

impl ScanOutcome {
    /// Classifies a pass in which no host accepted.
    pub(crate) fn from_attempts(attempts: Vec<HostAttempt>) -> Self {
        if attempts.iter().all(HostAttempt::answered) {
            ScanOutcome::Rejected { attempts }
        } else {
            ScanOutcome::Exhausted { attempts }
        }
    }

    /// Whether another scan could plausibly produce a different answer.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScanOutcome::Exhausted { .. })
    }
}
