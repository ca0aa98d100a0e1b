//! The network side of a probe: one connection, one envelope, no DATA.

use super::result::RcptReply;
use crate::core::config::Config;
use crate::core::error::{AppError, Result};

use async_trait::async_trait;
use lettre::transport::smtp::client::SmtpConnection;
use lettre::transport::smtp::commands::{Mail, Rcpt};
use lettre::transport::smtp::extension::ClientId;
use lettre::transport::smtp::response::{Code, Response};
use lettre::Address;
use std::net::ToSocketAddrs;
use std::str::FromStr;
use std::time::Duration;

#[async_trait]
pub trait RcptTransport: Send + Sync {
    /// Connects to `host`, greets, sends `MAIL FROM:<sender>` and
    /// `RCPT TO:<recipient>`, and returns the RCPT reply. The connection is
    /// closed before returning.
    ///
    /// A refused `MAIL FROM` is reported as [`AppError::SmtpCommand`] with the
    /// server's code. Other errors mean the host gave no answer at all.
    async fn rcpt_probe(&self, host: &str, sender: &str, recipient: &str) -> Result<RcptReply>;
}

/// `RcptTransport` over a plaintext `lettre` SMTP connection.
#[derive(Clone)]
pub struct LettreTransport {
    port: u16,
    timeout: Duration,
    helo_name: ClientId,
}

impl LettreTransport {
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.smtp_port,
            timeout: config.smtp_timeout,
            helo_name: ClientId::Domain(config.helo_name.clone()),
        }
    }
}

#[async_trait]
impl RcptTransport for LettreTransport {
    async fn rcpt_probe(&self, host: &str, sender: &str, recipient: &str) -> Result<RcptReply> {
        let sender_address = Address::from_str(sender)?;
        let recipient_address = Address::from_str(recipient)?;

        let server = host.to_string();
        let port = self.port;
        let timeout = self.timeout;
        let helo_name = self.helo_name.clone();

        // lettre's client is blocking; keep it off the async workers.
        let handle = tokio::task::spawn_blocking(move || {
            blocking_rcpt_probe(
                &server,
                port,
                timeout,
                &helo_name,
                &sender_address,
                &recipient_address,
            )
        });

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(AppError::Task(format!(
                "SMTP probe task for {} failed: {}",
                host, join_err
            ))),
            Err(_) => {
                tracing::warn!(target: "smtp_task", "SMTP exchange with {} exceeded {:?}", host, self.timeout);
                Err(AppError::SmtpTimeout(host.to_string()))
            }
        }
    }
}

fn blocking_rcpt_probe(
    host: &str,
    port: u16,
    timeout: Duration,
    helo_name: &ClientId,
    sender: &Address,
    recipient: &Address,
) -> Result<RcptReply> {
    let socket_addr = (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        AppError::SmtpInconclusive(format!("Could not resolve mail server address: {}", host))
    })?;

    tracing::debug!(target: "smtp_task", "Connecting to {} ({})", host, socket_addr);
    // connect() reads the banner and performs EHLO.
    let mut conn = SmtpConnection::connect(socket_addr, Some(timeout), helo_name, None, None)?;

    let outcome = exchange_envelope(&mut conn, host, sender, recipient);

    if let Err(e) = conn.quit() {
        tracing::debug!(target: "smtp_task", "QUIT to {} failed ({}), aborting connection", host, e);
        conn.abort();
    }
    outcome
}

fn exchange_envelope(
    conn: &mut SmtpConnection,
    host: &str,
    sender: &Address,
    recipient: &Address,
) -> Result<RcptReply> {
    tracing::debug!(target: "smtp_task", "Sending MAIL FROM:<{}> to {}...", sender, host);
    if let Err(e) = conn.command(Mail::new(Some(sender.clone()), vec![])) {
        return Err(match e.status() {
            Some(code) => AppError::SmtpCommand {
                code: code_value(code),
                message: e.to_string(),
            },
            None => AppError::Smtp(e),
        });
    }

    tracing::debug!(target: "smtp_task", "Sending RCPT TO:<{}> to {}...", recipient, host);
    match conn.command(Rcpt::new(recipient.clone(), vec![])) {
        Ok(response) => {
            let reply = reply_from_response(&response);
            tracing::debug!(target: "smtp_task", "RCPT TO:<{}> on {}: {}", recipient, host, reply);
            Ok(reply)
        }
        // lettre reports negative replies as errors; the code is still the answer.
        Err(e) => match e.status() {
            Some(code) => {
                let reply = RcptReply::new(code_value(code), e.to_string());
                tracing::debug!(target: "smtp_task", "RCPT TO:<{}> refused by {}: {}", recipient, host, reply);
                Ok(reply)
            }
            None => Err(AppError::Smtp(e)),
        },
    }
}

fn reply_from_response(response: &Response) -> RcptReply {
    RcptReply::new(
        code_value(response.code()),
        response.message().collect::<Vec<&str>>().join(" "),
    )
}

fn code_value(code: Code) -> u16 {
    code.to_string().parse().unwrap_or(0)
}

/// Tests basic SMTP connectivity to a known reliable server (Google).
/// This helps diagnose if outbound port 25 is generally blocked.
pub async fn test_smtp_connectivity(config: &Config) -> Result<()> {
    tracing::info!("Testing outbound SMTP (port {}) connectivity...", config.smtp_port);

    let test_server = "gmail-smtp-in.l.google.com";
    let port = config.smtp_port;
    let timeout = Duration::from_secs(5);
    let helo_name = ClientId::Domain(config.helo_name.clone());

    let handle = tokio::task::spawn_blocking(move || -> Result<()> {
        let socket_addr = (test_server, port)
            .to_socket_addrs()
            .map_err(|e| AppError::Config(format!("DNS resolution failed for {}: {}", test_server, e)))?
            .next()
            .ok_or_else(|| {
                AppError::Config(format!("Could not resolve any IP address for {}", test_server))
            })?;
        let mut conn = SmtpConnection::connect(socket_addr, Some(timeout), &helo_name, None, None)?;
        conn.quit().ok();
        Ok(())
    });

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(Ok(()))) => {
            tracing::info!("SMTP connectivity test successful (connected to {}).", test_server);
            Ok(())
        }
        Ok(Ok(Err(e))) => {
            tracing::error!("SMTP connectivity test failed: {}", e);
            Err(e)
        }
        Ok(Err(join_err)) => Err(AppError::Task(format!(
            "SMTP connectivity test task failed: {}",
            join_err
        ))),
        Err(_) => {
            tracing::error!(
                "SMTP connectivity test timed out connecting to {}. Outbound port {} is likely blocked.",
                test_server,
                port
            );
            Err(AppError::SmtpInconclusive(format!(
                "SMTP connection timed out - port {} is likely blocked.",
                port
            )))
        }
    }
}
