//! Outgoing mail.
//!
//! The auth service only needs to deliver password reset links. Delivery
//! goes through the [`Mailer`] trait so the transport can be swapped; the
//! default [`LogMailer`] writes messages to the log.

use std::sync::Mutex;

use amc_core::ServiceError;

/// A message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Pluggable mail transport.
pub trait Mailer: Send + Sync + 'static {
    fn send(&self, mail: &OutgoingMail) -> Result<(), ServiceError>;
}

/// Writes every message to the log instead of delivering it.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), ServiceError> {
        tracing::info!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            "outgoing mail:\n{}",
            mail.body
        );
        Ok(())
    }
}

/// Keeps sent messages in memory. Used by tests and local runs.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every message sent so far.
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), ServiceError> {
        self.sent
            .lock()
            .map_err(|e| ServiceError::Internal(e.to_string()))?
            .push(mail.clone());
        Ok(())
    }
}
