//! Outbound mail. Delivery is pluggable: production logs the envelope,
//! tests capture messages in memory.

use std::sync::Mutex;

use crate::config::APP_NAME;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail transport unavailable: {0}")]
    Transport(String),
    #[error("Internal lock error")]
    LockPoisoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// Welcome message carrying the temporary password of a new doctor account.
    pub fn account_created(to: &str, full_name: &str, temporary_password: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: format!("{APP_NAME} - your account"),
            body: format!(
                "Hello {full_name},\n\n\
                 An account has been created for you.\n\
                 Email: {to}\n\
                 Temporary password: {temporary_password}\n\n\
                 Please change it after your first sign-in."
            ),
        }
    }

    /// Temporary password issued through the reset flow.
    pub fn temporary_password(to: &str, temporary_password: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: format!("{APP_NAME} - temporary password"),
            body: format!(
                "A password reset was requested for {to}.\n\
                 Temporary password: {temporary_password}\n\n\
                 Use it on the reset page to choose a new password."
            ),
        }
    }
}

pub trait Mailer: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Default mailer: records that a message went out, never its body.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "Mail dispatched");
        Ok(())
    }
}

/// Captures sent mail in an outbox.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<OutgoingMail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    pub fn last_to(&self, recipient: &str) -> Option<OutgoingMail> {
        self.sent().into_iter().rev().find(|m| m.to == recipient)
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        self.outbox
            .lock()
            .map_err(|_| MailError::LockPoisoned)?
            .push(mail.clone());
        Ok(())
    }
}
