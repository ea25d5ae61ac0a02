use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    /// The configured administrators of this installation.
    Admins,
    To(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Recipients,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()>;
}

/// Delivery attempt whose failure is logged and dropped.
pub async fn send_best_effort(mailer: &dyn Mailer, message: EmailMessage) {
    let subject = message.subject.clone();
    if let Err(e) = mailer.send(message).await {
        warn!(error = %e, %subject, "email delivery failed; ignoring");
    }
}

/// Transport that writes each message as a structured log record.
pub struct LogMailer {
    admins: Vec<String>,
}

impl LogMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            admins: config.admins.clone(),
        }
    }

    fn resolve(&self, to: &Recipients) -> Vec<String> {
        match to {
            Recipients::Admins => self.admins.clone(),
            Recipients::To(list) => list.clone(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
        let recipients = self.resolve(&message.to);
        if recipients.is_empty() {
            anyhow::bail!("no recipients for \"{}\"", message.subject);
        }
        info!(
            from = %message.from,
            to = %recipients.join(", "),
            subject = %message.subject,
            body = %message.body,
            "email sent"
        );
        Ok(())
    }
}
