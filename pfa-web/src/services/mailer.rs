//! Outbound email over SMTP
//!
//! lettre's synchronous transport runs on the blocking pool; the async
//! [`Mailer`] trait lets tests swap in a recorder.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Attachment, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use pfa_common::config::SmtpConfig;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP is not configured (set [smtp] host and from)")]
    NotConfigured,

    #[error("Invalid email address {0:?}")]
    Address(String),

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("Failed to send email: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<MailAttachment>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// SMTP mailer built from `[smtp]` configuration
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<SmtpTransport, MailError> {
        let host = self.config.host.trim();

        let mut builder = if self.config.use_tls {
            SmtpTransport::starttls_relay(host)
                .map_err(|e| MailError::Transport(format!("invalid SMTP host: {e}")))?
                .port(self.config.port)
        } else {
            SmtpTransport::builder_dangerous(host).port(self.config.port)
        };

        if !self.config.username.trim().is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ));
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if !self.is_configured() {
            return Err(MailError::NotConfigured);
        }

        let recipient = mail.to.clone();
        let message = build_message(&self.config.from, mail)?;
        let transport = self.transport()?;

        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?
            .map_err(|e| {
                warn!(to = %recipient, error = %e, "SMTP delivery failed");
                MailError::Transport(e.to_string())
            })?;

        info!(to = %recipient, "Email sent");
        Ok(())
    }
}

/// Assemble a plain-text message with an optional attachment
pub fn build_message(from: &str, mail: OutgoingMail) -> Result<Message, MailError> {
    let from: Mailbox = from
        .trim()
        .parse()
        .map_err(|_| MailError::Address(from.to_string()))?;
    let to: Mailbox = mail
        .to
        .trim()
        .parse()
        .map_err(|_| MailError::Address(mail.to.clone()))?;

    let builder = Message::builder().from(from).to(to).subject(mail.subject);

    let message = match mail.attachment {
        Some(attachment) => {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| MailError::Build(e.to_string()))?;
            builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(mail.body))
                    .singlepart(Attachment::new(attachment.file_name).body(attachment.bytes, content_type)),
            )
        }
        None => builder.body(mail.body),
    };

    message.map_err(|e| MailError::Build(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: &str) -> OutgoingMail {
        OutgoingMail {
            to: to.to_string(),
            subject: "Expenses".to_string(),
            body: "Attached.".to_string(),
            attachment: Some(MailAttachment {
                file_name: "report.zip".to_string(),
                content_type: "application/zip".to_string(),
                bytes: vec![0x50, 0x4b, 0x05, 0x06],
            }),
        }
    }

    #[test]
    fn test_build_message_with_attachment() {
        let message = build_message("Finance <me@example.com>", mail("boss@example.com")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Expenses"));
        assert!(raw.contains("report.zip"));
        assert!(raw.contains("application/zip"));
    }

    #[test]
    fn test_bad_recipient() {
        let err = build_message("me@example.com", mail("not an address")).unwrap_err();
        assert!(matches!(err, MailError::Address(_)));
    }

    #[tokio::test]
    async fn test_unconfigured_mailer_refuses() {
        let mailer = SmtpMailer::new(SmtpConfig::default());
        assert!(!mailer.is_configured());
        assert!(matches!(mailer.send(mail("a@b.com")).await, Err(MailError::NotConfigured)));
    }
}
