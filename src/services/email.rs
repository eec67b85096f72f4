//! Outbound email: verification and password-reset messages.

use async_trait::async_trait;
use std::sync::Arc;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::info;

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

pub fn verification_email(frontend_url: &str, to: &str, token: &str) -> OutgoingMail {
    let link = format!("{}/verify-email/{}", frontend_url.trim_end_matches('/'), token);
    OutgoingMail {
        to: to.to_string(),
        subject: "Verify Your Email - Research Collaboration Platform".to_string(),
        html: format!(
            "<h2>Welcome to the Research Collaboration Platform</h2>\
             <p>Please verify your email address to activate your account:</p>\
             <p><a href=\"{link}\">Verify Email</a></p>\
             <p>This link expires in 24 hours.</p>"
        ),
    }
}

pub fn password_reset_email(frontend_url: &str, to: &str, token: &str) -> OutgoingMail {
    let link = format!("{}/reset-password/{}", frontend_url.trim_end_matches('/'), token);
    OutgoingMail {
        to: to.to_string(),
        subject: "Password Reset - Research Collaboration Platform".to_string(),
        html: format!(
            "<h2>Password Reset Request</h2>\
             <p>Use the link below to choose a new password:</p>\
             <p><a href=\"{link}\">Reset Password</a></p>\
             <p>This link expires in 1 hour. If you did not request a reset, ignore this email.</p>"
        ),
    }
}

/// SMTP delivery via STARTTLS relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig, host: &str) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.parse().map_err(|e: lettre::address::AddressError| {
                MailError::InvalidAddress(format!("{}: {}", self.from, e))
            })?)
            .to(mail
                .to
                .parse()
                .map_err(|e: lettre::address::AddressError| MailError::InvalidAddress(format!("{}: {}", mail.to, e)))?)
            .subject(mail.subject)
            .header(ContentType::TEXT_HTML)
            .body(mail.html)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        info!("Email sent to {}", mail.to);
        Ok(())
    }
}

/// Development mailer: logs the message instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        info!(to = %mail.to, subject = %mail.subject, "Email not delivered (no SMTP host configured)");
        tracing::debug!("{}", mail.html);
        Ok(())
    }
}

/// Picks SMTP when a host is configured, otherwise logs.
pub fn mailer_from_config(config: &EmailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match config.smtp_host.as_deref() {
        Some(host) => Ok(Arc::new(SmtpMailer::new(config, host)?)),
        None => Ok(Arc::new(LogMailer)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_point_at_frontend_routes() {
        let mail = verification_email("http://localhost:3000/", "ada@example.org", "abc123");
        assert!(mail.html.contains("http://localhost:3000/verify-email/abc123"));
        assert_eq!(mail.to, "ada@example.org");

        let mail = password_reset_email("https://hub.example", "ada@example.org", "def456");
        assert!(mail.html.contains("https://hub.example/reset-password/def456"));
    }

    #[tokio::test]
    async fn log_mailer_never_fails() {
        let mail = verification_email("http://x", "a@b.c", "t");
        assert!(LogMailer.send(mail).await.is_ok());
    }
}
