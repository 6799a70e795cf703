//! Outgoing mail.
//!
//! The auth controller only needs one message, the reset-password email.
//! `SmtpMailer` delivers it through an SMTP relay; `LogMailer` is used when
//! no relay is configured and only logs the recipient.

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info};

use crate::config::MailConfig;

#[derive(Debug, Clone)]
pub struct ResetPasswordEmail {
    pub to_email: String,
    pub firstname: String,
    pub lastname: String,
    pub token: String,
    pub reset_link: String,
}

impl ResetPasswordEmail {
    pub fn subject(&self) -> &'static str {
        "Reset your password"
    }

    pub fn body(&self) -> String {
        format!(
            "Hello {} {},\n\n\
             A password reset was requested for your account.\n\
             Follow this link to choose a new password:\n\n{}\n\n\
             Or enter this reset code: {}\n\n\
             If you did not request this, you can ignore this email.\n",
            self.firstname, self.lastname, self.reset_link, self.token
        )
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_reset_password(&self, email: &ResetPasswordEmail) -> anyhow::Result<()>;
}

/// Builds the mailer from config: SMTP when a host is set, logging otherwise.
pub fn from_config(cfg: &MailConfig) -> anyhow::Result<std::sync::Arc<dyn Mailer>> {
    match &cfg.smtp_host {
        Some(host) => Ok(std::sync::Arc::new(SmtpMailer::new(cfg, host)?)),
        None => {
            info!("SMTP_HOST not set; reset emails will only be logged");
            Ok(std::sync::Arc::new(LogMailer))
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_reset_password(&self, email: &ResetPasswordEmail) -> anyhow::Result<()> {
        info!(to_email = %email.to_email, "reset password email (log only)");
        debug!(link = %email.reset_link, "reset link");
        Ok(())
    }
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &MailConfig, host: &str) -> anyhow::Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .with_context(|| format!("smtp relay {host}"))?;
        if let Some(port) = cfg.smtp_port {
            builder = builder.port(port);
        }
        if let (Some(user), Some(pass)) = (&cfg.smtp_username, &cfg.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        let from = cfg
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("invalid MAIL_FROM {}", cfg.from))?;
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_reset_password(&self, email: &ResetPasswordEmail) -> anyhow::Result<()> {
        let to = email
            .to_email
            .parse::<Mailbox>()
            .context("invalid recipient address")?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body())
            .context("build reset email")?;
        self.transport
            .send(message)
            .await
            .context("smtp send")?;
        info!(to_email = %email.to_email, "reset password email sent");
        Ok(())
    }
}
