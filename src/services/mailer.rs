//! Outbound mail for account verification.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    address::AddressError,
    message::Mailbox,
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid Address: {0}")]
    InvalidEmailAddress(String),
    #[error("Send error: {0}")]
    SendError(String),
    #[error("Env Var Missing: {0}")]
    EnvVarMissing(String),
}

impl From<AddressError> for MailError {
    fn from(err: AddressError) -> Self {
        MailError::InvalidEmailAddress(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        MailError::SendError(err.to_string())
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_email(&self, to: &str, token: &str) -> Result<(), MailError>;
}

/// Link a recipient follows to confirm their address.
pub fn verification_link(link_base: &str, token: &str) -> String {
    format!("{link_base}{token}")
}

fn env_var(name: &str) -> Result<String, MailError> {
    std::env::var(name).map_err(|_| MailError::EnvVarMissing(name.to_string()))
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    sender: Mailbox,
    verification_link_base: String,
}

impl SmtpMailer {
    /// Reads `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`,
    /// `SMTP_FROM` and `SMTP_TLS_DISABLED`.
    pub fn from_env(verification_link_base: String) -> Result<Self, MailError> {
        let host = env_var("SMTP_HOST")?;
        let port: u16 = env_var("SMTP_PORT")?
            .parse()
            .map_err(|_| MailError::EnvVarMissing("SMTP_PORT".into()))?;
        let sender: Mailbox = env_var("SMTP_FROM")?.parse()?;

        let disabled_tls = std::env::var("SMTP_TLS_DISABLED")
            .unwrap_or_else(|_| "false".to_string())
            .eq_ignore_ascii_case("true");

        let transport = if disabled_tls {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&host)
                .port(port)
                .build()
        } else {
            let creds = Credentials::new(env_var("SMTP_USERNAME")?, env_var("SMTP_PASSWORD")?);
            let tls = TlsParameters::new(host.clone())?;

            AsyncSmtpTransport::<Tokio1Executor>::relay(&host)?
                .port(port)
                .tls(Tls::Required(tls))
                .credentials(creds)
                .build()
        };

        Ok(Self {
            transport: Arc::new(transport),
            sender,
            verification_link_base,
        })
    }

    async fn send_email(&self, to: &str, subject: &str, body: String) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.sender.clone())
            .to(to.parse::<Mailbox>()?)
            .subject(subject)
            .body(body)?;

        self.transport.send(email).await.map(|_| ())?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification_email(&self, to: &str, token: &str) -> Result<(), MailError> {
        let body = format!(
            "Thanks for signing up!\n\nVerify here:\n{}",
            verification_link(&self.verification_link_base, token)
        );
        self.send_email(to, "Verify your email", body).await
    }
}
