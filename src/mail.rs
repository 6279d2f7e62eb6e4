//! Outbound mail: registration confirmation, password reset and the
//! contact form.
//!
//! Handlers talk to a `Mailer` trait object held in `CoreState`. The HTTP
//! relay implementation posts JSON to a mail gateway; without a relay the
//! messages are only logged.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::MailConfig;

const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Mail relay rejected message with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Build the configured mailer.
pub fn mailer_from_config(config: &MailConfig) -> Arc<dyn Mailer> {
    match &config.relay_url {
        Some(url) => Arc::new(HttpRelayMailer::new(url.clone(), config)),
        None => {
            tracing::warn!("MAIL_RELAY_URL not set; outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Message templates
// ═══════════════════════════════════════════════════════════

pub fn registration_email(frontend_url: &str, token: &str) -> (&'static str, String) {
    (
        "Registration Confirmation",
        format!(
            "Please confirm your registration by clicking the following link:\n\n\
             {frontend_url}/confirm-registration/{token}"
        ),
    )
}

pub fn password_reset_email(frontend_url: &str, token: &str) -> (&'static str, String) {
    (
        "Password Reset Request",
        format!(
            "You requested a password reset. Please click the following link to reset your password:\n\n\
             {frontend_url}/reset-password/{token}"
        ),
    )
}

pub fn contact_email(first_name: &str, last_name: &str, email: &str, message: &str) -> (String, String) {
    (
        format!("Contact message from {first_name} {last_name}"),
        format!("Message from: {first_name} {last_name}\nEmail: {email}\n\nMessage:\n{message}"),
    )
}

// ═══════════════════════════════════════════════════════════
// Transports
// ═══════════════════════════════════════════════════════════

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Posts each message as JSON to a mail relay, with basic auth when
/// credentials are configured.
pub struct HttpRelayMailer {
    client: reqwest::Client,
    url: String,
    user: Option<String>,
    pass: Option<String>,
    from: String,
}

impl HttpRelayMailer {
    pub fn new(url: String, config: &MailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            user: config.user.clone(),
            pass: config.pass.clone(),
            from: config.from.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpRelayMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let mut request = self
            .client
            .post(&self.url)
            .timeout(RELAY_TIMEOUT)
            .json(&RelayMessage {
                from: &self.from,
                to,
                subject,
                text: body,
            });
        if let Some(user) = &self.user {
            request = request.basic_auth(user, self.pass.as_deref());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status().as_u16()));
        }
        tracing::info!(to, subject, "mail sent");
        Ok(())
    }
}

/// Logs instead of sending. Bodies carry tokens, so only the envelope is logged.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailError> {
        tracing::info!(to, subject, "mail relay disabled; message not delivered");
        Ok(())
    }
}
