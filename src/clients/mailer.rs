use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct MailerConfig {
    /// Transactional-mail HTTP endpoint. Empty means log-only delivery.
    pub endpoint: String,
    pub api_key: String,
    pub from_address: String,
}

#[derive(Debug, Serialize)]
struct OutboundMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Outbound email delivery. The login flow depends on this for OTP codes,
/// so failures surface to the caller instead of being swallowed.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<()>;
}

/// Posts messages to a transactional-mail HTTP API.
pub struct HttpMailer {
    client: Client,
    config: MailerConfig,
}

impl HttpMailer {
    #[must_use]
    pub const fn new(config: MailerConfig, client: Client) -> Self {
        Self { client, config }
    }
}

#[async_trait::async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<()> {
        let body = OutboundMail {
            from: &self.config.from_address,
            to,
            subject,
            text,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach mail service")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Mail service error: {status} - {body}");
        }

        Ok(())
    }
}

/// Development delivery: writes the message to the log instead of sending.
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<()> {
        info!(to, subject, "Mail (log-only delivery): {text}");
        Ok(())
    }
}
