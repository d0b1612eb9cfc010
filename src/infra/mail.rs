//! Outbound mail transports.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::application::notify::{MailError, Mailer, OutgoingMail};
use crate::config::{MailBackend, MailSettings};

use super::error::InfraError;

/// Writes every message to the log instead of delivering it.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        info!(
            target = "skystore::mail",
            from = %mail.from,
            to = %mail.to.join(","),
            subject = %mail.subject,
            body = %mail.body,
            "mail logged"
        );
        Ok(())
    }
}

/// POSTs each message as JSON to a mail relay.
#[derive(Debug, Clone)]
pub struct WebhookMailer {
    client: Client,
    url: String,
}

impl WebhookMailer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("skystore/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::mail(err.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.url)
            .json(&mail)
            .send()
            .await
            .map_err(|err| MailError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(MailError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

pub fn build_mailer(settings: &MailSettings) -> Result<Arc<dyn Mailer>, InfraError> {
    match &settings.backend {
        MailBackend::Log => Ok(Arc::new(LogMailer)),
        MailBackend::Webhook { url } => Ok(Arc::new(WebhookMailer::new(
            url.clone(),
            settings.timeout,
        )?)),
    }
}
