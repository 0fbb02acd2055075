//! Failure notifications for dependencies whose license could not be found.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook URL missing")]
    MissingWebhook,

    #[error("unable to make request to slack webhook")]
    Transport(#[from] reqwest::Error),

    #[error("non-ok response returned from Slack: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Report that no license could be found for `dependency` of `product`.
    async fn notify_license_gap(&self, product: &str, dependency: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    text: &'a str,
}

/// Posts to a Slack incoming webhook, which answers a plain `ok` on success.
pub struct SlackNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl SlackNotifier {
    pub fn new(webhook_url: Option<String>) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self::with_client(client, webhook_url))
    }

    pub fn with_client(client: Client, webhook_url: Option<String>) -> Self {
        SlackNotifier {
            client,
            webhook_url: webhook_url.filter(|url| !url.is_empty()),
        }
    }
}

pub fn license_gap_message(product: &str, dependency: &str) -> String {
    format!("Failed to retrieve license for product: {product}, dependency: {dependency}")
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify_license_gap(&self, product: &str, dependency: &str) -> Result<(), NotifyError> {
        let url = self.webhook_url.as_deref().ok_or(NotifyError::MissingWebhook)?;
        let text = license_gap_message(product, dependency);

        let body = self
            .client
            .post(url)
            .json(&SlackMessage { text: &text })
            .send()
            .await?
            .text()
            .await?;

        if body.trim() != "ok" {
            return Err(NotifyError::Rejected(body));
        }
        tracing::info!(product, dependency, "posted license failure notification");
        Ok(())
    }
}
