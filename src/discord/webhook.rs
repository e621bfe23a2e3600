use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::Notifier;

/// Posts plain-text messages to a Discord webhook.
#[derive(Clone)]
pub struct DiscordWebhook {
    http: Client,
    webhook_url: String,
}

impl DiscordWebhook {
    pub fn new(webhook_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(DiscordWebhook {
            http,
            webhook_url: webhook_url.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    fn name(&self) -> &str {
        "discord"
    }

    /// Discord answers 204 with an empty body; only the status is checked.
    async fn send(&self, message: &str) -> Result<()> {
        let body = serde_json::json!({ "content": message });

        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .context("Discord webhook request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Discord webhook error {}: {}", status, body);
        }

        debug!("Discord webhook accepted message ({} chars)", message.len());
        Ok(())
    }
}

/// Dry-run notifier: logs what would have been posted.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn send(&self, message: &str) -> Result<()> {
        info!("[DRY_RUN] Would post:\n{}", message);
        Ok(())
    }
}
