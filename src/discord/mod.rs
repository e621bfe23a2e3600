pub mod webhook;

use anyhow::Result;
use async_trait::async_trait;

pub use webhook::{DiscordWebhook, LogNotifier};

/// One-way "deliver a text message" endpoint.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
