use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};

mod bot;
mod config;
mod db;
mod discord;
mod fotmob;
#[cfg(test)]
mod testing;

use bot::MatchdayBot;
use config::{Config, StateBackend};
use db::{JsonFileStore, SqliteStore, StateStore};
use discord::{DiscordWebhook, LogNotifier, Notifier};
use fotmob::FotMob;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let timeout = Duration::from_secs(config.http_timeout_secs);

    let notifier: Box<dyn Notifier> = if config.dry_run {
        info!("🟡 DRY RUN mode – messages are logged, state is not written");
        Box::new(LogNotifier)
    } else {
        let url = config
            .discord_webhook_url
            .as_deref()
            .context("DISCORD_WEBHOOK_URL missing")?;
        info!("🔴 LIVE mode – messages WILL be posted to Discord");
        Box::new(DiscordWebhook::new(url, timeout)?)
    };

    let feed = FotMob::new(&config.fotmob_api_url, timeout, config.debug_fotmob_payload)?;

    let store: Box<dyn StateStore> = match config.state_backend {
        StateBackend::Json => Box::new(JsonFileStore::new(&config.state_file)),
        StateBackend::Sqlite => Box::new(SqliteStore::open(&config.state_db_path)?),
    };
    info!(
        "Team {} | state backend: {} | notifier: {}",
        config.team_id,
        store.name(),
        notifier.name()
    );

    let bot = MatchdayBot::new(&config, &feed, notifier.as_ref(), store.as_ref());
    let report = bot.run_cycle(Utc::now()).await?;

    info!(
        "Cycle done: mode={:?} candidates={} duplicates={} delivered={} failed={} persisted={}",
        report.mode,
        report.candidates,
        report.duplicates,
        report.delivered,
        report.failed,
        report.persisted
    );

    if report.failed > 0 {
        error!("{} event(s) could not be delivered; they will be retried next run", report.failed);
        anyhow::bail!("{} delivery failure(s)", report.failed);
    }

    Ok(())
}
