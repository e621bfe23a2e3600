use clap::{Parser, ValueEnum};

use crate::bot::schedule::ScheduleConfig;

/// Upper bound for every minute-valued window (one week).
const MAX_WINDOW_MINUTES: i64 = 7 * 24 * 60;

/// Upper bound for every hour-valued horizon (one year).
const MAX_HORIZON_HOURS: i64 = 365 * 24;

/// Where the delivered-event ids are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StateBackend {
    Json,
    Sqlite,
}

/// FotMob matchday notifier
#[derive(Parser, Debug, Clone)]
#[command(name = "matchday-bot", version, about)]
pub struct Config {
    /// FotMob team id to follow
    #[arg(long, env = "TEAM_ID", default_value = "1186081")]
    pub team_id: u64,

    /// Discord webhook URL (required unless dry-run)
    #[arg(long, env = "DISCORD_WEBHOOK_URL")]
    pub discord_webhook_url: Option<String>,

    /// Log messages instead of posting them; state is never written
    #[arg(long, env = "DRY_RUN", default_value = "false")]
    pub dry_run: bool,

    /// How long before kickoff the "match soon" notice may fire
    #[arg(long, env = "PREMATCH_WINDOW_MINUTES", default_value = "120")]
    pub prematch_window_minutes: i64,

    /// Matches kicking off further ahead than this are ignored
    #[arg(long, env = "MATCH_LOOKAHEAD_HOURS", default_value = "24")]
    pub match_lookahead_hours: i64,

    /// Fast polling starts this long before kickoff
    #[arg(long, env = "FAST_WINDOW_BEFORE_MINUTES", default_value = "90")]
    pub fast_window_before_minutes: i64,

    /// Fast polling continues this long after the expected final whistle
    #[arg(long, env = "FAST_WINDOW_AFTER_MINUTES", default_value = "30")]
    pub fast_window_after_minutes: i64,

    /// Expected kickoff-to-final-whistle duration
    #[arg(long, env = "EXPECTED_MATCH_DURATION_MINUTES", default_value = "120")]
    pub expected_match_duration_minutes: i64,

    /// Outside fast windows, run only on minutes divisible by this
    #[arg(long, env = "SLOW_POLL_INTERVAL_MINUTES", default_value = "30")]
    pub slow_poll_interval_minutes: u32,

    /// How far back the latest-finished recap may look
    #[arg(long, env = "MAX_FINISHED_AGE_HOURS", default_value = "168")]
    pub max_finished_age_hours: i64,

    /// Post this message and exit (webhook smoke test)
    #[arg(long, env = "DISCORD_TEST_MESSAGE")]
    pub discord_test_message: Option<String>,

    /// Announce the next upcoming match and exit
    #[arg(long, env = "SEND_NEXT_MATCH_NOW", default_value = "false")]
    pub send_next_match_now: bool,

    /// Post a recap of the latest finished match and exit
    #[arg(long, env = "SEND_LATEST_FINISHED_MATCH_NOW", default_value = "false")]
    pub send_latest_finished_match_now: bool,

    /// Post the recap even if it was already delivered (implies recap mode)
    #[arg(long, env = "FORCE_POST", default_value = "false")]
    pub force_post: bool,

    /// Log payload diagnostics for match-detail fetches and recaps
    #[arg(long, env = "DEBUG_FOTMOB_PAYLOAD", default_value = "false")]
    pub debug_fotmob_payload: bool,

    /// State backend
    #[arg(long, env = "STATE_BACKEND", value_enum, default_value = "json")]
    pub state_backend: StateBackend,

    /// JSON state file path
    #[arg(long, env = "STATE_FILE", default_value = ".state/posted_events.json")]
    pub state_file: String,

    /// SQLite state database path
    #[arg(long, env = "STATE_DB_PATH", default_value = ".state/posted_events.db")]
    pub state_db_path: String,

    /// FotMob API base URL
    #[arg(long, env = "FOTMOB_API_URL", default_value = "https://www.fotmob.com/api")]
    pub fotmob_api_url: String,

    /// Timeout for every outbound HTTP call, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "20")]
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.dry_run && self.discord_webhook_url.is_none() {
            anyhow::bail!(
                "DISCORD_WEBHOOK_URL is required unless DRY_RUN is enabled."
            );
        }
        if self.slow_poll_interval_minutes == 0 {
            anyhow::bail!("slow_poll_interval_minutes must be at least 1");
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("http_timeout_secs must be positive");
        }
        for (name, value) in [
            ("prematch_window_minutes", self.prematch_window_minutes),
            ("fast_window_before_minutes", self.fast_window_before_minutes),
            ("fast_window_after_minutes", self.fast_window_after_minutes),
            ("expected_match_duration_minutes", self.expected_match_duration_minutes),
        ] {
            if !(0..=MAX_WINDOW_MINUTES).contains(&value) {
                anyhow::bail!("{} must be between 0 and {}", name, MAX_WINDOW_MINUTES);
            }
        }
        if !(0..=MAX_HORIZON_HOURS).contains(&self.match_lookahead_hours) {
            anyhow::bail!("match_lookahead_hours must be between 0 and {}", MAX_HORIZON_HOURS);
        }
        if !(1..=MAX_HORIZON_HOURS).contains(&self.max_finished_age_hours) {
            anyhow::bail!("max_finished_age_hours must be between 1 and {}", MAX_HORIZON_HOURS);
        }
        Ok(())
    }

    /// Recap mode is requested explicitly or implied by FORCE_POST.
    pub fn recap_mode(&self) -> bool {
        self.send_latest_finished_match_now || self.force_post
    }

    pub fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            fast_window_before_minutes: self.fast_window_before_minutes,
            fast_window_after_minutes: self.fast_window_after_minutes,
            expected_match_duration_minutes: self.expected_match_duration_minutes,
            slow_poll_interval_minutes: self.slow_poll_interval_minutes,
        }
    }
}
