use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Read-only source of fixture snapshots and per-match detail payloads.
#[async_trait]
pub trait FeedProvider: Send + Sync {
    /// Raw fixtures snapshot for one team.
    async fn fetch_team_fixtures(&self, team_id: u64) -> Result<Value>;

    /// Raw detail payload (goals, incidents) for one match.
    async fn fetch_match_details(&self, match_id: &str) -> Result<Value>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
