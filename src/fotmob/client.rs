use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::provider::FeedProvider;

/// Number of body characters logged when a payload is not JSON.
const PREVIEW_CHARS: usize = 300;

/// Feed provider backed by the public FotMob JSON API.
pub struct FotMob {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
    debug_payload: bool,
}

impl FotMob {
    pub fn new(base_url: &str, timeout: Duration, debug_payload: bool) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(FotMob {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            debug_payload,
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let url = format!("{}/{}", self.base_url, path);
        Url::parse_with_params(&url, params).with_context(|| format!("Invalid feed URL {}", url))
    }
}

#[async_trait]
impl FeedProvider for FotMob {
    fn name(&self) -> &str {
        "FotMob"
    }

    async fn fetch_team_fixtures(&self, team_id: u64) -> Result<Value> {
        let team_id = team_id.to_string();
        let url = self.endpoint("teams", &[("id", team_id.as_str())])?;
        debug!("Fetching team fixtures from {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("FotMob team request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("FotMob team fixtures error: {}", resp.status());
        }

        resp.json::<Value>()
            .await
            .context("Failed to parse FotMob team response")
    }

    /// A non-JSON body (block pages, maintenance HTML) yields an empty
    /// object so callers fall through to "no goal data".
    async fn fetch_match_details(&self, match_id: &str) -> Result<Value> {
        let url = self.endpoint("matchDetails", &[("matchId", match_id)])?;
        debug!("Fetching match details from {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("FotMob matchDetails request failed")?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !status.is_success() {
            anyhow::bail!("FotMob matchDetails error for {}: {}", match_id, status);
        }

        let body = resp
            .text()
            .await
            .context("Failed to read FotMob matchDetails body")?;
        let parsed = parse_json_body(&body);

        if self.debug_payload {
            info!(
                "matchDetails fetch debug: match_id={} status_code={} content_type={} json_parse_ok={}",
                match_id,
                status.as_u16(),
                content_type,
                parsed.is_some()
            );
            if parsed.is_none() {
                info!("matchDetails non-JSON preview: {}", body_preview(&body));
            }
        }

        Ok(parsed.unwrap_or_else(|| {
            warn!("matchDetails for {} was not JSON, using empty payload", match_id);
            Value::Object(Default::default())
        }))
    }
}

/// Parse a body that should hold a JSON object. Empty bodies parse as `{}`.
pub(crate) fn parse_json_body(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return Some(Value::Object(Default::default()));
    }
    serde_json::from_str(body).ok()
}

fn body_preview(body: &str) -> String {
    body.chars().take(PREVIEW_CHARS).collect::<String>().replace('\n', " ")
}
