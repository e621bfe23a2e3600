use chrono::{DateTime, Utc};
use chrono_tz::Europe::London;
use serde_json::Value;

use crate::db::models::MatchRecord;
use crate::fotmob::normalize::value_to_i64;

/// Kickoff in the tracked team's home league timezone.
pub fn kickoff_london(kickoff: DateTime<Utc>) -> String {
    kickoff.with_timezone(&London).format("%d-%m-%Y %H:%M").to_string()
}

/// `"2 - 1"` -> `"2-1"`.
pub fn compact_score(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Feed score string first, then `home-away`, else `-`.
pub fn match_score(record: &MatchRecord) -> String {
    if let Some(s) = record.status.score_str.as_deref() {
        return compact_score(s);
    }
    match (record.home.score, record.away.score) {
        (Some(h), Some(a)) => format!("{}-{}", h, a),
        _ => "-".to_string(),
    }
}

/// Score from a match-detail payload, falling back to the fixture record.
pub fn details_score(details: &Value, record: &MatchRecord) -> String {
    let score_str = details["general"]["status"]["scoreStr"]
        .as_str()
        .or_else(|| details["header"]["status"]["scoreStr"].as_str())
        .filter(|s| !s.trim().is_empty());
    if let Some(s) = score_str {
        return compact_score(s);
    }
    let home = value_to_i64(&details["general"]["homeTeam"]["score"]);
    let away = value_to_i64(&details["general"]["awayTeam"]["score"]);
    match (home, away) {
        (Some(h), Some(a)) => format!("{}-{}", h, a),
        _ => match_score(record),
    }
}

/// `🏆 League Round 1` (round omitted when empty).
pub fn competition_line(record: &MatchRecord) -> String {
    format!("🏆 {} {}", record.competition, record.round)
        .trim_end()
        .to_string()
}

pub fn venue_line(record: &MatchRecord) -> Option<String> {
    record.venue.as_ref().map(|v| format!("🏟️ Stadium: {}", v))
}

/// Join message lines, dropping absent ones.
pub fn lines<I>(parts: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    parts.into_iter().flatten().collect::<Vec<_>>().join("\n")
}
