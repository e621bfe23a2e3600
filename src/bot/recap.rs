//! One-off announcements: next fixture and latest finished-match recap.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use super::format::{competition_line, details_score, kickoff_london, lines, venue_line};
use super::goals::{extract_goals, GoalExtraction};
use crate::db::models::{GoalRecord, MatchEvent, MatchRecord};

pub const NO_GOAL_DATA: &str = "⚽ Goals: N/A (source did not provide goal events)";

/// Earliest not-started, not-cancelled match kicking off at or after `now`.
pub fn find_next_upcoming_match(records: &[MatchRecord], now: DateTime<Utc>) -> Option<&MatchRecord> {
    records
        .iter()
        .filter(|m| !m.status.started && !m.status.finished && !m.status.cancelled)
        .filter(|m| m.kickoff >= now)
        .min_by_key(|m| m.kickoff)
}

/// Most recent finished match whose kickoff is within `max_age_hours`.
pub fn find_latest_finished_match(
    records: &[MatchRecord],
    now: DateTime<Utc>,
    max_age_hours: i64,
) -> Option<&MatchRecord> {
    let oldest = now - Duration::hours(max_age_hours);
    records
        .iter()
        .filter(|m| m.status.finished && !m.status.cancelled)
        .filter(|m| m.kickoff >= oldest && m.kickoff <= now)
        .max_by_key(|m| m.kickoff)
}

pub fn next_match_message(record: &MatchRecord, team_id: &str) -> String {
    let (ours, opponent) = record.perspective(team_id);
    lines([
        Some(format!("📅 **Next match:** {} vs {}", ours, opponent)),
        Some(format!("🕒 Kickoff (London): {}", kickoff_london(record.kickoff))),
        Some(competition_line(record)),
        venue_line(record),
    ])
}

pub fn recap_event_id(record: &MatchRecord) -> String {
    format!("recap:{}", record.id)
}

/// A rendered recap plus what the goal parser found, for diagnostics.
#[derive(Debug, Clone)]
pub struct Recap {
    pub event: MatchEvent,
    pub extraction: GoalExtraction,
}

fn goal_line(goal: &GoalRecord) -> String {
    let mut line = format!("• {}' {}", goal.minute_text(), goal.player);
    if goal.is_penalty {
        line.push_str(" (Pen.)");
    }
    if goal.is_own_goal {
        line.push_str(" (OG)");
    }
    line.push_str(&format!(" ({})", goal.side.label()));
    line
}

/// Post-match recap. Always carries a goals section, explicitly marked
/// N/A when no payload location reported goals.
pub fn build_recap(record: &MatchRecord, details: &Value, team_id: &str) -> Recap {
    let (ours, opponent) = record.perspective(team_id);
    let extraction = extract_goals(details, Some(record));

    let goals_section = if extraction.goals.is_empty() {
        NO_GOAL_DATA.to_string()
    } else {
        let mut section = String::from("⚽ Goals:");
        for goal in &extraction.goals {
            section.push('\n');
            section.push_str(&goal_line(goal));
        }
        section
    };

    let competition = if record.round.is_empty() {
        format!("🏆 {}", record.competition)
    } else {
        format!("🏆 {} ({})", record.competition, record.round)
    };

    let message = lines([
        Some(format!("🏁 **Full-time recap:** {} vs {}", ours, opponent)),
        Some(format!("📊 Final score: {}", details_score(details, record))),
        Some(goals_section),
        Some(competition),
        venue_line(record),
    ]);

    Recap {
        event: MatchEvent::new(recap_event_id(record), message),
        extraction,
    }
}

/// Top-level keys of the detail payload's `content` section.
pub fn content_sections(details: &Value) -> Vec<String> {
    details["content"]
        .as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}
