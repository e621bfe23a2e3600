//! Goal extraction from match-detail payloads and live goal events.
//!
//! The detail payload reports goals in several places with different field
//! names. Sources are tried in [`GoalSource`] order and the first one that
//! yields any goal is used.

use serde_json::Value;
use tracing::debug;

use super::format::details_score;
use crate::db::models::{GoalRecord, MatchEvent, MatchRecord, TeamSide};
use crate::fotmob::normalize::{value_to_i64, value_to_string};

/// Where in the detail payload goals were found, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalSource {
    Shotmap,
    MatchFacts,
    Incidents,
    Events,
}

impl GoalSource {
    const ALL: [GoalSource; 4] = [
        GoalSource::Shotmap,
        GoalSource::MatchFacts,
        GoalSource::Incidents,
        GoalSource::Events,
    ];

    fn entries(self, details: &Value) -> &[Value] {
        let content = &details["content"];
        let list = match self {
            GoalSource::Shotmap => content["shotmap"]["shots"].as_array(),
            GoalSource::MatchFacts => content["matchFacts"]["events"]
                .as_array()
                .or_else(|| content["matchFacts"]["events"]["events"].as_array()),
            GoalSource::Incidents => content["incidents"]
                .as_array()
                .or_else(|| content["incidents"]["incidents"].as_array()),
            GoalSource::Events => content["events"]
                .as_array()
                .or_else(|| details["events"].as_array()),
        };
        list.map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Goals found in a detail payload, ordered by (minute, added time).
#[derive(Debug, Clone, Default)]
pub struct GoalExtraction {
    pub source: Option<GoalSource>,
    pub goals: Vec<GoalRecord>,
}

struct SideIds {
    home: Option<String>,
    away: Option<String>,
}

impl SideIds {
    fn resolve(details: &Value, record: Option<&MatchRecord>) -> Self {
        let general = &details["general"];
        SideIds {
            home: record
                .and_then(|r| r.home.id.clone())
                .or_else(|| value_to_string(&general["homeTeam"]["id"])),
            away: record
                .and_then(|r| r.away.id.clone())
                .or_else(|| value_to_string(&general["awayTeam"]["id"])),
        }
    }

    fn side_of(&self, entry: &Value) -> TeamSide {
        let team_id = value_to_string(&entry["teamId"]).or_else(|| value_to_string(&entry["team"]["id"]));
        if let Some(id) = team_id.as_deref() {
            if self.home.as_deref() == Some(id) {
                return TeamSide::Home;
            }
            if self.away.as_deref() == Some(id) {
                return TeamSide::Away;
            }
        }
        match entry["isHome"].as_bool() {
            Some(true) => TeamSide::Home,
            Some(false) => TeamSide::Away,
            None => TeamSide::Other(team_id.unwrap_or_else(|| "unknown".to_string())),
        }
    }
}

/// Extract goals, using `record` (when given) to resolve home/away sides.
pub fn extract_goals(details: &Value, record: Option<&MatchRecord>) -> GoalExtraction {
    let sides = SideIds::resolve(details, record);
    for source in GoalSource::ALL {
        let mut goals: Vec<GoalRecord> = source
            .entries(details)
            .iter()
            .filter(|entry| is_goal_entry(entry))
            .map(|entry| goal_from_entry(entry, &sides))
            .collect();
        if !goals.is_empty() {
            goals.sort_by_key(|g| (g.minute, g.added_time));
            debug!("Parsed {} goal(s) from {:?}", goals.len(), source);
            return GoalExtraction {
                source: Some(source),
                goals,
            };
        }
    }
    GoalExtraction::default()
}

fn entry_kind(entry: &Value) -> String {
    entry["eventType"]
        .as_str()
        .or_else(|| entry["type"].as_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn is_goal_entry(entry: &Value) -> bool {
    matches!(entry_kind(entry).as_str(), "goal" | "owngoal")
}

fn first_string(entry: &Value, paths: &[&[&str]]) -> Option<String> {
    paths.iter().find_map(|path| {
        let v = path.iter().fold(entry, |v, key| &v[*key]);
        value_to_string(v)
    })
}

fn first_bool(entry: &Value, keys: &[&str]) -> bool {
    keys.iter().any(|key| entry[*key].as_bool().unwrap_or(false))
}

/// Parse one minute field: a number or a `"45+2'"` style string.
fn parse_minute(value: &Value) -> Option<(i64, Option<i64>)> {
    match value {
        Value::String(s) => {
            let s = s.trim().trim_end_matches('\'');
            match s.split_once('+') {
                Some((m, a)) => Some((m.trim().parse().ok()?, a.trim().parse().ok())),
                None => Some((s.parse().ok()?, None)),
            }
        }
        v => value_to_i64(v).map(|m| (m, None)),
    }
}

/// Minute and stoppage time. The first minute field that parses wins.
fn minute_of(entry: &Value) -> (u32, u32) {
    let (minute, inline_added) = ["min", "minute", "time"]
        .iter()
        .find_map(|key| parse_minute(&entry[*key]))
        .map_or((None, None), |(m, a)| (Some(m), a));

    let added = ["minAdded", "overloadTime", "addedTime", "timeAdded"]
        .iter()
        .find_map(|key| value_to_i64(&entry[*key]))
        .or(inline_added);

    let clamp = |v: Option<i64>| v.and_then(|v| u32::try_from(v).ok()).unwrap_or(0);
    (clamp(minute), clamp(added))
}

fn goal_from_entry(entry: &Value, sides: &SideIds) -> GoalRecord {
    let (minute, added_time) = minute_of(entry);
    let player = first_string(
        entry,
        &[
            &["playerName"],
            &["name"],
            &["player", "name"],
            &["nameStr"],
            &["fullName"],
        ],
    )
    .unwrap_or_else(|| "Unknown".to_string());
    let assist = first_string(
        entry,
        &[&["assistPlayerName"], &["assist", "name"], &["assistStr"]],
    );
    let situation = entry["situation"].as_str().unwrap_or("");
    let description = entry["goalDescription"].as_str().unwrap_or("");

    GoalRecord {
        minute,
        added_time,
        player,
        assist,
        side: sides.side_of(entry),
        is_penalty: first_bool(entry, &["isPenalty", "penalty"])
            || situation.eq_ignore_ascii_case("penalty")
            || description.to_ascii_lowercase().contains("penalty"),
        is_own_goal: first_bool(entry, &["isOwnGoal", "ownGoal"])
            || entry_kind(entry) == "owngoal",
    }
}

/// Goal identity: the same (match, side, scorer, minute, own-goal) always
/// maps to the same id. Two goals by one player in one minute collapse into
/// one event.
pub fn goal_event_id(record: &MatchRecord, goal: &GoalRecord) -> String {
    format!(
        "{}:goal:{}:{}:{}:{}",
        record.id,
        goal.side.id_key(),
        goal.player.trim().to_lowercase(),
        goal.minute_text(),
        if goal.is_own_goal { "og" } else { "reg" }
    )
}

fn side_name<'a>(record: &'a MatchRecord, side: &'a TeamSide) -> &'a str {
    match side {
        TeamSide::Home => &record.home.name,
        TeamSide::Away => &record.away.name,
        TeamSide::Other(raw) => raw,
    }
}

/// Goal notifications for a live match, with the running scoreline.
pub fn goal_events(record: &MatchRecord, details: &Value) -> Vec<MatchEvent> {
    let extraction = extract_goals(details, Some(record));
    let scoreline = format!(
        "{} {} {}",
        record.home.name,
        details_score(details, record),
        record.away.name
    );

    extraction
        .goals
        .iter()
        .map(|goal| {
            let mut message = format!(
                "⚽ {}' GOAL for {}!\n👟 Scorer: {}",
                goal.minute_text(),
                side_name(record, &goal.side),
                goal.player
            );
            if goal.is_own_goal {
                message.push_str(" (OG)");
            }
            if let Some(assist) = &goal.assist {
                message.push_str(&format!("\n🅰️ Assist: {}", assist));
            }
            message.push_str(&format!("\n📊 {}", scoreline));
            MatchEvent::new(goal_event_id(record, goal), message)
        })
        .collect()
}
