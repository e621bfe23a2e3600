//! Feed normalizer: turns heterogeneous fixture items into [`MatchRecord`]s.
//!
//! The feed nests the match object under varying keys (or not at all) and
//! omits fields freely. Everything downstream works on the canonical record
//! only; shape handling lives here.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::models::{MatchRecord, MatchStatus, TeamRef, UNKNOWN_MATCH_ID};

/// Keys under which a fixture wrapper may nest its match object.
const WRAPPER_KEYS: [&str; 4] = ["match", "fixture", "event", "game"];

/// Match id field names, in lookup order.
const ID_KEYS: [&str; 4] = ["id", "matchId", "match_id", "eventId"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("match {match_id} has no status.utcTime")]
    MissingKickoff { match_id: String },
    #[error("match {match_id} has unparseable kickoff {raw:?}")]
    BadKickoff { match_id: String, raw: String },
}

/// Fixture items of a team snapshot (`fixtures.allFixtures.fixtures`).
pub fn fixture_items(snapshot: &Value) -> &[Value] {
    snapshot["fixtures"]["allFixtures"]["fixtures"]
        .as_array()
        .or_else(|| snapshot["allFixtures"]["fixtures"].as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Locate the match object inside a fixture wrapper.
///
/// Nested objects under a known key win; otherwise the wrapper itself is the
/// match when it carries status or timing fields.
pub fn pick_match_obj(item: &Value) -> Option<&Value> {
    for key in WRAPPER_KEYS {
        if let Some(obj) = item.get(key).filter(|v| v.is_object()) {
            return Some(obj);
        }
    }
    let has_timing = item.get("status").map_or(false, |s| !s.is_null())
        || item.get("utcTime").map_or(false, |t| !t.is_null());
    if item.is_object() && has_timing {
        Some(item)
    } else {
        None
    }
}

/// Stable match id, falling back through alternative keys to a sentinel.
pub fn match_id(obj: &Value) -> String {
    ID_KEYS
        .iter()
        .find_map(|key| value_to_string(&obj[*key]))
        .unwrap_or_else(|| UNKNOWN_MATCH_ID.to_string())
}

/// Build the canonical record for one match object.
pub fn normalize_match(obj: &Value) -> Result<MatchRecord, NormalizeError> {
    let id = match_id(obj);
    let status = &obj["status"];

    let raw_kickoff = status["utcTime"]
        .as_str()
        .ok_or_else(|| NormalizeError::MissingKickoff {
            match_id: id.clone(),
        })?;
    let kickoff = parse_utc(raw_kickoff).ok_or_else(|| NormalizeError::BadKickoff {
        match_id: id.clone(),
        raw: raw_kickoff.to_string(),
    })?;

    let reason = &status["reason"];
    let reason_code = reason["short"]
        .as_str()
        .filter(|s| !s.is_empty())
        .or_else(|| reason["long"].as_str())
        .unwrap_or("")
        .to_string();

    let competition = obj["tournament"]["name"]
        .as_str()
        .or_else(|| obj["leagueName"].as_str())
        .or_else(|| obj["league"]["name"].as_str())
        .unwrap_or("Unknown tournament")
        .to_string();

    let round = value_to_string(&obj["roundName"])
        .or_else(|| value_to_string(&obj["round"]))
        .unwrap_or_default();

    let venue = obj["venue"]["name"]
        .as_str()
        .or_else(|| obj["venue"].as_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string);

    Ok(MatchRecord {
        id,
        kickoff,
        home: team_ref(obj, "home", "homeTeam"),
        away: team_ref(obj, "away", "awayTeam"),
        competition,
        round,
        venue,
        status: MatchStatus {
            started: status["started"].as_bool().unwrap_or(false),
            finished: status["finished"].as_bool().unwrap_or(false),
            cancelled: status["cancelled"].as_bool().unwrap_or(false),
            reason_code,
            score_str: status["scoreStr"]
                .as_str()
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string),
        },
    })
}

/// Normalize every fixture in a snapshot, skipping (and logging) the ones
/// that carry no match object or no usable kickoff.
pub fn normalize_snapshot(snapshot: &Value) -> Vec<MatchRecord> {
    let items = fixture_items(snapshot);
    let records: Vec<MatchRecord> = items
        .iter()
        .filter_map(|item| {
            let obj = pick_match_obj(item)?;
            match normalize_match(obj) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping fixture: {}", e);
                    None
                }
            }
        })
        .collect();
    debug!(
        "Normalized {} of {} fixture item(s)",
        records.len(),
        items.len()
    );
    records
}

fn team_ref(obj: &Value, key: &str, alt_key: &str) -> TeamRef {
    let team = match obj.get(key).filter(|v| v.is_object()) {
        Some(t) => t,
        None => &obj[alt_key],
    };
    TeamRef {
        id: value_to_string(&team["id"]),
        name: team["name"]
            .as_str()
            .or_else(|| team["shortName"].as_str())
            .unwrap_or("Unknown")
            .to_string(),
        score: value_to_i64(&team["score"]),
    }
}

/// Parse an ISO-8601 timestamp; naive timestamps are taken as UTC.
pub fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// String or number as a string; `None` for null, empty and other types.
pub(crate) fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integer from a number or a numeric string.
pub(crate) fn value_to_i64(v: &Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_f64().map(|f| f as i64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}
