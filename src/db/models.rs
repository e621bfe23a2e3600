use chrono::{DateTime, Utc};

/// Sentinel used when a fixture carries none of the known id fields.
pub const UNKNOWN_MATCH_ID: &str = "unknown";

/// One side of a fixture as reported by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TeamRef {
    /// Feed team id, stringified (the feed mixes numbers and strings)
    pub id: Option<String>,
    pub name: String,
    /// Goals scored so far, when the feed reports them
    pub score: Option<i64>,
}

/// Status tuple of a fixture. Absent fields mean "not started".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchStatus {
    pub started: bool,
    pub finished: bool,
    pub cancelled: bool,
    /// Short reason code, e.g. "HT", "FT"; empty when unknown
    pub reason_code: String,
    /// Feed-formatted score string, e.g. "2 - 1"
    pub score_str: Option<String>,
}

/// Canonical match record produced by the feed normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub id: String,
    pub kickoff: DateTime<Utc>,
    pub home: TeamRef,
    pub away: TeamRef,
    pub competition: String,
    /// Round or stage label; empty when the feed omits it
    pub round: String,
    pub venue: Option<String>,
    pub status: MatchStatus,
}

impl MatchRecord {
    /// Started and not yet finished.
    pub fn is_live(&self) -> bool {
        self.status.started && !self.status.finished
    }

    /// Display names ordered as (tracked team, opponent).
    pub fn perspective(&self, team_id: &str) -> (&str, &str) {
        if self.home.id.as_deref() == Some(team_id) {
            (&self.home.name, &self.away.name)
        } else if self.away.id.as_deref() == Some(team_id) {
            (&self.away.name, &self.home.name)
        } else {
            (&self.home.name, &self.away.name)
        }
    }
}

/// A notification candidate. `event_id` never depends on wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEvent {
    pub event_id: String,
    pub message: String,
}

impl MatchEvent {
    pub fn new(event_id: impl Into<String>, message: impl Into<String>) -> Self {
        MatchEvent {
            event_id: event_id.into(),
            message: message.into(),
        }
    }
}

/// Lifecycle categories, listed in classification precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    Cancelled,
    Prematch,
    Halftime,
    Live,
    Fulltime,
}

impl LifecycleKind {
    /// Suffix used in the event id (`<match>:<suffix>`).
    pub fn id_suffix(self) -> &'static str {
        match self {
            LifecycleKind::Cancelled => "cancelled",
            LifecycleKind::Prematch => "prematch",
            LifecycleKind::Halftime => "halftime",
            LifecycleKind::Live => "live",
            LifecycleKind::Fulltime => "fulltime",
        }
    }
}

/// Which side of the fixture an incident belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamSide {
    Home,
    Away,
    /// Team id matched neither side; the raw id is kept
    Other(String),
}

impl TeamSide {
    pub fn label(&self) -> &str {
        match self {
            TeamSide::Home => "Home",
            TeamSide::Away => "Away",
            TeamSide::Other(raw) => raw,
        }
    }

    pub fn id_key(&self) -> &str {
        match self {
            TeamSide::Home => "home",
            TeamSide::Away => "away",
            TeamSide::Other(raw) => raw,
        }
    }
}

/// A scoring incident extracted from a match-detail payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalRecord {
    pub minute: u32,
    pub added_time: u32,
    pub player: String,
    pub assist: Option<String>,
    pub side: TeamSide,
    pub is_penalty: bool,
    pub is_own_goal: bool,
}

impl GoalRecord {
    /// `"52"` or `"45+2"` when stoppage time is reported.
    pub fn minute_text(&self) -> String {
        if self.added_time > 0 {
            format!("{}+{}", self.minute, self.added_time)
        } else {
            self.minute.to_string()
        }
    }
}
