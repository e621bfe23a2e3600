//! Lifecycle classification: at most one event per match per cycle.
//!
//! Precedence is the order of [`RULES`]; the first rule that applies wins.

use chrono::{DateTime, Duration, Utc};

use super::format::{competition_line, kickoff_london, lines, match_score, venue_line};
use crate::db::models::{LifecycleKind, MatchEvent, MatchRecord};

/// Matches that kicked off longer ago than this are ignored.
pub const LOOKBACK_HOURS: i64 = 4;

/// Countdown line is shown only this close to kickoff.
pub const COUNTDOWN_MINUTES: i64 = 60;

/// Inputs that stay fixed for one classification pass.
#[derive(Debug, Clone)]
pub struct ClassifyContext {
    pub team_id: String,
    pub now: DateTime<Utc>,
    pub prematch_window: Duration,
    pub lookahead: Duration,
}

impl ClassifyContext {
    pub fn new(
        team_id: impl Into<String>,
        now: DateTime<Utc>,
        prematch_window_minutes: i64,
        match_lookahead_hours: i64,
    ) -> Self {
        ClassifyContext {
            team_id: team_id.into(),
            now,
            prematch_window: Duration::minutes(prematch_window_minutes),
            lookahead: Duration::hours(match_lookahead_hours),
        }
    }

    /// Kickoff lies in `[now - lookback, now + lookahead]`.
    pub fn in_window(&self, record: &MatchRecord) -> bool {
        let lower = self.now - Duration::hours(LOOKBACK_HOURS);
        let upper = self.now + self.lookahead;
        lower <= record.kickoff && record.kickoff <= upper
    }
}

struct Rule {
    kind: LifecycleKind,
    applies: fn(&MatchRecord, &ClassifyContext) -> bool,
}

fn is_cancelled(m: &MatchRecord, _: &ClassifyContext) -> bool {
    m.status.cancelled
}

fn is_prematch(m: &MatchRecord, ctx: &ClassifyContext) -> bool {
    !m.status.started && m.kickoff <= ctx.now + ctx.prematch_window
}

fn is_halftime(m: &MatchRecord, _: &ClassifyContext) -> bool {
    m.is_live() && m.status.reason_code.eq_ignore_ascii_case("HT")
}

fn is_live(m: &MatchRecord, _: &ClassifyContext) -> bool {
    m.is_live()
}

fn is_fulltime(m: &MatchRecord, _: &ClassifyContext) -> bool {
    m.status.finished
}

/// Classification rules in precedence order.
const RULES: [Rule; 5] = [
    Rule { kind: LifecycleKind::Cancelled, applies: is_cancelled },
    Rule { kind: LifecycleKind::Prematch, applies: is_prematch },
    Rule { kind: LifecycleKind::Halftime, applies: is_halftime },
    Rule { kind: LifecycleKind::Live, applies: is_live },
    Rule { kind: LifecycleKind::Fulltime, applies: is_fulltime },
];

/// Pick the lifecycle category for one match, if any.
pub fn classify(record: &MatchRecord, ctx: &ClassifyContext) -> Option<LifecycleKind> {
    if !ctx.in_window(record) {
        return None;
    }
    RULES
        .iter()
        .find(|rule| (rule.applies)(record, ctx))
        .map(|rule| rule.kind)
}

/// Lifecycle event id: `<match>:<kind>`.
pub fn lifecycle_event_id(record: &MatchRecord, kind: LifecycleKind) -> String {
    format!("{}:{}", record.id, kind.id_suffix())
}

/// Render the notification for a classified match.
pub fn lifecycle_event(
    record: &MatchRecord,
    kind: LifecycleKind,
    ctx: &ClassifyContext,
) -> MatchEvent {
    let (ours, opponent) = record.perspective(&ctx.team_id);
    let score = match_score(record);

    let message = match kind {
        LifecycleKind::Cancelled => lines([
            Some(format!("❌ **{} vs {}** has been cancelled.", ours, opponent)),
            Some(competition_line(record)),
            venue_line(record),
        ]),
        LifecycleKind::Prematch => {
            let minutes_left = (record.kickoff - ctx.now).num_minutes();
            let countdown = (0..=COUNTDOWN_MINUTES)
                .contains(&minutes_left)
                .then(|| format!("⏳ Starts in {} min", minutes_left));
            lines([
                Some(format!("📣 **Match soon:** {} vs {}", ours, opponent)),
                Some(format!("🕒 Kickoff (London): {}", kickoff_london(record.kickoff))),
                countdown,
                Some(competition_line(record)),
                venue_line(record),
            ])
        }
        LifecycleKind::Halftime => lines([
            Some(format!("⏸️ **Half-time:** {} vs {}", ours, opponent)),
            Some(format!("📊 Score: {}", score)),
        ]),
        LifecycleKind::Live => lines([
            Some(format!("🔴 **Match is live:** {} vs {}", ours, opponent)),
            Some(format!("📊 Live score: {}", score)),
        ]),
        LifecycleKind::Fulltime => lines([
            Some(format!("✅ **Full-time:** {} vs {}", ours, opponent)),
            Some(format!("📊 Final score: {}", score)),
            Some(competition_line(record)),
        ]),
    };

    MatchEvent::new(lifecycle_event_id(record, kind), message)
}

/// Lifecycle events for every match in the snapshot.
pub fn build_events(records: &[MatchRecord], ctx: &ClassifyContext) -> Vec<MatchEvent> {
    records
        .iter()
        .filter_map(|record| {
            classify(record, ctx).map(|kind| lifecycle_event(record, kind, ctx))
        })
        .collect()
}
