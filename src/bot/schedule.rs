use chrono::{DateTime, Duration, Timelike, Utc};

use crate::db::models::MatchRecord;

/// Tunables for the adaptive fast/slow polling gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub fast_window_before_minutes: i64,
    pub fast_window_after_minutes: i64,
    pub expected_match_duration_minutes: i64,
    pub slow_poll_interval_minutes: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            fast_window_before_minutes: 90,
            fast_window_after_minutes: 30,
            expected_match_duration_minutes: 120,
            slow_poll_interval_minutes: 30,
        }
    }
}

/// Why the gate admitted (or refused) a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    LiveMatch(String),
    FastWindow(String),
    SlowPoll,
    Skip,
}

impl GateDecision {
    pub fn should_run(&self) -> bool {
        !matches!(self, GateDecision::Skip)
    }
}

impl ScheduleConfig {
    /// `[kickoff - before, kickoff + duration + after]`.
    pub fn fast_window(&self, kickoff: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            kickoff - Duration::minutes(self.fast_window_before_minutes),
            kickoff
                + Duration::minutes(
                    self.expected_match_duration_minutes + self.fast_window_after_minutes,
                ),
        )
    }

    /// Decide whether the event pipeline runs this cycle.
    ///
    /// Any live match admits immediately. Otherwise `now` must fall inside a
    /// match's fast window, or on a slow-poll boundary of the hour.
    pub fn evaluate(&self, records: &[MatchRecord], now: DateTime<Utc>) -> GateDecision {
        if let Some(m) = records.iter().find(|m| m.is_live()) {
            return GateDecision::LiveMatch(m.id.clone());
        }

        for m in records {
            let (start, end) = self.fast_window(m.kickoff);
            if start <= now && now <= end {
                return GateDecision::FastWindow(m.id.clone());
            }
        }

        let interval = self.slow_poll_interval_minutes.max(1);
        if now.minute() % interval == 0 {
            GateDecision::SlowPoll
        } else {
            GateDecision::Skip
        }
    }
}
