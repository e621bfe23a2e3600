use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db::models::{MatchEvent, MatchRecord};
use crate::db::StateStore;
use crate::discord::Notifier;
use crate::fotmob::{normalize_snapshot, FeedProvider};

use super::classify::{build_events, ClassifyContext};
use super::dedup::filter_new;
use super::goals::goal_events;
use super::recap::{
    build_recap, content_sections, find_latest_finished_match, find_next_upcoming_match,
    next_match_message,
};
use super::schedule::GateDecision;

/// What a cycle ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMode {
    TestMessage,
    NextMatch,
    Recap,
    /// Scheduling gate refused the event pipeline
    Gated,
    Events,
}

/// Outcome of one run, logged by `main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub mode: CycleMode,
    pub candidates: usize,
    pub duplicates: usize,
    pub delivered: usize,
    pub failed: usize,
    pub persisted: bool,
}

impl CycleReport {
    fn new(mode: CycleMode) -> Self {
        CycleReport {
            mode,
            candidates: 0,
            duplicates: 0,
            delivered: 0,
            failed: 0,
            persisted: false,
        }
    }
}

/// Delivery orchestrator: gate, classify, dedup, deliver, persist.
///
/// Collaborators are borrowed for one run; the delivered-id set is loaded
/// once, threaded through the cycle and saved at most once.
pub struct MatchdayBot<'a> {
    config: &'a Config,
    feed: &'a dyn FeedProvider,
    notifier: &'a dyn Notifier,
    store: &'a dyn StateStore,
}

impl<'a> MatchdayBot<'a> {
    pub fn new(
        config: &'a Config,
        feed: &'a dyn FeedProvider,
        notifier: &'a dyn Notifier,
        store: &'a dyn StateStore,
    ) -> Self {
        MatchdayBot {
            config,
            feed,
            notifier,
            store,
        }
    }

    /// Run one cycle to completion at time `now`.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let mut posted = self.store.load()?;
        debug!(
            "Loaded {} delivered event id(s) from {} store",
            posted.len(),
            self.store.name()
        );

        if let Some(text) = &self.config.discord_test_message {
            self.notifier
                .send(text)
                .await
                .context("Test message delivery failed")?;
            info!("Test message sent via {}", self.notifier.name());
            let mut report = CycleReport::new(CycleMode::TestMessage);
            report.delivered = 1;
            return Ok(report);
        }

        let snapshot = self
            .feed
            .fetch_team_fixtures(self.config.team_id)
            .await
            .with_context(|| format!("{} fixtures fetch failed", self.feed.name()))?;
        let records = normalize_snapshot(&snapshot);
        info!("Fetched {} fixture(s) for team {}", records.len(), self.config.team_id);

        if self.config.send_next_match_now {
            return self.announce_next_match(&records, now).await;
        }

        if self.config.recap_mode() {
            return self.post_latest_recap(&records, now, &mut posted).await;
        }

        match self.config.schedule().evaluate(&records, now) {
            GateDecision::Skip => {
                info!("Outside fast windows and off slow-poll boundary; skipping cycle");
                return Ok(CycleReport::new(CycleMode::Gated));
            }
            GateDecision::LiveMatch(id) => debug!("Match {} is live; running full pipeline", id),
            GateDecision::FastWindow(id) => debug!("Inside fast window of match {}", id),
            GateDecision::SlowPoll => debug!("Slow-poll boundary reached"),
        }

        let ctx = ClassifyContext::new(
            self.config.team_id.to_string(),
            now,
            self.config.prematch_window_minutes,
            self.config.match_lookahead_hours,
        );
        let mut events = build_events(&records, &ctx);
        events.extend(self.collect_live_goal_events(&records).await);

        let mut report = CycleReport::new(CycleMode::Events);
        report.candidates = events.len();
        let fresh = filter_new(events, &posted);
        report.duplicates = report.candidates - fresh.len();

        if fresh.is_empty() {
            info!("No new events to post.");
            return Ok(report);
        }

        self.deliver_all(fresh, &mut posted, &mut report).await;
        self.persist(&posted, &mut report)?;
        Ok(report)
    }

    /// Goal events for every live match. Detail fetches run one at a time;
    /// a failed fetch skips that match only.
    async fn collect_live_goal_events(&self, records: &[MatchRecord]) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        for record in records.iter().filter(|m| m.is_live()) {
            match self.feed.fetch_match_details(&record.id).await {
                Ok(details) => {
                    let goals = goal_events(record, &details);
                    debug!("Match {}: {} goal event(s)", record.id, goals.len());
                    events.extend(goals);
                }
                Err(e) => warn!("Skipping goal scan for match {}: {:#}", record.id, e),
            }
        }
        events
    }

    async fn deliver_all(
        &self,
        events: Vec<MatchEvent>,
        posted: &mut HashSet<String>,
        report: &mut CycleReport,
    ) {
        for event in events {
            match self.notifier.send(&event.message).await {
                Ok(()) => {
                    info!("Posted: {}", event.event_id);
                    posted.insert(event.event_id);
                    report.delivered += 1;
                }
                Err(e) => {
                    error!("Failed to post {}: {:#}", event.event_id, e);
                    report.failed += 1;
                }
            }
        }
    }

    /// Save once, only after at least one delivery and never in dry-run.
    fn persist(&self, posted: &HashSet<String>, report: &mut CycleReport) -> Result<()> {
        if report.delivered == 0 || self.config.dry_run {
            return Ok(());
        }
        self.store
            .save(posted)
            .with_context(|| format!("Failed to save {} state", self.store.name()))?;
        report.persisted = true;
        Ok(())
    }

    async fn announce_next_match(
        &self,
        records: &[MatchRecord],
        now: DateTime<Utc>,
    ) -> Result<CycleReport> {
        let mut report = CycleReport::new(CycleMode::NextMatch);
        let Some(next) = find_next_upcoming_match(records, now) else {
            info!("No upcoming match found");
            return Ok(report);
        };
        let message = next_match_message(next, &self.config.team_id.to_string());
        self.notifier
            .send(&message)
            .await
            .context("Next match announcement failed")?;
        info!("Announced next match {}", next.id);
        report.candidates = 1;
        report.delivered = 1;
        Ok(report)
    }

    async fn post_latest_recap(
        &self,
        records: &[MatchRecord],
        now: DateTime<Utc>,
        posted: &mut HashSet<String>,
    ) -> Result<CycleReport> {
        let mut report = CycleReport::new(CycleMode::Recap);
        if self.config.force_post && !self.config.send_latest_finished_match_now {
            info!("FORCE_POST enabled -> enabling recap mode.");
        }

        let Some(latest) =
            find_latest_finished_match(records, now, self.config.max_finished_age_hours)
        else {
            info!(
                "No finished match within the last {}h",
                self.config.max_finished_age_hours
            );
            return Ok(report);
        };

        let details = self
            .feed
            .fetch_match_details(&latest.id)
            .await
            .with_context(|| format!("Match details fetch failed for {}", latest.id))?;
        let recap = build_recap(latest, &details, &self.config.team_id.to_string());
        report.candidates = 1;

        if self.config.debug_fotmob_payload {
            info!(
                "Recap debug: match_id={} sections={:?} goal_source={:?} goals_parsed={}",
                latest.id,
                content_sections(&details),
                recap.extraction.source,
                recap.extraction.goals.len()
            );
        }

        if posted.contains(&recap.event.event_id) && !self.config.force_post {
            info!("Recap {} already posted; skipping", recap.event.event_id);
            report.duplicates = 1;
            return Ok(report);
        }

        self.deliver_all(vec![recap.event], posted, &mut report).await;
        self.persist(posted, &mut report)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::classify::tests::now;
    use crate::bot::goals::tests::match_details;
    use crate::testing::CapturedLogs;
    use async_trait::async_trait;
    use chrono::Duration;
    use clap::Parser;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeFeed {
        fixtures: Value,
        details: HashMap<String, Value>,
        detail_calls: Mutex<Vec<String>>,
        fixture_calls: Mutex<usize>,
    }

    impl FakeFeed {
        fn new(matches: Vec<Value>) -> Self {
            let fixtures: Vec<Value> = matches.into_iter().map(|m| json!({ "match": m })).collect();
            FakeFeed {
                fixtures: json!({"fixtures": {"allFixtures": {"fixtures": fixtures}}}),
                details: HashMap::new(),
                detail_calls: Mutex::new(Vec::new()),
                fixture_calls: Mutex::new(0),
            }
        }

        fn with_details(mut self, match_id: &str, details: Value) -> Self {
            self.details.insert(match_id.to_string(), details);
            self
        }

        fn detail_calls(&self) -> Vec<String> {
            self.detail_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FeedProvider for FakeFeed {
        async fn fetch_team_fixtures(&self, _team_id: u64) -> Result<Value> {
            *self.fixture_calls.lock().unwrap() += 1;
            Ok(self.fixtures.clone())
        }

        async fn fetch_match_details(&self, match_id: &str) -> Result<Value> {
            self.detail_calls.lock().unwrap().push(match_id.to_string());
            self.details
                .get(match_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no details for {}", match_id))
        }

        fn name(&self) -> &str {
            "fake-feed"
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        sent: Mutex<Vec<String>>,
        fail_when_contains: Option<&'static str>,
    }

    impl FakeNotifier {
        fn failing_on(needle: &'static str) -> Self {
            FakeNotifier {
                fail_when_contains: Some(needle),
                ..Default::default()
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        async fn send(&self, message: &str) -> Result<()> {
            if let Some(needle) = self.fail_when_contains {
                if message.contains(needle) {
                    anyhow::bail!("webhook returned 500");
                }
            }
            self.sent.lock().unwrap().push(message.to_string());
            Ok(())
        }

        fn name(&self) -> &str {
            "fake-notifier"
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        ids: Mutex<HashSet<String>>,
        saves: Mutex<usize>,
    }

    impl MemoryStore {
        fn with(ids: &[&str]) -> Self {
            let store = MemoryStore::default();
            store.ids.lock().unwrap().extend(ids.iter().map(|s| s.to_string()));
            store
        }

        fn saves(&self) -> usize {
            *self.saves.lock().unwrap()
        }

        fn ids(&self) -> HashSet<String> {
            self.ids.lock().unwrap().clone()
        }
    }

    impl StateStore for MemoryStore {
        fn load(&self) -> Result<HashSet<String>> {
            Ok(self.ids())
        }

        fn save(&self, event_ids: &HashSet<String>) -> Result<()> {
            *self.ids.lock().unwrap() = event_ids.clone();
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }

        fn name(&self) -> &str {
            "memory"
        }
    }

    fn fixture(id: u64, minutes_from_now: i64, started: bool, finished: bool, reason: &str) -> Value {
        let kickoff = now() + Duration::minutes(minutes_from_now);
        json!({
            "id": id,
            "home": {"id": 1186081, "name": "Hashtag United", "score": 1},
            "away": {"id": 123, "name": "Opponent", "score": 0},
            "status": {
                "utcTime": kickoff.to_rfc3339(),
                "started": started,
                "finished": finished,
                "cancelled": false,
                "reason": {"short": reason}
            },
            "tournament": {"name": "League"},
            "roundName": "Round 1",
            "venue": {"name": "Parkside"}
        })
    }

    fn config(args: &[&str]) -> Config {
        let mut argv = vec![
            "matchday-bot",
            "--discord-webhook-url",
            "https://discord.com/api/webhooks/test",
        ];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn second_identical_run_delivers_nothing() {
        let cfg = config(&[]);
        let feed = FakeFeed::new(vec![
            fixture(999, 30, false, false, ""),
            fixture(1001, -20, true, false, ""),
        ])
        .with_details("1001", match_details());
        let notifier = FakeNotifier::default();
        let store = MemoryStore::default();
        let bot = MatchdayBot::new(&cfg, &feed, &notifier, &store);

        let first = bot.run_cycle(now()).await.unwrap();
        assert_eq!(first.mode, CycleMode::Events);
        assert_eq!(first.delivered, 3); // prematch, live, goal
        assert!(first.persisted);
        assert!(store.ids().contains("999:prematch"));
        assert!(store.ids().contains("1001:live"));

        let second = bot.run_cycle(now()).await.unwrap();
        assert_eq!(second.delivered, 0);
        assert_eq!(second.duplicates, 3);
        assert_eq!(notifier.sent().len(), 3);
        assert_eq!(store.saves(), 1);
    }

    #[tokio::test]
    async fn goal_scan_fetches_only_live_matches() {
        let cfg = config(&[]);
        let feed = FakeFeed::new(vec![
            fixture(1001, -20, true, false, ""),
            fixture(1002, -150, true, true, "FT"),
        ])
        .with_details("1001", match_details());
        let notifier = FakeNotifier::default();
        let store = MemoryStore::default();
        MatchdayBot::new(&cfg, &feed, &notifier, &store)
            .run_cycle(now())
            .await
            .unwrap();

        assert_eq!(feed.detail_calls(), vec!["1001"]);
        let goals: Vec<String> = store.ids().into_iter().filter(|id| id.contains(":goal:")).collect();
        assert_eq!(goals.len(), 1);
    }

    #[tokio::test]
    async fn failed_detail_fetch_does_not_abort_cycle() {
        let cfg = config(&[]);
        // no details registered: every detail fetch fails
        let feed = FakeFeed::new(vec![fixture(1001, -20, true, false, "")]);
        let notifier = FakeNotifier::default();
        let store = MemoryStore::default();
        let report = MatchdayBot::new(&cfg, &feed, &notifier, &store)
            .run_cycle(now())
            .await
            .unwrap();
        assert_eq!(report.delivered, 1);
        assert!(store.ids().contains("1001:live"));
    }

    #[tokio::test]
    async fn failed_delivery_is_not_marked_and_others_continue() {
        let cfg = config(&[]);
        let feed = FakeFeed::new(vec![
            fixture(1, 30, false, false, ""),
            fixture(2, -150, true, true, "FT"),
        ]);
        let notifier = FakeNotifier::failing_on("Match soon");
        let store = MemoryStore::default();
        let report = MatchdayBot::new(&cfg, &feed, &notifier, &store)
            .run_cycle(now())
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
        assert!(report.persisted);
        assert!(!store.ids().contains("1:prematch"));
        assert!(store.ids().contains("2:fulltime"));
    }

    #[tokio::test]
    async fn nothing_saved_when_every_delivery_fails() {
        let cfg = config(&[]);
        let feed = FakeFeed::new(vec![fixture(1, 30, false, false, "")]);
        let notifier = FakeNotifier::failing_on("Match soon");
        let store = MemoryStore::default();
        let report = MatchdayBot::new(&cfg, &feed, &notifier, &store)
            .run_cycle(now())
            .await
            .unwrap();
        assert_eq!(report.failed, 1);
        assert!(!report.persisted);
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn dry_run_never_persists() {
        let cfg = config(&["--dry-run"]);
        let feed = FakeFeed::new(vec![fixture(1, 30, false, false, "")]);
        let notifier = FakeNotifier::default();
        let store = MemoryStore::default();
        let report = MatchdayBot::new(&cfg, &feed, &notifier, &store)
            .run_cycle(now())
            .await
            .unwrap();
        assert_eq!(report.delivered, 1);
        assert!(!report.persisted);
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn gate_skips_quiet_cycles() {
        let cfg = config(&[]);
        // only a match five days out; 13:07 is off the 30-minute boundary
        let feed = FakeFeed::new(vec![fixture(1, 5 * 24 * 60, false, false, "")]);
        let notifier = FakeNotifier::default();
        let store = MemoryStore::default();
        let report = MatchdayBot::new(&cfg, &feed, &notifier, &store)
            .run_cycle(now() + Duration::minutes(7))
            .await
            .unwrap();
        assert_eq!(report.mode, CycleMode::Gated);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_message_skips_feed() {
        let cfg = config(&["--dry-run", "--discord-test-message", "test message"]);
        let feed = FakeFeed::new(vec![]);
        let notifier = FakeNotifier::default();
        let store = MemoryStore::default();
        let report = MatchdayBot::new(&cfg, &feed, &notifier, &store)
            .run_cycle(now())
            .await
            .unwrap();
        assert_eq!(report.mode, CycleMode::TestMessage);
        assert_eq!(notifier.sent(), vec!["test message"]);
        assert_eq!(*feed.fixture_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn next_match_announcement() {
        let cfg = config(&["--send-next-match-now"]);
        let feed = FakeFeed::new(vec![
            fixture(1, 500, false, false, ""),
            fixture(2, 60, false, false, ""),
        ]);
        let notifier = FakeNotifier::default();
        let store = MemoryStore::default();
        let report = MatchdayBot::new(&cfg, &feed, &notifier, &store)
            .run_cycle(now())
            .await
            .unwrap();
        assert_eq!(report.mode, CycleMode::NextMatch);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Next match"));
        assert!(sent[0].contains("14-02-2026 14:00"));
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn recap_skipped_when_already_posted() {
        let cfg = config(&["--send-latest-finished-match-now"]);
        let feed = FakeFeed::new(vec![fixture(5555, -60, true, true, "FT")])
            .with_details("5555", match_details());
        let notifier = FakeNotifier::default();
        let store = MemoryStore::with(&["recap:5555"]);
        let report = MatchdayBot::new(&cfg, &feed, &notifier, &store)
            .run_cycle(now())
            .await
            .unwrap();
        assert_eq!(feed.detail_calls(), vec!["5555"]);
        assert_eq!(report.duplicates, 1);
        assert!(notifier.sent().is_empty());
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn force_post_bypasses_dedup_and_implies_recap() {
        let cfg = config(&["--force-post"]);
        let feed = FakeFeed::new(vec![fixture(7777, -60, true, true, "FT")])
            .with_details("7777", match_details());
        let notifier = FakeNotifier::default();
        let store = MemoryStore::with(&["recap:7777"]);
        let report = MatchdayBot::new(&cfg, &feed, &notifier, &store)
            .run_cycle(now())
            .await
            .unwrap();
        assert_eq!(report.mode, CycleMode::Recap);
        assert_eq!(report.delivered, 1);
        assert_eq!(store.saves(), 1);
        let sent = notifier.sent();
        assert!(sent[0].contains("Full-time recap"));
        assert!(sent[0].contains("52' Player A (Home)"));
    }

    #[tokio::test]
    async fn recap_records_its_id() {
        let cfg = config(&["--send-latest-finished-match-now", "--debug-fotmob-payload"]);
        let feed = FakeFeed::new(vec![fixture(6666, -60, true, true, "FT")])
            .with_details("6666", json!({"content": {}}));
        let notifier = FakeNotifier::default();
        let store = MemoryStore::default();
        let (logs, _guard) = CapturedLogs::install();
        MatchdayBot::new(&cfg, &feed, &notifier, &store)
            .run_cycle(now())
            .await
            .unwrap();
        assert!(store.ids().contains("recap:6666"));
        assert!(notifier.sent()[0].contains("N/A (source did not provide goal events)"));

        let text = logs.text();
        assert!(text.contains("Recap debug: match_id=6666"), "{}", text);
        assert!(text.contains("goal_source=None goals_parsed=0"), "{}", text);
    }

    #[tokio::test]
    async fn recap_detail_failure_is_an_error() {
        let cfg = config(&["--send-latest-finished-match-now"]);
        let feed = FakeFeed::new(vec![fixture(8, -60, true, true, "FT")]);
        let notifier = FakeNotifier::default();
        let store = MemoryStore::default();
        let result = MatchdayBot::new(&cfg, &feed, &notifier, &store)
            .run_cycle(now())
            .await;
        assert!(result.is_err());
        assert!(notifier.sent().is_empty());
    }
}
